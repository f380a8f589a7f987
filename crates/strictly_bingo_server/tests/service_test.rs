//! Tests for the game service flows.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use strictly_bingo::{BingoError, lines};
use tempfile::NamedTempFile;

use strictly_bingo_server::{
    BingoRepository, BingoService, BoardStatus, PLAYER_COLORS, ServiceError, deal_card,
    pick_color, run_migrations, toggle_cell,
};

struct Fixture {
    _db: NamedTempFile,
    service: BingoService,
    board_id: i32,
    player_id: i32,
}

/// Board hosted by "host" with `topics` topics and one player owned by "u1".
fn setup(topics: usize) -> Fixture {
    let db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db.path().to_str().expect("Invalid path").to_string();
    run_migrations(&db_path).expect("Migrations failed");
    let service = BingoService::new(BingoRepository::new(db_path).expect("Repository failed"));

    let board = service.create_board("host", "All-hands").expect("Board failed");
    let board_id = *board.id();
    for i in 0..topics {
        service
            .add_topic(board_id, "host", &format!("They say 'synergy' #{i}"))
            .expect("Topic failed");
    }
    let player = service.join_board(board_id, "u1", "Alice").expect("Join failed");
    Fixture {
        _db: db,
        service,
        board_id,
        player_id: *player.id(),
    }
}

#[test]
fn test_start_game_needs_minimum_topics() {
    let fx = setup(5);
    let err = fx.service.start_game(fx.board_id, "host").unwrap_err();
    assert!(matches!(err, ServiceError::NotEnoughTopics { needed: 8, remaining: 3 }));
    assert_eq!(err.to_string(), "Need at least 8 topics (3 more to go)");
}

#[test]
fn test_start_game_host_only() {
    let fx = setup(8);
    let err = fx.service.start_game(fx.board_id, "u1").unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    fx.service.start_game(fx.board_id, "host").expect("Start failed");
    let board = fx.service.repository().get_board(fx.board_id).unwrap().unwrap();
    assert_eq!(board.parse_status().unwrap(), BoardStatus::Playing);
}

#[test]
fn test_start_game_unknown_board() {
    let fx = setup(8);
    let err = fx.service.start_game(999, "host").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Board")));
}

#[test]
fn test_generate_card_sizes_from_pool() {
    for (pool, size) in [(8, 3), (15, 4), (24, 5)] {
        let fx = setup(pool);
        let card = fx
            .service
            .generate_card(fx.board_id, fx.player_id, "u1")
            .expect("Deal failed");
        assert_eq!(card.grid_size, size);
        assert_eq!(card.cells.len(), size * size);

        let center = size * size / 2;
        let free = &card.cells[center];
        assert_eq!(free.topic_id, None);
        assert_eq!(free.text, "FREE");
        assert!(free.marked);

        let ids: HashSet<_> = card.cells.iter().filter_map(|c| c.topic_id).collect();
        assert_eq!(ids.len(), size * size - 1);
    }
}

#[test]
fn test_generate_card_rejects_small_pool() {
    let fx = setup(7);
    let err = fx
        .service
        .generate_card(fx.board_id, fx.player_id, "u1")
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotEnoughTopics { remaining: 1, .. }));
}

#[test]
fn test_generate_card_checks_ownership() {
    let fx = setup(8);
    let err = fx
        .service
        .generate_card(fx.board_id, fx.player_id, "intruder")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let other = fx.service.create_board("host", "Other").unwrap();
    let err = fx
        .service
        .generate_card(*other.id(), fx.player_id, "u1")
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = fx.service.generate_card(fx.board_id, 777, "u1").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Player")));
}

#[test]
fn test_regenerate_replaces_card() {
    let fx = setup(24);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();
    fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap();
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();

    let cells = fx
        .service
        .repository()
        .card_cells(fx.player_id, fx.board_id)
        .unwrap();
    assert_eq!(cells.len(), 25);
    assert_eq!(cells.iter().filter(|c| *c.marked()).count(), 1, "Only the free cell is marked");
}

#[test]
fn test_mark_cell_toggles() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();

    let outcome = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap();
    assert_eq!(outcome.cell_index, 0);
    assert!(outcome.marked);
    assert!(!outcome.bingo.bingo());

    let outcome = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap();
    assert!(!outcome.marked);
}

#[test]
fn test_mark_cell_rejects_free_and_missing() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();

    let err = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 4).unwrap_err();
    assert!(matches!(err, ServiceError::Core(BingoError::FreeCell)));
    assert_eq!(err.to_string(), "Cannot toggle FREE cell");

    let err = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 9).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Cell")));
}

#[test]
fn test_mark_cell_before_card_dealt() {
    let fx = setup(8);
    let err = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Cell")));
}

#[test]
fn test_bingo_recorded_once() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();

    fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 3).unwrap();
    let outcome = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 5).unwrap();
    assert!(outcome.bingo.bingo());
    assert_eq!(outcome.bingo.winning_line(), Some(&[3, 4, 5][..]));

    // Marking an unrelated cell keeps the win but logs nothing new.
    let outcome = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap();
    assert_eq!(outcome.bingo.winning_line(), Some(&[3, 4, 5][..]));

    let events = fx.service.bingo_events(fx.board_id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].line().unwrap(), vec![3, 4, 5]);
    assert_eq!(*events[0].player_id(), fx.player_id);
}

#[test]
fn test_mark_cell_huge_index_not_found() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();
    let err = fx
        .service
        .mark_cell(fx.board_id, fx.player_id, "u1", usize::MAX)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Cell")));
}

#[test]
fn test_second_line_while_first_holds_not_logged() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();
    for index in [3, 5] {
        fx.service.mark_cell(fx.board_id, fx.player_id, "u1", index).unwrap();
    }
    // Column 1 completes, but row 1 is still the reported line.
    fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 1).unwrap();
    let outcome = fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 7).unwrap();
    assert_eq!(outcome.bingo.winning_line(), Some(&[3, 4, 5][..]));
    assert_eq!(fx.service.bingo_events(fx.board_id).unwrap().len(), 1);
}

#[test]
fn test_my_card_reloads_marks() {
    let fx = setup(8);
    let dealt = fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();
    fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 0).unwrap();

    let card = fx.service.my_card(fx.board_id, fx.player_id, "u1").expect("Reload failed");
    assert_eq!(card.grid_size, 3);
    assert_eq!(card.cells.len(), 9);
    assert!(card.cells[0].marked);
    assert_eq!(card.cells[4].text, "FREE");
    for (reloaded, original) in card.cells.iter().zip(&dealt.cells) {
        assert_eq!(reloaded.topic_id, original.topic_id);
        assert_eq!(reloaded.text, original.text);
    }

    let err = fx.service.my_card(fx.board_id, fx.player_id, "u2").unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn test_my_card_before_deal() {
    let fx = setup(8);
    let err = fx.service.my_card(fx.board_id, fx.player_id, "u1").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Card")));
}

#[test]
fn test_player_marks_for_board_members() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();
    fx.service.mark_cell(fx.board_id, fx.player_id, "u1", 2).unwrap();
    fx.service.join_board(fx.board_id, "u2", "Bob").unwrap();

    let marks = fx.service.player_marks(fx.board_id, fx.player_id, "u2").expect("Marks failed");
    assert_eq!(marks.grid_size, 3);
    let marked: Vec<_> = marks.cells.iter().filter(|c| c.marked).map(|c| c.cell_index).collect();
    assert_eq!(marked, vec![2, 4]);
    assert!(fx.service.player_marks(fx.board_id, fx.player_id, "host").is_ok());

    let err = fx.service.player_marks(fx.board_id, fx.player_id, "stranger").unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = fx.service.player_marks(fx.board_id, 777, "u2").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Player")));
}

#[test]
fn test_roster_colors() {
    let fx = setup(0);
    let bob = fx.service.join_board(fx.board_id, "u2", "Bob").unwrap();
    let players = fx.service.players(fx.board_id).expect("Roster failed");
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name(), "Alice");
    assert_eq!(players[0].color(), PLAYER_COLORS[0]);
    assert_eq!(bob.color(), PLAYER_COLORS[1]);
}

#[test]
fn test_pick_color_wraps_when_palette_used() {
    assert_eq!(pick_color([]), PLAYER_COLORS[0]);
    assert_eq!(pick_color([PLAYER_COLORS[0], PLAYER_COLORS[2]]), PLAYER_COLORS[1]);
    assert_eq!(pick_color(PLAYER_COLORS), PLAYER_COLORS[0]);
}

#[test]
fn test_leaderboard_orders_by_wins() {
    let fx = setup(8);
    let bob = fx.service.join_board(fx.board_id, "u2", "Bob").unwrap();
    let repo = fx.service.repository();
    repo.record_bingo(fx.board_id, fx.player_id, &[0, 1, 2]).unwrap();
    repo.record_bingo(fx.board_id, *bob.id(), &[0, 3, 6]).unwrap();
    repo.record_bingo(fx.board_id, *bob.id(), &[2, 4, 6]).unwrap();

    let board = fx.service.leaderboard(fx.board_id).expect("Leaderboard failed");
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].name, "Bob");
    assert_eq!(board[0].wins, 2);
    assert_eq!(board[0].color, PLAYER_COLORS[1]);
    assert_eq!(board[1].player_id, fx.player_id);
    assert_eq!(board[1].wins, 1);

    fx.service.reset_game(fx.board_id, "host").unwrap();
    assert!(fx.service.leaderboard(fx.board_id).unwrap().is_empty());
}

#[test]
fn test_set_reward_host_only() {
    let fx = setup(0);
    let err = fx.service.set_reward(fx.board_id, "u1", "Pizza").unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let board = fx.service.set_reward(fx.board_id, "host", "  Pizza  ").expect("Set failed");
    assert_eq!(board.reward().as_deref(), Some("Pizza"));
    let board = fx.service.set_reward(fx.board_id, "host", " ").unwrap();
    assert_eq!(*board.reward(), None);
}

#[test]
fn test_reset_game_host_only() {
    let fx = setup(8);
    fx.service.generate_card(fx.board_id, fx.player_id, "u1").unwrap();

    let err = fx.service.reset_game(fx.board_id, "u1").unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    fx.service.reset_game(fx.board_id, "host").expect("Reset failed");
    let cells = fx
        .service
        .repository()
        .card_cells(fx.player_id, fx.board_id)
        .unwrap();
    assert!(cells.is_empty());
}

#[test]
fn test_delete_topic_permissions() {
    let fx = setup(0);
    let mine = fx.service.add_topic(fx.board_id, "u1", "mine").unwrap();
    let theirs = fx.service.add_topic(fx.board_id, "u2", "theirs").unwrap();

    fx.service.delete_topic("u1", *mine.id()).expect("Author delete failed");
    let err = fx.service.delete_topic("u1", *theirs.id()).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    fx.service.delete_topic("host", *theirs.id()).expect("Host delete failed");

    assert!(fx.service.topics(fx.board_id).unwrap().is_empty());
}

#[test]
fn test_blank_input_rejected() {
    let fx = setup(0);
    assert!(matches!(
        fx.service.add_topic(fx.board_id, "u1", "   ").unwrap_err(),
        ServiceError::BadRequest(_)
    ));
    assert!(matches!(
        fx.service.create_board("host", "").unwrap_err(),
        ServiceError::BadRequest(_)
    ));
    assert!(matches!(
        fx.service.join_board(fx.board_id, "u9", " ").unwrap_err(),
        ServiceError::BadRequest(_)
    ));
}

#[test]
fn test_flows_play_full_card() {
    let fx = setup(24);
    let repo = fx.service.repository();
    let mut rng = StdRng::seed_from_u64(77);
    let card = deal_card(repo, fx.board_id, fx.player_id, &mut rng).expect("Deal failed");
    assert_eq!(*card.grid_size(), 5);

    let mut won_at = None;
    for index in (0..25).filter(|&i| i != 12) {
        let outcome = toggle_cell(repo, fx.board_id, fx.player_id, index).expect("Toggle failed");
        if outcome.bingo.bingo() {
            won_at = Some((index, outcome.bingo.winning_line().unwrap().to_vec()));
            break;
        }
    }

    // Row-major marking completes the top row first.
    let (index, line) = won_at.expect("No bingo");
    assert_eq!(index, 4);
    assert_eq!(line, lines(5)[0].cells());
}
