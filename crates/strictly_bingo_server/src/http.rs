//! REST API over the bingo service.
//!
//! Callers are identified by the `x-user-id` header, which the upstream
//! auth layer sets after verifying the session token.

use axum::body::Body;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strictly_bingo::{
    BingoResult, CellState, GRID_TIERS, Topic, assemble_card, check_bingo, grid_size_for, is_tier_size,
};
use tower::ServiceBuilder;
use tracing::{error, info, instrument, warn};

use crate::db::{BingoEvent, Board, BoardTopic, Player};
use crate::service::{
    BingoService, CardView, CellView, LeaderboardEntry, MarkOutcome, MarksView, ServiceError,
};

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Error response: a status code and an `{"error": ...}` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::BadRequest(_)
            | ServiceError::NotEnoughTopics { .. }
            | ServiceError::Core(_) => StatusCode::BAD_REQUEST,
            ServiceError::Db(e) => {
                error!(error = %e, "Storage failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal storage error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller(
    /// User id from [`USER_HEADER`].
    pub String,
);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Missing user"))?;
        Ok(Caller(user.to_string()))
    }
}

/// Accepts only the side lengths of the sizing tiers.
fn tier_grid_size(grid_size: usize) -> Result<usize, ApiError> {
    if is_tier_size(grid_size) {
        return Ok(grid_size);
    }
    let sizes: Vec<String> = GRID_TIERS.iter().map(|t| t.size.to_string()).collect();
    warn!(grid_size, "Rejected grid size");
    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        format!("Grid size must be one of {}", sizes.join(", ")),
    ))
}

/// Runs a storage-backed service call off the async runtime.
async fn blocking<T, F>(service: BingoService, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&BingoService) -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            error!(error = %e, "Service task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?
        .map_err(ApiError::from)
}

// ─────────────────────────────────────────────────────────────
//  Request / response bodies
// ─────────────────────────────────────────────────────────────

/// Body of `POST /api/size-for-pool`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeRequest {
    /// Topics available.
    pub topic_count: usize,
}

/// Body of `POST /api/assemble-card`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleRequest {
    /// Topic pool.
    pub topics: Vec<Topic>,
    /// Side length.
    pub grid_size: usize,
}

/// Response of `POST /api/assemble-card`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleResponse {
    /// Side length.
    pub grid_size: usize,
    /// Cells in row-major order.
    pub cells: Vec<CellView>,
}

/// Body of `POST /api/check-bingo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Cell states; unmarked cells may be omitted.
    pub cells: Vec<CellState>,
    /// Side length.
    pub grid_size: usize,
}

/// Body of `POST /api/boards`.
#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    /// Board title.
    pub title: String,
}

/// Body of `POST /api/boards/{id}/topics`.
#[derive(Debug, Deserialize)]
pub struct AddTopicRequest {
    /// Topic text.
    pub text: String,
}

/// Body of `POST /api/boards/{id}/players`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// Display name.
    pub name: String,
}

/// Body of `PUT /api/boards/{id}/reward`.
#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    /// Stakes text; blank clears it.
    pub reward: String,
}

/// Body of the host-only board calls.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRequest {
    /// Target board.
    pub board_id: i32,
}

/// Body of `POST /api/generate-card`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCardRequest {
    /// Target board.
    pub board_id: i32,
    /// Caller's player on that board.
    pub player_id: i32,
}

/// Body of `POST /api/mark-cell`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCellRequest {
    /// Target board.
    pub board_id: i32,
    /// Caller's player on that board.
    pub player_id: i32,
    /// Cell to toggle.
    pub cell_index: usize,
}

/// A bingo event as shown to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    /// Event id.
    pub id: i32,
    /// Winner.
    pub player_id: i32,
    /// Winning line cell indices.
    pub winning_line: Vec<usize>,
    /// When the bingo was called.
    pub created_at: chrono::NaiveDateTime,
}

impl TryFrom<&BingoEvent> for EventView {
    type Error = ServiceError;

    fn try_from(event: &BingoEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *event.id(),
            player_id: *event.player_id(),
            winning_line: event.line()?,
            created_at: *event.created_at(),
        })
    }
}

// ─────────────────────────────────────────────────────────────
//  Pure calls
// ─────────────────────────────────────────────────────────────

#[instrument]
async fn size_for_pool(Json(req): Json<SizeRequest>) -> Json<serde_json::Value> {
    Json(json!({ "gridSize": grid_size_for(req.topic_count) }))
}

#[instrument(skip(req), fields(pool = req.topics.len(), grid_size = req.grid_size))]
async fn assemble(Json(req): Json<AssembleRequest>) -> Result<Json<AssembleResponse>, ApiError> {
    let grid_size = tier_grid_size(req.grid_size)?;
    let card = assemble_card(&req.topics, grid_size).map_err(ServiceError::from)?;
    Ok(Json(AssembleResponse {
        grid_size: *card.grid_size(),
        cells: card.cells().iter().map(CellView::from).collect(),
    }))
}

#[instrument(skip(req), fields(cells = req.cells.len(), grid_size = req.grid_size))]
async fn check(Json(req): Json<CheckRequest>) -> Result<Json<BingoResult>, ApiError> {
    let grid_size = tier_grid_size(req.grid_size)?;
    let result = check_bingo(&req.cells, grid_size).map_err(ServiceError::from)?;
    Ok(Json(result))
}

// ─────────────────────────────────────────────────────────────
//  Board operations
// ─────────────────────────────────────────────────────────────

#[instrument(skip(service, req))]
async fn create_board(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Json(req): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<Board>), ApiError> {
    let board = blocking(service, move |s| s.create_board(&user, &req.title)).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

#[instrument(skip(service))]
async fn get_board(
    State(service): State<BingoService>,
    Path(board_id): Path<i32>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(blocking(service, move |s| s.get_board(board_id)).await?))
}

#[instrument(skip(service, req))]
async fn set_reward(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path(board_id): Path<i32>,
    Json(req): Json<RewardRequest>,
) -> Result<Json<Board>, ApiError> {
    let board = blocking(service, move |s| s.set_reward(board_id, &user, &req.reward)).await?;
    Ok(Json(board))
}

#[instrument(skip(service, req))]
async fn add_topic(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path(board_id): Path<i32>,
    Json(req): Json<AddTopicRequest>,
) -> Result<(StatusCode, Json<BoardTopic>), ApiError> {
    let topic = blocking(service, move |s| s.add_topic(board_id, &user, &req.text)).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

#[instrument(skip(service))]
async fn list_topics(
    State(service): State<BingoService>,
    Path(board_id): Path<i32>,
) -> Result<Json<Vec<BoardTopic>>, ApiError> {
    Ok(Json(blocking(service, move |s| s.topics(board_id)).await?))
}

#[instrument(skip(service))]
async fn delete_topic(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path(topic_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    blocking(service, move |s| s.delete_topic(&user, topic_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(service, req))]
async fn join_board(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path(board_id): Path<i32>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let player = blocking(service, move |s| s.join_board(board_id, &user, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

#[instrument(skip(service))]
async fn list_players(
    State(service): State<BingoService>,
    Path(board_id): Path<i32>,
) -> Result<Json<Vec<Player>>, ApiError> {
    Ok(Json(blocking(service, move |s| s.players(board_id)).await?))
}

#[instrument(skip(service))]
async fn my_card(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path((board_id, player_id)): Path<(i32, i32)>,
) -> Result<Json<CardView>, ApiError> {
    Ok(Json(blocking(service, move |s| s.my_card(board_id, player_id, &user)).await?))
}

#[instrument(skip(service))]
async fn player_marks(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Path((board_id, player_id)): Path<(i32, i32)>,
) -> Result<Json<MarksView>, ApiError> {
    Ok(Json(blocking(service, move |s| s.player_marks(board_id, player_id, &user)).await?))
}

#[instrument(skip(service))]
async fn leaderboard(
    State(service): State<BingoService>,
    Path(board_id): Path<i32>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(blocking(service, move |s| s.leaderboard(board_id)).await?))
}

#[instrument(skip(service))]
async fn start_game(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Json(req): Json<BoardRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    blocking(service, move |s| s.start_game(req.board_id, &user)).await?;
    Ok(Json(json!({ "ok": true })))
}

#[instrument(skip(service))]
async fn generate_card(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Json(req): Json<GenerateCardRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let card = blocking(service, move |s| s.generate_card(req.board_id, req.player_id, &user)).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

#[instrument(skip(service))]
async fn mark_cell(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Json(req): Json<MarkCellRequest>,
) -> Result<Json<MarkOutcome>, ApiError> {
    let outcome = blocking(service, move |s| {
        s.mark_cell(req.board_id, req.player_id, &user, req.cell_index)
    })
    .await?;
    Ok(Json(outcome))
}

#[instrument(skip(service))]
async fn reset_game(
    State(service): State<BingoService>,
    Caller(user): Caller,
    Json(req): Json<BoardRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    blocking(service, move |s| s.reset_game(req.board_id, &user)).await?;
    Ok(Json(json!({ "ok": true })))
}

#[instrument(skip(service))]
async fn bingo_events(
    State(service): State<BingoService>,
    Path(board_id): Path<i32>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let events = blocking(service, move |s| {
        s.bingo_events(board_id)?
            .iter()
            .map(EventView::try_from)
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;
    Ok(Json(events))
}

/// Builds the API router.
pub fn router(service: BingoService) -> Router {
    Router::new()
        .route("/api/size-for-pool", post(size_for_pool))
        .route("/api/assemble-card", post(assemble))
        .route("/api/check-bingo", post(check))
        .route("/api/boards", post(create_board))
        .route("/api/boards/{board_id}", get(get_board))
        .route("/api/boards/{board_id}/reward", put(set_reward))
        .route("/api/boards/{board_id}/topics", post(add_topic).get(list_topics))
        .route("/api/boards/{board_id}/players", post(join_board).get(list_players))
        .route("/api/boards/{board_id}/players/{player_id}/card", get(my_card))
        .route("/api/boards/{board_id}/players/{player_id}/marks", get(player_marks))
        .route("/api/boards/{board_id}/leaderboard", get(leaderboard))
        .route("/api/boards/{board_id}/bingo-events", get(bingo_events))
        .route("/api/topics/{topic_id}", delete(delete_topic))
        .route("/api/start-game", post(start_game))
        .route("/api/generate-card", post(generate_card))
        .route("/api/mark-cell", post(mark_cell))
        .route("/api/reset-game", post(reset_game))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(service)
}

/// Serves the API on `addr` until the process is stopped.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind.
#[instrument(skip(service))]
pub async fn serve(service: BingoService, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Bingo server ready");
    let result = axum::serve(listener, router(service)).await;
    if let Err(e) = &result {
        warn!(error = %e, "Server exited");
    }
    result
}
