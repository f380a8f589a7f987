//! Uniform shuffling of topic pools.

use rand::Rng;
use tracing::instrument;

/// Returns a uniformly random permutation of `items` using the thread RNG.
///
/// The input is left untouched.
#[instrument(skip(items), fields(len = items.len()))]
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::thread_rng())
}

/// Returns a uniformly random permutation of `items` drawn from `rng`.
///
/// Fisher-Yates over a copy: walk from the last index down to 1 and swap
/// each slot with a uniformly chosen index in `0..=i`. Duplicates are kept.
#[instrument(skip(items, rng), fields(len = items.len()))]
pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.gen_range(0..=i);
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_same_length() {
        let input = [1, 2, 3, 4, 5];
        assert_eq!(shuffle(&input).len(), 5);
    }

    #[test]
    fn test_is_permutation() {
        let input: Vec<u32> = (1..=10).collect();
        let mut out = shuffle(&input);
        out.sort();
        assert_eq!(out, input);
    }

    #[test]
    fn test_keeps_duplicates() {
        let input = ["a", "b", "a", "c", "a"];
        let mut out = shuffle(&input);
        out.sort();
        assert_eq!(out, vec!["a", "a", "a", "b", "c"]);
    }

    #[test]
    fn test_input_untouched() {
        let input = vec![1, 2, 3, 4, 5];
        let copy = input.clone();
        let _ = shuffle(&input);
        assert_eq!(input, copy);
    }

    #[test]
    fn test_produces_different_orderings() {
        let input: Vec<u32> = (0..20).collect();
        let seen: HashSet<Vec<u32>> = (0..10).map(|_| shuffle(&input)).collect();
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let input: Vec<u32> = (0..16).collect();
        let a = shuffle_with(&input, &mut StdRng::seed_from_u64(7));
        let b = shuffle_with(&input, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_and_single() {
        let empty: [u8; 0] = [];
        assert!(shuffle(&empty).is_empty());
        assert_eq!(shuffle(&[42]), vec![42]);
    }
}
