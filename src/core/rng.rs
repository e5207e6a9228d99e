//! Seeded Random Number Generator
//!
//! Uses Xorshift128+ for fast, reproducible placement decisions.
//! Given the same seed, a round makes the same placement choices.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::node::NodeId;

/// Seeded PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use reaction_games::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max].
    #[inline]
    pub fn next_int_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        min + self.next_int(max - min + 1)
    }

    /// Weighted gate: fires with probability `1 / one_in`.
    ///
    /// `one_in == 0` never fires; `one_in == 1` always fires.
    #[inline]
    pub fn chance(&mut self, one_in: u32) -> bool {
        if one_in == 0 {
            return false;
        }
        self.next_int(one_in) == 0
    }

    /// Random colour channel value.
    #[inline]
    pub fn next_channel(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Shuffle a slice in place using Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Get current state (for debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a round seed from the round id and its board.
///
/// Node ids are hashed in the order given; callers pass the board's
/// sorted node list so the same board always yields the same seed.
pub fn derive_round_seed(round_id: &[u8; 16], nodes: &[NodeId]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"REACTION_GAMES_SEED_V1");
    hasher.update(round_id);
    for node in nodes {
        hasher.update(node.as_str().as_bytes());
        hasher.update([0u8]);
    }

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::node_range;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_int(100) < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_next_int_range() {
        let mut rng = DeterministicRng::new(5678);

        for _ in 0..1000 {
            let val = rng.next_int_range(10, 20);
            assert!((10..=20).contains(&val));
        }

        assert_eq!(rng.next_int_range(5, 5), 5);
    }

    #[test]
    fn test_chance_edges() {
        let mut rng = DeterministicRng::new(42);
        for _ in 0..200 {
            assert!(!rng.chance(0));
            assert!(rng.chance(1));
        }
    }

    #[test]
    fn test_chance_rate_is_plausible() {
        let mut rng = DeterministicRng::new(777);
        let hits = (0..10_000).filter(|_| rng.chance(10)).count();
        // Expect ~1000
        assert!((800..1200).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_choose() {
        let mut rng = DeterministicRng::new(9);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());

        let items = [1, 2, 3];
        for _ in 0..100 {
            assert!(items.contains(rng.choose(&items).unwrap()));
        }
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut rng1 = DeterministicRng::new(1111);
        let mut rng2 = DeterministicRng::new(1111);

        let mut arr1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut arr2 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng1.shuffle(&mut arr1);
        rng2.shuffle(&mut arr2);

        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_derive_round_seed() {
        let nodes = node_range("n", 4);
        let seed1 = derive_round_seed(&[1u8; 16], &nodes);
        let seed2 = derive_round_seed(&[1u8; 16], &nodes);
        assert_eq!(seed1, seed2);

        let seed3 = derive_round_seed(&[2u8; 16], &nodes);
        assert_ne!(seed1, seed3);

        let seed4 = derive_round_seed(&[1u8; 16], &nodes[..3]);
        assert_ne!(seed1, seed4);
    }
}
