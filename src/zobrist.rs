//! Incremental Zobrist hashing for search states.
//!
//! Two independent tables are kept: one keyed by crate-occupied cells, and
//! one keyed by the canonical ("top-reachable") representative of the
//! player's reachable floor component. XOR-ing a state's crate hash with its
//! canonical-player hash gives a single 64-bit fingerprint that collapses
//! all player-only-move-equivalent states onto the same value.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::MAX_DIM;

/// Fixed seed so hash tables (and therefore transposition-table behavior)
/// are reproducible across runs.
const ZOBRIST_SEED: u64 = 0x123456789abcdef0;

pub struct Zobrist {
    crate_hashes: Vec<Vec<u64>>,
    player_hashes: Vec<Vec<u64>>,
}

impl Zobrist {
    pub fn new() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(ZOBRIST_SEED);
        let mut crate_hashes = vec![vec![0u64; MAX_DIM]; MAX_DIM];
        let mut player_hashes = vec![vec![0u64; MAX_DIM]; MAX_DIM];
        for row in crate_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.gen();
            }
        }
        for row in player_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.gen();
            }
        }
        Zobrist {
            crate_hashes,
            player_hashes,
        }
    }

    pub fn crate_hash(&self, row: usize, col: usize) -> u64 {
        self.crate_hashes[row][col]
    }

    pub fn player_hash(&self, row: usize, col: usize) -> u64 {
        self.player_hashes[row][col]
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new()
    }
}
