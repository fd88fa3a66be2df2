//! Mutable search node: player position, crate vector, incremental hash,
//! heuristic value, and the normalized player-zone representative.

use std::rc::Rc;

use crate::geometry::Position;
use crate::heuristic::{Cost, Heuristic};
use crate::level::Level;

#[derive(Clone)]
pub struct State {
    pub level: Rc<Level>,
    pub player: Position,
    pub crates: Vec<Position>,
    pub hash: u64,
    pub heuristic: Cost,
    /// Lexicographically smallest cell reachable by the player in the
    /// current configuration. `None` until the move generator next runs
    /// (cleared on every push).
    pub top_reachable: Option<Position>,
}

impl State {
    pub fn initial(level: Rc<Level>, heuristic: &impl Heuristic) -> Self {
        let crates = level.initial_crates.clone();
        let player = level.initial_player;
        let mut hash = 0u64;
        for c in &crates {
            hash ^= level.zobrist.crate_hash(c.row as usize, c.col as usize);
        }
        let h = heuristic.compute(&level, &crates);
        State {
            level,
            player,
            crates,
            hash,
            heuristic: h,
            top_reachable: None,
        }
    }

    pub fn crate_index_at(&self, pos: Position) -> Option<usize> {
        self.crates.iter().position(|&c| c == pos)
    }

    pub fn is_solved(&self) -> bool {
        self.crates.iter().all(|&c| self.level.is_goal(c))
    }
}
