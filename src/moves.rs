//! Flood fill from the player over floor-and-not-a-crate cells: enumerates
//! every (crate, push direction) pair reachable from the current
//! configuration, and normalizes the player position as a side effect.

use std::collections::VecDeque;

use crate::geometry::{step, Direction, Position, ALL_DIRECTIONS, MAX_DIM};
use crate::level::Tile;
use crate::state::State;

/// Runs the move generator on `state`, setting `top_reachable` and mixing
/// its Zobrist contribution into `state.hash`. Returns the candidate
/// pushes, deduplicated across approach paths.
pub fn generate_moves(state: &mut State) -> Vec<(usize, Direction)> {
    let level = state.level.clone();
    let mut visited = vec![false; MAX_DIM * MAX_DIM];
    let mut queue = VecDeque::new();
    let mut pushes = Vec::new();
    let mut top = state.player;

    visited[state.player.key()] = true;
    queue.push_back(state.player);

    while let Some(pos) = queue.pop_front() {
        if pos < top {
            top = pos;
        }
        for &d in &ALL_DIRECTIONS {
            let next = match step(pos, d) {
                Some(n) => n,
                None => continue,
            };
            if level.tile(next) == Tile::Wall {
                continue;
            }
            if let Some(idx) = state.crate_index_at(next) {
                pushes.push((idx, d));
                continue;
            }
            let key = next.key();
            if !visited[key] {
                visited[key] = true;
                queue.push_back(next);
            }
        }
    }

    state.top_reachable = Some(top);
    state.hash ^= level.zobrist.player_hash(top.row as usize, top.col as usize);

    pushes.sort_unstable();
    pushes.dedup();
    pushes
}
