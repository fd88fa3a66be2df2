//! Admissible lower bounds on the remaining push count, used to order the
//! A* frontier.

use crate::geometry::Position;
use crate::hungarian::hungarian_algorithm;
use crate::level::Level;

/// Sentinel cost for a crate/goal pairing with no valid push path. Large
/// enough to never be favored by the assignment, small enough that summing
/// up to `MAX_BOXES` of them cannot overflow a `u32` accumulator.
const UNREACHABLE_PAIR_COST: u32 = 1_000_000;

/// A push-count bound. `UNSOLVABLE` stands in for "no finite bound exists
/// from this configuration" (some crate has no path to any goal).
pub type Cost = u32;
pub const UNSOLVABLE: Cost = Cost::MAX;

pub trait Heuristic {
    fn compute(&self, level: &Level, crates: &[Position]) -> Cost;
}

/// Sum of each crate's distance to its own nearest goal. A valid lower
/// bound even though several crates may claim the same nearest goal: the
/// true assignment cost can only be larger, never smaller.
pub struct SimpleHeuristic;

impl Heuristic for SimpleHeuristic {
    fn compute(&self, level: &Level, crates: &[Position]) -> Cost {
        let mut total: u64 = 0;
        for (i, &pos) in crates.iter().enumerate() {
            match level.push_distance(i, pos) {
                Some(d) => total += d as u64,
                None => return UNSOLVABLE,
            }
        }
        if total >= UNSOLVABLE as u64 {
            UNSOLVABLE
        } else {
            total as Cost
        }
    }
}

/// Minimum-weight perfect matching between crates and goals over the
/// push-distance cost matrix, via the Hungarian algorithm.
pub struct HungarianHeuristic;

impl Heuristic for HungarianHeuristic {
    fn compute(&self, level: &Level, crates: &[Position]) -> Cost {
        let n = crates.len();
        if n == 0 {
            return 0;
        }
        // A crate with no path to any goal makes the whole state unsolvable;
        // bail before building a matrix that would only hide that fact.
        for (i, &crate_pos) in crates.iter().enumerate() {
            if level.push_distance(i, crate_pos).is_none() {
                return UNSOLVABLE;
            }
        }
        let mut matrix = vec![vec![0u32; n]; n];
        for (i, &crate_pos) in crates.iter().enumerate() {
            for j in 0..n {
                matrix[i][j] =
                    level.push_distance_to_goal(i, crate_pos, j).unwrap_or(UNREACHABLE_PAIR_COST);
            }
        }
        hungarian_algorithm(&matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::level::{LevelBuilder, Tile};
    use std::rc::Rc;

    fn build(s: &str) -> Level {
        let mut tiles = Vec::new();
        let mut player = None;
        let mut crates = Vec::new();
        let mut goals = Vec::new();
        for (row, line) in s.lines().enumerate() {
            let mut tile_row = Vec::new();
            for (col, ch) in line.chars().enumerate() {
                let pos = Position::new(row, col);
                let tile = match ch {
                    '#' => Tile::Wall,
                    '.' => {
                        goals.push(pos);
                        Tile::Goal
                    }
                    '@' => {
                        player = Some(pos);
                        Tile::Floor
                    }
                    '$' => {
                        crates.push(pos);
                        Tile::Floor
                    }
                    _ => Tile::Floor,
                };
                tile_row.push(tile);
            }
            tiles.push(tile_row);
        }
        LevelBuilder::build(
            "test".to_string(),
            tiles,
            player,
            crates,
            goals,
            Rc::new(crate::zobrist::Zobrist::new()),
            &Config::default(),
            1,
        )
        .unwrap()
    }

    #[test]
    fn simple_heuristic_is_zero_when_solved() {
        let level = build("#####\n#@ .#\n#####");
        let heuristic = SimpleHeuristic;
        let crates: Vec<Position> = level.goals.clone();
        assert_eq!(heuristic.compute(&level, &crates), 0);
    }

    #[test]
    fn hungarian_matches_simple_on_single_crate() {
        let level = build("#####\n#@$.#\n#####");
        let crates = level.initial_crates.clone();
        let simple = SimpleHeuristic.compute(&level, &crates);
        let hungarian = HungarianHeuristic.compute(&level, &crates);
        assert_eq!(simple, hungarian);
    }

    #[test]
    fn both_heuristics_never_exceed_the_known_optimal_push_count() {
        // Two independent one-push corridors, separated by a wall so each
        // crate can only ever reach its own goal: the true optimal is
        // exactly 2 pushes, and neither heuristic may report more.
        let level = build("#############\n#@$.#   $.  #\n#############");
        let crates = level.initial_crates.clone();
        let optimal = 2;
        assert!(SimpleHeuristic.compute(&level, &crates) <= optimal);
        assert!(HungarianHeuristic.compute(&level, &crates) <= optimal);
    }
}
