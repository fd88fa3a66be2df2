//! A* search driver: explores pushes in `g + h` order, collapsing forced
//! push chains through articulation cuts, and verifies the solution it
//! returns before handing it back.

use std::collections::HashSet;

use log::debug;

use crate::config::Config;
use crate::error::Result;
use crate::geometry::{step, Direction};
use crate::heuristic::{Heuristic, UNSOLVABLE};
use crate::level::{Level, Tile};
use crate::moves::generate_moves;
use crate::pqueue::PriorityQueue;
use crate::push::try_push;
use crate::state::State;
use std::rc::Rc;

/// Outcome of solving a single level.
pub enum SolveResult {
    Solved(Vec<(usize, Direction)>),
    /// The level has no solution reachable before the priority queue drained.
    Unsolvable,
    /// The search exceeded `config.max_search` expansions without resolving.
    Cutoff,
}

struct Node {
    state: State,
    moves: Vec<(usize, Direction)>,
    g: u32,
}

/// True iff the neighbor of `pos` in direction `d` is a wall (or off the
/// grid, which is equivalent for this purpose).
fn is_wall_in(level: &Level, pos: crate::geometry::Position, d: Direction) -> bool {
    match step(pos, d) {
        Some(p) => level.tile(p) == Tile::Wall,
        None => true,
    }
}

/// Extends a successful push with any forced follow-up pushes through an
/// articulation cut: while the crate's new cell is a cut point hemmed in by
/// literal walls on both sides perpendicular to the push direction, the
/// player has no way to approach from the side and redirect the crate, so
/// keep pushing straight through rather than handing control back to the
/// move generator.
fn extend_through_cuts(
    mut state: State,
    mut moves: Vec<(usize, Direction)>,
    crate_index: usize,
    d: Direction,
    heuristic: &impl Heuristic,
) -> (State, Vec<(usize, Direction)>) {
    loop {
        let crate_pos = state.crates[crate_index];
        if !state.level.is_cut(crate_pos) || state.level.is_goal(crate_pos) {
            return (state, moves);
        }
        if !is_wall_in(&state.level, crate_pos, d.next()) || !is_wall_in(&state.level, crate_pos, d.prev()) {
            return (state, moves);
        }
        match try_push(&state, crate_index, d, heuristic) {
            Some(next) => {
                moves.push((crate_index, d));
                state = next;
            }
            None => return (state, moves),
        }
    }
}

/// Runs A* search over `level` from its initial configuration, using
/// `heuristic` to order the frontier.
pub fn solve(level: Rc<Level>, heuristic: &impl Heuristic, config: &Config) -> Result<SolveResult> {
    let initial = State::initial(Rc::clone(&level), heuristic);
    if initial.is_solved() {
        return Ok(SolveResult::Solved(Vec::new()));
    }
    if initial.heuristic == UNSOLVABLE {
        return Ok(SolveResult::Unsolvable);
    }

    let mut queue: PriorityQueue<Node> = PriorityQueue::new();
    let mut visited: HashSet<u64> = HashSet::new();

    queue.push(
        initial.heuristic as usize,
        Node {
            state: initial,
            moves: Vec::new(),
            g: 0,
        },
    );

    let mut expansions: usize = 0;

    while let Some(mut node) = queue.pop_min() {
        if expansions > config.max_search {
            return Ok(SolveResult::Cutoff);
        }

        let candidates = generate_moves(&mut node.state);
        if !visited.insert(node.state.hash) {
            continue;
        }
        expansions += 1;

        if node.state.is_solved() {
            let moves = node.moves.clone();
            verify_solution(&level, &moves);
            return Ok(SolveResult::Solved(moves));
        }

        for (crate_index, d) in candidates {
            let next = match try_push(&node.state, crate_index, d, heuristic) {
                Some(s) => s,
                None => continue,
            };
            if next.heuristic == UNSOLVABLE {
                continue;
            }
            let mut next_moves = node.moves.clone();
            next_moves.push((crate_index, d));
            let (next, next_moves) = extend_through_cuts(next, next_moves, crate_index, d, heuristic);

            if visited.contains(&next.hash) {
                continue;
            }

            let g = node.g + 1;
            let priority = (g + next.heuristic) as usize;
            queue.push(
                priority,
                Node {
                    state: next,
                    moves: next_moves,
                    g,
                },
            );
        }
    }

    debug!("search exhausted priority queue after {} expansions", expansions);
    Ok(SolveResult::Unsolvable)
}

/// Replays `moves` from the level's initial configuration and panics if any
/// push fails or the final state is not solved. A verification failure means
/// the search produced an internally inconsistent result and is a bug, not a
/// recoverable runtime condition.
fn verify_solution(level: &Rc<Level>, moves: &[(usize, Direction)]) {
    let simple = crate::heuristic::SimpleHeuristic;
    let mut state = State::initial(Rc::clone(level), &simple);
    for &(crate_index, d) in moves {
        state = try_push(&state, crate_index, d, &simple)
            .unwrap_or_else(|| panic!("solution verification failed: push ({}, {}) was rejected on replay", crate_index, d));
    }
    assert!(
        state.is_solved(),
        "solution verification failed: replayed moves do not reach a solved state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::heuristic::SimpleHeuristic;
    use crate::level::{LevelBuilder, Tile};
    use crate::zobrist::Zobrist;

    fn build(s: &str) -> Rc<Level> {
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
        Rc::new(
            LevelBuilder::build(
                "test".to_string(),
                tiles,
                player,
                crates,
                goals,
                Rc::new(Zobrist::new()),
                &Config::default(),
                1,
            )
            .unwrap(),
        )
    }

    #[test]
    fn solves_a_trivial_single_push_level() {
        let level = build("#####\n#@$.#\n#####");
        let heuristic = SimpleHeuristic;
        let config = Config::default();
        match solve(level, &heuristic, &config).unwrap() {
            SolveResult::Solved(moves) => assert_eq!(moves, vec![(0, Direction::Right)]),
            _ => panic!("expected a solution"),
        }
    }

    #[test]
    fn solves_a_level_requiring_several_pushes() {
        let level = build("######\n#@$  #\n#   .#\n######");
        let heuristic = SimpleHeuristic;
        let config = Config::default();
        match solve(level, &heuristic, &config).unwrap() {
            SolveResult::Solved(moves) => assert!(!moves.is_empty()),
            _ => panic!("expected a solution"),
        }
    }

    #[test]
    fn detects_unsolvable_level_via_dead_square() {
        let level = build("####\n#.@#\n#$ #\n####");
        let heuristic = SimpleHeuristic;
        let config = Config::default();
        match solve(level, &heuristic, &config).unwrap() {
            SolveResult::Unsolvable => {}
            SolveResult::Solved(_) => panic!("level should be unsolvable: crate starts on a dead square"),
            SolveResult::Cutoff => panic!("level is tiny, should not hit the search budget"),
        }
    }

    #[test]
    fn already_solved_level_returns_empty_move_list() {
        let level = build("#####\n#@*.#\n#####");
        // no crate was placed on the goal above since '*' isn't in this
        // helper's alphabet; build a level that starts solved directly.
        let _ = level;
        let mut tiles = Vec::new();
        let mut goals = Vec::new();
        let mut crates = Vec::new();
        let grid = "#####\n#@ .#\n#####";
        for (row, line) in grid.lines().enumerate() {
            let mut tile_row = Vec::new();
            for (col, ch) in line.chars().enumerate() {
                let pos = Position::new(row, col);
                let tile = match ch {
                    '#' => Tile::Wall,
                    '.' => {
                        goals.push(pos);
                        crates.push(pos);
                        Tile::Goal
                    }
                    '@' => Tile::Floor,
                    _ => Tile::Floor,
                };
                tile_row.push(tile);
            }
            tiles.push(tile_row);
        }
        let level = Rc::new(
            LevelBuilder::build(
                "solved".to_string(),
                tiles,
                Some(Position::new(1, 1)),
                crates,
                goals,
                Rc::new(Zobrist::new()),
                &Config::default(),
                1,
            )
            .unwrap(),
        );
        let heuristic = SimpleHeuristic;
        let config = Config::default();
        match solve(level, &heuristic, &config).unwrap() {
            SolveResult::Solved(moves) => assert!(moves.is_empty()),
            _ => panic!("expected an already-solved level to return immediately"),
        }
    }
}
