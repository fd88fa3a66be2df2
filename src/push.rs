//! The push evaluator: validates a candidate push against blockers, dead
//! squares and the 2x2 freeze pattern, and produces a successor state.

use crate::geometry::{step, Direction, Position};
use crate::heuristic::Heuristic;
use crate::level::{Level, Tile};
use crate::state::State;

fn tile_or_wall(level: &Level, pos: Option<Position>) -> Tile {
    match pos {
        Some(p) => level.tile(p),
        None => Tile::Wall,
    }
}

fn crate_at(crates: &[Position], pos: Position, exclude: usize) -> Option<usize> {
    crates
        .iter()
        .position(|&c| c == pos)
        .filter(|&idx| idx != exclude)
}

/// Checks whether pushing the crate at `crate_index` into `q` (its cell
/// after the push) forms a frozen 2x2 block with another crate, per the
/// resolved freeze-guard rule: reject unless both cells of the pair are
/// goals.
pub(crate) fn is_frozen(level: &Level, crates: &[Position], crate_index: usize, d: Direction, q: Position) -> bool {
    for &nd in &[d.next(), d.prev()] {
        let nd_cell = step(q, nd);
        let nd_blocked = tile_or_wall(level, nd_cell) == Tile::Wall
            || nd_cell.map_or(false, |p| crate_at(crates, p, crate_index).is_some());
        if !nd_blocked {
            continue;
        }
        for &dp in &[d, d.opposite()] {
            let other_cell = match step(q, dp) {
                Some(p) => p,
                None => continue,
            };
            let other_idx = match crate_at(crates, other_cell, crate_index) {
                Some(idx) => idx,
                None => continue,
            };
            let fourth = step(other_cell, nd);
            let fourth_blocked = tile_or_wall(level, fourth) == Tile::Wall
                || fourth.map_or(false, |p| crate_at(crates, p, crate_index).is_some());
            if fourth_blocked {
                let other_pos = crates[other_idx];
                if !(level.is_goal(q) && level.is_goal(other_pos)) {
                    return true;
                }
            }
        }
    }
    false
}

/// Attempts to push the crate at `crate_index` in direction `d`. Returns
/// `None` if the push is rejected (blocked, dead square, or frozen); the
/// input state is never mutated.
pub fn try_push(state: &State, crate_index: usize, d: Direction, heuristic: &impl Heuristic) -> Option<State> {
    let level = &state.level;
    let crate_pos = state.crates[crate_index];
    let q = step(crate_pos, d)?;

    if level.tile(q) == Tile::Wall {
        return None;
    }
    if crate_at(&state.crates, q, crate_index).is_some() {
        return None;
    }
    if level.is_dead_square(q) {
        return None;
    }
    if is_frozen(level, &state.crates, crate_index, d, q) {
        return None;
    }

    let mut crates = state.crates.clone();
    crates[crate_index] = q;

    let mut hash = state.hash;
    hash ^= level
        .zobrist
        .crate_hash(crate_pos.row as usize, crate_pos.col as usize);
    hash ^= level.zobrist.crate_hash(q.row as usize, q.col as usize);

    let h = heuristic.compute(level, &crates);

    Some(State {
        level: state.level.clone(),
        player: crate_pos,
        crates,
        hash,
        heuristic: h,
        top_reachable: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::heuristic::SimpleHeuristic;
    use crate::level::LevelBuilder;
    use crate::state::State;
    use std::rc::Rc;

    fn build(s: &str) -> State {
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
                    '*' => {
                        crates.push(pos);
                        goals.push(pos);
                        Tile::Goal
                    }
                    _ => Tile::Floor,
                };
                tile_row.push(tile);
            }
            tiles.push(tile_row);
        }
        let level = Rc::new(
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
            .unwrap(),
        );
        State::initial(level, &SimpleHeuristic)
    }

    #[test]
    fn single_push_succeeds_and_solves() {
        let state = build("#####\n#@$.#\n#####");
        let next = try_push(&state, 0, Direction::Right, &SimpleHeuristic).unwrap();
        assert!(next.is_solved());
        assert_eq!(next.player, state.crates[0]);
    }

    #[test]
    fn push_into_dead_square_is_rejected() {
        let state = build("####\n#.@#\n#$ #\n####");
        assert!(state.level.is_dead_square(Position::new(2, 2)));
        let result = try_push(&state, 0, Direction::Right, &SimpleHeuristic);
        assert!(result.is_none());
    }

    #[test]
    fn push_is_pure_and_leaves_input_state_unchanged() {
        let state = build("#####\n#@$.#\n#####");
        let before_hash = state.hash;
        let before_crates = state.crates.clone();
        let _ = try_push(&state, 0, Direction::Right, &SimpleHeuristic);
        assert_eq!(state.hash, before_hash);
        assert_eq!(state.crates, before_crates);

        let a = try_push(&state, 0, Direction::Right, &SimpleHeuristic).unwrap();
        let b = try_push(&state, 0, Direction::Right, &SimpleHeuristic).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.crates, b.crates);
    }

    #[test]
    fn freeze_block_is_rejected_when_neither_cell_is_a_goal() {
        let state = build("#.@$ $.#\n########");
        let q = step(state.crates[0], Direction::Right).unwrap();
        assert!(is_frozen(&state.level, &state.crates, 0, Direction::Right, q));
    }

    #[test]
    fn freeze_block_is_allowed_when_both_cells_are_goals() {
        let state = build("# @$.*  #\n########");
        let q = step(state.crates[0], Direction::Right).unwrap();
        assert!(!is_frozen(&state.level, &state.crates, 0, Direction::Right, q));
    }
}
