//! Static, immutable per-level model: the grid itself plus every
//! precomputed analysis the search relies on (reachability, push
//! distances, dead squares, articulation cuts).

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::config::Config;
use crate::error::{Result, SokobanError};
use crate::geometry::{step, Direction, Position, ALL_DIRECTIONS, MAX_DIM};
use crate::zobrist::Zobrist;

/// Maximum number of crates (and goals) a level may contain, matching the
/// fixed-capacity buffers used by the Hungarian assignment solver.
pub const MAX_CRATES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Floor,
    Goal,
}

fn direction_index(d: Direction) -> usize {
    match d {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

/// A dense bitset over the `[0, MAX_DIM*MAX_DIM)` cell-key space.
#[derive(Debug, Clone)]
pub struct CellSet {
    bits: Vec<bool>,
}

impl CellSet {
    fn new() -> Self {
        CellSet {
            bits: vec![false; MAX_DIM * MAX_DIM],
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.bits[pos.key()]
    }

    fn insert(&mut self, pos: Position) -> bool {
        let key = pos.key();
        let was_set = self.bits[key];
        self.bits[key] = true;
        !was_set
    }

    pub fn len(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Level {
    pub name: String,
    tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,
    pub goals: Vec<Position>,
    pub initial_player: Position,
    pub initial_crates: Vec<Position>,
    pub zobrist: Rc<Zobrist>,

    pub player_reachable: CellSet,
    crate_reachable: Vec<CellSet>,
    push_distance: Vec<HashMap<usize, u32>>,
    /// Per-goal push-distance maps (`goal_distance[j][cell]`), used by the
    /// Hungarian heuristic's cost matrix. `push_distance[i]` is the
    /// pointwise minimum of these, restricted to `crate_reachable[i]`.
    goal_distance: Vec<HashMap<usize, u32>>,
    dead_squares: CellSet,
    cuts: HashMap<usize, u8>,
}

impl Level {
    /// Tile at `pos`, treating any out-of-bounds or short-row cell as a wall.
    pub fn tile(&self, pos: Position) -> Tile {
        let row = pos.row as usize;
        let col = pos.col as usize;
        if row >= self.height {
            return Tile::Wall;
        }
        match self.tiles[row].get(col) {
            Some(&t) => t,
            None => Tile::Wall,
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        (pos.row as usize) < self.height && (pos.col as usize) < MAX_DIM
    }

    pub fn is_goal(&self, pos: Position) -> bool {
        self.tile(pos) == Tile::Goal
    }

    pub fn is_dead_square(&self, pos: Position) -> bool {
        self.dead_squares.contains(pos)
    }

    pub fn crate_reachable(&self, crate_index: usize) -> &CellSet {
        &self.crate_reachable[crate_index]
    }

    /// Minimum push count for crate `crate_index` to reach some goal from `pos`.
    pub fn push_distance(&self, crate_index: usize, pos: Position) -> Option<u32> {
        self.push_distance[crate_index].get(&pos.key()).copied()
    }

    /// Push count for crate `crate_index` (currently at `pos`) to reach the
    /// specific goal `goal_index`, or `None` if unreachable. Used to build
    /// the Hungarian assignment's cost matrix.
    pub fn push_distance_to_goal(&self, crate_index: usize, pos: Position, goal_index: usize) -> Option<u32> {
        if !self.crate_reachable[crate_index].contains(pos) {
            return None;
        }
        self.goal_distance[goal_index].get(&pos.key()).copied()
    }

    /// Directions from an articulation cell that lead toward a goal, or
    /// `None` if `pos` is not an articulation point.
    pub fn cut_directions(&self, pos: Position) -> Option<u8> {
        self.cuts.get(&pos.key()).copied()
    }

    pub fn is_cut(&self, pos: Position) -> bool {
        self.cuts.contains_key(&pos.key())
    }
}

fn walkable(t: Tile) -> bool {
    t != Tile::Wall
}

/// Plain flood fill: a neighbor is reachable iff it is not a wall.
fn bfs_walkable(level_tile: impl Fn(Position) -> Tile, start: Position) -> CellSet {
    let mut seen = CellSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(pos) = queue.pop_front() {
        for &d in &ALL_DIRECTIONS {
            if let Some(next) = step(pos, d) {
                if walkable(level_tile(next)) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

/// Forward "pusher fits behind" BFS: edge `x -> x+d` is valid iff both
/// `x+d` and `x-d` are non-wall.
fn bfs_crate_reachable(level_tile: impl Fn(Position) -> Tile, start: Position) -> CellSet {
    let mut seen = CellSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(pos) = queue.pop_front() {
        for &d in &ALL_DIRECTIONS {
            let forward = step(pos, d);
            let behind = step(pos, d.opposite());
            if let (Some(next), Some(behind)) = (forward, behind) {
                if walkable(level_tile(next)) && walkable(level_tile(behind)) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

/// Reverse BFS from a single goal, under the same pusher-fits-behind rule,
/// yielding push-distance-to-that-goal for every cell that can reach it.
fn compute_goal_distance(level_tile: impl Fn(Position) -> Tile, goal: Position) -> HashMap<usize, u32> {
    let mut dist = HashMap::new();
    let mut queue = VecDeque::new();
    dist.insert(goal.key(), 0u32);
    queue.push_back(goal);
    while let Some(c) = queue.pop_front() {
        let d_c = dist[&c.key()];
        for &d in &ALL_DIRECTIONS {
            // Predecessor p pushed the crate from p into c via direction d:
            // p = c - d, and the pusher must fit behind p, i.e. p - d non-wall.
            let p = match step(c, d.opposite()) {
                Some(p) => p,
                None => continue,
            };
            if !walkable(level_tile(p)) {
                continue;
            }
            let behind_p = match step(p, d.opposite()) {
                Some(b) => b,
                None => continue,
            };
            if !walkable(level_tile(behind_p)) {
                continue;
            }
            if !dist.contains_key(&p.key()) {
                dist.insert(p.key(), d_c + 1);
                queue.push_back(p);
            }
        }
    }
    dist
}

fn tile_or_wall(level_tile: &impl Fn(Position) -> Tile, pos: Option<Position>) -> Tile {
    match pos {
        Some(p) => level_tile(p),
        None => Tile::Wall,
    }
}

fn hug_walk(
    level_tile: &impl Fn(Position) -> Tile,
    goals: &HashSet<usize>,
    start: Position,
    wall_dir: Direction,
    walk_dir: Direction,
) -> bool {
    let mut cur = start;
    loop {
        let next = match step(cur, walk_dir) {
            Some(p) => p,
            None => return true,
        };
        match level_tile(next) {
            Tile::Wall => return true,
            _ => {}
        }
        if goals.contains(&next.key()) {
            return false;
        }
        let adjacent = step(next, wall_dir);
        if tile_or_wall(level_tile, adjacent) != Tile::Wall {
            return false;
        }
        cur = next;
    }
}

fn is_dead_square(
    level_tile: &impl Fn(Position) -> Tile,
    goals: &HashSet<usize>,
    pos: Position,
) -> bool {
    let wall_dirs: Vec<Direction> = ALL_DIRECTIONS
        .iter()
        .copied()
        .filter(|&d| tile_or_wall(level_tile, step(pos, d)) == Tile::Wall)
        .collect();

    match wall_dirs.len() {
        0 => false,
        1 => {
            let d = wall_dirs[0];
            hug_walk(level_tile, goals, pos, d, d.next()) && hug_walk(level_tile, goals, pos, d, d.prev())
        }
        2 => {
            if wall_dirs[0] == wall_dirs[1].opposite() {
                let d = wall_dirs[0];
                hug_walk(level_tile, goals, pos, d, d.next()) && hug_walk(level_tile, goals, pos, d, d.prev())
            } else {
                true
            }
        }
        _ => true,
    }
}

fn compute_dead_squares(
    level_tile: &impl Fn(Position) -> Tile,
    goals: &HashSet<usize>,
    reachable: &CellSet,
) -> CellSet {
    let mut dead = CellSet::new();
    for row in 0..MAX_DIM {
        for col in 0..MAX_DIM {
            let pos = Position::new(row, col);
            if !reachable.contains(pos) {
                continue;
            }
            if level_tile(pos) == Tile::Wall || goals.contains(&pos.key()) {
                continue;
            }
            if is_dead_square(level_tile, goals, pos) {
                dead.insert(pos);
            }
        }
    }
    dead
}

fn build_adjacency(level_tile: &impl Fn(Position) -> Tile, reachable: &CellSet) -> HashMap<usize, Vec<Position>> {
    let mut adj = HashMap::new();
    for row in 0..MAX_DIM {
        for col in 0..MAX_DIM {
            let pos = Position::new(row, col);
            if !reachable.contains(pos) || level_tile(pos) == Tile::Wall {
                continue;
            }
            let mut neighbors = Vec::new();
            for &d in &ALL_DIRECTIONS {
                if let Some(next) = step(pos, d) {
                    if reachable.contains(next) && level_tile(next) != Tile::Wall {
                        neighbors.push(next);
                    }
                }
            }
            adj.insert(pos.key(), neighbors);
        }
    }
    adj
}

/// Iterative articulation-point search (Tarjan low-link) over the floor
/// graph restricted to `reachable` cells, rooted at `root`.
fn compute_articulation_points(adj: &HashMap<usize, Vec<Position>>, root: Position) -> HashSet<usize> {
    struct Frame {
        node: usize,
        parent: Option<usize>,
        neighbor_idx: usize,
    }

    let mut disc: HashMap<usize, u32> = HashMap::new();
    let mut low: HashMap<usize, u32> = HashMap::new();
    let mut timer: u32 = 0;
    let mut articulation = HashSet::new();
    let mut root_children: u32 = 0;

    let root_key = root.key();
    disc.insert(root_key, timer);
    low.insert(root_key, timer);
    timer += 1;

    let mut stack = vec![Frame {
        node: root_key,
        parent: None,
        neighbor_idx: 0,
    }];

    while !stack.is_empty() {
        let top = stack.len() - 1;
        let node = stack[top].node;
        let parent = stack[top].parent;
        let neighbors = match adj.get(&node) {
            Some(n) => n,
            None => {
                stack.pop();
                continue;
            }
        };

        if stack[top].neighbor_idx < neighbors.len() {
            let child_key = neighbors[stack[top].neighbor_idx].key();
            stack[top].neighbor_idx += 1;

            if Some(child_key) == parent {
                // Skip the single edge straight back to the parent; grid
                // adjacency never has parallel edges so this fires once.
                continue;
            }

            if let Some(&child_disc) = disc.get(&child_key) {
                let node_low = low[&node];
                low.insert(node, node_low.min(child_disc));
            } else {
                disc.insert(child_key, timer);
                low.insert(child_key, timer);
                timer += 1;
                if parent.is_none() {
                    root_children += 1;
                }
                stack.push(Frame {
                    node: child_key,
                    parent: Some(node),
                    neighbor_idx: 0,
                });
            }
        } else {
            stack.pop();
            if let Some(parent_key) = parent {
                let child_low = low[&node];
                let parent_low = low[&parent_key];
                low.insert(parent_key, parent_low.min(child_low));

                let parent_disc = disc[&parent_key];
                let parent_is_root = stack.len() == 1 && stack[0].node == parent_key;
                if !parent_is_root && child_low >= parent_disc {
                    articulation.insert(parent_key);
                }
            }
        }
    }

    if root_children > 1 {
        articulation.insert(root_key);
    }
    articulation
}

fn flood_excluding(
    level_tile: &impl Fn(Position) -> Tile,
    reachable: &CellSet,
    start: Position,
    excluded: Position,
    goals: &HashSet<usize>,
) -> bool {
    let mut seen = CellSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    if goals.contains(&start.key()) {
        return true;
    }
    while let Some(pos) = queue.pop_front() {
        for &d in &ALL_DIRECTIONS {
            if let Some(next) = step(pos, d) {
                if next == excluded || !reachable.contains(next) || level_tile(next) == Tile::Wall {
                    continue;
                }
                if seen.insert(next) {
                    if goals.contains(&next.key()) {
                        return true;
                    }
                    queue.push_back(next);
                }
            }
        }
    }
    false
}

fn compute_cuts(
    level_tile: &impl Fn(Position) -> Tile,
    goals: &HashSet<usize>,
    reachable: &CellSet,
    root: Position,
) -> HashMap<usize, u8> {
    let adj = build_adjacency(level_tile, reachable);
    let points = compute_articulation_points(&adj, root);

    let mut cuts = HashMap::new();
    for &key in &points {
        let row = key / MAX_DIM;
        let col = key % MAX_DIM;
        let pos = Position::new(row, col);
        let mut mask: u8 = 0;
        for &d in &ALL_DIRECTIONS {
            if let Some(next) = step(pos, d) {
                if reachable.contains(next) && level_tile(next) != Tile::Wall {
                    if flood_excluding(level_tile, reachable, next, pos, goals) {
                        mask |= 1 << direction_index(d);
                    }
                }
            }
        }
        cuts.insert(key, mask);
    }
    cuts
}

pub struct LevelBuilder;

impl LevelBuilder {
    /// Build and fully precompute a [`Level`] from a parsed grid.
    pub fn build(
        name: String,
        tiles: Vec<Vec<Tile>>,
        player: Option<Position>,
        crates: Vec<Position>,
        goals: Vec<Position>,
        zobrist: Rc<Zobrist>,
        config: &Config,
        level_number: usize,
    ) -> Result<Level> {
        let height = tiles.len();
        let width = tiles.iter().map(|row| row.len()).max().unwrap_or(0);

        if height > config.max_dim || width > config.max_dim {
            return Err(SokobanError::SizeExceeded {
                level: level_number,
                width,
                height,
                max_dim: config.max_dim,
            });
        }

        let player = player.ok_or_else(|| SokobanError::MalformedLevel {
            level: level_number,
            reason: "no player position found".to_string(),
        })?;

        if crates.len() != goals.len() {
            return Err(SokobanError::MalformedLevel {
                level: level_number,
                reason: format!(
                    "crate count ({}) does not match goal count ({})",
                    crates.len(),
                    goals.len()
                ),
            });
        }

        let level_tile = |pos: Position| -> Tile {
            let row = pos.row as usize;
            let col = pos.col as usize;
            if row >= height {
                return Tile::Wall;
            }
            match tiles[row].get(col) {
                Some(&t) => t,
                None => Tile::Wall,
            }
        };

        let goal_set: HashSet<usize> = goals.iter().map(|g| g.key()).collect();

        let player_reachable = bfs_walkable(level_tile, player);

        let goal_distance: Vec<HashMap<usize, u32>> = goals
            .iter()
            .map(|&g| compute_goal_distance(level_tile, g))
            .collect();

        let mut crate_reachable = Vec::with_capacity(crates.len());
        let mut push_distance = Vec::with_capacity(crates.len());
        for &c in &crates {
            let reachable = bfs_crate_reachable(level_tile, c);
            let mut distances = HashMap::new();
            for row in 0..MAX_DIM {
                for col in 0..MAX_DIM {
                    let pos = Position::new(row, col);
                    if !reachable.contains(pos) {
                        continue;
                    }
                    let nearest = goal_distance
                        .iter()
                        .filter_map(|m| m.get(&pos.key()).copied())
                        .min();
                    if let Some(d) = nearest {
                        distances.insert(pos.key(), d);
                    }
                }
            }
            crate_reachable.push(reachable);
            push_distance.push(distances);
        }

        let dead_squares = compute_dead_squares(&level_tile, &goal_set, &player_reachable);
        let cuts = compute_cuts(&level_tile, &goal_set, &player_reachable, player);

        Ok(Level {
            name,
            tiles,
            width,
            height,
            goals,
            initial_player: player,
            initial_crates: crates,
            zobrist,
            player_reachable,
            crate_reachable,
            push_distance,
            goal_distance,
            dead_squares,
            cuts,
        })
    }
}
