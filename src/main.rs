mod config;
mod error;
mod geometry;
mod heuristic;
mod hungarian;
mod level;
mod levels;
mod moves;
mod pqueue;
mod push;
mod search;
mod state;
mod zobrist;

use std::rc::Rc;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::info;

use crate::config::Config;
use crate::geometry::Direction as PushDirection;
use crate::heuristic::{Heuristic, HungarianHeuristic, SimpleHeuristic};
use crate::level::Level;
use crate::levels::Levels;
use crate::search::{solve, SolveResult};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeuristicType {
    Simple,
    Hungarian,
}

#[derive(Parser)]
#[command(name = "sokoban-solver")]
#[command(about = "An A* Sokoban push solver", long_about = None)]
struct Args {
    /// Path to the levels file (XSB format)
    #[arg(value_name = "FILE")]
    levels_file: String,

    /// Level number to solve (1-indexed), or start of range
    #[arg(value_name = "LEVEL")]
    level_start: usize,

    /// Optional end of level range (inclusive, 1-indexed)
    #[arg(value_name = "LEVEL_END")]
    level_end: Option<usize>,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,

    /// Maximum number of states to explore before giving up
    #[arg(short = 'n', long, default_value = "300000")]
    max_search: usize,

    /// Maximum level width/height
    #[arg(long, default_value = "50")]
    max_dim: usize,

    /// Heuristic to use for solving
    #[arg(short = 'H', long, value_enum, default_value = "simple")]
    heuristic: HeuristicType,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn print_solution(level: &Level, moves: &[(usize, PushDirection)]) {
    println!("\nsolving '{}' ({} pushes):", level.name, moves.len());
    for (i, (crate_index, d)) in moves.iter().enumerate() {
        println!("  push #{} {} ({}/{})", crate_index + 1, d, i + 1, moves.len());
    }
}

struct LevelStats {
    solved: bool,
    steps: usize,
    elapsed_ms: u128,
    /// Set only for internal-bug-class failures (verification failure);
    /// a skipped level (cutoff or proven unsolvable) is not fatal.
    fatal: bool,
}

fn solve_level(level: Rc<Level>, config: &Config, print: bool) -> LevelStats {
    let start = Instant::now();
    let result = if config.use_hungarian {
        solve(Rc::clone(&level), &HungarianHeuristic, config)
    } else {
        solve(Rc::clone(&level), &SimpleHeuristic, config)
    };
    let elapsed_ms = start.elapsed().as_millis();

    let (solved_char, steps, solved, fatal, moves) = match result {
        Ok(SolveResult::Solved(moves)) => ('Y', moves.len(), true, false, Some(moves)),
        Ok(SolveResult::Cutoff) => {
            log::warn!("level '{}' hit the search budget ({})", level.name, config.max_search);
            ('N', 0, false, false, None)
        }
        Ok(SolveResult::Unsolvable) => ('X', 0, false, false, None),
        Err(e) => {
            log::error!("level '{}' failed: {}", level.name, e);
            ('E', 0, false, true, None)
        }
    };

    println!(
        "{:<12}  solved: {}  steps: {:<5}  elapsed: {} ms",
        level.name, solved_char, steps, elapsed_ms
    );

    if print {
        if let Some(moves) = moves {
            print_solution(&level, &moves);
        }
    }

    LevelStats {
        solved,
        steps,
        elapsed_ms,
        fatal,
    }
}

fn main() {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(log_level).init();

    let config = Config {
        max_dim: args.max_dim,
        use_hungarian: matches!(args.heuristic, HeuristicType::Hungarian),
        max_search: args.max_search,
    };

    let zobrist = Rc::new(crate::zobrist::Zobrist::new());
    let levels = match Levels::from_file(&args.levels_file, Rc::clone(&zobrist), &config) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("error loading levels: {}", e);
            std::process::exit(1);
        }
    };

    let level_end = args.level_end.unwrap_or(args.level_start);
    let num_levels = level_end.saturating_sub(args.level_start) + 1;

    if args.level_start == 0 {
        eprintln!("error: level numbers must be at least 1");
        std::process::exit(1);
    }
    if level_end < args.level_start {
        eprintln!("error: level end must be >= level start");
        std::process::exit(1);
    }
    if level_end > levels.len() {
        eprintln!("error: level {} not found (file contains {} levels)", level_end, levels.len());
        std::process::exit(1);
    }
    if args.print_solution && num_levels > 1 {
        eprintln!("error: solution printing only supported when solving a single level");
        std::process::exit(1);
    }

    info!("loaded {} level(s) from {}", levels.len(), args.levels_file);

    let mut total_solved = 0;
    let mut total_steps = 0;
    let mut total_time_ms = 0;
    let mut skipped_names = Vec::new();
    // Skipped levels (budget exhausted or proven unsolvable) are a normal
    // outcome and never affect the exit code; only a verification failure
    // or other internal error does.
    let mut any_fatal = false;

    for level_num in args.level_start..=level_end {
        let level = levels
            .get(level_num - 1)
            .expect("range already validated against levels.len()");
        let name = level.name.clone();
        let stats = solve_level(level, &config, args.print_solution);
        if stats.solved {
            total_solved += 1;
        } else if stats.fatal {
            any_fatal = true;
        } else {
            skipped_names.push(name);
        }
        total_steps += stats.steps;
        total_time_ms += stats.elapsed_ms;
    }

    if num_levels > 1 {
        println!("---");
        println!(
            "solved: {:>3}/{:<3}  skipped: {:<3}  steps: {:<5}  elapsed: {} ms",
            total_solved,
            num_levels,
            skipped_names.len(),
            total_steps,
            total_time_ms
        );
        if !skipped_names.is_empty() {
            println!("skipped levels: {}", skipped_names.join(", "));
        }
    }

    if any_fatal {
        std::process::exit(1);
    }
}
