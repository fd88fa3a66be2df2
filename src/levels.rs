//! XSB-format level tokenizer: splits a levels file into named chunks on
//! `;`-prefixed comment lines and blank lines, then builds each chunk into
//! a fully precomputed [`Level`].

use std::fs;
use std::rc::Rc;

use crate::config::Config;
use crate::error::{Result, SokobanError};
use crate::geometry::Position;
use crate::level::{Level, LevelBuilder, Tile};
use crate::zobrist::Zobrist;

fn parse_grid(
    text: &str,
    zobrist: Rc<Zobrist>,
    config: &Config,
    level_number: usize,
) -> Result<Rc<Level>> {
    let mut tiles = Vec::new();
    let mut player = None;
    let mut crates = Vec::new();
    let mut goals = Vec::new();

    for (row, line) in text.lines().enumerate() {
        let mut tile_row = Vec::with_capacity(line.len());
        for (col, ch) in line.chars().enumerate() {
            let pos = Position::new(row, col);
            let tile = match ch {
                '#' => Tile::Wall,
                ' ' => Tile::Floor,
                '.' => {
                    goals.push(pos);
                    Tile::Goal
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
                '@' => {
                    if player.is_some() {
                        return Err(SokobanError::MalformedLevel {
                            level: level_number,
                            reason: "multiple player positions found".to_string(),
                        });
                    }
                    player = Some(pos);
                    Tile::Floor
                }
                '+' => {
                    if player.is_some() {
                        return Err(SokobanError::MalformedLevel {
                            level: level_number,
                            reason: "multiple player positions found".to_string(),
                        });
                    }
                    player = Some(pos);
                    goals.push(pos);
                    Tile::Goal
                }
                other => {
                    return Err(SokobanError::MalformedLevel {
                        level: level_number,
                        reason: format!("invalid character '{}' at column {}", other, col),
                    });
                }
            };
            tile_row.push(tile);
        }
        tiles.push(tile_row);
    }

    LevelBuilder::build(
        format!("level {}", level_number),
        tiles,
        player,
        crates,
        goals,
        zobrist,
        config,
        level_number,
    )
    .map(Rc::new)
}

/// A sequence of parsed, precomputed levels, as tokenized out of one XSB
/// levels file. Each level is `Rc`-wrapped so the solver can share it
/// across search nodes without copying its precomputed analyses.
pub struct Levels {
    levels: Vec<Rc<Level>>,
}

impl Levels {
    /// Tokenizes `contents` into level chunks and builds each one. A chunk
    /// ends at a `;`-prefixed line or a blank line; both also act as
    /// separators when consecutive. Every level is validated (size, player,
    /// crate/goal count) before this returns, so a levels file with a
    /// malformed or oversized level anywhere in it fails as a whole, before
    /// any search begins.
    pub fn from_text(contents: &str, zobrist: Rc<Zobrist>, config: &Config) -> Result<Self> {
        let mut levels = Vec::new();
        let mut current = String::new();
        let mut level_number = 0usize;

        let mut flush = |current: &mut String, level_number: &mut usize, levels: &mut Vec<Rc<Level>>| -> Result<()> {
            if current.is_empty() {
                return Ok(());
            }
            *level_number += 1;
            let chunk = current.trim_end_matches('\n');
            let level = parse_grid(chunk, Rc::clone(&zobrist), config, *level_number)?;
            levels.push(level);
            current.clear();
            Ok(())
        };

        for line in contents.lines() {
            if line.trim_start().starts_with(';') {
                flush(&mut current, &mut level_number, &mut levels)?;
                continue;
            }
            if line.is_empty() {
                flush(&mut current, &mut level_number, &mut levels)?;
                continue;
            }
            current.push_str(line);
            current.push('\n');
        }
        flush(&mut current, &mut level_number, &mut levels)?;

        Ok(Levels { levels })
    }

    pub fn from_file(path: &str, zobrist: Rc<Zobrist>, config: &Config) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents, zobrist, config)
    }

    /// Cheap `Rc` clone of the `index`-th level, letting the caller share
    /// the same precomputed analyses across an entire search.
    pub fn get(&self, index: usize) -> Option<Rc<Level>> {
        self.levels.get(index).map(Rc::clone)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zobrist() -> Rc<Zobrist> {
        Rc::new(Zobrist::new())
    }

    #[test]
    fn splits_on_comment_and_blank_lines() {
        let text = "; first\n\n#####\n#@$.#\n#####\n\n; second\n\n#####\n#.$@#\n#####\n";
        let levels = Levels::from_text(text, zobrist(), &Config::default()).unwrap();
        assert_eq!(levels.len(), 2);
    }

    #[test]
    fn single_level_without_trailing_separator_is_parsed() {
        let text = "#####\n#@$.#\n#####";
        let levels = Levels::from_text(text, zobrist(), &Config::default()).unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels.get(0).unwrap().initial_crates.len(), 1);
    }

    #[test]
    fn malformed_level_anywhere_in_the_batch_fails_the_whole_parse() {
        let text = "#####\n#@$.#\n#####\n\n#####\n#@@ #\n#####\n";
        let result = Levels::from_text(text, zobrist(), &Config::default());
        assert!(matches!(result, Err(SokobanError::MalformedLevel { .. })));
    }

    #[test]
    fn oversized_level_is_rejected_before_search() {
        let mut config = Config::default();
        config.max_dim = 3;
        let text = "#####\n#@$.#\n#####";
        let result = Levels::from_text(text, zobrist(), &config);
        assert!(matches!(result, Err(SokobanError::SizeExceeded { .. })));
    }

    #[test]
    fn from_file_reports_io_error_for_missing_file() {
        let result = Levels::from_file("/nonexistent/path/to/levels.xsb", zobrist(), &Config::default());
        assert!(matches!(result, Err(SokobanError::Io(_))));
    }
}
