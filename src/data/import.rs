//! CSV game files
//!
//! Columns: `game_id,sport,start_time,home_team_id,away_team_id,home_score,away_score`.
//! `start_time` is RFC 3339; blank score cells mark unplayed fixtures.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::GameSource;
use crate::{GameRecord, Result, TeamId};

#[derive(Debug, Deserialize)]
struct RawGame {
    game_id: String,
    sport: String,
    start_time: DateTime<Utc>,
    home_team_id: i64,
    away_team_id: i64,
    home_score: Option<u32>,
    away_score: Option<u32>,
}

/// A game row together with its sport tag
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedGame {
    pub sport: String,
    pub game: GameRecord,
}

/// Read every well-formed row; malformed rows are logged and skipped
pub fn load_games<P: AsRef<Path>>(path: P) -> Result<Vec<ImportedGame>> {
    let file = std::fs::File::open(path.as_ref())?;
    let games = load_games_from_reader(file)?;
    log::info!(
        "Loaded {} games from {}",
        games.len(),
        path.as_ref().display()
    );
    Ok(games)
}

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<ImportedGame>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut games = Vec::new();
    for (line, result) in reader.deserialize::<RawGame>().enumerate() {
        match result {
            Ok(raw) => {
                if raw.game_id.is_empty() {
                    log::warn!("skipping row {}: empty game_id", line + 2);
                    continue;
                }
                games.push(ImportedGame {
                    sport: raw.sport,
                    game: GameRecord {
                        game_id: raw.game_id,
                        start_time: raw.start_time,
                        home_team: TeamId(raw.home_team_id),
                        away_team: TeamId(raw.away_team_id),
                        home_score: raw.home_score,
                        away_score: raw.away_score,
                    },
                });
            }
            Err(e) => {
                log::warn!("skipping malformed game row: {}", e);
            }
        }
    }
    Ok(games)
}

/// A CSV file read as a game stream, optionally limited to one sport
pub struct CsvSource {
    path: PathBuf,
    sport: Option<String>,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvSource {
            path: path.as_ref().to_path_buf(),
            sport: None,
        }
    }

    pub fn with_sport(mut self, sport: &str) -> Self {
        self.sport = Some(sport.to_string());
        self
    }
}

impl GameSource for CsvSource {
    /// Games sorted into start-time order (files are not assumed sorted)
    fn games(&self) -> Result<Vec<GameRecord>> {
        let mut games: Vec<GameRecord> = load_games(&self.path)?
            .into_iter()
            .filter(|g| self.sport.as_deref().map_or(true, |s| g.sport == s))
            .map(|g| g.game)
            .collect();
        crate::sort_chronologically(&mut games);
        Ok(games)
    }
}
