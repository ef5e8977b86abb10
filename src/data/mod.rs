//! Data ingestion and storage
//!
//! Game sources (SQLite store, CSV files) and labelled dataset output.

pub mod database;
pub mod dataset;
pub mod import;

pub use database::{Database, DatabaseSource, DatabaseStats};
pub use dataset::{DatasetSplit, FeatureDataset, FeatureScaler, LabelCounts};
pub use import::{load_games, CsvSource, ImportedGame};

use chrono::{DateTime, Utc};

use crate::{GameRecord, Result};

/// Anything that can hand the pipeline a batch of game records
pub trait GameSource {
    /// All known games, in start-time order
    fn games(&self) -> Result<Vec<GameRecord>>;

    /// Games starting strictly after `after` (all games for `None`), in start-time order
    fn games_after(&self, after: Option<DateTime<Utc>>) -> Result<Vec<GameRecord>> {
        let games = self.games()?;
        Ok(match after {
            Some(after) => games.into_iter().filter(|g| g.start_time > after).collect(),
            None => games,
        })
    }
}
