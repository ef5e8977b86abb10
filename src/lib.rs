//! Chronological team-form features for game outcome models
//!
//! Walks completed games in start-time order, keeps running per-team statistics,
//! and emits one feature vector per eligible game using only pre-game state.

pub mod data;
pub mod features;
pub mod pipeline;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use features::{FeatureConfig, RatingConfig};
use pipeline::TiePolicy;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// A single game from the schedule. Scores are `None` until the game is played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub start_time: DateTime<Utc>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl GameRecord {
    /// Final score as (home, away), if the game has been played
    pub fn final_score(&self) -> Option<(u32, u32)> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some((home, away)),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.final_score().is_some()
    }

    /// Result from the home team's perspective, if completed
    pub fn home_outcome(&self) -> Option<Outcome> {
        self.final_score()
            .map(|(home, away)| Outcome::from_scores(home, away))
    }
}

/// Stable sort into non-decreasing start time; games sharing a start time keep input order.
pub fn sort_chronologically(games: &mut [GameRecord]) {
    games.sort_by_key(|g| g.start_time);
}

/// Result of a game for one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn from_scores(score_for: u32, score_against: u32) -> Self {
        match score_for.cmp(&score_against) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    /// Numeric value: 1 = win, 0 = loss, 0.5 = draw
    pub fn value(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Loss => 0.0,
            Outcome::Draw => 0.5,
        }
    }

    /// The same game seen from the other side
    pub fn reversed(self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

/// Training target for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    AwayWin,
    HomeWin,
    /// Only produced under the `draw` tie policy
    Draw,
}

impl Label {
    pub fn from_home_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => Label::HomeWin,
            Outcome::Loss => Label::AwayWin,
            Outcome::Draw => Label::Draw,
        }
    }

    /// Class index: 1 = home win, 0 = away win, 2 = draw
    pub fn class(self) -> u8 {
        match self {
            Label::AwayWin => 0,
            Label::HomeWin => 1,
            Label::Draw => 2,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::AwayWin => write!(f, "Away win"),
            Label::HomeWin => write!(f, "Home win"),
            Label::Draw => write!(f, "Draw"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum MatchupError {
    /// A read of a team that was never ingested. Means the driver itself is broken.
    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("Pipeline already finished; start a new run or resume from a checkpoint")]
    StreamClosed,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MatchupError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub tie_policy: TiePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub dataset_path: String,
    pub checkpoint_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/games.db".to_string(),
            dataset_path: "data/features.csv".to_string(),
            checkpoint_path: "data/checkpoint.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MatchupError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MatchupError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MatchupError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make derived features meaningless
    pub fn validate(&self) -> Result<()> {
        if self.rating.recent_window == 0 || self.rating.rolling_window == 0 {
            return Err(MatchupError::Config(
                "rating windows must hold at least one game".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.rating.momentum_alpha) {
            return Err(MatchupError::Config(format!(
                "momentum_alpha must be in [0, 1], got {}",
                self.rating.momentum_alpha
            )));
        }
        if self.features.min_history == 0 {
            return Err(MatchupError::Config(
                "min_history must be at least 1".to_string(),
            ));
        }
        if self.features.elo_scale <= 0.0
            || self.features.streak_scale <= 0.0
            || self.features.margin_scale <= 0.0
        {
            return Err(MatchupError::Config(
                "feature scales must be positive".to_string(),
            ));
        }
        if self.features.primetime_hour > 23 {
            return Err(MatchupError::Config(format!(
                "primetime_hour must be 0-23, got {}",
                self.features.primetime_hour
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_game(home_score: Option<u32>, away_score: Option<u32>) -> GameRecord {
        GameRecord {
            game_id: "g1".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 10, 5, 19, 30, 0).unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_score,
            away_score,
        }
    }

    #[test]
    fn test_home_outcome() {
        assert_eq!(make_game(Some(100), Some(90)).home_outcome(), Some(Outcome::Win));
        assert_eq!(make_game(Some(80), Some(90)).home_outcome(), Some(Outcome::Loss));
        assert_eq!(make_game(Some(90), Some(90)).home_outcome(), Some(Outcome::Draw));
        assert_eq!(make_game(Some(90), None).home_outcome(), None);
        assert!(!make_game(None, None).is_completed());
    }

    #[test]
    fn test_label_classes() {
        assert_eq!(Label::from_home_outcome(Outcome::Win).class(), 1);
        assert_eq!(Label::from_home_outcome(Outcome::Loss).class(), 0);
        assert_eq!(Label::from_home_outcome(Outcome::Draw).class(), 2);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut a = make_game(Some(1), Some(0));
        a.game_id = "a".to_string();
        let mut b = a.clone();
        b.game_id = "b".to_string();
        let mut early = a.clone();
        early.game_id = "early".to_string();
        early.start_time = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();

        let mut games = vec![a, b, early];
        sort_chronologically(&mut games);
        let ids: Vec<_> = games.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "a", "b"]);
    }

    #[test]
    fn test_config_roundtrip_and_defaults() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.features.min_history, 5);
        assert_eq!(parsed.rating.recent_window, 10);
        assert_eq!(parsed.pipeline.tie_policy, TiePolicy::Drop);

        // Missing sections fall back to defaults
        let partial = Config::from_toml("[features]\nmin_history = 3\nelo_scale = 400.0\nstreak_scale = 5.0\nmargin_scale = 10.0\nbounded = true\nprimetime_hour = 20\n").unwrap();
        assert_eq!(partial.features.min_history, 3);
        assert!(partial.features.bounded);
        assert_eq!(partial.rating.initial_rating, 1500.0);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut config = Config::default();
        config.rating.momentum_alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.features.min_history = 0;
        assert!(config.validate().is_err());
    }
}
