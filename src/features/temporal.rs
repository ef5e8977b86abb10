//! Temporal feature extraction
//!
//! Scheduling context known before kickoff: time of day, weekday, month, and
//! rest since each team's previous game.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::GameRecord;

/// Context features taken from the game record itself
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameContext {
    /// Start hour normalized by 24
    pub hour: f64,
    /// Monday = 0 ... Sunday = 6, normalized by 7
    pub weekday: f64,
    /// Month (1-12) normalized by 12
    pub month: f64,
    /// 1.0 if Saturday or Sunday
    pub is_weekend: f64,
    /// 1.0 if the game starts at or after the primetime hour
    pub is_primetime: f64,
}

impl GameContext {
    pub fn from_game(game: &GameRecord, primetime_hour: u32) -> Self {
        let start = game.start_time;
        let weekday = start.weekday().num_days_from_monday();
        GameContext {
            hour: start.hour() as f64 / 24.0,
            weekday: weekday as f64 / 7.0,
            month: start.month() as f64 / 12.0,
            is_weekend: if weekday >= 5 { 1.0 } else { 0.0 },
            is_primetime: if start.hour() >= primetime_hour { 1.0 } else { 0.0 },
        }
    }
}

/// Rest before a game, normalized: 0 = 1 day, 1 = 14+ days, 0.5 if unknown
pub fn rest_days(last_played: Option<DateTime<Utc>>, start: DateTime<Utc>) -> f64 {
    match last_played {
        Some(last) => {
            let days = (start - last).num_days();
            ((days - 1) as f64 / 13.0).clamp(0.0, 1.0)
        }
        None => 0.5,
    }
}
