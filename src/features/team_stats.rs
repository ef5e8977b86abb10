//! Team state storage
//!
//! Running per-team statistics, owned by a single pipeline driver.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MatchupError, Outcome, Result, TeamId};

/// Fixed-capacity FIFO of recent outcomes (most recent last)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultWindow {
    capacity: usize,
    results: VecDeque<Outcome>,
}

impl ResultWindow {
    pub fn new(capacity: usize) -> Self {
        ResultWindow {
            capacity,
            results: VecDeque::with_capacity(capacity),
        }
    }

    /// Append the newest result, evicting the oldest once over capacity
    pub fn push(&mut self, outcome: Outcome) {
        self.results.push_back(outcome);
        while self.results.len() > self.capacity {
            self.results.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter()
    }

    /// Mean outcome value, or `None` while empty
    pub fn mean(&self) -> Option<f64> {
        if self.results.is_empty() {
            None
        } else {
            let total: f64 = self.results.iter().map(|o| o.value()).sum();
            Some(total / self.results.len() as f64)
        }
    }
}

/// Running statistics for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    /// Completed games applied so far (wins + losses + draws)
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    /// Always 0 unless ties are recorded as draws
    pub draws: u32,
    /// Sum of points scored across all games
    pub points_for_total: f64,
    /// Sum of points conceded across all games
    pub points_against_total: f64,
    /// Home split
    pub home_games: u32,
    pub home_wins: u32,
    /// Away split
    pub away_games: u32,
    pub away_wins: u32,
    /// Longer form window (`recent_window` games)
    pub recent_results: ResultWindow,
    /// Short form window (`rolling_window` games)
    pub rolling_window: ResultWindow,
    /// Current Elo rating, starting at the configured initial rating
    pub elo_rating: f64,
    /// EWMA of outcome values, in [0, 1]
    pub momentum: f64,
    /// Positive = win streak, negative = loss streak
    pub current_streak: i32,
    /// Start time of the team's last processed game
    pub last_played: Option<DateTime<Utc>>,
}

impl TeamState {
    /// Neutral prior for a team seen for the first time
    pub fn new(initial_rating: f64, recent_window: usize, rolling_window: usize) -> Self {
        TeamState {
            games_played: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            points_for_total: 0.0,
            points_against_total: 0.0,
            home_games: 0,
            home_wins: 0,
            away_games: 0,
            away_wins: 0,
            recent_results: ResultWindow::new(recent_window),
            rolling_window: ResultWindow::new(rolling_window),
            elo_rating: initial_rating,
            momentum: 0.5,
            current_streak: 0,
            last_played: None,
        }
    }

    // Derived rates below divide by games_played; callers gate on the
    // eligibility threshold before reading them.

    pub fn win_rate(&self) -> f64 {
        self.wins as f64 / self.games_played as f64
    }

    /// Win ratio in home games (0.5 with no home games yet)
    pub fn home_win_rate(&self) -> f64 {
        if self.home_games == 0 {
            0.5
        } else {
            self.home_wins as f64 / self.home_games as f64
        }
    }

    /// Win ratio in away games (0.5 with no away games yet)
    pub fn away_win_rate(&self) -> f64 {
        if self.away_games == 0 {
            0.5
        } else {
            self.away_wins as f64 / self.away_games as f64
        }
    }

    pub fn avg_points_for(&self) -> f64 {
        self.points_for_total / self.games_played as f64
    }

    pub fn avg_points_against(&self) -> f64 {
        self.points_against_total / self.games_played as f64
    }

    /// Average point differential per game
    pub fn avg_margin(&self) -> f64 {
        (self.points_for_total - self.points_against_total) / self.games_played as f64
    }

    /// Mean of the recent-form window (0.5 when empty)
    pub fn recent_form(&self) -> f64 {
        self.recent_results.mean().unwrap_or(0.5)
    }

    /// Mean of the short rolling window (0.5 when empty)
    pub fn rolling_form(&self) -> f64 {
        self.rolling_window.mean().unwrap_or(0.5)
    }
}

/// All team states for one pipeline run
#[derive(Debug, Clone)]
pub struct TeamStateStore {
    teams: HashMap<TeamId, TeamState>,
    initial_rating: f64,
    recent_window: usize,
    rolling_window: usize,
}

impl TeamStateStore {
    pub fn new(initial_rating: f64, recent_window: usize, rolling_window: usize) -> Self {
        TeamStateStore {
            teams: HashMap::new(),
            initial_rating,
            recent_window,
            rolling_window,
        }
    }

    /// Rebuild a store from saved states
    pub fn from_states(
        initial_rating: f64,
        recent_window: usize,
        rolling_window: usize,
        states: impl IntoIterator<Item = (TeamId, TeamState)>,
    ) -> Self {
        TeamStateStore {
            teams: states.into_iter().collect(),
            initial_rating,
            recent_window,
            rolling_window,
        }
    }

    /// Existing state for a team, inserting the neutral prior on first sight
    pub fn get_or_create(&mut self, team: TeamId) -> &TeamState {
        let (initial_rating, recent, rolling) =
            (self.initial_rating, self.recent_window, self.rolling_window);
        self.teams
            .entry(team)
            .or_insert_with(|| TeamState::new(initial_rating, recent, rolling))
    }

    /// Read-only fetch of a team that must already exist
    pub fn get(&self, team: TeamId) -> Result<&TeamState> {
        self.teams.get(&team).ok_or(MatchupError::UnknownTeam(team))
    }

    /// Write back both teams' post-game states. The only way states change after creation.
    pub fn apply_game_result(
        &mut self,
        home: TeamId,
        home_state: TeamState,
        away: TeamId,
        away_state: TeamState,
    ) {
        self.teams.insert(home, home_state);
        self.teams.insert(away, away_state);
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// All teams sorted by id
    pub fn iter_sorted(&self) -> Vec<(TeamId, &TeamState)> {
        let mut teams: Vec<_> = self.teams.iter().map(|(id, s)| (*id, s)).collect();
        teams.sort_by_key(|(id, _)| *id);
        teams
    }
}
