//! Post-game state updates
//!
//! Applies one game's result to both teams. Pure: old states in, new states out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::elo::EloConfig;
use super::team_stats::{TeamState, TeamStateStore};
use crate::Outcome;

/// Rating and form parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Elo rating given to a team on first appearance
    pub initial_rating: f64,
    pub k_factor: f64,
    /// Elo points credited to the home side in the expectation
    pub home_advantage: f64,
    /// Momentum smoothing constant
    pub momentum_alpha: f64,
    /// Capacity of the recent-form window
    pub recent_window: usize,
    /// Capacity of the short rolling window
    pub rolling_window: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            initial_rating: 1500.0,
            k_factor: 20.0,
            home_advantage: 0.0,
            momentum_alpha: 0.25,
            recent_window: 10,
            rolling_window: 7,
        }
    }
}

impl RatingConfig {
    pub fn elo(&self) -> EloConfig {
        EloConfig {
            k_factor: self.k_factor,
            home_advantage: self.home_advantage,
        }
    }

    /// Empty store whose new teams start from this configuration's prior
    pub fn new_store(&self) -> TeamStateStore {
        TeamStateStore::new(self.initial_rating, self.recent_window, self.rolling_window)
    }
}

/// Applies completed games to team states
#[derive(Debug, Clone)]
pub struct RatingUpdater {
    elo: EloConfig,
    momentum_alpha: f64,
}

impl RatingUpdater {
    pub fn new(config: &RatingConfig) -> Self {
        RatingUpdater {
            elo: config.elo(),
            momentum_alpha: config.momentum_alpha,
        }
    }

    /// New (home, away) states after a game with the given final score
    pub fn update(
        &self,
        home: &TeamState,
        away: &TeamState,
        home_score: u32,
        away_score: u32,
        played_at: DateTime<Utc>,
    ) -> (TeamState, TeamState) {
        let home_outcome = Outcome::from_scores(home_score, away_score);
        let home_delta =
            self.elo
                .home_delta(home.elo_rating, away.elo_rating, home_outcome.value());

        let new_home = self.apply(
            home,
            home_outcome,
            TeamGame {
                points_for: home_score,
                points_against: away_score,
                is_home: true,
                elo_delta: home_delta,
                played_at,
            },
        );
        let new_away = self.apply(
            away,
            home_outcome.reversed(),
            TeamGame {
                points_for: away_score,
                points_against: home_score,
                is_home: false,
                elo_delta: -home_delta,
                played_at,
            },
        );

        (new_home, new_away)
    }

    fn apply(&self, state: &TeamState, outcome: Outcome, game: TeamGame) -> TeamState {
        let mut next = state.clone();

        next.games_played += 1;
        next.points_for_total += game.points_for as f64;
        next.points_against_total += game.points_against as f64;

        let won = outcome == Outcome::Win;
        if game.is_home {
            next.home_games += 1;
            if won {
                next.home_wins += 1;
            }
        } else {
            next.away_games += 1;
            if won {
                next.away_wins += 1;
            }
        }

        match outcome {
            Outcome::Win => {
                next.wins += 1;
                next.current_streak = state.current_streak.max(0) + 1;
            }
            Outcome::Loss => {
                next.losses += 1;
                next.current_streak = state.current_streak.min(0) - 1;
            }
            Outcome::Draw => {
                next.draws += 1;
                next.current_streak = 0;
            }
        }

        next.recent_results.push(outcome);
        next.rolling_window.push(outcome);
        next.elo_rating = state.elo_rating + game.elo_delta;
        next.momentum =
            state.momentum * (1.0 - self.momentum_alpha) + outcome.value() * self.momentum_alpha;
        next.last_played = Some(game.played_at);

        next
    }
}

/// One game from a single team's side
struct TeamGame {
    points_for: u32,
    points_against: u32,
    is_home: bool,
    elo_delta: f64,
    played_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap()
    }

    fn fresh() -> TeamState {
        TeamState::new(1500.0, 10, 7)
    }

    #[test]
    fn test_home_win_updates_counters() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let (home, away) = updater.update(&fresh(), &fresh(), 100, 90, kickoff());

        assert_eq!(home.games_played, 1);
        assert_eq!(home.wins, 1);
        assert_eq!(home.home_games, 1);
        assert_eq!(home.home_wins, 1);
        assert_eq!(home.points_for_total, 100.0);
        assert_eq!(home.points_against_total, 90.0);
        assert_eq!(home.current_streak, 1);

        assert_eq!(away.games_played, 1);
        assert_eq!(away.losses, 1);
        assert_eq!(away.away_games, 1);
        assert_eq!(away.away_wins, 0);
        assert_eq!(away.current_streak, -1);
        assert_eq!(away.last_played, Some(kickoff()));
    }

    #[test]
    fn test_elo_changes_are_symmetric() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let mut home = fresh();
        home.elo_rating = 1580.0;
        let mut away = fresh();
        away.elo_rating = 1455.0;

        let (new_home, new_away) = updater.update(&home, &away, 17, 24, kickoff());
        let home_change = new_home.elo_rating - home.elo_rating;
        let away_change = new_away.elo_rating - away.elo_rating;

        assert!(home_change < 0.0);
        assert_abs_diff_eq!(home_change, -away_change, epsilon = 1e-9);
    }

    #[test]
    fn test_momentum_ewma() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let (home, away) = updater.update(&fresh(), &fresh(), 3, 1, kickoff());

        // 0.5 * 0.75 + 1 * 0.25
        assert_abs_diff_eq!(home.momentum, 0.625);
        // 0.5 * 0.75 + 0 * 0.25
        assert_abs_diff_eq!(away.momentum, 0.375);
    }

    #[test]
    fn test_streak_flips_sign() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let mut team = fresh();
        team.current_streak = 3;
        let opponent = fresh();

        let (after_loss, _) = updater.update(&team, &opponent, 10, 20, kickoff());
        assert_eq!(after_loss.current_streak, -1);

        let (after_second_loss, _) = updater.update(&after_loss, &opponent, 10, 20, kickoff());
        assert_eq!(after_second_loss.current_streak, -2);

        let (after_win, _) = updater.update(&after_second_loss, &opponent, 30, 20, kickoff());
        assert_eq!(after_win.current_streak, 1);
    }

    #[test]
    fn test_draw_resets_streak_and_counts_half() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let mut home = fresh();
        home.current_streak = 2;

        let (home, away) = updater.update(&home, &fresh(), 1, 1, kickoff());
        assert_eq!(home.draws, 1);
        assert_eq!(home.current_streak, 0);
        assert_eq!(away.draws, 1);
        assert_eq!(home.wins + home.losses + home.draws, home.games_played);
        assert_abs_diff_eq!(home.elo_rating, 1500.0);
        assert_eq!(home.recent_results.mean(), Some(0.5));
    }

    #[test]
    fn test_windows_keep_configured_capacity() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let mut home = fresh();
        let away = fresh();
        for _ in 0..12 {
            home = updater.update(&home, &away, 2, 1, kickoff()).0;
        }
        assert_eq!(home.recent_results.len(), 10);
        assert_eq!(home.rolling_window.len(), 7);
        assert_eq!(home.games_played, 12);
    }

    #[test]
    fn test_update_is_pure() {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let home = fresh();
        let away = fresh();
        let first = updater.update(&home, &away, 21, 14, kickoff());
        let second = updater.update(&home, &away, 21, 14, kickoff());
        assert_eq!(first, second);
        assert_eq!(home, fresh());
    }
}
