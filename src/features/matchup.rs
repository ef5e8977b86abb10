//! Matchup feature vectors
//!
//! Turns two pre-game team states plus the game's own schedule context into a
//! fixed-length vector laid out by the versioned schema.

use serde::{Deserialize, Serialize};

use super::elo::EloConfig;
use super::schema::{Feature, FEATURE_DIM};
use super::team_stats::TeamState;
use super::temporal::{rest_days, GameContext};
use crate::GameRecord;

/// Feature construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Games each team needs on record before a vector is emitted
    pub min_history: u32,
    /// Divisor for the Elo rating difference
    pub elo_scale: f64,
    /// Divisor for the streak difference
    pub streak_scale: f64,
    /// Divisor for average point differentials
    pub margin_scale: f64,
    /// Pass difference features through tanh
    pub bounded: bool,
    /// Hour (0-23) from which a start counts as primetime
    pub primetime_hour: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            min_history: 5,
            elo_scale: 400.0,
            streak_scale: 5.0,
            margin_scale: 10.0,
            bounded: false,
            primetime_hour: 19,
        }
    }
}

/// One game's features in schema order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_DIM],
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    pub fn len(&self) -> usize {
        FEATURE_DIM
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }
}

/// Builds feature vectors from pre-game states
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    config: FeatureConfig,
    elo: EloConfig,
}

impl FeatureVectorBuilder {
    pub fn new(config: FeatureConfig, elo: EloConfig) -> Self {
        FeatureVectorBuilder { config, elo }
    }

    /// Both teams have at least `min_history` completed games on record.
    /// Never less than one game, so the per-game averages are defined.
    pub fn is_eligible(&self, home: &TeamState, away: &TeamState) -> bool {
        let min_history = self.config.min_history.max(1);
        home.games_played >= min_history && away.games_played >= min_history
    }

    /// Feature vector for `game`, or `None` when either team is below the history threshold.
    ///
    /// The states must not yet include `game`; only its schedule fields are read.
    pub fn build(
        &self,
        home: &TeamState,
        away: &TeamState,
        game: &GameRecord,
    ) -> Option<FeatureVector> {
        if !self.is_eligible(home, away) {
            return None;
        }

        let ctx = GameContext::from_game(game, self.config.primetime_hour);
        let home_win_rate = home.win_rate();
        let away_win_rate = away.win_rate();

        let mut v = FeatureVector {
            values: [0.0; FEATURE_DIM],
        };

        v.set(Feature::HomeWinRate, home_win_rate);
        v.set(Feature::AwayWinRate, away_win_rate);
        v.set(Feature::WinRateDiff, home_win_rate - away_win_rate);
        v.set(Feature::HomeHomeWinRate, home.home_win_rate());
        v.set(Feature::AwayAwayWinRate, away.away_win_rate());

        v.set(Feature::HomePointsFor, home.avg_points_for());
        v.set(Feature::AwayPointsFor, away.avg_points_for());
        v.set(Feature::HomePointsAgainst, home.avg_points_against());
        v.set(Feature::AwayPointsAgainst, away.avg_points_against());
        v.set(
            Feature::HomePointDiff,
            self.bound(home.avg_margin() / self.config.margin_scale),
        );
        v.set(
            Feature::AwayPointDiff,
            self.bound(away.avg_margin() / self.config.margin_scale),
        );

        v.set(Feature::HomeRecentForm, home.recent_form());
        v.set(Feature::AwayRecentForm, away.recent_form());
        v.set(Feature::HomeRollingForm, home.rolling_form());
        v.set(Feature::AwayRollingForm, away.rolling_form());

        v.set(
            Feature::EloDiff,
            self.bound((home.elo_rating - away.elo_rating) / self.config.elo_scale),
        );
        v.set(
            Feature::EloHomeExpectation,
            self.elo.expected_home(home.elo_rating, away.elo_rating),
        );
        v.set(Feature::Log5, log5(home_win_rate, away_win_rate));
        v.set(Feature::MomentumDiff, self.bound(home.momentum - away.momentum));
        v.set(
            Feature::StreakDiff,
            self.bound(
                (home.current_streak - away.current_streak) as f64 / self.config.streak_scale,
            ),
        );

        v.set(Feature::HomeRestDays, rest_days(home.last_played, game.start_time));
        v.set(Feature::AwayRestDays, rest_days(away.last_played, game.start_time));

        v.set(Feature::HourOfDay, ctx.hour);
        v.set(Feature::DayOfWeek, ctx.weekday);
        v.set(Feature::Month, ctx.month);
        v.set(Feature::IsWeekend, ctx.is_weekend);
        v.set(Feature::IsPrimetime, ctx.is_primetime);

        Some(v)
    }

    fn bound(&self, x: f64) -> f64 {
        if self.config.bounded {
            x.tanh()
        } else {
            x
        }
    }
}

/// Log5 probability that a team with win rate `p_a` beats one with `p_b`
pub fn log5(p_a: f64, p_b: f64) -> f64 {
    let p_a = p_a.clamp(0.01, 0.99);
    let p_b = p_b.clamp(0.01, 0.99);
    let denom = p_a + p_b - 2.0 * p_a * p_b;
    if denom.abs() < 1e-6 {
        0.5
    } else {
        (p_a - p_a * p_b) / denom
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::features::rating::{RatingConfig, RatingUpdater};
    use crate::TeamId;

    fn make_game(day: u32, hour: u32) -> GameRecord {
        GameRecord {
            game_id: format!("g{}", day),
            start_time: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_score: None,
            away_score: None,
        }
    }

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(FeatureConfig::default(), EloConfig::default())
    }

    /// State after `results` as (points_for, points_against, at_home) on consecutive days
    fn played(results: &[(u32, u32, bool)]) -> TeamState {
        let updater = RatingUpdater::new(&RatingConfig::default());
        let opponent = TeamState::new(1500.0, 10, 7);
        let mut state = TeamState::new(1500.0, 10, 7);
        for (day, (pf, pa, at_home)) in results.iter().enumerate() {
            let when = Utc
                .with_ymd_and_hms(2024, 2, 1 + day as u32, 19, 0, 0)
                .unwrap();
            state = if *at_home {
                updater.update(&state, &opponent, *pf, *pa, when).0
            } else {
                updater.update(&opponent, &state, *pa, *pf, when).1
            };
        }
        state
    }

    #[test]
    fn test_ineligible_below_min_history() {
        let four = played(&[(1, 0, true); 4]);
        let five = played(&[(1, 0, true); 5]);

        assert!(builder().build(&four, &five, &make_game(10, 12)).is_none());
        assert!(builder().build(&five, &four, &make_game(10, 12)).is_none());
        assert!(builder().build(&five, &five, &make_game(10, 12)).is_some());
    }

    #[test]
    fn test_zero_min_history_still_needs_one_game() {
        let config = FeatureConfig {
            min_history: 0,
            ..FeatureConfig::default()
        };
        let builder = FeatureVectorBuilder::new(config, EloConfig::default());
        let fresh = TeamState::new(1500.0, 10, 7);
        let one = played(&[(3, 1, true)]);

        assert!(builder.build(&fresh, &one, &make_game(10, 12)).is_none());
        assert!(builder.build(&one, &fresh, &make_game(10, 12)).is_none());

        let v = builder.build(&one, &one, &make_game(10, 12)).unwrap();
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_hand_computed_aggregates() {
        let home = played(&[
            (30, 10, true),
            (20, 25, false),
            (14, 14, true),
            (28, 21, true),
            (10, 17, false),
        ]);
        let away = played(&[(7, 3, false); 5]);

        let v = builder().build(&home, &away, &make_game(10, 20)).unwrap();

        // 2 wins, 2 losses, 1 draw
        assert_abs_diff_eq!(v.get(Feature::HomeWinRate), 0.4);
        assert_abs_diff_eq!(v.get(Feature::AwayWinRate), 1.0);
        assert_abs_diff_eq!(v.get(Feature::WinRateDiff), -0.6);
        // 2 of 3 home games won
        assert_abs_diff_eq!(v.get(Feature::HomeHomeWinRate), 2.0 / 3.0);
        assert_abs_diff_eq!(v.get(Feature::AwayAwayWinRate), 1.0);
        assert_abs_diff_eq!(v.get(Feature::HomePointsFor), 102.0 / 5.0);
        assert_abs_diff_eq!(v.get(Feature::HomePointsAgainst), 87.0 / 5.0);
        assert_abs_diff_eq!(v.get(Feature::HomePointDiff), 3.0 / 10.0);
        assert_abs_diff_eq!(v.get(Feature::AwayPointDiff), 4.0 / 10.0);
        // W L D W L
        assert_abs_diff_eq!(v.get(Feature::HomeRecentForm), 2.5 / 5.0);
        assert_abs_diff_eq!(v.get(Feature::AwayRollingForm), 1.0);
        assert_abs_diff_eq!(
            v.get(Feature::StreakDiff),
            (-1.0 - 5.0) / 5.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            v.get(Feature::EloDiff),
            (home.elo_rating - away.elo_rating) / 400.0
        );
        assert_abs_diff_eq!(v.get(Feature::MomentumDiff), home.momentum - away.momentum);
        // Last game on Feb 5, this one on Mar 10
        assert_eq!(v.get(Feature::HomeRestDays), 1.0);
        assert_eq!(v.get(Feature::IsPrimetime), 1.0);
        // 2024-03-10 was a Sunday
        assert_eq!(v.get(Feature::IsWeekend), 1.0);
        assert_eq!(v.len(), FEATURE_DIM);
    }

    #[test]
    fn test_bounded_differences() {
        let strong = {
            let mut s = played(&[(50, 0, true); 6]);
            s.elo_rating = 2300.0;
            s
        };
        let weak = played(&[(0, 50, false); 6]);

        let config = FeatureConfig {
            bounded: true,
            ..FeatureConfig::default()
        };
        let bounded = FeatureVectorBuilder::new(config, EloConfig::default());
        let v = bounded.build(&strong, &weak, &make_game(10, 12)).unwrap();
        let raw = builder().build(&strong, &weak, &make_game(10, 12)).unwrap();

        for feature in [
            Feature::EloDiff,
            Feature::StreakDiff,
            Feature::MomentumDiff,
            Feature::HomePointDiff,
            Feature::AwayPointDiff,
        ] {
            assert!(v.get(feature).abs() < 1.0, "{:?}", feature);
            assert_abs_diff_eq!(v.get(feature), raw.get(feature).tanh());
        }
        assert!(raw.get(Feature::EloDiff) > 1.0);
        // Rates are untouched
        assert_eq!(v.get(Feature::HomeWinRate), raw.get(Feature::HomeWinRate));
    }

    #[test]
    fn test_same_inputs_same_vector() {
        let home = played(&[(3, 1, true); 5]);
        let away = played(&[(1, 3, false); 5]);
        let game = make_game(12, 15);
        assert_eq!(
            builder().build(&home, &away, &game),
            builder().build(&home, &away, &game)
        );
    }

    #[test]
    fn test_log5() {
        assert_abs_diff_eq!(log5(0.5, 0.5), 0.5);
        assert!(log5(0.8, 0.5) > 0.5);
        assert!(log5(0.8, 0.5) < 1.0);
        // Perfect records are clamped rather than dividing by zero
        let p = log5(1.0, 1.0);
        assert!(p.is_finite());
        assert_abs_diff_eq!(p, 0.5);
    }
}
