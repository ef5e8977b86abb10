//! Elo rating system for team strength estimation

use serde::{Deserialize, Serialize};

/// Elo rating configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    /// K-factor: how much ratings change per game
    pub k_factor: f64,
    /// Rating points added to the home side when computing expectation
    pub home_advantage: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            k_factor: 20.0,
            home_advantage: 0.0,
        }
    }
}

impl EloConfig {
    /// Expected score (0-1) for the home team
    pub fn expected_home(&self, home_rating: f64, away_rating: f64) -> f64 {
        expected_score(home_rating + self.home_advantage, away_rating)
    }

    /// Rating change for the home team; the away team moves by the negation.
    ///
    /// `home_actual` is 1 for a home win, 0 for an away win, 0.5 for a draw.
    pub fn home_delta(&self, home_rating: f64, away_rating: f64, home_actual: f64) -> f64 {
        self.k_factor * (home_actual - self.expected_home(home_rating, away_rating))
    }
}

/// Standard logistic Elo expectation for `rating` against `opponent`
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((opponent - rating) / 400.0))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_expected_score_equal_teams() {
        assert_abs_diff_eq!(expected_score(1500.0, 1500.0), 0.5);
        let elo = EloConfig::default();
        assert_abs_diff_eq!(elo.expected_home(1500.0, 1500.0), 0.5);
    }

    #[test]
    fn test_expected_score_400_gap() {
        // 400 points = 10:1 odds
        assert_abs_diff_eq!(expected_score(1900.0, 1500.0), 10.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            expected_score(1500.0, 1900.0) + expected_score(1900.0, 1500.0),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_home_advantage_shifts_expectation() {
        let elo = EloConfig {
            k_factor: 20.0,
            home_advantage: 50.0,
        };
        let expected = elo.expected_home(1500.0, 1500.0);
        assert!(expected > 0.5 && expected < 0.6);
    }

    #[test]
    fn test_home_delta() {
        let elo = EloConfig::default();
        assert_abs_diff_eq!(elo.home_delta(1500.0, 1500.0, 1.0), 10.0);
        assert_abs_diff_eq!(elo.home_delta(1500.0, 1500.0, 0.0), -10.0);
        assert_abs_diff_eq!(elo.home_delta(1500.0, 1500.0, 0.5), 0.0);

        // Upset wins move ratings further
        let upset = elo.home_delta(1400.0, 1600.0, 1.0);
        assert!(upset > 10.0);
    }
}
