//! Versioned feature schema
//!
//! Every feature has a fixed name and position. Reordering, adding, or removing a
//! feature requires bumping `SCHEMA_VERSION` so stored models stay interpretable.

pub const SCHEMA_VERSION: u32 = 1;

/// Number of features in the current schema
pub const FEATURE_DIM: usize = 27;

/// Feature positions in schema v1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Feature {
    HomeWinRate,
    AwayWinRate,
    WinRateDiff,
    HomeHomeWinRate,
    AwayAwayWinRate,
    HomePointsFor,
    AwayPointsFor,
    HomePointsAgainst,
    AwayPointsAgainst,
    HomePointDiff,
    AwayPointDiff,
    HomeRecentForm,
    AwayRecentForm,
    HomeRollingForm,
    AwayRollingForm,
    EloDiff,
    EloHomeExpectation,
    Log5,
    MomentumDiff,
    StreakDiff,
    HomeRestDays,
    AwayRestDays,
    HourOfDay,
    DayOfWeek,
    Month,
    IsWeekend,
    IsPrimetime,
}

impl Feature {
    /// All features in schema order
    pub const ALL: [Feature; FEATURE_DIM] = [
        Feature::HomeWinRate,
        Feature::AwayWinRate,
        Feature::WinRateDiff,
        Feature::HomeHomeWinRate,
        Feature::AwayAwayWinRate,
        Feature::HomePointsFor,
        Feature::AwayPointsFor,
        Feature::HomePointsAgainst,
        Feature::AwayPointsAgainst,
        Feature::HomePointDiff,
        Feature::AwayPointDiff,
        Feature::HomeRecentForm,
        Feature::AwayRecentForm,
        Feature::HomeRollingForm,
        Feature::AwayRollingForm,
        Feature::EloDiff,
        Feature::EloHomeExpectation,
        Feature::Log5,
        Feature::MomentumDiff,
        Feature::StreakDiff,
        Feature::HomeRestDays,
        Feature::AwayRestDays,
        Feature::HourOfDay,
        Feature::DayOfWeek,
        Feature::Month,
        Feature::IsWeekend,
        Feature::IsPrimetime,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used in exports
    pub fn name(self) -> &'static str {
        match self {
            Feature::HomeWinRate => "home_win_rate",
            Feature::AwayWinRate => "away_win_rate",
            Feature::WinRateDiff => "win_rate_diff",
            Feature::HomeHomeWinRate => "home_home_win_rate",
            Feature::AwayAwayWinRate => "away_away_win_rate",
            Feature::HomePointsFor => "home_points_for",
            Feature::AwayPointsFor => "away_points_for",
            Feature::HomePointsAgainst => "home_points_against",
            Feature::AwayPointsAgainst => "away_points_against",
            Feature::HomePointDiff => "home_point_diff",
            Feature::AwayPointDiff => "away_point_diff",
            Feature::HomeRecentForm => "home_recent_form",
            Feature::AwayRecentForm => "away_recent_form",
            Feature::HomeRollingForm => "home_rolling_form",
            Feature::AwayRollingForm => "away_rolling_form",
            Feature::EloDiff => "elo_diff",
            Feature::EloHomeExpectation => "elo_home_expectation",
            Feature::Log5 => "log5",
            Feature::MomentumDiff => "momentum_diff",
            Feature::StreakDiff => "streak_diff",
            Feature::HomeRestDays => "home_rest_days",
            Feature::AwayRestDays => "away_rest_days",
            Feature::HourOfDay => "hour_of_day",
            Feature::DayOfWeek => "day_of_week",
            Feature::Month => "month",
            Feature::IsWeekend => "is_weekend",
            Feature::IsPrimetime => "is_primetime",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Feature names in schema order
pub fn feature_names() -> Vec<&'static str> {
    Feature::ALL.iter().map(|f| f.name()).collect()
}
