//! Feature extraction
//!
//! Team state, rating updates, and matchup feature vectors.

pub mod elo;
pub mod matchup;
pub mod rating;
pub mod schema;
pub mod team_stats;
pub mod temporal;

pub use elo::EloConfig;
pub use matchup::{FeatureConfig, FeatureVector, FeatureVectorBuilder};
pub use rating::{RatingConfig, RatingUpdater};
pub use schema::{Feature, FEATURE_DIM, SCHEMA_VERSION};
pub use team_stats::{ResultWindow, TeamState, TeamStateStore};
pub use temporal::GameContext;
