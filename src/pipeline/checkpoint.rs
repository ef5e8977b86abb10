//! Team store snapshots
//!
//! One record per team, every state field included, tagged with a schema version
//! and the rating settings the states were built under. Snapshots are only taken
//! between games.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::{RatingConfig, TeamState, TeamStateStore};
use crate::{MatchupError, Result, TeamId};

pub const CHECKPOINT_VERSION: u32 = 1;

/// One team's saved state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: TeamId,
    #[serde(flatten)]
    pub state: TeamState,
}

/// Whole-store snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: u32,
    /// Start time of the last game applied to the store
    pub last_start_time: Option<DateTime<Utc>>,
    /// Settings every saved state was produced with
    pub rating: RatingConfig,
    pub teams: Vec<TeamRecord>,
}

impl Checkpoint {
    pub fn capture(
        store: &TeamStateStore,
        rating: &RatingConfig,
        last_start_time: Option<DateTime<Utc>>,
    ) -> Self {
        Checkpoint {
            schema_version: CHECKPOINT_VERSION,
            last_start_time,
            rating: rating.clone(),
            teams: store
                .iter_sorted()
                .into_iter()
                .map(|(team_id, state)| TeamRecord {
                    team_id,
                    state: state.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Write via a temporary file so a crash never leaves a torn snapshot
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        log::info!(
            "Saved checkpoint with {} teams to {}",
            self.teams.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Rebuild the store, refusing snapshots taken under different rating settings.
    /// Continuing with other settings would give states no single pass produces.
    pub fn into_store(self, config: &RatingConfig) -> Result<TeamStateStore> {
        if self.rating != *config {
            return Err(MatchupError::Checkpoint(format!(
                "rating settings {:?} do not match configured {:?}",
                self.rating, config
            )));
        }

        Ok(TeamStateStore::from_states(
            self.rating.initial_rating,
            self.rating.recent_window,
            self.rating.rolling_window,
            self.teams.into_iter().map(|r| (r.team_id, r.state)),
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.schema_version != CHECKPOINT_VERSION {
            return Err(MatchupError::Checkpoint(format!(
                "unsupported checkpoint version {} (expected {})",
                self.schema_version, CHECKPOINT_VERSION
            )));
        }
        for record in &self.teams {
            let s = &record.state;
            if s.wins + s.losses + s.draws != s.games_played {
                return Err(MatchupError::Checkpoint(format!(
                    "{}: {} wins + {} losses + {} draws != {} games",
                    record.team_id, s.wins, s.losses, s.draws, s.games_played
                )));
            }
            if s.recent_results.capacity() != self.rating.recent_window
                || s.rolling_window.capacity() != self.rating.rolling_window
            {
                return Err(MatchupError::Checkpoint(format!(
                    "{}: window capacity differs from snapshot header",
                    record.team_id
                )));
            }
            for window in [&s.recent_results, &s.rolling_window] {
                if window.len() > window.capacity() {
                    return Err(MatchupError::Checkpoint(format!(
                        "{}: window holds {} results but capacity is {}",
                        record.team_id,
                        window.len(),
                        window.capacity()
                    )));
                }
            }
        }
        Ok(())
    }
}
