//! Chronological feature pipeline
//!
//! Streams games in start-time order. For each completed game the pre-game
//! states of both teams are read (and turned into features when eligible)
//! before the game's result is written back to the store.

pub mod checkpoint;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::{
    FeatureVector, FeatureVectorBuilder, RatingConfig, RatingUpdater, TeamStateStore,
};
use crate::{Config, GameRecord, Label, MatchupError, Outcome, Result, TeamId};

pub use checkpoint::Checkpoint;

/// What to do with games that end level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiePolicy {
    /// Treat as bad data: no features, no state update
    #[default]
    Drop,
    /// Record a draw and emit a three-way label
    Draw,
}

/// Driver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Streaming,
    Done,
}

/// One labelled training example
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub game_id: String,
    pub start_time: DateTime<Utc>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub features: FeatureVector,
    pub label: Label,
}

/// How a single game was handled
#[derive(Debug, Clone, PartialEq)]
pub enum GameDisposition {
    /// Features emitted, then state updated
    Emitted(Sample),
    /// State updated, but a team is below the history threshold
    Warmup,
    /// Missing a score; ignored
    Incomplete,
    /// Tie under the drop policy; ignored
    TieDropped,
    /// Starts before the last processed game; ignored
    OutOfOrder,
    /// Home and away are the same team; ignored
    SelfMatch,
}

impl GameDisposition {
    pub fn into_sample(self) -> Option<Sample> {
        match self {
            GameDisposition::Emitted(sample) => Some(sample),
            _ => None,
        }
    }

    /// True if the game changed team state
    pub fn updated_state(&self) -> bool {
        matches!(self, GameDisposition::Emitted(_) | GameDisposition::Warmup)
    }
}

/// Counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub games_seen: usize,
    pub emitted: usize,
    pub warmup: usize,
    pub incomplete: usize,
    pub ties_dropped: usize,
    pub out_of_order: usize,
    pub self_matches: usize,
}

impl PipelineSummary {
    /// Games applied to team state
    pub fn processed(&self) -> usize {
        self.emitted + self.warmup
    }

    fn record(&mut self, disposition: &GameDisposition) {
        self.games_seen += 1;
        match disposition {
            GameDisposition::Emitted(_) => self.emitted += 1,
            GameDisposition::Warmup => self.warmup += 1,
            GameDisposition::Incomplete => self.incomplete += 1,
            GameDisposition::TieDropped => self.ties_dropped += 1,
            GameDisposition::OutOfOrder => self.out_of_order += 1,
            GameDisposition::SelfMatch => self.self_matches += 1,
        }
    }
}

/// Single-threaded driver that owns the team store for one run
pub struct Pipeline {
    store: TeamStateStore,
    rating: RatingConfig,
    updater: RatingUpdater,
    builder: FeatureVectorBuilder,
    tie_policy: TiePolicy,
    state: PipelineState,
    last_start_time: Option<DateTime<Utc>>,
    summary: PipelineSummary,
}

impl Pipeline {
    /// Fresh run with an empty store. Rejects a config that fails validation.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_store(config, config.rating.new_store(), None))
    }

    /// Resume from a snapshot; games starting before its last game are rejected
    pub fn from_checkpoint(config: &Config, checkpoint: Checkpoint) -> Result<Self> {
        config.validate()?;
        let last_start_time = checkpoint.last_start_time;
        let store = checkpoint.into_store(&config.rating)?;
        log::info!(
            "Resuming from checkpoint: {} teams, last game at {}",
            store.len(),
            last_start_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "(none)".to_string())
        );
        Ok(Self::with_store(config, store, last_start_time))
    }

    fn with_store(
        config: &Config,
        store: TeamStateStore,
        last_start_time: Option<DateTime<Utc>>,
    ) -> Self {
        Pipeline {
            store,
            rating: config.rating.clone(),
            updater: RatingUpdater::new(&config.rating),
            builder: FeatureVectorBuilder::new(config.features.clone(), config.rating.elo()),
            tie_policy: config.pipeline.tie_policy,
            state: PipelineState::Init,
            last_start_time,
            summary: PipelineSummary::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn summary(&self) -> &PipelineSummary {
        &self.summary
    }

    /// Read access to team states; the driver is the only writer
    pub fn store(&self) -> &TeamStateStore {
        &self.store
    }

    pub fn last_start_time(&self) -> Option<DateTime<Utc>> {
        self.last_start_time
    }

    /// Handle one game. Only a broken store invariant is an error.
    pub fn process(&mut self, game: &GameRecord) -> Result<GameDisposition> {
        if self.state == PipelineState::Done {
            return Err(MatchupError::StreamClosed);
        }
        self.state = PipelineState::Streaming;

        let disposition = self.step(game)?;
        self.summary.record(&disposition);
        Ok(disposition)
    }

    fn step(&mut self, game: &GameRecord) -> Result<GameDisposition> {
        let Some((home_score, away_score)) = game.final_score() else {
            log::debug!("Skipping unplayed game {}", game.game_id);
            return Ok(GameDisposition::Incomplete);
        };

        if game.home_team == game.away_team {
            log::warn!(
                "Skipping game {}: {} listed as both home and away",
                game.game_id,
                game.home_team
            );
            return Ok(GameDisposition::SelfMatch);
        }

        if let Some(last) = self.last_start_time {
            if game.start_time < last {
                log::warn!(
                    "Skipping out-of-order game {}: starts {} before last processed game at {}",
                    game.game_id,
                    game.start_time.to_rfc3339(),
                    last.to_rfc3339()
                );
                return Ok(GameDisposition::OutOfOrder);
            }
        }

        let outcome = Outcome::from_scores(home_score, away_score);
        if outcome == Outcome::Draw && self.tie_policy == TiePolicy::Drop {
            log::warn!(
                "Dropping tied game {} ({}-{})",
                game.game_id,
                home_score,
                away_score
            );
            return Ok(GameDisposition::TieDropped);
        }

        self.store.get_or_create(game.home_team);
        self.store.get_or_create(game.away_team);
        let home = self.store.get(game.home_team)?;
        let away = self.store.get(game.away_team)?;

        // Read pre-game state before anything is written back
        let features = self.builder.build(home, away, game);
        let (new_home, new_away) =
            self.updater
                .update(home, away, home_score, away_score, game.start_time);

        self.store
            .apply_game_result(game.home_team, new_home, game.away_team, new_away);
        self.last_start_time = Some(game.start_time);

        Ok(match features {
            Some(features) => GameDisposition::Emitted(Sample {
                game_id: game.game_id.clone(),
                start_time: game.start_time,
                home_team: game.home_team,
                away_team: game.away_team,
                features,
                label: Label::from_home_outcome(outcome),
            }),
            None => GameDisposition::Warmup,
        })
    }

    /// Process an already-ordered stream, collecting emitted samples
    pub fn run<I>(&mut self, games: I) -> Result<Vec<Sample>>
    where
        I: IntoIterator<Item = GameRecord>,
    {
        let mut samples = Vec::new();
        for game in games {
            if let Some(sample) = self.process(&game)?.into_sample() {
                samples.push(sample);
            }
        }
        Ok(samples)
    }

    /// Sort a bounded batch into start-time order, then process it
    pub fn run_unsorted(&mut self, mut games: Vec<GameRecord>) -> Result<Vec<Sample>> {
        crate::sort_chronologically(&mut games);
        self.run(games)
    }

    /// Close the stream. Further `process` calls fail.
    pub fn finish(&mut self) -> PipelineSummary {
        self.state = PipelineState::Done;
        let s = &self.summary;
        log::info!(
            "Pipeline done: {} games seen, {} emitted, {} warmup, {} incomplete, {} ties dropped, {} out of order, {} self-matches, {} teams",
            s.games_seen,
            s.emitted,
            s.warmup,
            s.incomplete,
            s.ties_dropped,
            s.out_of_order,
            s.self_matches,
            self.store.len()
        );
        self.summary
    }

    /// Snapshot between games
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::capture(&self.store, &self.rating, self.last_start_time)
    }

    /// Features for a fixture that has not been played, from current team states.
    ///
    /// `None` when either team is unseen or below the history threshold.
    pub fn fixture_features(&self, fixture: &GameRecord) -> Option<FeatureVector> {
        let home = self.store.get(fixture.home_team).ok()?;
        let away = self.store.get(fixture.away_team).ok()?;
        self.builder.build(home, away, fixture)
    }
}
