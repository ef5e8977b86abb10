//! Matchup feature pipeline CLI
//!
//! Imports game results, replays them in time order and writes a labelled
//! feature dataset plus a team-state checkpoint for scoring fixtures.

use clap::{Parser, Subcommand};
use matchup::{Config, Result};

#[derive(Parser)]
#[command(name = "matchup")]
#[command(about = "Chronological team-form features for game outcome models", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Replay stored games and write the feature dataset and checkpoint
    Build {
        /// Only use games for this sport
        #[arg(long)]
        sport: Option<String>,
        /// Read games from this CSV file instead of the database
        #[arg(long)]
        csv: Option<String>,
        /// Continue from the saved checkpoint
        #[arg(long)]
        resume: bool,
    },
    /// Show a team's state from the checkpoint
    Team {
        /// Team id
        id: i64,
    },
    /// Print features for an unplayed fixture
    Fixture {
        /// Home team id
        home: i64,
        /// Away team id
        away: i64,
        /// Scheduled start (RFC 3339)
        #[arg(long)]
        at: String,
    },
    /// Print the feature schema
    Schema,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import games from a CSV file
    Import {
        /// CSV path (game_id,sport,start_time,home_team_id,away_team_id,home_score,away_score)
        file: String,
    },
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Import { file } => commands::data_import(&config, &file),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Build { sport, csv, resume } => {
            commands::build(&config, sport.as_deref(), csv.as_deref(), resume)
        }
        Commands::Team { id } => commands::team(&config, id),
        Commands::Fixture { home, away, at } => commands::fixture(&config, home, away, &at),
        Commands::Schema => commands::schema(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use std::collections::BTreeMap;
    use std::path::Path;

    use chrono::{DateTime, Utc};

    use super::*;
    use matchup::data::{load_games, CsvSource, Database, FeatureDataset, GameSource};
    use matchup::features::{Feature, SCHEMA_VERSION};
    use matchup::pipeline::{Checkpoint, Pipeline};
    use matchup::{GameRecord, MatchupError, TeamId};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'matchup data import games.csv' to load results");
        println!("  3. Run 'matchup build' to write the feature dataset");
        println!("  4. Run 'matchup fixture <HOME> <AWAY> --at <TIME>' to score a fixture");

        Ok(())
    }

    pub fn data_import(config: &Config, file: &str) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;

        let mut by_sport: BTreeMap<String, Vec<GameRecord>> = BTreeMap::new();
        for imported in load_games(file)? {
            by_sport.entry(imported.sport).or_default().push(imported.game);
        }

        if by_sport.is_empty() {
            println!("No games found in {}", file);
            return Ok(());
        }

        for (sport, games) in &by_sport {
            let count = db.upsert_games(sport, games)?;
            println!("Stored {} {} games", count, sport);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:      {}", config.data.database_path);
        println!("  Teams:     {}", stats.team_count);
        println!("  Games:     {}", stats.game_count);
        println!("  Completed: {}", stats.completed_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:     {} to {}", earliest, latest);
        }
        for (sport, count) in &stats.sports {
            println!("    {:<10} {}", sport, count);
        }

        Ok(())
    }

    pub fn build(config: &Config, sport: Option<&str>, csv: Option<&str>, resume: bool) -> Result<()> {
        let mut pipeline = if resume {
            let checkpoint = Checkpoint::load(&config.data.checkpoint_path)?;
            Pipeline::from_checkpoint(config, checkpoint)?
        } else {
            Pipeline::new(config)?
        };

        let db;
        let source: Box<dyn GameSource + '_> = match csv {
            Some(file) => {
                let source = CsvSource::new(file);
                Box::new(match sport {
                    Some(sport) => source.with_sport(sport),
                    None => source,
                })
            }
            None => {
                db = Database::open(&config.data.database_path)?;
                Box::new(db.source(sport))
            }
        };
        let games = source.games_after(pipeline.last_start_time())?;

        if games.is_empty() {
            println!("No new games to process.");
            return Ok(());
        }
        println!("Processing {} games...", games.len());

        let samples = pipeline.run(games)?;
        let summary = pipeline.finish();
        let dataset = FeatureDataset::new(samples);

        if resume {
            dataset.append_csv(&config.data.dataset_path)?;
        } else {
            dataset.write_csv(&config.data.dataset_path)?;
        }
        pipeline
            .checkpoint()
            .save(&config.data.checkpoint_path)?;

        println!("\nBuild complete!");
        println!("  Games processed: {}", summary.processed());
        println!("  Samples:         {}", summary.emitted);
        println!("  Warmup:          {}", summary.warmup);
        println!("  Unplayed:        {}", summary.incomplete);
        println!("  Ties dropped:    {}", summary.ties_dropped);
        println!("  Teams:           {}", pipeline.store().len());

        let counts = dataset.label_counts();
        println!(
            "  Labels:          {} home / {} away / {} draw",
            counts.home_wins, counts.away_wins, counts.draws
        );

        // A scaler only makes sense over the full history, not an appended tail
        if !resume && !dataset.is_empty() {
            let split = dataset.split_chronological(0.7, 0.15)?;
            println!(
                "  Split:           {} train / {} validation / {} test",
                split.train.len(),
                split.validation.len(),
                split.test.len()
            );
            if !split.train.is_empty() {
                let scaler = split.fit_scaler()?;
                let dataset_path = Path::new(&config.data.dataset_path);
                for path in split.write_scaled_csv(dataset_path, &scaler)? {
                    println!("  Scaled:          {}", path.display());
                }
                let scaler_path = dataset_path.with_extension("scaler.json");
                std::fs::write(&scaler_path, serde_json::to_string_pretty(&scaler)?)?;
                println!("  Scaler:          {}", scaler_path.display());
            }
        }

        Ok(())
    }

    pub fn team(config: &Config, id: i64) -> Result<()> {
        let store = load_store(config)?;
        let team = TeamId(id);
        let state = store.get(team)?;

        println!("Team {}", team);
        println!("───────────────────────────────");
        println!(
            "  Record:      {}-{}-{} ({} games)",
            state.wins, state.losses, state.draws, state.games_played
        );
        println!("  Win rate:    {:.3}", state.win_rate());
        println!(
            "  Home / away: {:.3} / {:.3}",
            state.home_win_rate(),
            state.away_win_rate()
        );
        println!(
            "  Points:      {:.1} for / {:.1} against",
            state.avg_points_for(),
            state.avg_points_against()
        );
        println!("  Recent form: {:.3}", state.recent_form());
        println!("  Rolling:     {:.3}", state.rolling_form());
        println!("  ELO:         {:.1}", state.elo_rating);
        println!("  Momentum:    {:.3}", state.momentum);
        println!("  Streak:      {:+}", state.current_streak);
        if let Some(last) = state.last_played {
            println!("  Last played: {}", last.to_rfc3339());
        }

        Ok(())
    }

    pub fn fixture(config: &Config, home: i64, away: i64, at: &str) -> Result<()> {
        let start_time = DateTime::parse_from_rfc3339(at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| MatchupError::Parse(format!("bad start time {:?}: {}", at, e)))?;

        let checkpoint = Checkpoint::load(&config.data.checkpoint_path)?;
        let pipeline = Pipeline::from_checkpoint(config, checkpoint)?;

        let fixture = GameRecord {
            game_id: format!("fixture-{}-{}", home, away),
            start_time,
            home_team: TeamId(home),
            away_team: TeamId(away),
            home_score: None,
            away_score: None,
        };

        match pipeline.fixture_features(&fixture) {
            Some(features) => {
                println!("Features for {} vs {} at {}", home, away, start_time.to_rfc3339());
                for feature in Feature::ALL {
                    println!("  {:<24} {:>10.4}", feature.name(), features.get(feature));
                }
            }
            None => {
                println!(
                    "Not enough history: both teams need {} completed games.",
                    config.features.min_history
                );
            }
        }

        Ok(())
    }

    pub fn schema() -> Result<()> {
        println!("Feature schema v{}", SCHEMA_VERSION);
        for feature in Feature::ALL {
            println!("  {:>2}  {}", feature.index(), feature.name());
        }
        Ok(())
    }

    fn load_store(config: &Config) -> Result<matchup::features::TeamStateStore> {
        let path = &config.data.checkpoint_path;
        if !Path::new(path).exists() {
            return Err(MatchupError::Checkpoint(format!(
                "no checkpoint at {}. Run 'matchup build' first.",
                path
            )));
        }
        Checkpoint::load(path)?.into_store(&config.rating)
    }
}
