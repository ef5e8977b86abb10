//! SQLite storage for game schedules and results

use crate::data::GameSource;
use crate::{GameRecord, MatchupError, Result, TeamId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

const SELECT_GAMES: &str = "SELECT game_id, start_time, home_team_id, away_team_id, home_score, away_score FROM games";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                game_id TEXT PRIMARY KEY,
                sport TEXT NOT NULL,
                start_time TEXT NOT NULL,
                home_team_id INTEGER NOT NULL,
                away_team_id INTEGER NOT NULL,
                home_score INTEGER,
                away_score INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_games_start ON games(start_time);
            CREATE INDEX IF NOT EXISTS idx_games_sport ON games(sport, start_time);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Operations ====================

    /// Insert or update a game. A blank score never overwrites a reported one.
    pub fn upsert_game(&self, sport: &str, game: &GameRecord) -> Result<()> {
        upsert(&self.conn, sport, game)
    }

    /// Upsert a batch inside one transaction
    pub fn upsert_games(&mut self, sport: &str, games: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for game in games {
            upsert(&tx, sport, game)?;
        }
        tx.commit()?;
        Ok(games.len())
    }

    /// All games in start-time order, optionally for one sport
    pub fn get_games(&self, sport: Option<&str>) -> Result<Vec<GameRecord>> {
        match sport {
            Some(sport) => self.query(
                &format!("{} WHERE sport = ?1 ORDER BY start_time, rowid", SELECT_GAMES),
                params![sport],
            ),
            None => self.query(&format!("{} ORDER BY start_time, rowid", SELECT_GAMES), []),
        }
    }

    /// Games starting strictly after `after`, in start-time order (for resuming)
    pub fn get_games_after(
        &self,
        after: DateTime<Utc>,
        sport: Option<&str>,
    ) -> Result<Vec<GameRecord>> {
        let after = format_time(after);
        match sport {
            Some(sport) => self.query(
                &format!(
                    "{} WHERE sport = ?1 AND start_time > ?2 ORDER BY start_time, rowid",
                    SELECT_GAMES
                ),
                params![sport, after],
            ),
            None => self.query(
                &format!("{} WHERE start_time > ?1 ORDER BY start_time, rowid", SELECT_GAMES),
                params![after],
            ),
        }
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let games = stmt
            .query_map(params, Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let start_str: String = row.get(1)?;
        let start_time = DateTime::parse_from_rfc3339(&start_str)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(GameRecord {
            game_id: row.get(0)?,
            start_time,
            home_team: TeamId(row.get(2)?),
            away_team: TeamId(row.get(3)?),
            home_score: row.get(4)?,
            away_score: row.get(5)?,
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let (game_count, completed_count): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(home_score IS NOT NULL AND away_score IS NOT NULL), 0) FROM games",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let team_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT home_team_id FROM games UNION SELECT away_team_id FROM games)",
            [],
            |row| row.get(0),
        )?;

        let (min_time, max_time): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(start_time), MAX(start_time) FROM games",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT sport, COUNT(*) FROM games GROUP BY sport ORDER BY sport")?;
        let sports = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(DatabaseStats {
            game_count: game_count as usize,
            completed_count: completed_count as usize,
            team_count: team_count as usize,
            earliest_game: min_time.map(|s| parse_time(&s)).transpose()?,
            latest_game: max_time.map(|s| parse_time(&s)).transpose()?,
            sports,
        })
    }
}

/// Stored games as a pipeline source, optionally limited to one sport
pub struct DatabaseSource<'a> {
    db: &'a Database,
    sport: Option<String>,
}

impl Database {
    pub fn source(&self, sport: Option<&str>) -> DatabaseSource<'_> {
        DatabaseSource {
            db: self,
            sport: sport.map(str::to_string),
        }
    }
}

impl GameSource for DatabaseSource<'_> {
    fn games(&self) -> Result<Vec<GameRecord>> {
        self.db.get_games(self.sport.as_deref())
    }

    fn games_after(&self, after: Option<DateTime<Utc>>) -> Result<Vec<GameRecord>> {
        match after {
            Some(after) => self.db.get_games_after(after, self.sport.as_deref()),
            None => self.games(),
        }
    }
}

fn upsert(conn: &Connection, sport: &str, game: &GameRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO games (game_id, sport, start_time, home_team_id, away_team_id,
                           home_score, away_score)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(game_id) DO UPDATE SET
            sport = excluded.sport,
            start_time = excluded.start_time,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            home_score = COALESCE(excluded.home_score, home_score),
            away_score = COALESCE(excluded.away_score, away_score)
        "#,
        params![
            game.game_id,
            sport,
            format_time(game.start_time),
            game.home_team.0,
            game.away_team.0,
            game.home_score,
            game.away_score,
        ],
    )?;
    Ok(())
}

/// Fixed-width UTC timestamps so text order matches time order
fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MatchupError::Parse(format!("bad timestamp {:?}: {}", s, e)))
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// All stored games, played or not
    pub game_count: usize,
    /// Games with both scores reported
    pub completed_count: usize,
    /// Distinct team ids on either side
    pub team_count: usize,
    /// Earliest and latest start times, `None` when empty
    pub earliest_game: Option<DateTime<Utc>>,
    pub latest_game: Option<DateTime<Utc>>,
    /// (sport, game count)
    pub sports: Vec<(String, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_game(id: &str, day: u32, home: i64, away: i64, score: Option<(u32, u32)>) -> GameRecord {
        GameRecord {
            game_id: id.to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 11, day, 1, 15, 0).unwrap(),
            home_team: TeamId(home),
            away_team: TeamId(away),
            home_score: score.map(|s| s.0),
            away_score: score.map(|s| s.1),
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 0);
        assert_eq!(stats.team_count, 0);
        assert!(stats.earliest_game.is_none());
    }

    #[test]
    fn test_games_come_back_in_time_order() {
        let mut db = Database::in_memory().unwrap();
        let games = vec![
            make_game("late", 20, 1, 2, Some((110, 104))),
            make_game("early", 3, 2, 3, Some((99, 101))),
            make_game("future", 28, 3, 1, None),
        ];
        assert_eq!(db.upsert_games("nba", &games).unwrap(), 3);

        let loaded = db.get_games(None).unwrap();
        let ids: Vec<_> = loaded.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "future"]);
        assert_eq!(loaded[0], games[1]);
        assert_eq!(loaded[2].home_score, None);
    }

    #[test]
    fn test_score_update_keeps_schedule() {
        let db = Database::in_memory().unwrap();
        db.upsert_game("nfl", &make_game("g1", 10, 1, 2, None)).unwrap();
        db.upsert_game("nfl", &make_game("g1", 10, 1, 2, Some((27, 24))))
            .unwrap();
        // A later blank report does not erase the score
        db.upsert_game("nfl", &make_game("g1", 10, 1, 2, None)).unwrap();

        let games = db.get_games(Some("nfl")).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].final_score(), Some((27, 24)));
    }

    #[test]
    fn test_sport_filter_and_resume_query() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_games(
            "nba",
            &[
                make_game("a", 1, 1, 2, Some((1, 0))),
                make_game("b", 5, 1, 2, Some((1, 0))),
            ],
        )
        .unwrap();
        db.upsert_games("nhl", &[make_game("c", 3, 7, 8, Some((2, 1)))])
            .unwrap();

        assert_eq!(db.get_games(Some("nhl")).unwrap().len(), 1);

        let cutoff = Utc.with_ymd_and_hms(2024, 11, 1, 1, 15, 0).unwrap();
        let after = db.get_games_after(cutoff, Some("nba")).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].game_id, "b");
        assert_eq!(db.get_games_after(cutoff, None).unwrap().len(), 2);
    }

    #[test]
    fn test_source_resumes_after_cutoff() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_games(
            "nfl",
            &[
                make_game("w1", 3, 1, 2, Some((20, 17))),
                make_game("w2", 10, 2, 1, Some((14, 21))),
            ],
        )
        .unwrap();
        db.upsert_games("nba", &[make_game("n1", 12, 5, 6, Some((101, 99)))])
            .unwrap();

        let source = db.source(Some("nfl"));
        assert_eq!(source.games().unwrap().len(), 2);

        let cutoff = Utc.with_ymd_and_hms(2024, 11, 3, 1, 15, 0).unwrap();
        let tail = source.games_after(Some(cutoff)).unwrap();
        let ids: Vec<_> = tail.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["w2"]);

        assert_eq!(db.source(None).games_after(None).unwrap().len(), 3);
    }

    #[test]
    fn test_stats() {
        let mut db = Database::in_memory().unwrap();
        db.upsert_games(
            "nba",
            &[
                make_game("a", 1, 1, 2, Some((1, 0))),
                make_game("b", 9, 2, 3, None),
            ],
        )
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.game_count, 2);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.team_count, 3);
        assert_eq!(stats.sports, vec![("nba".to_string(), 2)]);
        assert_eq!(
            stats.latest_game,
            Some(Utc.with_ymd_and_hms(2024, 11, 9, 1, 15, 0).unwrap())
        );
    }
}
