use chrono::Utc;
use rusqlite::{params, Connection};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::predictor::models::{PredictionResult, UnknownLabel};

pub mod models;
use models::*;

/// Persistence failures. Absorbed on save, surfaced on reads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

/// Persistence contract the prediction engine depends on.
pub trait PredictionStore: Send + Sync {
    /// Persist a result, assigning its identifier and creation timestamp.
    fn save(&self, result: &PredictionResult) -> Result<PredictionRecord, StoreError>;

    fn find_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, StoreError>;

    /// Exact-match tournament lookup, newest first.
    fn find_by_tournament(&self, tournament: &str) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Predictions where `player` is either competitor, newest first.
    fn find_by_player(&self, player: &str) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Zero-based page, newest first.
    fn list_paged(&self, page: u32, size: u32) -> Result<Page<PredictionRecord>, StoreError>;

    fn count(&self) -> Result<i64, StoreError>;
}

/// Player directory persistence.
pub trait PlayerStore: Send + Sync {
    /// Insert a player, returning it with its assigned id.
    fn insert_player(&self, player: &Player) -> Result<Player, StoreError>;

    fn find_player(&self, id: i64) -> Result<Option<Player>, StoreError>;

    /// Case-insensitive substring match on the name.
    fn search_players(&self, query: &str) -> Result<Vec<Player>, StoreError>;

    /// Best-ranked first; unranked players sort last.
    fn top_players(&self, limit: u32) -> Result<Vec<Player>, StoreError>;

    fn player_count(&self) -> Result<i64, StoreError>;
}

/// Thread-safe SQLite store (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn query_players(
        &self,
        filter: &str,
        tail: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<Player>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM players {} ORDER BY rank IS NULL, rank ASC, id ASC {}",
            PLAYER_COLUMNS, filter, tail
        );
        let mut stmt = conn.prepare(&sql)?;
        let players = stmt
            .query_map(args, map_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    /// Select records newest first. `filter` goes before the ORDER BY,
    /// `tail` (e.g. LIMIT/OFFSET) after it.
    fn query_records(
        &self,
        filter: &str,
        tail: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<PredictionRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM predictions {} ORDER BY created_at DESC, id DESC {}",
            RECORD_COLUMNS, filter, tail
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(args, map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl PredictionStore for Database {
    fn save(&self, result: &PredictionResult) -> Result<PredictionRecord, StoreError> {
        let mut record = PredictionRecord::from_result(result, Utc::now());
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO predictions (
                player1_name, player2_name, player1_win_prob, player2_win_prob,
                predicted_winner, confidence, confidence_level, recommendation,
                key_factors, tournament, surface, source,
                actual_winner, correct, created_at, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            params![
                record.player1_name,
                record.player2_name,
                record.player1_win_prob,
                record.player2_win_prob,
                record.predicted_winner,
                record.confidence,
                record.confidence_level.as_str(),
                record.recommendation.as_str(),
                record.key_factors,
                record.tournament,
                record.surface.as_str(),
                record.source.as_str(),
                record.actual_winner,
                record.correct,
                record.created_at,
                record.updated_at,
            ],
        )?;
        record.id = Some(conn.last_insert_rowid());
        Ok(record)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<PredictionRecord>, StoreError> {
        let mut records = self.query_records("WHERE id = ?1", "", params![id])?;
        Ok(records.pop())
    }

    fn find_by_tournament(&self, tournament: &str) -> Result<Vec<PredictionRecord>, StoreError> {
        self.query_records("WHERE tournament = ?1", "", params![tournament])
    }

    fn find_by_player(&self, player: &str) -> Result<Vec<PredictionRecord>, StoreError> {
        self.query_records(
            "WHERE player1_name = ?1 OR player2_name = ?1",
            "",
            params![player],
        )
    }

    fn list_paged(&self, page: u32, size: u32) -> Result<Page<PredictionRecord>, StoreError> {
        let limit = i64::from(size);
        let total = self.count()?;
        // An offset beyond i64 lies past any row SQLite can hold.
        let items = match i64::from(page).checked_mul(limit) {
            Some(offset) => self.query_records("", "LIMIT ?1 OFFSET ?2", params![limit, offset])?,
            None => Vec::new(),
        };
        Ok(Page::new(items, page, size, total))
    }

    fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let total = conn.query_row("SELECT COUNT(*) FROM predictions", [], |r| r.get(0))?;
        Ok(total)
    }
}

impl PlayerStore for Database {
    fn insert_player(&self, player: &Player) -> Result<Player, StoreError> {
        let now = Utc::now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO players (
                name, country, rank, points, career_matches, career_wins,
                career_titles, surface_preferences, created_at, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                player.name,
                player.country,
                player.rank,
                player.points,
                player.career_matches,
                player.career_wins,
                player.career_titles,
                player.surface_preferences,
                now,
                now,
            ],
        )?;
        Ok(Player {
            id: Some(conn.last_insert_rowid()),
            ..player.clone()
        })
    }

    fn find_player(&self, id: i64) -> Result<Option<Player>, StoreError> {
        let mut players = self.query_players("WHERE id = ?1", "", params![id])?;
        Ok(players.pop())
    }

    fn search_players(&self, query: &str) -> Result<Vec<Player>, StoreError> {
        // instr() rather than LIKE so '%' and '_' in the query match literally
        self.query_players(
            "WHERE instr(lower(name), lower(?1)) > 0",
            "",
            params![query],
        )
    }

    fn top_players(&self, limit: u32) -> Result<Vec<Player>, StoreError> {
        self.query_players("", "LIMIT ?1", params![i64::from(limit)])
    }

    fn player_count(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let total = conn.query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))?;
        Ok(total)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const RECORD_COLUMNS: &str = "id, player1_name, player2_name, player1_win_prob, player2_win_prob,
    predicted_winner, confidence, confidence_level, recommendation,
    key_factors, tournament, surface, source,
    actual_winner, correct, created_at, updated_at";

fn map_record(row: &rusqlite::Row) -> rusqlite::Result<PredictionRecord> {
    Ok(PredictionRecord {
        id: row.get(0)?,
        player1_name: row.get(1)?,
        player2_name: row.get(2)?,
        player1_win_prob: row.get(3)?,
        player2_win_prob: row.get(4)?,
        predicted_winner: row.get(5)?,
        confidence: row.get(6)?,
        confidence_level: label(row, 7)?,
        recommendation: label(row, 8)?,
        key_factors: row.get(9)?,
        tournament: row.get(10)?,
        surface: label(row, 11)?,
        source: label(row, 12)?,
        actual_winner: row.get(13)?,
        correct: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

const PLAYER_COLUMNS: &str = "id, name, country, rank, points, career_matches, career_wins,
    career_titles, surface_preferences";

fn map_player(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        rank: row.get(3)?,
        points: row.get(4)?,
        career_matches: row.get(5)?,
        career_wins: row.get(6)?,
        career_titles: row.get(7)?,
        surface_preferences: row.get(8)?,
    })
}

/// Read a TEXT column holding one of our label enums.
fn label<T: FromStr<Err = UnknownLabel>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: UnknownLabel| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    player1_name      TEXT    NOT NULL,
    player2_name      TEXT    NOT NULL,
    player1_win_prob  REAL    NOT NULL,
    player2_win_prob  REAL    NOT NULL,
    predicted_winner  TEXT    NOT NULL,
    confidence        REAL    NOT NULL,
    confidence_level  TEXT    NOT NULL,
    recommendation    TEXT    NOT NULL,
    key_factors       TEXT,
    tournament        TEXT    NOT NULL,
    surface           TEXT    NOT NULL,
    source            TEXT    NOT NULL,
    actual_winner     TEXT,
    correct           INTEGER,
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_predictions_tournament ON predictions(tournament);
CREATE INDEX IF NOT EXISTS idx_predictions_player1 ON predictions(player1_name);
CREATE INDEX IF NOT EXISTS idx_predictions_player2 ON predictions(player2_name);

CREATE TABLE IF NOT EXISTS players (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT    NOT NULL,
    country             TEXT,
    rank                INTEGER,
    points              INTEGER,
    career_matches      INTEGER,
    career_wins         INTEGER,
    career_titles       INTEGER,
    surface_preferences TEXT,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_players_rank ON players(rank);
"#;
