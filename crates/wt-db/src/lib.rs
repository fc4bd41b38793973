//! Storage layer for the work timer.
//!
//! Provides the session ledger (entries and settings) using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Separate processes (or separate `Database` values) may open the same file;
//! the start guard runs in an `IMMEDIATE` transaction so two writers cannot both
//! open a session.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). This format ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Single Active Session
//!
//! At most one row in `entries` may have a NULL `end_time`. New sessions are
//! only written after an in-transaction check finds none. Reads still pick the
//! most recent open row so a file with stray open rows stays usable.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use thiserror::Error;
use wt_core::{Entry, Ledger, LedgerError, StartedEntry, SwitchedEntry, seconds_between};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for entry {entry_id}: {timestamp}")]
    TimestampParse {
        entry_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        Self::unavailable(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

#[derive(Debug)]
struct EntryRow {
    id: i64,
    prefix: String,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: Option<f64>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prefix: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            duration_seconds: row.get(4)?,
        })
    }

    fn into_entry(self) -> Result<Entry, DbError> {
        let start_time = parse_timestamp(&self.start_time, self.id)?;
        let end_time = self
            .end_time
            .as_deref()
            .map(|ts| parse_timestamp(ts, self.id))
            .transpose()?;
        Ok(Entry {
            id: self.id,
            prefix: self.prefix,
            start_time,
            end_time,
            duration_seconds: self.duration_seconds,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, prefix, start_time, end_time, duration_seconds";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Entries table: one row per work session
            -- start_time/end_time: ISO 8601 UTC (e.g., '2024-01-15T10:30:00.000Z')
            -- end_time IS NULL marks the active session
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prefix TEXT NOT NULL CHECK (length(prefix) > 0),
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds REAL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_start ON entries(start_time);
            CREATE INDEX IF NOT EXISTS idx_entries_open
                ON entries(start_time) WHERE end_time IS NULL;

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the active entry, preferring the latest start if several exist.
    pub fn get_active_entry(&self) -> Result<Option<Entry>, DbError> {
        query_active(&self.conn)
    }

    /// Opens a session for `prefix` at `now` unless one is already active.
    pub fn start_entry_at(
        &mut self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<StartedEntry, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let started = insert_unless_active(&tx, prefix, now)?;
        tx.commit()?;
        Ok(started)
    }

    /// Closes entry `id` at `now`.
    ///
    /// Returns `None` when the entry is unknown or already closed. An end
    /// time earlier than the start is clamped so durations are never negative.
    pub fn stop_entry_at(&mut self, id: i64, now: DateTime<Utc>) -> Result<Option<Entry>, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stopped = close_entry(&tx, id, now)?;
        tx.commit()?;
        Ok(stopped)
    }

    /// Closes `active_id` and opens a session for `prefix`, both at `now`,
    /// in one transaction. Nothing is written if either step fails.
    ///
    /// If another session is still active after the close, it is returned as
    /// [`StartedEntry::Existing`] and no row is inserted.
    pub fn switch_entry_at(
        &mut self,
        active_id: i64,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<SwitchedEntry, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stopped = close_entry(&tx, active_id, now)?;
        let started = insert_unless_active(&tx, prefix, now)?;
        tx.commit()?;
        Ok(SwitchedEntry { stopped, started })
    }

    /// Lists completed entries, most recent start first.
    pub fn list_completed_entries(&self) -> Result<Vec<Entry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE end_time IS NOT NULL
            ORDER BY start_time DESC, id DESC
            "
        ))?;
        let rows = stmt.query_map([], EntryRow::from_row)?;
        collect_entries(rows)
    }

    /// Lists completed entries started within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_completed_entries_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Entry>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE start_time >= ? AND start_time < ? AND end_time IS NOT NULL
            ORDER BY start_time DESC, id DESC
            "
        ))?;
        let rows = stmt.query_map(
            [format_timestamp(start), format_timestamp(end)],
            EntryRow::from_row,
        )?;
        collect_entries(rows)
    }

    /// Sums durations of completed entries started at or after `since`.
    pub fn sum_duration_since(&self, since: DateTime<Utc>) -> Result<f64, DbError> {
        let total: f64 = self.conn.query_row(
            "
            SELECT COALESCE(SUM(duration_seconds), 0.0)
            FROM entries
            WHERE start_time >= ? AND end_time IS NOT NULL
            ",
            [format_timestamp(since)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Stores a setting, replacing any previous value.
    pub fn put_setting(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        Ok(())
    }

    /// Lists all settings ordered by key.
    pub fn list_settings(&self) -> Result<Vec<(String, String)>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }
}

impl Ledger for Database {
    fn active_entry(&self) -> Result<Option<Entry>, LedgerError> {
        Ok(self.get_active_entry()?)
    }

    fn start_entry_at(
        &mut self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<StartedEntry, LedgerError> {
        Ok(Self::start_entry_at(self, prefix, now)?)
    }

    fn stop_entry_at(
        &mut self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Entry>, LedgerError> {
        Ok(Self::stop_entry_at(self, id, now)?)
    }

    fn switch_entry_at(
        &mut self,
        active_id: i64,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<SwitchedEntry, LedgerError> {
        Ok(Self::switch_entry_at(self, active_id, prefix, now)?)
    }

    fn completed_entries(&self) -> Result<Vec<Entry>, LedgerError> {
        Ok(self.list_completed_entries()?)
    }

    fn total_duration_since(&self, since: DateTime<Utc>) -> Result<f64, LedgerError> {
        Ok(self.sum_duration_since(since)?)
    }

    fn completed_entries_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Entry>, LedgerError> {
        Ok(self.list_completed_entries_in_range(start, end)?)
    }

    fn setting(&self, key: &str, default: &str) -> Result<String, LedgerError> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), LedgerError> {
        Ok(self.put_setting(key, value)?)
    }
}

/// Inserts a session for `prefix` unless one is already active.
fn insert_unless_active(
    conn: &Connection,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<StartedEntry, DbError> {
    if let Some(existing) = query_active(conn)? {
        return Ok(StartedEntry::Existing(existing));
    }
    conn.execute(
        "INSERT INTO entries (prefix, start_time) VALUES (?, ?)",
        params![prefix, format_timestamp(now)],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, prefix, "inserted entry");

    Ok(StartedEntry::Created(Entry {
        id,
        prefix: prefix.to_string(),
        start_time: parse_timestamp(&format_timestamp(now), id)?,
        end_time: None,
        duration_seconds: None,
    }))
}

/// Closes entry `id` at `now` if it is still open.
fn close_entry(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<Option<Entry>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ? AND end_time IS NULL"),
            [id],
            EntryRow::from_row,
        )
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut entry = row.into_entry()?;

    // Stored timestamps carry milliseconds; truncate `now` the same way so
    // the duration matches what a reader recomputes from the row.
    let end_time = parse_timestamp(&format_timestamp(now.max(entry.start_time)), id)?;
    let duration = seconds_between(entry.start_time, end_time);
    conn.execute(
        "UPDATE entries SET end_time = ?, duration_seconds = ? WHERE id = ?",
        params![format_timestamp(end_time), duration, id],
    )?;

    entry.end_time = Some(end_time);
    entry.duration_seconds = Some(duration);
    Ok(Some(entry))
}

fn query_active(conn: &Connection) -> Result<Option<Entry>, DbError> {
    let row = conn
        .query_row(
            &format!(
                "
                SELECT {ENTRY_COLUMNS}
                FROM entries
                WHERE end_time IS NULL
                ORDER BY start_time DESC, id DESC
                LIMIT 1
                "
            ),
            [],
            EntryRow::from_row,
        )
        .optional()?;
    row.map(EntryRow::into_entry).transpose()
}

fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<EntryRow>>,
) -> Result<Vec<Entry>, DbError> {
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.into_entry()?);
    }
    Ok(entries)
}

fn parse_timestamp(timestamp: &str, entry_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            entry_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
