//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! Components call store methods and never execute SQL directly.

use crate::{
    error::{LedgerError, LedgerResult},
    event::{EventLogEntry, LedgerEvent},
    types::Height,
};
use rusqlite::{params, Connection, OptionalExtension};

mod complaint;
mod config;
mod discount;
mod governance;
mod profile;
mod reward;
mod ticket;

const SAVEPOINT: &str = "ledger_tx";
const HEIGHT_KEY: &str = "current_height";

pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    pub fn open(path: &str) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run on every open.
    pub fn migrate(&self) -> LedgerResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_loyalty.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_governance.sql"))?;
        Ok(())
    }

    // ── Transactions ───────────────────────────────────────────

    /// Run `f` as one atomic transaction: every write it makes commits
    /// together, or none do. Savepoints nest, so an atomic block may call
    /// another.
    pub fn atomic<T>(&self, f: impl FnOnce(&Self) -> LedgerResult<T>) -> LedgerResult<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT};"))?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {SAVEPOINT};"))?;
                Ok(value)
            }
            Err(err) => {
                self.conn.execute_batch(&format!(
                    "ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT};"
                ))?;
                Err(err)
            }
        }
    }

    /// Allocate the next id for `name`. Ids start at 1 and never repeat;
    /// a rolled-back allocation is rolled back with its transaction.
    pub(crate) fn next_id(&self, name: &str) -> LedgerResult<u64> {
        self.conn.execute(
            "INSERT INTO counter (name, value) VALUES (?1, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1",
            params![name],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT value FROM counter WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id as u64)
    }

    /// The last id handed out for `name`, or 0.
    pub fn last_id(&self, name: &str) -> LedgerResult<u64> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM counter WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.unwrap_or(0) as u64)
    }

    // ── Clock ──────────────────────────────────────────────────

    pub fn load_height(&self) -> LedgerResult<Height> {
        let height: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM ledger_meta WHERE key = ?1",
                params![HEIGHT_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(height.unwrap_or(0) as u64)
    }

    pub fn save_height(&self, height: Height) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO ledger_meta (key, value) VALUES (?1, ?2)",
            params![HEIGHT_KEY, height as i64],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, height: Height, event: &LedgerEvent) -> LedgerResult<()> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO event_log (height, component, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![height as i64, event.component(), event.type_name(), payload],
        )?;
        Ok(())
    }

    pub fn events_at_height(&self, height: Height) -> LedgerResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, height, component, event_type, payload
             FROM event_log WHERE height = ?1 ORDER BY id ASC",
            Some(height),
        )
    }

    pub fn all_events(&self) -> LedgerResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, height, component, event_type, payload
             FROM event_log ORDER BY id ASC",
            None,
        )
    }

    pub fn event_count(&self) -> LedgerResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_events(&self, sql: &str, height: Option<Height>) -> LedgerResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match height {
            Some(h) => stmt.query_map(params![h as i64], event_row_mapper)?,
            None => stmt.query_map([], event_row_mapper)?,
        };
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn event_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventLogEntry> {
    Ok(EventLogEntry {
        id:         Some(row.get(0)?),
        height:     row.get::<_, i64>(1)? as u64,
        component:  row.get(2)?,
        event_type: row.get(3)?,
        payload:    row.get(4)?,
    })
}

/// Map "no row" to a domain InvalidId; pass every other error through.
pub(crate) fn require<T>(found: Option<T>, entity: &'static str, id: u64) -> LedgerResult<T> {
    found.ok_or(LedgerError::InvalidId { entity, id })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LedgerStore {
        let store = LedgerStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    #[test]
    fn ids_are_monotonic_per_counter() {
        let store = store();
        assert_eq!(store.last_id("profile").unwrap(), 0);
        assert_eq!(store.next_id("profile").unwrap(), 1);
        assert_eq!(store.next_id("profile").unwrap(), 2);
        assert_eq!(store.next_id("ticket").unwrap(), 1);
        assert_eq!(store.last_id("profile").unwrap(), 2);
    }

    #[test]
    fn failed_atomic_block_rolls_back_everything() {
        let store = store();
        let result: LedgerResult<()> = store.atomic(|s| {
            s.next_id("profile")?;
            s.append_event(1, &LedgerEvent::LoyaltyLevelUpdated { profile_id: 1, level: 2 })?;
            Err(LedgerError::InvalidId { entity: "profile", id: 1 })
        });
        assert!(result.is_err());
        assert_eq!(store.last_id("profile").unwrap(), 0);
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[test]
    fn nested_atomic_blocks_commit_together() {
        let store = store();
        store
            .atomic(|s| {
                s.next_id("profile")?;
                s.atomic(|inner| inner.next_id("profile"))
            })
            .unwrap();
        assert_eq!(store.last_id("profile").unwrap(), 2);
    }

    #[test]
    fn height_round_trips_through_meta() {
        let store = store();
        assert_eq!(store.load_height().unwrap(), 0);
        store.save_height(42).unwrap();
        assert_eq!(store.load_height().unwrap(), 42);
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = store();
        store.migrate().unwrap();
    }
}
