use super::LedgerStore;
use crate::{error::LedgerResult, types::ProfileId};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Repair counts ──────────────────────────────────────────────

    pub fn repair_count(&self, profile_id: ProfileId) -> LedgerResult<u64> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT count FROM repair_count WHERE profile_id = ?1",
                params![profile_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0) as u64)
    }

    pub fn set_repair_count(&self, profile_id: ProfileId, count: u64) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO repair_count (profile_id, count) VALUES (?1, ?2)",
            params![profile_id as i64, count as i64],
        )?;
        Ok(())
    }
}
