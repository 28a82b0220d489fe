use super::LedgerStore;
use crate::{
    discount_engine::DiscountRecord,
    error::LedgerResult,
    types::{Amount, ProfileId, TicketId},
};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Discount history ───────────────────────────────────────────

    /// Re-application overwrites the previous entry; nothing accumulates.
    pub fn upsert_discount(&self, d: &DiscountRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO discount_history (
                profile_id, ticket_id, applied_discount, timestamp
             ) VALUES (?1, ?2, ?3, ?4)",
            params![
                d.profile_id as i64,
                d.ticket_id as i64,
                d.applied_discount as i64,
                d.timestamp as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_discount(
        &self,
        profile_id: ProfileId,
        ticket_id: TicketId,
    ) -> LedgerResult<Option<DiscountRecord>> {
        self.conn
            .query_row(
                "SELECT profile_id, ticket_id, applied_discount, timestamp
                 FROM discount_history WHERE profile_id = ?1 AND ticket_id = ?2",
                params![profile_id as i64, ticket_id as i64],
                |row| {
                    Ok(DiscountRecord {
                        profile_id:       row.get::<_, i64>(0)? as u64,
                        ticket_id:        row.get::<_, i64>(1)? as u64,
                        applied_discount: row.get::<_, i64>(2)? as u64,
                        timestamp:        row.get::<_, i64>(3)? as u64,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn discount_history_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM discount_history", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Sum of the latest discount recorded per (profile, ticket).
    pub fn total_discount_recorded(&self) -> LedgerResult<Amount> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(applied_discount), 0) FROM discount_history",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}
