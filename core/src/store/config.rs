use super::LedgerStore;
use crate::{config::DiscountParams, error::LedgerResult};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Config singleton ───────────────────────────────────────────

    pub fn has_params(&self) -> LedgerResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM config WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_params(&self) -> LedgerResult<DiscountParams> {
        self.conn
            .query_row(
                "SELECT max_discount_pct, complaint_threshold, decay_period,
                        decay_factor_pct, owner
                 FROM config WHERE id = 1",
                [],
                |row| {
                    Ok(DiscountParams {
                        max_discount_pct:    row.get::<_, i64>(0)? as u64,
                        complaint_threshold: row.get::<_, i64>(1)? as u64,
                        decay_period:        row.get::<_, i64>(2)? as u64,
                        decay_factor_pct:    row.get::<_, i64>(3)? as u64,
                        owner:               row.get(4)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Write the whole singleton. Callers validate before writing.
    pub fn save_params(&self, p: &DiscountParams) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (
                id, max_discount_pct, complaint_threshold, decay_period,
                decay_factor_pct, owner
             ) VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                p.max_discount_pct as i64,
                p.complaint_threshold as i64,
                p.decay_period as i64,
                p.decay_factor_pct as i64,
                &p.owner,
            ],
        )?;
        Ok(())
    }
}
