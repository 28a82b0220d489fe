use super::LedgerStore;
use crate::{
    complaint_registry::{ComplaintCounters, ComplaintRecord},
    error::LedgerResult,
    types::{ComplaintId, ProfileId},
};
use rusqlite::{params, OptionalExtension};

// Helper function for mapping complaint rows
fn complaint_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComplaintRecord> {
    Ok(ComplaintRecord {
        profile_id:   row.get::<_, i64>(0)? as u64,
        complaint_id: row.get::<_, i64>(1)? as u64,
        timestamp:    row.get::<_, i64>(2)? as u64,
        description:  row.get(3)?,
        resolved:     row.get::<_, i32>(4)? != 0,
    })
}

impl LedgerStore {
    // ── Complaint counters ─────────────────────────────────────────

    pub fn get_complaint_counters(
        &self,
        profile_id: ProfileId,
    ) -> LedgerResult<Option<ComplaintCounters>> {
        self.conn
            .query_row(
                "SELECT total_complaints, unresolved_complaints, last_complaint_height
                 FROM complaint_counter WHERE profile_id = ?1",
                params![profile_id as i64],
                |row| {
                    Ok(ComplaintCounters {
                        total_complaints:      row.get::<_, i64>(0)? as u64,
                        unresolved_complaints: row.get::<_, i64>(1)? as u64,
                        last_complaint_height: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn upsert_complaint_counters(
        &self,
        profile_id: ProfileId,
        c: &ComplaintCounters,
    ) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO complaint_counter (
                profile_id, total_complaints, unresolved_complaints, last_complaint_height
             ) VALUES (?1, ?2, ?3, ?4)",
            params![
                profile_id as i64,
                c.total_complaints as i64,
                c.unresolved_complaints as i64,
                c.last_complaint_height as i64,
            ],
        )?;
        Ok(())
    }

    // ── Complaint ──────────────────────────────────────────────────

    pub fn insert_complaint(&self, c: &ComplaintRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO complaint (profile_id, complaint_id, timestamp, description, resolved)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                c.profile_id as i64,
                c.complaint_id as i64,
                c.timestamp as i64,
                &c.description,
                if c.resolved { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    pub fn get_complaint(
        &self,
        profile_id: ProfileId,
        complaint_id: ComplaintId,
    ) -> LedgerResult<Option<ComplaintRecord>> {
        self.conn
            .query_row(
                "SELECT profile_id, complaint_id, timestamp, description, resolved
                 FROM complaint WHERE profile_id = ?1 AND complaint_id = ?2",
                params![profile_id as i64, complaint_id as i64],
                complaint_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn complaints_for_profile(&self, profile_id: ProfileId) -> LedgerResult<Vec<ComplaintRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT profile_id, complaint_id, timestamp, description, resolved
             FROM complaint WHERE profile_id = ?1
             ORDER BY complaint_id ASC",
        )?;
        let rows = stmt.query_map(params![profile_id as i64], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn mark_complaint_resolved(
        &self,
        profile_id: ProfileId,
        complaint_id: ComplaintId,
    ) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE complaint SET resolved = 1 WHERE profile_id = ?1 AND complaint_id = ?2",
            params![profile_id as i64, complaint_id as i64],
        )?;
        Ok(())
    }
}
