use super::LedgerStore;
use crate::{
    error::LedgerResult,
    ticket_ledger::{TicketRecord, TicketStatus},
    types::{Amount, Principal, TicketId},
};
use rusqlite::{params, OptionalExtension};

fn ticket_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketRecord> {
    Ok(TicketRecord {
        ticket_id:   row.get::<_, i64>(0)? as u64,
        owner:       row.get(1)?,
        profile_id:  row.get::<_, i64>(2)? as u64,
        description: row.get(3)?,
        status:      row.get(4)?,
        cost:        row.get::<_, i64>(5)? as u64,
    })
}

impl LedgerStore {
    // ── Ticket ─────────────────────────────────────────────────────

    pub fn insert_ticket(&self, t: &TicketRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO ticket (ticket_id, owner, profile_id, description, status, cost)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                t.ticket_id as i64,
                &t.owner,
                t.profile_id as i64,
                &t.description,
                t.status,
                t.cost as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_ticket(&self, ticket_id: TicketId) -> LedgerResult<Option<TicketRecord>> {
        self.conn
            .query_row(
                "SELECT ticket_id, owner, profile_id, description, status, cost
                 FROM ticket WHERE ticket_id = ?1",
                params![ticket_id as i64],
                ticket_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_ticket_status(&self, ticket_id: TicketId, status: TicketStatus) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE ticket SET status = ?1 WHERE ticket_id = ?2",
            params![status, ticket_id as i64],
        )?;
        Ok(())
    }

    pub fn set_ticket_cost(&self, ticket_id: TicketId, cost: Amount) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE ticket SET cost = ?1 WHERE ticket_id = ?2",
            params![cost as i64, ticket_id as i64],
        )?;
        Ok(())
    }

    pub fn ticket_owners(&self) -> LedgerResult<Vec<(TicketId, Principal)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticket_id, owner FROM ticket ORDER BY ticket_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as u64, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn ticket_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ticket", [], |row| row.get(0))?;
        Ok(count)
    }
}
