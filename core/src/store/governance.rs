use super::LedgerStore;
use crate::{
    error::LedgerResult,
    governance::{ProposalRecord, VoteRecord},
    types::ProposalId,
};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Proposal ───────────────────────────────────────────────────

    pub fn insert_proposal(&self, p: &ProposalRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO proposal (
                proposal_id, proposer, description, yes_votes, no_votes, end_height
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                p.proposal_id as i64,
                &p.proposer,
                &p.description,
                p.yes_votes as i64,
                p.no_votes as i64,
                p.end_height as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> LedgerResult<Option<ProposalRecord>> {
        self.conn
            .query_row(
                "SELECT proposal_id, proposer, description, yes_votes, no_votes, end_height
                 FROM proposal WHERE proposal_id = ?1",
                params![proposal_id as i64],
                |row| {
                    Ok(ProposalRecord {
                        proposal_id: row.get::<_, i64>(0)? as u64,
                        proposer:    row.get(1)?,
                        description: row.get(2)?,
                        yes_votes:   row.get::<_, i64>(3)? as u64,
                        no_votes:    row.get::<_, i64>(4)? as u64,
                        end_height:  row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Bump one side of the tally by a single vote.
    pub fn tally_vote(&self, proposal_id: ProposalId, vote_yes: bool) -> LedgerResult<()> {
        let sql = if vote_yes {
            "UPDATE proposal SET yes_votes = yes_votes + 1 WHERE proposal_id = ?1"
        } else {
            "UPDATE proposal SET no_votes = no_votes + 1 WHERE proposal_id = ?1"
        };
        self.conn.execute(sql, params![proposal_id as i64])?;
        Ok(())
    }

    pub fn proposal_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM proposal", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Vote ───────────────────────────────────────────────────────

    pub fn insert_vote(&self, v: &VoteRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO vote (proposal_id, voter, vote_yes) VALUES (?1, ?2, ?3)",
            params![
                v.proposal_id as i64,
                &v.voter,
                if v.vote_yes { 1i32 } else { 0i32 },
            ],
        )?;
        Ok(())
    }

    pub fn get_vote(&self, proposal_id: ProposalId, voter: &str) -> LedgerResult<Option<VoteRecord>> {
        self.conn
            .query_row(
                "SELECT proposal_id, voter, vote_yes FROM vote
                 WHERE proposal_id = ?1 AND voter = ?2",
                params![proposal_id as i64, voter],
                |row| {
                    Ok(VoteRecord {
                        proposal_id: row.get::<_, i64>(0)? as u64,
                        voter:       row.get(1)?,
                        vote_yes:    row.get::<_, i32>(2)? != 0,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
