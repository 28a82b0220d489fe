use super::LedgerStore;
use crate::{
    error::LedgerResult,
    profile_registry::ProfileRecord,
    types::{Principal, ProfileId},
};
use rusqlite::{params, OptionalExtension};

fn profile_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRecord> {
    Ok(ProfileRecord {
        profile_id:    row.get::<_, i64>(0)? as u64,
        owner:         row.get(1)?,
        join_height:   row.get::<_, i64>(2)? as u64,
        loyalty_level: row.get::<_, i64>(3)? as u64,
    })
}

impl LedgerStore {
    // ── Profile ────────────────────────────────────────────────────

    pub fn insert_profile(&self, p: &ProfileRecord) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO profile (profile_id, owner, join_height, loyalty_level)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                p.profile_id as i64,
                &p.owner,
                p.join_height as i64,
                p.loyalty_level as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, profile_id: ProfileId) -> LedgerResult<Option<ProfileRecord>> {
        self.conn
            .query_row(
                "SELECT profile_id, owner, join_height, loyalty_level
                 FROM profile WHERE profile_id = ?1",
                params![profile_id as i64],
                profile_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_profile_owner(&self, profile_id: ProfileId, owner: &Principal) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE profile SET owner = ?1 WHERE profile_id = ?2",
            params![owner, profile_id as i64],
        )?;
        Ok(())
    }

    pub fn set_loyalty_level(&self, profile_id: ProfileId, level: u64) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE profile SET loyalty_level = ?1 WHERE profile_id = ?2",
            params![level as i64, profile_id as i64],
        )?;
        Ok(())
    }

    /// Every `(profile_id, owner)` pair, in id order.
    pub fn profile_owners(&self) -> LedgerResult<Vec<(ProfileId, Principal)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT profile_id, owner FROM profile ORDER BY profile_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as u64, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn profile_count(&self) -> LedgerResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))?;
        Ok(count)
    }
}
