//! Ticket ledger: repair-ticket lifecycle and cost.
//!
//! Tickets are never deleted. Status is overwritten by the business;
//! cost only ever goes down, and only through the discount engine.

use crate::{
    error::LedgerResult,
    event::LedgerEvent,
    external::IdentityRegistry,
    store::{require, LedgerStore},
    types::{Amount, Height, Principal, ProfileId, TicketId},
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

pub const TICKET_COUNTER: &str = "ticket";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending    => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved   => "resolved",
            Self::Rejected   => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending"     => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "resolved"    => Some(Self::Resolved),
            "rejected"    => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl ToSql for TicketStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TicketStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketRecord {
    pub ticket_id:   TicketId,
    pub owner:       Principal,
    pub profile_id:  ProfileId,
    pub description: String,
    pub status:      TicketStatus,
    pub cost:        Amount,
}

pub struct TicketLedger<'a> {
    store:      &'a LedgerStore,
    identities: &'a mut dyn IdentityRegistry,
    height:     Height,
}

impl<'a> TicketLedger<'a> {
    pub fn new(
        store: &'a LedgerStore,
        identities: &'a mut dyn IdentityRegistry,
        height: Height,
    ) -> Self {
        Self { store, identities, height }
    }

    /// Open a pending ticket owned by the caller. The profile is not
    /// checked; a ticket on an unknown profile simply earns no discount.
    pub fn create_ticket(
        &mut self,
        caller: &Principal,
        profile_id: ProfileId,
        description: &str,
        cost: Amount,
    ) -> LedgerResult<TicketId> {
        let height = self.height;
        let identities = &mut *self.identities;
        let ticket_id = self.store.atomic(|store| {
            let ticket_id = store.next_id(TICKET_COUNTER)?;
            store.insert_ticket(&TicketRecord {
                ticket_id,
                owner: caller.clone(),
                profile_id,
                description: description.to_string(),
                status: TicketStatus::Pending,
                cost,
            })?;
            store.append_event(
                height,
                &LedgerEvent::TicketCreated {
                    ticket_id,
                    profile_id,
                    owner: caller.clone(),
                    cost,
                },
            )?;
            identities.mint(ticket_id, caller)?;
            Ok(ticket_id)
        })?;
        log::debug!("height={height} ticket: #{ticket_id} opened by {caller} cost={cost}");
        Ok(ticket_id)
    }

    /// Overwrite a ticket's status. Business owner only.
    pub fn resolve_ticket(
        &self,
        caller: &Principal,
        ticket_id: TicketId,
        status: TicketStatus,
    ) -> LedgerResult<()> {
        let height = self.height;
        self.store.atomic(|store| {
            store.get_params()?.ensure_owner(caller, "resolve ticket")?;
            require(store.get_ticket(ticket_id)?, "ticket", ticket_id)?;
            store.set_ticket_status(ticket_id, status)?;
            store.append_event(height, &LedgerEvent::TicketStatusChanged { ticket_id, status })
        })?;
        log::debug!("height={height} ticket: #{ticket_id} -> {}", status.as_str());
        Ok(())
    }

    /// `None` when the ticket does not exist.
    pub fn get_ticket(&self, ticket_id: TicketId) -> LedgerResult<Option<TicketRecord>> {
        self.store.get_ticket(ticket_id)
    }

    pub fn ticket_count(&self) -> LedgerResult<i64> {
        self.store.ticket_count()
    }
}
