//! loyalty-core: a deterministic service-loyalty ledger.
//!
//! Profiles earn loyalty levels, complaints weigh against them and decay
//! over time, and repair tickets are priced with a tiered discount.
//! Resolved repairs pay token rewards and stakeholders vote on proposals.
//! All state lives in SQLite behind [`store::LedgerStore`].

pub mod clock;
pub mod command;
pub mod complaint_registry;
pub mod config;
pub mod discount_engine;
pub mod engine;
pub mod error;
pub mod event;
pub mod external;
pub mod governance;
pub mod profile_registry;
pub mod reward_distributor;
pub mod rng;
pub mod scenario;
pub mod store;
pub mod ticket_ledger;
pub mod types;
pub mod view;
