//! Proposal module - the heart of the offer workflow
//!
//! Proposal content, lifecycle, tokens, storage and the service tying them
//! together.

pub(crate) mod lifecycle;
mod models;
mod service;
mod store;
mod tokens;

pub use models::*;
pub use service::{CreatedProposal, DashboardQuery, ProposalService, SyncState};
pub use store::{record_key, KeyValueStore, ProposalRepository, INDEX_KEY, RECORD_KEY_PREFIX};
pub use tokens::{generate_edit_token, generate_share_token, is_well_formed, tokens_match};
