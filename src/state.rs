//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::proposal::ProposalService;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Proposal workflow over the configured repository and remote
    pub proposals: ProposalService,
}

impl AppState {
    pub fn new(proposals: ProposalService) -> Self {
        Self { proposals }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
