//! Proposal storage
//!
//! [`ProposalRepository`] is the seam between the service and persistence.
//! [`KeyValueStore`] keeps each record as a JSON string under
//! `qop_proposal_{token}` plus a most-recent-first index under `qop_index_v1`.

use crate::error::AppError;
use crate::proposal::{tokens_match, ProposalRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Key prefix of a stored record
pub const RECORD_KEY_PREFIX: &str = "qop_proposal_";

/// Key of the token index
pub const INDEX_KEY: &str = "qop_index_v1";

pub fn record_key(token: &str) -> String {
    format!("{}{}", RECORD_KEY_PREFIX, token)
}

/// Persistence for proposal records, keyed by public token
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// `None` when the token is unknown or the stored entry is unreadable
    async fn get(&self, token: &str) -> Result<Option<ProposalRecord>, AppError>;

    /// Records whose edit token is among `edit_tokens`
    async fn list_by_edit_tokens(&self, edit_tokens: &[String]) -> Result<Vec<ProposalRecord>, AppError>;

    /// Insert or replace
    async fn save(&self, record: &ProposalRecord) -> Result<(), AppError>;

    /// Replace the stored record only if it is still at version `expected`.
    /// Returns `false` when another write got there first or the record is gone.
    async fn save_if_version(&self, record: &ProposalRecord, expected: u64) -> Result<bool, AppError>;

    /// Returns whether a record was removed
    async fn delete(&self, token: &str) -> Result<bool, AppError>;

    fn backend_name(&self) -> &'static str;
}

/// Thread-safe string key-value store holding serialized records
#[derive(Clone, Default)]
pub struct KeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access, mostly for diagnostics
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(key.into(), value.into());
    }

    /// Every readable record, most recently saved first
    async fn records(&self) -> Vec<ProposalRecord> {
        let entries = self.entries.read().await;
        Self::read_index(&entries)
            .iter()
            .filter_map(|token| {
                entries
                    .get(&record_key(token))
                    .and_then(|raw| Self::decode(token, raw))
            })
            .collect()
    }

    fn read_index(entries: &HashMap<String, String>) -> Vec<String> {
        match entries.get(INDEX_KEY) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!("Token index is corrupt, starting over: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    fn write_index(entries: &mut HashMap<String, String>, index: &[String]) -> Result<(), AppError> {
        entries.insert(INDEX_KEY.to_string(), serde_json::to_string(index)?);
        Ok(())
    }

    fn store(entries: &mut HashMap<String, String>, record: &ProposalRecord) -> Result<(), AppError> {
        entries.insert(record_key(&record.token), serde_json::to_string(record)?);

        let mut index = Self::read_index(entries);
        index.retain(|token| token != &record.token);
        index.insert(0, record.token.clone());
        Self::write_index(entries, &index)
    }

    fn decode(token: &str, raw: &str) -> Option<ProposalRecord> {
        match serde_json::from_str(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable proposal {}: {}", token, e);
                None
            }
        }
    }
}

#[async_trait]
impl ProposalRepository for KeyValueStore {
    async fn get(&self, token: &str) -> Result<Option<ProposalRecord>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&record_key(token))
            .and_then(|raw| Self::decode(token, raw)))
    }

    async fn list_by_edit_tokens(&self, edit_tokens: &[String]) -> Result<Vec<ProposalRecord>, AppError> {
        if edit_tokens.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .records()
            .await
            .into_iter()
            .filter(|r| edit_tokens.iter().any(|t| tokens_match(t, &r.edit_token)))
            .collect())
    }

    async fn save(&self, record: &ProposalRecord) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        Self::store(&mut entries, record)?;
        debug!("Saved proposal {} (v{})", record.token, record.version);
        Ok(())
    }

    async fn save_if_version(&self, record: &ProposalRecord, expected: u64) -> Result<bool, AppError> {
        let mut entries = self.entries.write().await;
        let current = entries
            .get(&record_key(&record.token))
            .and_then(|raw| Self::decode(&record.token, raw))
            .map(|stored| stored.version);
        if current != Some(expected) {
            debug!(
                "Proposal {} moved on (stored v{:?}, expected v{})",
                record.token, current, expected
            );
            return Ok(false);
        }

        Self::store(&mut entries, record)?;
        debug!("Saved proposal {} (v{})", record.token, record.version);
        Ok(true)
    }

    async fn delete(&self, token: &str) -> Result<bool, AppError> {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(&record_key(token)).is_some();

        let mut index = Self::read_index(&entries);
        let before = index.len();
        index.retain(|t| t != token);
        if index.len() != before {
            Self::write_index(&mut entries, &index)?;
        }

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "key-value"
    }
}
