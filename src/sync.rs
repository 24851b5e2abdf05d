//! Debounced remote mirroring
//!
//! Owner edits arrive in bursts; each token keeps at most one pending upsert
//! timer and a new write cancels and replaces it, so the last write wins.
//! Fire-and-forget calls (sent, viewed) run in the background and only log
//! failures.

use crate::error::AppError;
use crate::proposal::ProposalRecord;
use crate::remote::{RemoteBackend, RemoteRow};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct RemoteSync {
    remote: Option<Arc<dyn RemoteBackend>>,
    debounce: Duration,
    /// Pending upsert per token, tagged with the generation that owns it
    pending: Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>,
    generation: AtomicU64,
}

impl RemoteSync {
    pub fn new(remote: Option<Arc<dyn RemoteBackend>>, debounce: Duration) -> Self {
        Self {
            remote,
            debounce,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Local-only mode
    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// The backend, or `NotConfigured` in local-only mode
    pub fn remote(&self) -> Result<&Arc<dyn RemoteBackend>, AppError> {
        self.remote.as_ref().ok_or_else(|| {
            AppError::NotConfigured(
                "Remote sync is not configured (set REMOTE_RPC_URL and REMOTE_RPC_KEY)".to_string(),
            )
        })
    }

    /// Upsert right away, skipping records not complete enough to share
    pub async fn upsert_now(&self, record: &ProposalRecord) -> Result<Option<RemoteRow>, AppError> {
        if !record.data.is_complete() {
            debug!("Proposal {} incomplete, not mirrored", record.token);
            return Ok(None);
        }
        let remote = self.remote()?;
        self.cancel(&record.token).await;
        remote.upsert(record).await.map(Some)
    }

    /// Upsert after the debounce delay, replacing any pending upsert for
    /// the same token
    pub async fn schedule_upsert(&self, record: ProposalRecord) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        if !record.data.is_complete() {
            debug!("Proposal {} incomplete, not mirrored", record.token);
            return;
        }

        let token = record.token.clone();
        let delay = self.debounce;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let mut timers = self.pending.lock().await;

        if let Some((_, previous)) = timers.remove(&token) {
            previous.abort();
        }

        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match remote.upsert(&record).await {
                Ok(row) => info!(
                    "Proposal {} mirrored (remote v{})",
                    task_token,
                    row.version.unwrap_or(record.version)
                ),
                Err(e) => warn!("Remote upsert of {} failed: {}", task_token, e),
            }
            let mut timers = pending.lock().await;
            if timers.get(&task_token).is_some_and(|(owner, _)| *owner == generation) {
                timers.remove(&task_token);
            }
        });

        timers.insert(token, (generation, handle));
    }

    /// Drop the pending upsert of `token`, if any
    pub async fn cancel(&self, token: &str) {
        if let Some((_, handle)) = self.pending.lock().await.remove(token) {
            handle.abort();
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Run `call` in the background; errors are logged and dropped
    pub fn fire<F, Fut>(&self, what: &'static str, token: &str, call: F)
    where
        F: FnOnce(Arc<dyn RemoteBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let token = token.to_string();
        tokio::spawn(async move {
            if let Err(e) = call(remote).await {
                warn!("Remote {} for {} failed: {}", what, token, e);
            }
        });
    }
}
