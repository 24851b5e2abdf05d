//! Proposal service
//!
//! Every operation loads from the repository, applies one lifecycle step,
//! stamps the version and saves only if no other write landed in between.
//! Remote mirroring happens afterwards and never fails a local write.

use super::models::{
    AcceptanceMeta, DeclineMeta, ProposalData, ProposalPatch, ProposalRecord, ProposalStatus,
    ProposalSummary, PublicProposal,
};
use super::store::ProposalRepository;
use super::tokens::is_well_formed;
use crate::document::{file_name, ProposalDocument};
use crate::error::{not_found_error, AppError};
use crate::messages::{generate_messages, MessageContext, MessageTemplate};
use crate::sync::RemoteSync;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Where the freshly written record stands with the remote backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Remote copy written
    Synced,
    /// Remote write failed; a retry is scheduled
    Pending,
    /// No remote backend configured
    LocalOnly,
    /// Remote refused the write; retrying would not help
    Rejected,
}

/// Result of a create or duplicate: the owner-only view with the edit token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProposal {
    pub proposal: ProposalRecord,
    pub share_url: String,
    pub sync: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

/// Dashboard filter. Only records whose edit token is presented are listed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub edit_tokens: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ProposalStatus>,
}

/// Load-modify-save rounds before a contended write gives up
const MAX_WRITE_ATTEMPTS: usize = 3;

pub struct ProposalService {
    repo: Arc<dyn ProposalRepository>,
    sync: Arc<RemoteSync>,
    public_base_url: Url,
    validity_days: u32,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl ProposalService {
    pub fn new(
        repo: Arc<dyn ProposalRepository>,
        sync: Arc<RemoteSync>,
        public_base_url: Url,
        validity_days: u32,
    ) -> Self {
        Self {
            repo,
            sync,
            public_base_url,
            validity_days,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.repo.backend_name()
    }

    pub fn remote_enabled(&self) -> bool {
        self.sync.is_enabled()
    }

    /// Public link of a proposal: `{base}/p/{token}`
    pub fn share_url(&self, token: &str) -> String {
        self.public_base_url
            .join(&format!("p/{}", token))
            .map(String::from)
            .unwrap_or_else(|_| format!("{}p/{}", self.public_base_url, token))
    }

    async fn load(&self, token: &str) -> Result<ProposalRecord, AppError> {
        if !is_well_formed(token) {
            return Err(not_found_error(format!("Proposal {} not found", token)));
        }
        self.repo
            .get(token)
            .await?
            .ok_or_else(|| not_found_error(format!("Proposal {} not found", token)))
    }

    /// Load and check the owner secret
    pub async fn get_owned(&self, token: &str, edit_token: &str) -> Result<ProposalRecord, AppError> {
        let record = self.load(token).await?;
        record.verify_edit_token(edit_token)?;
        Ok(record)
    }

    /// Apply `step` to the stored record and save it at the next version.
    ///
    /// The save is conditional on the version that was loaded; when another
    /// writer got there first the record is reloaded and `step` runs again on
    /// the fresh copy. A step returning `false` leaves the record untouched.
    async fn mutate<F>(&self, token: &str, mut step: F) -> Result<(ProposalRecord, bool), AppError>
    where
        F: FnMut(&mut ProposalRecord) -> Result<bool, AppError> + Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut record = self.load(token).await?;
            if !step(&mut record)? {
                return Ok((record, false));
            }

            let expected = record.version;
            record.commit(Utc::now());
            if self.repo.save_if_version(&record, expected).await? {
                return Ok((record, true));
            }
            debug!("Proposal {} changed under write attempt {}, reloading", token, attempt);
        }

        Err(AppError::InvalidTransition(format!(
            "Proposal {} is being changed concurrently, try again",
            token
        )))
    }

    /// Save a new record, then try the remote right away
    async fn insert(&self, record: ProposalRecord) -> Result<CreatedProposal, AppError> {
        self.repo.save(&record).await?;

        let (sync, sync_error) = match self.sync.upsert_now(&record).await {
            Ok(Some(_)) => (SyncState::Synced, None),
            Ok(None) | Err(AppError::NotConfigured(_)) => (SyncState::LocalOnly, None),
            Err(e) if e.is_transient() => {
                warn!("Initial remote upsert of {} failed, retrying later: {}", record.token, e);
                self.sync.schedule_upsert(record.clone()).await;
                (SyncState::Pending, None)
            }
            Err(e) => {
                warn!("Remote refused proposal {}: {}", record.token, e);
                (
                    SyncState::Rejected,
                    Some(format!("Unable to save the proposal remotely: {}", e)),
                )
            }
        };

        Ok(CreatedProposal {
            share_url: self.share_url(&record.token),
            proposal: record,
            sync,
            sync_error,
        })
    }

    pub async fn create(&self, data: ProposalData) -> Result<CreatedProposal, AppError> {
        data.check()?;
        let record = ProposalRecord::new(data, Utc::now(), self.validity_days);
        info!("Created proposal {} for {}", record.token, record.data.prospect_company);
        self.insert(record).await
    }

    /// Content edit by the owner; mirrored after the debounce delay
    pub async fn update(
        &self,
        token: &str,
        edit_token: &str,
        patch: ProposalPatch,
    ) -> Result<ProposalRecord, AppError> {
        let (record, changed) = self
            .mutate(token, |record| {
                record.verify_edit_token(edit_token)?;
                if patch.is_empty() {
                    return Ok(false);
                }
                record.apply_patch(&patch)?;
                Ok(true)
            })
            .await?;

        if changed {
            debug!("Updated proposal {} to v{}", record.token, record.version);
            self.sync.schedule_upsert(record.clone()).await;
        }
        Ok(record)
    }

    /// Owner shared the link, message or PDF
    pub async fn share(&self, token: &str, edit_token: &str) -> Result<ProposalRecord, AppError> {
        let (record, changed) = self
            .mutate(token, |record| {
                record.verify_edit_token(edit_token)?;
                record.mark_sent(Utc::now())
            })
            .await?;

        if changed {
            info!("Proposal {} marked sent", record.token);

            let token = record.token.clone();
            self.sync.fire("mark_sent", &record.token, move |remote| async move {
                remote.mark_sent(&token).await
            });
        }
        Ok(record)
    }

    /// Prospect page load; the first one marks the proposal viewed
    pub async fn public_view(&self, token: &str) -> Result<PublicProposal, AppError> {
        let (record, changed) = self
            .mutate(token, |record| Ok(record.mark_viewed(Utc::now())))
            .await?;

        if changed {
            info!("Proposal {} viewed", record.token);

            let token = record.token.clone();
            self.sync.fire("mark_viewed", &record.token, move |remote| async move {
                remote.mark_viewed(&token).await
            });
        }
        Ok(record.to_public(today()))
    }

    pub async fn accept(&self, token: &str, meta: AcceptanceMeta) -> Result<PublicProposal, AppError> {
        let (record, _) = self
            .mutate(token, |record| {
                record.accept(meta.clone(), Utc::now())?;
                Ok(true)
            })
            .await?;
        info!("Proposal {} accepted", record.token);

        let token = record.token.clone();
        let client_date = record.accepted_at.unwrap_or_else(Utc::now).date_naive();
        self.sync.fire("accept", &record.token, move |remote| async move {
            remote.accept(&token, &meta, client_date).await
        });
        Ok(record.to_public(today()))
    }

    pub async fn decline(&self, token: &str, meta: DeclineMeta) -> Result<PublicProposal, AppError> {
        let (record, _) = self
            .mutate(token, |record| {
                record.decline(meta.clone(), Utc::now())?;
                Ok(true)
            })
            .await?;
        info!("Proposal {} declined", record.token);

        let token = record.token.clone();
        self.sync.fire("decline", &record.token, move |remote| async move {
            remote.decline(&token, &meta).await
        });
        Ok(record.to_public(today()))
    }

    async fn owned_records(&self, edit_tokens: &[String]) -> Result<Vec<ProposalRecord>, AppError> {
        if edit_tokens.is_empty() {
            return Ok(Vec::new());
        }
        self.repo.list_by_edit_tokens(edit_tokens).await
    }

    /// Owner list, most recently updated first
    pub async fn dashboard(&self, query: &DashboardQuery) -> Result<Vec<ProposalSummary>, AppError> {
        let today = today();
        let search = query.search.as_deref().unwrap_or_default();

        let mut records: Vec<ProposalRecord> = self
            .owned_records(&query.edit_tokens)
            .await?
            .into_iter()
            .filter(|r| query.status.map_or(true, |status| r.status == status))
            .filter(|r| r.matches_search(search))
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(records.iter().map(|r| r.to_summary(today)).collect())
    }

    /// Copy under new tokens, back to draft
    pub async fn duplicate(&self, token: &str, edit_token: &str) -> Result<CreatedProposal, AppError> {
        let source = self.get_owned(token, edit_token).await?;
        let copy = source.duplicate(Utc::now(), self.validity_days);
        info!("Duplicated proposal {} into {}", source.token, copy.token);
        self.insert(copy).await
    }

    /// Local removal; the remote copy is deleted best-effort
    pub async fn delete(&self, token: &str, edit_token: &str) -> Result<(), AppError> {
        let record = self.get_owned(token, edit_token).await?;
        self.sync.cancel(&record.token).await;
        self.repo.delete(&record.token).await?;
        info!("Deleted proposal {}", record.token);

        let edit_token = record.edit_token.clone();
        self.sync.fire("owner_delete", &record.token, move |remote| async move {
            remote.owner_delete(&edit_token).await.map(|_| ())
        });
        Ok(())
    }

    /// Pull statuses other devices may have moved forward
    pub async fn refresh_statuses(&self, edit_tokens: &[String]) -> Result<Vec<ProposalSummary>, AppError> {
        let remote = Arc::clone(self.sync.remote()?);
        let mut summaries = Vec::new();

        for record in self.owned_records(edit_tokens).await? {
            let record = match remote.public_get(&record.token).await {
                Ok(Some(row)) => match row.status() {
                    Some(status) => {
                        let (record, changed) = self
                            .mutate(&record.token, |record| {
                                Ok(record.adopt_remote_status(
                                    status,
                                    row.sent_at,
                                    row.viewed_at,
                                    row.accepted_at,
                                    row.declined_at,
                                ))
                            })
                            .await?;
                        if changed {
                            info!("Proposal {} is now {} (remote)", record.token, record.status);
                        }
                        record
                    }
                    None => record,
                },
                Ok(None) => {
                    debug!("Proposal {} has no remote copy", record.token);
                    record
                }
                Err(e) => {
                    warn!("Status refresh of {} failed: {}", record.token, e);
                    record
                }
            };
            summaries.push(record.to_summary(today()));
        }

        Ok(summaries)
    }

    pub async fn messages(&self, token: &str, edit_token: &str) -> Result<Vec<MessageTemplate>, AppError> {
        let record = self.get_owned(token, edit_token).await?;
        let context = MessageContext::from_record(&record, self.share_url(&record.token), today());
        Ok(generate_messages(&context))
    }

    /// Owner download; counts as sharing the proposal
    pub async fn owner_pdf(&self, token: &str, edit_token: &str) -> Result<(String, Vec<u8>), AppError> {
        let record = self.share(token, edit_token).await?;
        Ok(render(&record))
    }

    pub async fn public_pdf(&self, token: &str) -> Result<(String, Vec<u8>), AppError> {
        let record = self.load(token).await?;
        Ok(render(&record))
    }
}

fn render(record: &ProposalRecord) -> (String, Vec<u8>) {
    let document = ProposalDocument::from_record(record, today());
    (file_name(record), document.render_pdf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::lifecycle::tests::sample_data;
    use crate::proposal::KeyValueStore;
    use crate::remote::{RemoteBackend, RemoteRow};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn service_with(sync: RemoteSync) -> ProposalService {
        ProposalService::new(
            Arc::new(KeyValueStore::new()),
            Arc::new(sync),
            Url::parse("https://qop.example.com/").unwrap(),
            14,
        )
    }

    fn service() -> ProposalService {
        service_with(RemoteSync::disabled())
    }

    fn remote_sync(remote: AcceptedRemote, debounce: Duration) -> RemoteSync {
        RemoteSync::new(Some(Arc::new(remote) as Arc<dyn RemoteBackend>), debounce)
    }

    /// Remote that reports every proposal as accepted and fails writes
    struct AcceptedRemote {
        upsert_error: fn() -> AppError,
    }

    impl AcceptedRemote {
        fn offline() -> Self {
            Self {
                upsert_error: || AppError::Remote("offline".to_string()),
            }
        }

        fn refusing() -> Self {
            Self {
                upsert_error: || AppError::Forbidden("row-level security".to_string()),
            }
        }
    }

    #[async_trait]
    impl RemoteBackend for AcceptedRemote {
        async fn upsert(&self, _record: &ProposalRecord) -> Result<RemoteRow, AppError> {
            Err((self.upsert_error)())
        }

        async fn public_get(&self, token: &str) -> Result<Option<RemoteRow>, AppError> {
            Ok(Some(RemoteRow {
                token: token.to_string(),
                status: Some("accepted".to_string()),
                version: Some(4),
                valid_until: None,
                sent_at: Some(Utc::now()),
                viewed_at: Some(Utc::now()),
                accepted_at: Some(Utc::now()),
                declined_at: None,
                updated_at: None,
            }))
        }

        async fn mark_sent(&self, _token: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn mark_viewed(&self, _token: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn accept(
            &self,
            _token: &str,
            _meta: &AcceptanceMeta,
            _client_date: NaiveDate,
        ) -> Result<(), AppError> {
            Ok(())
        }

        async fn decline(&self, _token: &str, _meta: &DeclineMeta) -> Result<(), AppError> {
            Ok(())
        }

        async fn owner_delete(&self, _edit_token: &str) -> Result<bool, AppError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_create_without_remote_is_local_only() {
        let service = service();
        let created = service.create(sample_data()).await.unwrap();
        assert_eq!(created.sync, SyncState::LocalOnly);
        assert_eq!(created.proposal.version, 1);
        assert_eq!(
            created.share_url,
            format!("https://qop.example.com/p/{}", created.proposal.token)
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_data() {
        let mut data = sample_data();
        data.pack_id = "platinum".to_string();
        assert!(matches!(service().create(data).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_with_failing_remote_is_pending() {
        let sync = Arc::new(remote_sync(AcceptedRemote::offline(), Duration::from_secs(60)));
        let service = ProposalService::new(
            Arc::new(KeyValueStore::new()),
            Arc::clone(&sync),
            Url::parse("https://qop.example.com/").unwrap(),
            14,
        );
        let created = service.create(sample_data()).await.unwrap();
        assert_eq!(created.sync, SyncState::Pending);
        assert_eq!(created.sync_error, None);
        assert_eq!(sync.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_refused_by_remote_is_not_retried() {
        let sync = Arc::new(remote_sync(AcceptedRemote::refusing(), Duration::from_secs(60)));
        let service = ProposalService::new(
            Arc::new(KeyValueStore::new()),
            Arc::clone(&sync),
            Url::parse("https://qop.example.com/").unwrap(),
            14,
        );
        let created = service.create(sample_data()).await.unwrap();

        assert_eq!(created.sync, SyncState::Rejected);
        assert!(created
            .sync_error
            .as_deref()
            .is_some_and(|msg| msg.starts_with("Unable to save the proposal remotely")));
        assert_eq!(sync.pending_count().await, 0);

        // The local copy is kept regardless
        assert!(service.public_view(&created.proposal.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_checks_token() {
        let service = service();
        let created = service.create(sample_data()).await.unwrap();
        let token = &created.proposal.token;

        let patch = ProposalPatch {
            deposit_percent: Some(50),
            ..Default::default()
        };
        assert!(matches!(
            service.update(token, "not-the-edit-token", patch.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = service
            .update(token, &created.proposal.edit_token, patch)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.pricing().deposit_amount, 840);
    }

    #[tokio::test]
    async fn test_full_lifecycle_through_service() {
        let service = service();
        let created = service.create(sample_data()).await.unwrap();
        let token = created.proposal.token.clone();
        let edit = created.proposal.edit_token.clone();

        let shared = service.share(&token, &edit).await.unwrap();
        assert_eq!(shared.status, ProposalStatus::Sent);
        assert_eq!(shared.version, 2);

        // Sharing again changes nothing
        assert_eq!(service.share(&token, &edit).await.unwrap().version, 2);

        let viewed = service.public_view(&token).await.unwrap();
        assert_eq!(viewed.status, ProposalStatus::Viewed);
        let viewed_at = viewed.viewed_at;
        let again = service.public_view(&token).await.unwrap();
        assert_eq!(again.viewed_at, viewed_at);
        assert_eq!(again.version, 3);

        let accepted = service
            .accept(&token, AcceptanceMeta::default())
            .await
            .unwrap();
        assert_eq!(accepted.status, ProposalStatus::Accepted);
        assert!(!accepted.can_respond);

        assert!(matches!(
            service.decline(&token, DeclineMeta::default()).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            service
                .update(&token, &edit, ProposalPatch {
                    prospect_city: Some("Paris".to_string()),
                    ..Default::default()
                })
                .await,
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tokens_are_not_found() {
        let service = service();
        assert!(matches!(
            service.public_view("doesNotExist1234").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.public_view("../x").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_filters_by_edit_token_search_and_status() {
        let service = service();
        let first = service.create(sample_data()).await.unwrap().proposal;
        let mut other = sample_data();
        other.prospect_company = "Garage Martin".to_string();
        let second = service.create(other).await.unwrap().proposal;
        let _foreign = service.create(sample_data()).await.unwrap();

        service.share(&second.token, &second.edit_token).await.unwrap();

        let mut query = DashboardQuery {
            edit_tokens: vec![first.edit_token.clone(), second.edit_token.clone()],
            ..Default::default()
        };
        let all = service.dashboard(&query).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].token, second.token);

        query.search = Some("garage".to_string());
        assert_eq!(service.dashboard(&query).await.unwrap().len(), 1);

        query.search = None;
        query.status = Some(ProposalStatus::Draft);
        let drafts = service.dashboard(&query).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].token, first.token);

        assert!(service.dashboard(&DashboardQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_and_delete() {
        let service = service();
        let created = service.create(sample_data()).await.unwrap().proposal;
        service.share(&created.token, &created.edit_token).await.unwrap();

        let copy = service
            .duplicate(&created.token, &created.edit_token)
            .await
            .unwrap()
            .proposal;
        assert_ne!(copy.token, created.token);
        assert_eq!(copy.status, ProposalStatus::Draft);

        service.delete(&created.token, &created.edit_token).await.unwrap();
        assert!(matches!(
            service.public_view(&created.token).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.public_view(&copy.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_statuses_requires_remote() {
        let service = service();
        assert!(matches!(
            service.refresh_statuses(&[]).await,
            Err(AppError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_statuses_adopts_forward_progress() {
        let service = service_with(remote_sync(AcceptedRemote::offline(), Duration::from_secs(60)));
        let created = service.create(sample_data()).await.unwrap().proposal;

        let summaries = service
            .refresh_statuses(&[created.edit_token.clone()])
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, ProposalStatus::Accepted);
        assert_eq!(summaries[0].version, 2);

        let stored = service
            .get_owned(&created.token, &created.edit_token)
            .await
            .unwrap();
        assert!(stored.sent_at.is_some());
        assert!(stored.accepted_at.is_some());
    }

    /// Store that hands control back to the scheduler after every read,
    /// so concurrent operations all load before any of them saves
    struct YieldingStore(KeyValueStore);

    #[async_trait]
    impl ProposalRepository for YieldingStore {
        async fn get(&self, token: &str) -> Result<Option<ProposalRecord>, AppError> {
            let record = self.0.get(token).await;
            tokio::task::yield_now().await;
            record
        }

        async fn list_by_edit_tokens(&self, edit_tokens: &[String]) -> Result<Vec<ProposalRecord>, AppError> {
            self.0.list_by_edit_tokens(edit_tokens).await
        }

        async fn save(&self, record: &ProposalRecord) -> Result<(), AppError> {
            self.0.save(record).await
        }

        async fn save_if_version(&self, record: &ProposalRecord, expected: u64) -> Result<bool, AppError> {
            self.0.save_if_version(record, expected).await
        }

        async fn delete(&self, token: &str) -> Result<bool, AppError> {
            self.0.delete(token).await
        }

        fn backend_name(&self) -> &'static str {
            "yielding"
        }
    }

    async fn sent_proposal() -> (ProposalService, ProposalRecord) {
        let service = ProposalService::new(
            Arc::new(YieldingStore(KeyValueStore::new())),
            Arc::new(RemoteSync::disabled()),
            Url::parse("https://qop.example.com/").unwrap(),
            14,
        );
        let created = service.create(sample_data()).await.unwrap().proposal;
        let shared = service.share(&created.token, &created.edit_token).await.unwrap();
        assert_eq!(shared.version, 2);
        (service, shared)
    }

    #[tokio::test]
    async fn test_concurrent_accept_and_decline_only_one_wins() {
        let (service, sent) = sent_proposal().await;

        let (accepted, declined) = tokio::join!(
            service.accept(&sent.token, AcceptanceMeta::default()),
            service.decline(&sent.token, DeclineMeta::default()),
        );

        let winner = match (accepted, declined) {
            (Ok(winner), Err(AppError::InvalidTransition(_)))
            | (Err(AppError::InvalidTransition(_)), Ok(winner)) => winner,
            (accepted, declined) => panic!("expected one answer to win: {:?} / {:?}", accepted, declined),
        };
        assert_eq!(winner.version, 3);

        let stored = service.get_owned(&sent.token, &sent.edit_token).await.unwrap();
        assert_eq!(stored.status, winner.status);
        assert_eq!(stored.version, 3);
        assert_eq!(stored.accepted_at.is_some(), stored.status == ProposalStatus::Accepted);
        assert_eq!(stored.declined_at.is_some(), stored.status == ProposalStatus::Declined);
    }

    #[tokio::test]
    async fn test_concurrent_view_does_not_undo_accept() {
        let (service, sent) = sent_proposal().await;

        let (viewed, accepted) = tokio::join!(
            service.public_view(&sent.token),
            service.accept(&sent.token, AcceptanceMeta::default()),
        );

        let viewed = viewed.unwrap();
        let accepted = accepted.unwrap();
        assert_eq!(accepted.status, ProposalStatus::Accepted);
        assert!(viewed.version <= accepted.version);

        let stored = service.get_owned(&sent.token, &sent.edit_token).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::Accepted);
        assert_eq!(stored.version, accepted.version);
        assert!(stored.viewed_at.is_some());
        assert_eq!(stored.viewed_at, viewed.viewed_at);
    }

    #[tokio::test]
    async fn test_concurrent_edits_get_distinct_versions() {
        let (service, sent) = sent_proposal().await;
        let patch = |city: &str| ProposalPatch {
            prospect_city: Some(city.to_string()),
            ..Default::default()
        };

        let (first, second) = tokio::join!(
            service.update(&sent.token, &sent.edit_token, patch("Paris")),
            service.update(&sent.token, &sent.edit_token, patch("Nantes")),
        );

        let (first, second) = (first.unwrap(), second.unwrap());
        let mut versions = vec![first.version, second.version];
        versions.sort_unstable();
        assert_eq!(versions, vec![3, 4]);

        let last = if first.version == 4 { first } else { second };
        let stored = service.get_owned(&sent.token, &sent.edit_token).await.unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.data.prospect_city, last.data.prospect_city);
    }

    #[tokio::test]
    async fn test_messages_and_pdfs() {
        let service = service();
        let created = service.create(sample_data()).await.unwrap().proposal;

        let messages = service
            .messages(&created.token, &created.edit_token)
            .await
            .unwrap();
        assert_eq!(messages.len(), 5);
        assert!(messages[0].content.contains(&created.token));

        let (name, bytes) = service.public_pdf(&created.token).await.unwrap();
        assert!(name.ends_with(&format!("{}.pdf", created.token)));
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(service.public_view(&created.token).await.unwrap().status, ProposalStatus::Viewed);

        // Owner download on a viewed proposal keeps it viewed
        let (_, owner_bytes) = service
            .owner_pdf(&created.token, &created.edit_token)
            .await
            .unwrap();
        assert!(owner_bytes.starts_with(b"%PDF-"));
    }
}
