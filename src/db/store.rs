// PostgreSQL proposal repository
//
// One row per proposal, content in JSONB, keyed by public token

use super::queries;
use crate::error::AppError;
use crate::proposal::{AcceptanceMeta, DeclineMeta, ProposalData, ProposalRecord, ProposalRepository};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::Row;
use tracing::{debug, warn};

pub struct PgProposalStore {
    pool: Pool,
}

impl PgProposalStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &Row) -> Result<ProposalRecord, AppError> {
        let data: ProposalData = serde_json::from_value(row.try_get::<_, Value>("proposal")?)?;
        let accepted_meta: Option<AcceptanceMeta> = row
            .try_get::<_, Option<Value>>("accepted_meta")?
            .map(serde_json::from_value)
            .transpose()?;
        let declined_meta: Option<DeclineMeta> = row
            .try_get::<_, Option<Value>>("declined_meta")?
            .map(serde_json::from_value)
            .transpose()?;
        let status: String = row.try_get("status")?;
        let version: i64 = row.try_get("version")?;

        Ok(ProposalRecord {
            id: row.try_get("id")?,
            token: row.try_get("token")?,
            edit_token: row.try_get("edit_token")?,
            data,
            status: status.parse()?,
            version: u64::try_from(version).unwrap_or(1),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            valid_until: row.try_get("valid_until")?,
            sent_at: row.try_get("sent_at")?,
            viewed_at: row.try_get("viewed_at")?,
            accepted_at: row.try_get("accepted_at")?,
            declined_at: row.try_get("declined_at")?,
            accepted_meta,
            declined_meta,
        })
    }

    fn readable(rows: &[Row]) -> Vec<ProposalRecord> {
        rows.iter()
            .filter_map(|row| match Self::row_to_record(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable proposal row: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Derived column values bound alongside the record fields
struct Columns {
    proposal: Value,
    accepted_meta: Option<Value>,
    declined_meta: Option<Value>,
    total_price: i32,
    deposit_amount: i32,
    deposit_percent: i16,
    version: i64,
    status: &'static str,
}

impl Columns {
    fn of(record: &ProposalRecord) -> Result<Self, AppError> {
        let pricing = record.pricing();
        Ok(Self {
            proposal: serde_json::to_value(&record.data)?,
            accepted_meta: record.accepted_meta.as_ref().map(serde_json::to_value).transpose()?,
            declined_meta: record.declined_meta.as_ref().map(serde_json::to_value).transpose()?,
            total_price: i32::try_from(pricing.total_price).unwrap_or(i32::MAX),
            deposit_amount: i32::try_from(pricing.deposit_amount).unwrap_or(i32::MAX),
            deposit_percent: i16::from(record.data.deposit_percent),
            version: i64::try_from(record.version).unwrap_or(i64::MAX),
            status: record.status.as_str(),
        })
    }
}

#[async_trait]
impl ProposalRepository for PgProposalStore {
    async fn get(&self, token: &str) -> Result<Option<ProposalRecord>, AppError> {
        let client = self.pool.get().await?;
        let row = client.query_opt(queries::select_proposal().as_str(), &[&token]).await?;

        match row {
            Some(row) => match Self::row_to_record(&row) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!("Ignoring unreadable proposal {}: {}", token, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn list_by_edit_tokens(&self, edit_tokens: &[String]) -> Result<Vec<ProposalRecord>, AppError> {
        if edit_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::list_proposals_by_edit_tokens().as_str(), &[&edit_tokens])
            .await?;
        Ok(Self::readable(&rows))
    }

    async fn save(&self, record: &ProposalRecord) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let p = Columns::of(record)?;

        client
            .execute(
                queries::UPSERT_PROPOSAL,
                &[
                    &record.token,
                    &record.id,
                    &record.edit_token,
                    &p.proposal,
                    &record.data.pack_id,
                    &record.data.selected_options,
                    &p.total_price,
                    &p.deposit_percent,
                    &p.deposit_amount,
                    &p.status,
                    &p.version,
                    &record.valid_until,
                    &record.sent_at,
                    &record.viewed_at,
                    &record.accepted_at,
                    &record.declined_at,
                    &p.accepted_meta,
                    &p.declined_meta,
                    &record.created_at,
                    &record.updated_at,
                ],
            )
            .await?;

        debug!("Saved proposal {} (v{}) to PostgreSQL", record.token, record.version);
        Ok(())
    }

    async fn save_if_version(&self, record: &ProposalRecord, expected: u64) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let p = Columns::of(record)?;
        let expected = i64::try_from(expected).unwrap_or(i64::MAX);

        let affected = client
            .execute(
                queries::UPDATE_PROPOSAL_IF_VERSION,
                &[
                    &record.token,
                    &p.proposal,
                    &record.data.pack_id,
                    &record.data.selected_options,
                    &p.total_price,
                    &p.deposit_percent,
                    &p.deposit_amount,
                    &p.status,
                    &p.version,
                    &record.valid_until,
                    &record.sent_at,
                    &record.viewed_at,
                    &record.accepted_at,
                    &record.declined_at,
                    &p.accepted_meta,
                    &p.declined_meta,
                    &record.updated_at,
                    &expected,
                ],
            )
            .await?;

        if affected == 0 {
            debug!("Proposal {} moved on since v{}", record.token, expected);
            return Ok(false);
        }
        debug!("Saved proposal {} (v{}) to PostgreSQL", record.token, record.version);
        Ok(true)
    }

    async fn delete(&self, token: &str) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let affected = client.execute(queries::DELETE_PROPOSAL, &[&token]).await?;
        Ok(affected > 0)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
