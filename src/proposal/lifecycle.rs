//! Proposal lifecycle
//!
//! draft → sent → viewed → accepted | declined. Lifecycle methods only touch
//! status and timestamps; [`ProposalRecord::commit`] stamps the version once
//! per persisted write.

use super::models::{
    AcceptanceMeta, DeclineMeta, ProposalData, ProposalPatch, ProposalRecord, ProposalStatus,
    ProposalSummary, PublicProposal,
};
use super::tokens::{generate_edit_token, generate_share_token, tokens_match};
use crate::error::AppError;
use crate::pricing::{calculate_delivery_date, compute_valid_until, PricingDetails};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use uuid::Uuid;

/// Stored timestamps keep microseconds, the TIMESTAMPTZ resolution
fn stamp(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

impl ProposalRecord {
    /// Fresh draft with new tokens, valid for `validity_days`
    pub fn new(data: ProposalData, now: DateTime<Utc>, validity_days: u32) -> Self {
        let now = stamp(now);
        Self {
            id: Uuid::new_v4(),
            token: generate_share_token(),
            edit_token: generate_edit_token(),
            data,
            status: ProposalStatus::Draft,
            version: 1,
            created_at: now,
            updated_at: now,
            valid_until: compute_valid_until(now.date_naive(), validity_days),
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            declined_at: None,
            accepted_meta: None,
            declined_meta: None,
        }
    }

    /// Past the validity date, whatever the status
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }

    pub fn pricing(&self) -> PricingDetails {
        self.data.pricing()
    }

    pub fn verify_edit_token(&self, presented: &str) -> Result<(), AppError> {
        if tokens_match(presented, &self.edit_token) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Edit token does not match proposal {}",
                self.token
            )))
        }
    }

    /// Move to `next`, stamping the matching timestamp
    pub fn transition(&mut self, next: ProposalStatus, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot move proposal {} from {} to {}",
                self.token, self.status, next
            )));
        }

        let now = stamp(now);
        match next {
            ProposalStatus::Sent => self.sent_at = Some(now),
            ProposalStatus::Viewed => self.viewed_at = Some(now),
            ProposalStatus::Accepted => self.accepted_at = Some(now),
            ProposalStatus::Declined => self.declined_at = Some(now),
            ProposalStatus::Draft => {}
        }
        self.status = next;
        Ok(())
    }

    /// Owner shared the proposal. Returns whether anything changed.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> Result<bool, AppError> {
        match self.status {
            ProposalStatus::Draft => {
                self.transition(ProposalStatus::Sent, now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Prospect opened the public page. Only the first view is recorded.
    pub fn mark_viewed(&mut self, now: DateTime<Utc>) -> bool {
        if self.viewed_at.is_some() || self.status.rank() >= ProposalStatus::Viewed.rank() {
            return false;
        }
        self.transition(ProposalStatus::Viewed, now).is_ok()
    }

    fn ensure_can_respond(&self, today: NaiveDate) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "Proposal {} is already {}",
                self.token, self.status
            )));
        }
        if self.is_expired(today) {
            return Err(AppError::Expired(format!(
                "Proposal {} expired on {}",
                self.token, self.valid_until
            )));
        }
        Ok(())
    }

    pub fn can_respond(&self, today: NaiveDate) -> bool {
        self.ensure_can_respond(today).is_ok()
    }

    /// Prospect accepts. An unseen proposal is marked viewed on the way.
    pub fn accept(&mut self, meta: AcceptanceMeta, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_can_respond(now.date_naive())?;
        self.mark_viewed(now);
        self.transition(ProposalStatus::Accepted, now)?;
        self.accepted_meta = Some(meta);
        Ok(())
    }

    pub fn decline(&mut self, meta: DeclineMeta, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_can_respond(now.date_naive())?;
        self.mark_viewed(now);
        self.transition(ProposalStatus::Declined, now)?;
        self.declined_meta = Some(meta);
        Ok(())
    }

    /// Owner content edit. Refused once the prospect has answered.
    pub fn apply_patch(&mut self, patch: &ProposalPatch) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "Proposal {} is {} and can no longer be edited",
                self.token, self.status
            )));
        }
        self.data = patch.apply(&self.data)?;
        Ok(())
    }

    /// Stamp a persisted write
    pub fn commit(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = stamp(now);
    }

    /// Same content under new tokens, back to draft with a fresh validity window
    pub fn duplicate(&self, now: DateTime<Utc>, validity_days: u32) -> Self {
        Self::new(self.data.clone(), now, validity_days)
    }

    /// Prospect-facing view, never carrying the edit token
    pub fn to_public(&self, today: NaiveDate) -> PublicProposal {
        PublicProposal {
            token: self.token.clone(),
            data: self.data.clone(),
            status: self.status,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            valid_until: self.valid_until,
            sent_at: self.sent_at,
            viewed_at: self.viewed_at,
            accepted_at: self.accepted_at,
            declined_at: self.declined_at,
            pricing: self.pricing(),
            delivery_date: calculate_delivery_date(&self.data.pack_id, today),
            expired: self.is_expired(today),
            can_respond: self.can_respond(today),
        }
    }

    pub fn to_summary(&self, today: NaiveDate) -> ProposalSummary {
        ProposalSummary {
            token: self.token.clone(),
            status: self.status,
            version: self.version,
            prospect_company: self.data.prospect_company.clone(),
            prospect_name: self.data.prospect_name.clone(),
            prospect_city: self.data.prospect_city.clone(),
            pack_id: self.data.pack_id.clone(),
            total_price: self.pricing().total_price,
            valid_until: self.valid_until,
            expired: self.is_expired(today),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Case-insensitive match on company, prospect name or token
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.data.prospect_company.to_lowercase().contains(&query)
            || self.data.prospect_name.to_lowercase().contains(&query)
            || self.token.to_lowercase().contains(&query)
    }

    /// Adopt a status reported by another device when it moves us forward
    pub fn adopt_remote_status(
        &mut self,
        status: ProposalStatus,
        sent_at: Option<DateTime<Utc>>,
        viewed_at: Option<DateTime<Utc>>,
        accepted_at: Option<DateTime<Utc>>,
        declined_at: Option<DateTime<Utc>>,
    ) -> bool {
        if status.rank() <= self.status.rank() {
            return false;
        }
        self.status = status;
        self.sent_at = self.sent_at.or(sent_at.map(stamp));
        self.viewed_at = self.viewed_at.or(viewed_at.map(stamp));
        self.accepted_at = self.accepted_at.or(accepted_at.map(stamp));
        self.declined_at = self.declined_at.or(declined_at.map(stamp));
        true
    }
}
