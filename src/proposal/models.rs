//! Proposal data models
//!
//! Defines the proposal content, its lifecycle status and the stored record.

use crate::catalog::{get_pack, is_option_available};
use crate::error::{validation_error, AppError};
use crate::pricing::{calculate_pricing, PricingDetails, DEFAULT_DEPOSIT_PERCENT};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Highest deposit percent a proposal may ask for
pub const MAX_DEPOSIT_PERCENT: u8 = 50;

static SIRET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{14}$").expect("valid SIRET pattern"));

/// Lifecycle stage of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Being prepared by the owner
    Draft,
    /// Shared with the prospect
    Sent,
    /// Opened by the prospect
    Viewed,
    Accepted,
    Declined,
}

impl Default for ProposalStatus {
    fn default() -> Self {
        ProposalStatus::Draft
    }
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Viewed => "viewed",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Declined => "declined",
        }
    }

    /// Accepted and declined proposals never move again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Declined)
    }

    /// Position along the lifecycle, used to keep transitions monotonic
    pub fn rank(&self) -> u8 {
        match self {
            ProposalStatus::Draft => 0,
            ProposalStatus::Sent => 1,
            ProposalStatus::Viewed => 2,
            ProposalStatus::Accepted | ProposalStatus::Declined => 3,
        }
    }

    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Draft, Viewed) | (Sent, Viewed) | (Viewed, Accepted) | (Viewed, Declined)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProposalStatus::Draft),
            "sent" => Ok(ProposalStatus::Sent),
            "viewed" => Ok(ProposalStatus::Viewed),
            "accepted" => Ok(ProposalStatus::Accepted),
            "declined" => Ok(ProposalStatus::Declined),
            other => Err(validation_error(format!("Unknown proposal status '{}'", other))),
        }
    }
}

/// Writing tone of the generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Confident,
    Simple,
}

impl Default for Tone {
    fn default() -> Self {
        Tone::Neutral
    }
}

/// Empty, or exactly 14 digits
fn validate_siret(siret: &str) -> Result<(), validator::ValidationError> {
    if siret.is_empty() || SIRET_RE.is_match(siret) {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("invalid_siret");
    err.message = Some("SIRET must contain 14 digits".into());
    Err(err)
}

fn default_pack_id() -> String {
    "essential".to_string()
}

fn default_deposit_percent() -> u8 {
    DEFAULT_DEPOSIT_PERCENT
}

/// Everything the owner fills in when building a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalData {
    // Prospect
    #[validate(length(min = 1, max = 120, message = "Prospect name is required"))]
    #[serde(default)]
    pub prospect_name: String,
    #[validate(length(min = 1, max = 160, message = "Prospect company is required"))]
    #[serde(default)]
    pub prospect_company: String,
    #[validate(length(max = 120))]
    #[serde(default)]
    pub prospect_sector: String,
    #[validate(length(max = 120))]
    #[serde(default)]
    pub prospect_city: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub prospect_problem: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub prospect_goal: String,

    // Offer
    #[serde(default = "default_pack_id")]
    pub pack_id: String,
    #[serde(default)]
    pub selected_options: Vec<String>,
    #[serde(default = "default_deposit_percent")]
    pub deposit_percent: u8,

    // Owner
    #[validate(length(min = 1, max = 120, message = "Owner name is required"))]
    #[serde(default)]
    pub owner_name: String,
    #[validate(length(max = 40))]
    #[serde(default)]
    pub owner_phone: String,
    #[validate(email(message = "Owner email is invalid"))]
    #[serde(default)]
    pub owner_email: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub owner_website: String,
    #[validate(custom(function = "validate_siret"))]
    #[serde(default)]
    pub owner_siret: String,

    #[serde(default)]
    pub tone: Tone,

    /// External payment page (stored only, never processed)
    #[validate(url(message = "Payment link must be a valid URL"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
}

impl ProposalData {
    /// Field validation plus the catalog invariants
    pub fn check(&self) -> Result<(), AppError> {
        self.validate().map_err(|e| validation_error(e.to_string()))?;

        if get_pack(&self.pack_id).is_none() {
            return Err(validation_error(format!("Unknown pack '{}'", self.pack_id)));
        }

        if self.deposit_percent > MAX_DEPOSIT_PERCENT || self.deposit_percent % 10 != 0 {
            return Err(validation_error(format!(
                "Deposit percent must be a multiple of 10 between 0 and {}",
                MAX_DEPOSIT_PERCENT
            )));
        }

        let mut seen = HashSet::new();
        for option_id in &self.selected_options {
            if !seen.insert(option_id.as_str()) {
                return Err(validation_error(format!("Option '{}' selected twice", option_id)));
            }
            if !is_option_available(&self.pack_id, option_id) {
                return Err(validation_error(format!(
                    "Option '{}' is not available for pack '{}'",
                    option_id, self.pack_id
                )));
            }
        }

        Ok(())
    }

    /// Enough content for the public link to make sense on another device
    pub fn is_complete(&self) -> bool {
        get_pack(&self.pack_id).is_some()
            && !self.prospect_company.is_empty()
            && !self.owner_name.is_empty()
            && !self.owner_email.is_empty()
    }

    /// Server-side pricing, recomputed from ids
    pub fn pricing(&self) -> PricingDetails {
        calculate_pricing(&self.pack_id, &self.selected_options, self.deposit_percent)
    }

    /// Drop options the current pack does not offer
    fn retain_available_options(&mut self) {
        let pack_id = self.pack_id.clone();
        self.selected_options
            .retain(|option_id| is_option_available(&pack_id, option_id));
    }
}

/// Explicit partial update of [`ProposalData`]; `None` keeps the current value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPatch {
    pub prospect_name: Option<String>,
    pub prospect_company: Option<String>,
    pub prospect_sector: Option<String>,
    pub prospect_city: Option<String>,
    pub prospect_problem: Option<String>,
    pub prospect_goal: Option<String>,
    pub pack_id: Option<String>,
    pub selected_options: Option<Vec<String>>,
    pub deposit_percent: Option<u8>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
    pub owner_website: Option<String>,
    pub owner_siret: Option<String>,
    pub tone: Option<Tone>,
    /// An empty string clears the link
    pub payment_link: Option<String>,
}

impl ProposalPatch {
    pub fn is_empty(&self) -> bool {
        self.prospect_name.is_none()
            && self.prospect_company.is_none()
            && self.prospect_sector.is_none()
            && self.prospect_city.is_none()
            && self.prospect_problem.is_none()
            && self.prospect_goal.is_none()
            && self.pack_id.is_none()
            && self.selected_options.is_none()
            && self.deposit_percent.is_none()
            && self.owner_name.is_none()
            && self.owner_phone.is_none()
            && self.owner_email.is_none()
            && self.owner_website.is_none()
            && self.owner_siret.is_none()
            && self.tone.is_none()
            && self.payment_link.is_none()
    }

    /// Merge onto `current` and validate the result.
    ///
    /// Switching pack without an explicit option list keeps only the options
    /// the new pack offers.
    pub fn apply(&self, current: &ProposalData) -> Result<ProposalData, AppError> {
        let mut next = current.clone();

        fn set(target: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *target = value.trim().to_string();
            }
        }

        set(&mut next.prospect_name, &self.prospect_name);
        set(&mut next.prospect_company, &self.prospect_company);
        set(&mut next.prospect_sector, &self.prospect_sector);
        set(&mut next.prospect_city, &self.prospect_city);
        set(&mut next.prospect_problem, &self.prospect_problem);
        set(&mut next.prospect_goal, &self.prospect_goal);
        set(&mut next.owner_name, &self.owner_name);
        set(&mut next.owner_phone, &self.owner_phone);
        set(&mut next.owner_email, &self.owner_email);
        set(&mut next.owner_website, &self.owner_website);
        set(&mut next.owner_siret, &self.owner_siret);

        if let Some(deposit_percent) = self.deposit_percent {
            next.deposit_percent = deposit_percent;
        }
        if let Some(tone) = self.tone {
            next.tone = tone;
        }
        if let Some(link) = &self.payment_link {
            let link = link.trim();
            next.payment_link = (!link.is_empty()).then(|| link.to_string());
        }

        match (&self.pack_id, &self.selected_options) {
            (_, Some(options)) => {
                if let Some(pack_id) = &self.pack_id {
                    next.pack_id = pack_id.clone();
                }
                next.selected_options = options.clone();
            }
            (Some(pack_id), None) => {
                next.pack_id = pack_id.clone();
                next.retain_available_options();
            }
            (None, None) => {}
        }

        next.check()?;
        Ok(next)
    }
}

/// Who accepted the proposal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Why the proposal was declined
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A stored proposal: content plus tokens, lifecycle and timestamps.
///
/// `version` starts at 1 and grows by one on every persisted write. Writers
/// are not reconciled: the last write wins, and callers can compare versions
/// to notice they are looking at a stale copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub id: Uuid,
    /// Public share token (read access)
    pub token: String,
    /// Secret owner token (write access)
    pub edit_token: String,
    pub data: ProposalData,
    pub status: ProposalStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub valid_until: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_meta: Option<AcceptanceMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_meta: Option<DeclineMeta>,
}

/// What the prospect sees: the record without its edit token, plus
/// server-derived amounts and dates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProposal {
    pub token: String,
    pub data: ProposalData,
    pub status: ProposalStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub valid_until: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
    pub pricing: PricingDetails,
    pub delivery_date: NaiveDate,
    pub expired: bool,
    /// Accept/decline buttons are live
    pub can_respond: bool,
}

/// One row of the owner dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub token: String,
    pub status: ProposalStatus,
    pub version: u64,
    pub prospect_company: String,
    pub prospect_name: String,
    pub prospect_city: String,
    pub pack_id: String,
    pub total_price: u32,
    pub valid_until: NaiveDate,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
