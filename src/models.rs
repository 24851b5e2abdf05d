//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains all request/response structures used by the API.

use crate::catalog::{ContextItem, OfferOption, Pack};
use crate::messages::MessageTemplate;
use crate::pricing::{PricingDetails, TimelineStep};
use crate::proposal::{
    AcceptanceMeta, DeclineMeta, ProposalRecord, ProposalSummary, PublicProposal, SyncState,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PacksResponse {
    pub packs: &'static [Pack],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuery {
    pub pack_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub options: Vec<&'static OfferOption>,
}

#[derive(Debug, Serialize)]
pub struct ContextItemsResponse {
    pub problems: &'static [ContextItem],
    pub goals: &'static [ContextItem],
}

/// Price a selection without saving anything
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 40, message = "Pack id is required"))]
    pub pack_id: String,
    #[serde(default)]
    #[validate(length(max = 40, message = "Too many options"))]
    pub selected_options: Vec<String>,
    pub deposit_percent: Option<u8>,
    /// Work start date; defaults to today
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub pricing: PricingDetails,
    pub delivery_date: NaiveDate,
    pub timeline: Vec<TimelineStep>,
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

/// Owner view: the full record, edit token included
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResponse {
    pub proposal: ProposalRecord,
    pub pricing: PricingDetails,
    pub share_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncState>,
    /// Why the remote refused the first write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicProposalResponse {
    pub proposal: PublicProposal,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub proposals: Vec<ProposalSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageTemplate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    #[validate(length(max = 500, message = "Too many edit tokens"))]
    pub edit_tokens: Vec<String>,
    #[validate(length(max = 200))]
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatusesRequest {
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 edit tokens"))]
    pub edit_tokens: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
}

impl From<AcceptRequest> for AcceptanceMeta {
    fn from(req: AcceptRequest) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            name: clean(req.name),
            email: clean(req.email),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

impl From<DeclineRequest> for DeclineMeta {
    fn from(req: DeclineRequest) -> Self {
        Self {
            reason: req
                .reason
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_flattens_data() {
        let body = SuccessResponse::with_data(
            "ok",
            MessagesResponse { messages: Vec::new() },
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["messages"].is_array());
    }

    #[test]
    fn test_accept_request_validation_and_cleanup() {
        let bad = AcceptRequest {
            name: None,
            email: Some("nope".to_string()),
        };
        assert!(bad.validate().is_err());

        let meta: AcceptanceMeta = AcceptRequest {
            name: Some("  Marie ".to_string()),
            email: Some(String::new()),
        }
        .into();
        assert_eq!(meta.name.as_deref(), Some("Marie"));
        assert_eq!(meta.email, None);
    }

    #[test]
    fn test_refresh_request_needs_tokens() {
        let req = RefreshStatusesRequest { edit_tokens: Vec::new() };
        assert!(req.validate().is_err());
    }
}
