//! Owner route handlers
//!
//! Every route under `/api/proposals/{token}` requires the edit token as
//! `Authorization: Bearer <editToken>`.

use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    DashboardRequest, DashboardResponse, MessageResponse, MessagesResponse, ProposalResponse,
    RefreshStatusesRequest, SuccessResponse,
};
use crate::proposal::{CreatedProposal, DashboardQuery, ProposalData, ProposalPatch, ProposalRecord};
use crate::state::SharedState;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use tracing::debug;
use validator::Validate;

use super::pdf_response;

/// Owner secret taken from the bearer header
#[derive(Debug, Clone)]
pub struct EditToken(pub String);

impl<S> FromRequestParts<S> for EditToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Unauthorized(
                        "Missing edit token (expected Authorization: Bearer <editToken>)".to_string(),
                    )
                })?;
        Ok(EditToken(bearer.token().to_string()))
    }
}

fn owner_view(state: &SharedState, record: ProposalRecord) -> ProposalResponse {
    ProposalResponse {
        pricing: record.pricing(),
        share_url: state.proposals.share_url(&record.token),
        proposal: record,
        sync: None,
        sync_error: None,
    }
}

fn created_view(created: CreatedProposal) -> ProposalResponse {
    ProposalResponse {
        pricing: created.proposal.pricing(),
        share_url: created.share_url,
        proposal: created.proposal,
        sync: Some(created.sync),
        sync_error: created.sync_error,
    }
}

/// POST /api/proposals
///
/// Returns the record with its edit token; the owner must keep it.
pub async fn create_proposal(
    State(state): State<SharedState>,
    Json(payload): Json<ProposalData>,
) -> ApiResult<Json<SuccessResponse<ProposalResponse>>> {
    debug!("Creating proposal for {}", payload.prospect_company);
    let created = state.proposals.create(payload).await?;

    Ok(Json(SuccessResponse::with_data(
        "Proposal created successfully.",
        created_view(created),
    )))
}

/// GET /api/proposals/{token}
pub async fn get_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<Json<SuccessResponse<ProposalResponse>>> {
    let record = state.proposals.get_owned(&token, &edit_token).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal retrieved successfully.",
        owner_view(&state, record),
    )))
}

/// PATCH /api/proposals/{token}
pub async fn update_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
    Json(patch): Json<ProposalPatch>,
) -> ApiResult<Json<SuccessResponse<ProposalResponse>>> {
    let record = state.proposals.update(&token, &edit_token, patch).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Proposal saved (version {}).", record.version),
        owner_view(&state, record),
    )))
}

/// DELETE /api/proposals/{token}
pub async fn delete_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<Json<MessageResponse>> {
    state.proposals.delete(&token, &edit_token).await?;
    Ok(Json(MessageResponse::new("Proposal deleted successfully.")))
}

/// POST /api/proposals/{token}/share
///
/// Called when the owner copies the link or a message.
pub async fn share_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<Json<SuccessResponse<ProposalResponse>>> {
    let record = state.proposals.share(&token, &edit_token).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal marked as sent.",
        owner_view(&state, record),
    )))
}

/// POST /api/proposals/{token}/duplicate
pub async fn duplicate_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<Json<SuccessResponse<ProposalResponse>>> {
    let created = state.proposals.duplicate(&token, &edit_token).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal duplicated successfully.",
        created_view(created),
    )))
}

/// GET /api/proposals/{token}/messages
pub async fn proposal_messages(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<Json<SuccessResponse<MessagesResponse>>> {
    let messages = state.proposals.messages(&token, &edit_token).await?;
    Ok(Json(SuccessResponse::with_data(
        "Messages generated.",
        MessagesResponse { messages },
    )))
}

/// GET /api/proposals/{token}/pdf
///
/// Downloading the document counts as sharing it.
pub async fn proposal_pdf(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    EditToken(edit_token): EditToken,
) -> ApiResult<axum::response::Response> {
    let (file_name, bytes) = state.proposals.owner_pdf(&token, &edit_token).await?;
    Ok(pdf_response(&file_name, bytes))
}

/// POST /api/proposals/dashboard
pub async fn dashboard(
    State(state): State<SharedState>,
    Json(payload): Json<DashboardRequest>,
) -> ApiResult<Json<SuccessResponse<DashboardResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let query = DashboardQuery {
        edit_tokens: payload.edit_tokens,
        search: payload.search,
        status: payload
            .status
            .as_deref()
            .filter(|s| !s.is_empty() && *s != "all")
            .map(str::parse)
            .transpose()?,
    };
    let proposals = state.proposals.dashboard(&query).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} proposals found.", proposals.len()),
        DashboardResponse { proposals },
    )))
}

/// POST /api/proposals/refresh-statuses
///
/// Needs the remote backend; answers 503 in local-only mode.
pub async fn refresh_statuses(
    State(state): State<SharedState>,
    Json(payload): Json<RefreshStatusesRequest>,
) -> ApiResult<Json<SuccessResponse<DashboardResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let proposals = state.proposals.refresh_statuses(&payload.edit_tokens).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} proposals refreshed.", proposals.len()),
        DashboardResponse { proposals },
    )))
}
