//! Prospect route handlers
//!
//! Reachable with the public token alone. Responses never carry the edit token.

use crate::error::{validation_error, ApiResult};
use crate::models::{AcceptRequest, DeclineRequest, PublicProposalResponse, SuccessResponse};
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use super::pdf_response;

/// GET /api/public/{token}
///
/// The first load marks the proposal viewed.
pub async fn view_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SuccessResponse<PublicProposalResponse>>> {
    let proposal = state.proposals.public_view(&token).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal retrieved successfully.",
        PublicProposalResponse { proposal },
    )))
}

/// POST /api/public/{token}/accept
pub async fn accept_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    payload: Option<Json<AcceptRequest>>,
) -> ApiResult<Json<SuccessResponse<PublicProposalResponse>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let proposal = state.proposals.accept(&token, payload.into()).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal accepted.",
        PublicProposalResponse { proposal },
    )))
}

/// POST /api/public/{token}/decline
pub async fn decline_proposal(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    payload: Option<Json<DeclineRequest>>,
) -> ApiResult<Json<SuccessResponse<PublicProposalResponse>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let proposal = state.proposals.decline(&token, payload.into()).await?;
    Ok(Json(SuccessResponse::with_data(
        "Proposal declined.",
        PublicProposalResponse { proposal },
    )))
}

/// GET /api/public/{token}/pdf
pub async fn public_pdf(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> ApiResult<axum::response::Response> {
    let (file_name, bytes) = state.proposals.public_pdf(&token).await?;
    Ok(pdf_response(&file_name, bytes))
}
