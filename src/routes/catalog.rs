//! Catalog and pricing route handlers
//!
//! Read-only endpoints over the static offer catalog plus a stateless quote.

use crate::catalog::{get_pack, options_for_pack, GOALS, OPTIONS, PACKS, PROBLEMS};
use crate::error::{validation_error, ApiResult};
use crate::models::{
    ContextItemsResponse, OptionsQuery, OptionsResponse, PacksResponse, QuoteRequest,
    QuoteResponse, SuccessResponse,
};
use crate::pricing::{calculate_delivery_date, calculate_pricing, timeline, DEFAULT_DEPOSIT_PERCENT};
use axum::extract::Query;
use axum::Json;
use chrono::Utc;
use tracing::debug;
use validator::Validate;

/// GET /api/catalog/packs
pub async fn list_packs() -> Json<SuccessResponse<PacksResponse>> {
    Json(SuccessResponse::with_data(
        "Packs retrieved successfully.",
        PacksResponse { packs: PACKS },
    ))
}

/// GET /api/catalog/options?packId=
///
/// Without `packId` every option is returned.
pub async fn list_options(
    Query(query): Query<OptionsQuery>,
) -> ApiResult<Json<SuccessResponse<OptionsResponse>>> {
    let options = match query.pack_id.as_deref() {
        Some(pack_id) => {
            if get_pack(pack_id).is_none() {
                return Err(validation_error(format!("Unknown pack '{}'", pack_id)));
            }
            options_for_pack(pack_id)
        }
        None => OPTIONS.iter().collect(),
    };

    Ok(Json(SuccessResponse::with_data(
        format!("{} options available.", options.len()),
        OptionsResponse { options },
    )))
}

/// GET /api/catalog/problems
pub async fn list_context_items() -> Json<SuccessResponse<ContextItemsResponse>> {
    Json(SuccessResponse::with_data(
        "Problems and goals retrieved successfully.",
        ContextItemsResponse {
            problems: PROBLEMS,
            goals: GOALS,
        },
    ))
}

/// POST /api/pricing/quote
///
/// Prices a selection the same way stored proposals are priced.
pub async fn quote(Json(payload): Json<QuoteRequest>) -> ApiResult<Json<SuccessResponse<QuoteResponse>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    debug!("Quoting pack {} with {} options", payload.pack_id, payload.selected_options.len());

    if get_pack(&payload.pack_id).is_none() {
        return Err(validation_error(format!("Unknown pack '{}'", payload.pack_id)));
    }
    let deposit_percent = payload.deposit_percent.unwrap_or(DEFAULT_DEPOSIT_PERCENT);
    if deposit_percent > 100 {
        return Err(validation_error("Deposit percent cannot exceed 100"));
    }

    let start = payload.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let response = QuoteResponse {
        pricing: calculate_pricing(&payload.pack_id, &payload.selected_options, deposit_percent),
        delivery_date: calculate_delivery_date(&payload.pack_id, start),
        timeline: timeline(&payload.pack_id),
    };

    Ok(Json(SuccessResponse::with_data("Quote computed.", response)))
}
