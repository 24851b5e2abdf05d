//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod catalog;
mod proposals;
mod public;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    extract::State,
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Catalog and pricing
        .route("/api/catalog/packs", get(catalog::list_packs))
        .route("/api/catalog/options", get(catalog::list_options))
        .route("/api/catalog/problems", get(catalog::list_context_items))
        .route("/api/pricing/quote", post(catalog::quote))

        // Owner routes
        .route("/api/proposals", post(proposals::create_proposal))
        .route("/api/proposals/dashboard", post(proposals::dashboard))
        .route("/api/proposals/refresh-statuses", post(proposals::refresh_statuses))
        .route(
            "/api/proposals/{token}",
            get(proposals::get_proposal)
                .patch(proposals::update_proposal)
                .delete(proposals::delete_proposal),
        )
        .route("/api/proposals/{token}/share", post(proposals::share_proposal))
        .route("/api/proposals/{token}/duplicate", post(proposals::duplicate_proposal))
        .route("/api/proposals/{token}/messages", get(proposals::proposal_messages))
        .route("/api/proposals/{token}/pdf", get(proposals::proposal_pdf))

        // Prospect routes
        .route("/api/public/{token}", get(public::view_proposal))
        .route("/api/public/{token}/accept", post(public::accept_proposal))
        .route("/api/public/{token}/decline", post(public::decline_proposal))
        .route("/api/public/{token}/pdf", get(public::public_pdf))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .expose_headers([header::CONTENT_DISPOSITION])
            .max_age(Duration::from_secs(3600))
    }
}

/// Attachment response for a rendered proposal document
pub(crate) fn pdf_response(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Health check endpoint
async fn health_check(State(state): State<SharedState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.proposals.backend_name(),
        "remoteSync": state.proposals.remote_enabled(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::proposal::{KeyValueStore, ProposalService};
    use crate::state::AppState;
    use crate::sync::RemoteSync;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_settings() -> Settings {
        Settings::from_lookup(|_| None).unwrap()
    }

    fn app() -> Router {
        let settings = test_settings();
        let service = ProposalService::new(
            Arc::new(KeyValueStore::new()),
            Arc::new(RemoteSync::disabled()),
            settings.proposals.public_base_url.clone(),
            settings.proposals.validity_days,
        );
        create_router(Arc::new(AppState::new(service)), &settings)
    }

    fn proposal_body() -> Value {
        json!({
            "prospectName": "Marie Dupont",
            "prospectCompany": "Boulangerie Dupont",
            "prospectCity": "Lyon",
            "packId": "essential",
            "selectedOptions": ["seo-reinforced"],
            "depositPercent": 30,
            "ownerName": "Alex Martin",
            "ownerPhone": "06 12 34 56 78",
            "ownerEmail": "alex@example.com"
        })
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = send(app, req).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router) -> (String, String) {
        let (status, body) =
            send_json(app, "POST", "/api/proposals", None, Some(proposal_body())).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["proposal"]["token"].as_str().unwrap().to_string();
        let edit = body["proposal"]["editToken"].as_str().unwrap().to_string();
        (token, edit)
    }

    #[tokio::test]
    async fn test_health_reports_storage() {
        let (status, body) = send_json(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["remoteSync"], false);
    }

    #[tokio::test]
    async fn test_catalog_routes() {
        let app = app();
        let (status, body) = send_json(&app, "GET", "/api/catalog/packs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["packs"].as_array().unwrap().is_empty());

        let (status, _) =
            send_json(&app, "GET", "/api/catalog/options?packId=nope", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(&app, "GET", "/api/catalog/problems", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["goals"].is_array());
    }

    #[tokio::test]
    async fn test_quote_matches_calculator() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/pricing/quote",
            None,
            Some(json!({"packId": "essential", "selectedOptions": [], "depositPercent": 30, "startDate": "2024-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let expected = crate::pricing::calculate_pricing::<String>("essential", &[], 30);
        assert_eq!(body["pricing"]["totalPrice"], json!(expected.total_price));

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/pricing/quote",
            None,
            Some(json!({"packId": "unknown"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_owner_routes_require_edit_token() {
        let app = app();
        let (token, edit) = create(&app).await;
        let uri = format!("/api/proposals/{}", token);

        let (status, _) = send_json(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send_json(&app, "GET", &uri, Some("wrong-token-value"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, body) = send_json(&app, "GET", &uri, Some(&edit), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proposal"]["status"], "draft");
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let app = app();
        let (token, edit) = create(&app).await;
        let uri = format!("/api/proposals/{}", token);

        let (status, body) = send_json(
            &app,
            "PATCH",
            &uri,
            Some(&edit),
            Some(json!({"prospectCity": "Villeurbanne"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proposal"]["version"], 2);
        assert_eq!(body["proposal"]["data"]["prospectCity"], "Villeurbanne");
    }

    #[tokio::test]
    async fn test_public_flow_hides_edit_token_and_accepts() {
        let app = app();
        let (token, edit) = create(&app).await;

        let (status, body) =
            send_json(&app, "GET", &format!("/api/public/{}", token), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["proposal"].get("editToken").is_none());
        assert!(!body.to_string().contains(&edit));
        assert_eq!(body["proposal"]["status"], "viewed");

        let (status, body) = send_json(
            &app,
            "POST",
            &format!("/api/public/{}/accept", token),
            None,
            Some(json!({"name": "Marie"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proposal"]["status"], "accepted");

        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/public/{}/decline", token),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_public_token_is_not_found() {
        let (status, _) =
            send_json(&app(), "GET", "/api/public/doesnotexist123", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard_lists_owned_proposals() {
        let app = app();
        let (_, edit) = create(&app).await;
        create(&app).await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/proposals/dashboard",
            None,
            Some(json!({"editTokens": [edit], "status": "all"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["proposals"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_statuses_needs_remote() {
        let app = app();
        let (_, edit) = create(&app).await;
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/proposals/refresh-statuses",
            None,
            Some(json!({"editTokens": [edit]})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_owner_pdf_download_marks_sent() {
        let app = app();
        let (token, edit) = create(&app).await;

        let req = Request::builder()
            .uri(format!("/api/proposals/{}/pdf", token))
            .header(header::AUTHORIZATION, format!("Bearer {}", edit))
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"proposition-"));
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF-"));

        let (_, body) =
            send_json(&app, "GET", &format!("/api/proposals/{}", token), Some(&edit), None).await;
        assert_eq!(body["proposal"]["status"], "sent");
    }

    #[tokio::test]
    async fn test_delete_then_gone() {
        let app = app();
        let (token, edit) = create(&app).await;
        let uri = format!("/api/proposals/{}", token);

        let (status, _) = send_json(&app, "DELETE", &uri, Some(&edit), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(&app, "GET", &uri, Some(&edit), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
