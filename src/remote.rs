//! Remote persistence over RPC
//!
//! Records are mirrored to a hosted backend exposing SQL functions as
//! `POST {url}/rest/v1/rpc/{function}`. Every call carries the project key in
//! both the `apikey` and `Authorization: Bearer` headers; arguments are JSON
//! objects with `p_`-prefixed fields.

use crate::config::RemoteConfig;
use crate::error::AppError;
use crate::proposal::{AcceptanceMeta, DeclineMeta, ProposalRecord, ProposalStatus};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Row returned by the remote functions. Never carries the edit token.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRow {
    pub token: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteRow {
    /// Parsed status; unknown values read as `None`
    pub fn status(&self) -> Option<ProposalStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Operations the remote backend offers
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Insert or update. Fails with `Forbidden` when the edit token does not
    /// match the remote copy.
    async fn upsert(&self, record: &ProposalRecord) -> Result<RemoteRow, AppError>;

    async fn public_get(&self, token: &str) -> Result<Option<RemoteRow>, AppError>;

    async fn mark_sent(&self, token: &str) -> Result<(), AppError>;

    async fn mark_viewed(&self, token: &str) -> Result<(), AppError>;

    async fn accept(
        &self,
        token: &str,
        meta: &AcceptanceMeta,
        client_date: NaiveDate,
    ) -> Result<(), AppError>;

    async fn decline(&self, token: &str, meta: &DeclineMeta) -> Result<(), AppError>;

    /// Returns whether a remote row was removed
    async fn owner_delete(&self, edit_token: &str) -> Result<bool, AppError>;
}

/// reqwest implementation of [`RemoteBackend`]
#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RpcClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.as_str().trim_end_matches('/').to_string(),
            api_key: config.key.clone(),
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    /// Call `function` and decode its JSON answer. An empty body reads as `null`.
    async fn call<T: DeserializeOwned>(&self, function: &str, args: Value) -> Result<T, AppError> {
        debug!("RPC {}", function);

        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(&args)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("RPC {} failed: {}", function, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Remote(format!("RPC {} body unreadable: {}", function, e)))?;

        if !status.is_success() {
            let message = format!("RPC {} error ({}): {}", function, status, error_message(&text));
            let retryable = status.is_server_error()
                || status == StatusCode::REQUEST_TIMEOUT
                || status == StatusCode::TOO_MANY_REQUESTS;
            return Err(if retryable {
                AppError::Remote(message)
            } else {
                AppError::RemoteRejected(message)
            });
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body)
            .map_err(|e| AppError::RemoteRejected(format!("RPC {} returned unexpected data: {}", function, e)))
    }

    /// Functions answer either a single row, a one-row array or nothing
    async fn call_row(&self, function: &str, args: Value) -> Result<Option<RemoteRow>, AppError> {
        let value: Value = self.call(function, args).await?;
        let row = match value {
            Value::Null => None,
            Value::Array(mut rows) => {
                if rows.is_empty() {
                    None
                } else {
                    Some(rows.swap_remove(0))
                }
            }
            other => Some(other),
        };

        row.map(serde_json::from_value)
            .transpose()
            .map_err(|e| AppError::RemoteRejected(format!("RPC {} returned an invalid row: {}", function, e)))
    }
}

/// Best human-readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error", "hint", "details"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RemoteBackend for RpcClient {
    async fn upsert(&self, record: &ProposalRecord) -> Result<RemoteRow, AppError> {
        let pricing = record.pricing();
        let args = json!({
            "p_token": record.token,
            "p_edit_token": record.edit_token,
            "p_proposal": record.data,
            "p_pack_id": record.data.pack_id,
            "p_selected_options": record.data.selected_options,
            "p_total_price": pricing.total_price,
            "p_deposit_percent": record.data.deposit_percent,
            "p_deposit_amount": pricing.deposit_amount,
            "p_valid_until": record.valid_until,
        });

        self.call_row("qop_upsert_proposal", args)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(format!(
                    "Remote refused proposal {} (edit token mismatch)",
                    record.token
                ))
            })
    }

    async fn public_get(&self, token: &str) -> Result<Option<RemoteRow>, AppError> {
        self.call_row("qop_public_get", json!({ "p_token": token }))
            .await
    }

    async fn mark_sent(&self, token: &str) -> Result<(), AppError> {
        self.call::<Value>("qop_mark_sent", json!({ "p_token": token }))
            .await
            .map(|_| ())
    }

    async fn mark_viewed(&self, token: &str) -> Result<(), AppError> {
        self.call::<Value>("qop_mark_viewed", json!({ "p_token": token }))
            .await
            .map(|_| ())
    }

    async fn accept(
        &self,
        token: &str,
        meta: &AcceptanceMeta,
        client_date: NaiveDate,
    ) -> Result<(), AppError> {
        let args = json!({
            "p_token": token,
            "p_name": meta.name,
            "p_email": meta.email,
            "p_client_date": client_date,
        });
        self.call::<Value>("qop_accept", args).await.map(|_| ())
    }

    async fn decline(&self, token: &str, meta: &DeclineMeta) -> Result<(), AppError> {
        let args = json!({ "p_token": token, "p_reason": meta.reason });
        self.call::<Value>("qop_decline", args).await.map(|_| ())
    }

    async fn owner_delete(&self, edit_token: &str) -> Result<bool, AppError> {
        let value: Value = self
            .call("qop_owner_delete", json!({ "p_edit_token": edit_token }))
            .await?;
        Ok(!value.is_null() && value != Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::lifecycle::tests::sample_data;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RpcClient {
        RpcClient::new(&RemoteConfig {
            url: Url::parse(&server.uri()).unwrap(),
            key: "anon-key".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_sends_headers_and_prefixed_args() {
        let server = MockServer::start().await;
        let record = ProposalRecord::new(sample_data(), Utc::now(), 14);

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_upsert_proposal"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(body_partial_json(json!({
                "p_token": record.token,
                "p_pack_id": "essential",
                "p_total_price": 1680,
                "p_deposit_amount": 504,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "token": record.token,
                "status": "draft",
                "version": 1,
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let row = client_for(&server).upsert(&record).await.unwrap();
        assert_eq!(row.token, record.token);
        assert_eq!(row.status(), Some(ProposalStatus::Draft));
    }

    #[tokio::test]
    async fn test_upsert_with_no_row_is_a_token_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_upsert_proposal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let record = ProposalRecord::new(sample_data(), Utc::now(), 14);
        let err = client_for(&server).upsert(&record).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_public_get_reads_single_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_public_get"))
            .and(body_partial_json(json!({ "p_token": "abcdEFGH1234ijkl" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "abcdEFGH1234ijkl",
                "status": "viewed",
                "viewed_at": "2024-01-02T10:00:00Z",
            })))
            .mount(&server)
            .await;

        let row = client_for(&server)
            .public_get("abcdEFGH1234ijkl")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status(), Some(ProposalStatus::Viewed));
        assert!(row.viewed_at.is_some());
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_mark_sent"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "function missing" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).mark_sent("tok").await.unwrap_err();
        match err {
            AppError::RemoteRejected(msg) => assert!(msg.contains("function missing")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retryable_and_bad_rows_are_not() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_mark_sent"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_public_get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "viewed" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.mark_sent("tok").await.unwrap_err().is_transient());

        let err = client.public_get("tok").await.unwrap_err();
        assert!(matches!(err, AppError::RemoteRejected(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_body_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/qop_mark_viewed"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(client_for(&server).mark_viewed("tok").await.is_ok());
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(r#"{"hint":"check args"}"#), "check args");
        assert_eq!(error_message("plain text"), "plain text");
    }
}
