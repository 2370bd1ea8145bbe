//! HTTP API server for badge verification.
//!
//! Lists the badge catalog, issues single-use presentation requests and
//! verifies the presentations clients send back.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use badgekit_core::BadgeSummary;
use badgekit_verifier::{PresentationSubmission, VerifierError};

use crate::state::AppState;

// --- Response types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequestResponse {
    pub success: bool,
    pub badge_type: String,
    pub request_id: String,
    pub request_json: String,
    /// Unix milliseconds.
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPresentationResponse {
    pub success: bool,
    pub badge_type: String,
    pub issuer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub badges: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, reason: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            reason: reason.into(),
            badge_type: None,
        }),
    )
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

// --- Handlers ---

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        badges: state.lifecycle.catalog().len(),
    })
}

async fn handle_badges(State(state): State<Arc<AppState>>) -> Json<Vec<BadgeSummary>> {
    Json(state.lifecycle.catalog().summaries())
}

async fn handle_presentation_request(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PresentationRequestResponse>, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let badge_type = string_field(&body, "badgeType")
        .filter(|id| state.lifecycle.catalog().get(id).is_some())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Unknown badge type"))?;
    let origin = string_field(&body, "origin");

    match state.lifecycle.issue(&badge_type, origin.as_deref()) {
        Ok(issued) => Ok(Json(PresentationRequestResponse {
            success: true,
            badge_type: issued.badge_id,
            request_id: issued.request_id,
            request_json: issued.request_json,
            expires_at: issued.expires_at.timestamp_millis(),
        })),
        Err(VerifierError::UnknownBadge(_)) => {
            Err(reject(StatusCode::BAD_REQUEST, "Unknown badge type"))
        }
        Err(e) => {
            tracing::error!(badge_type = %badge_type, error = %e, "failed to create presentation request");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create request"))
        }
    }
}

async fn handle_verify_presentation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VerifyPresentationResponse>, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let submission = PresentationSubmission::from_value(&body)
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid payload"))?;

    match state.lifecycle.verify(&submission) {
        Ok(outcome) => Ok(Json(VerifyPresentationResponse {
            success: true,
            badge_type: outcome.badge_id,
            issuer: outcome.issuer,
        })),
        Err(VerifierError::RequestNotFound) => {
            Err(reject(StatusCode::GONE, "Request expired or unknown"))
        }
        Err(VerifierError::BadgeMismatch { .. }) => {
            Err(reject(StatusCode::BAD_REQUEST, "Badge mismatch"))
        }
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                reason: e.to_string(),
                badge_type: submission.badge_id,
            }),
        )),
    }
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/badges", get(handle_badges))
        .route("/presentation-request", post(handle_presentation_request))
        .route("/verify-presentation", post(handle_verify_presentation))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use badgekit_attest::{
        AttestationEngine, IdentityCredential, LocalAttestationEngine, PresentationInput,
        PresentationRequest,
    };
    use badgekit_core::{IdentityAttributes, DEMO_ISSUER_SECRET, DEMO_OWNER_SECRET};
    use badgekit_crypto::KeyPair;
    use serde_json::json;

    const ORIGIN: &str = "http://localhost:5173";

    fn state() -> Arc<AppState> {
        Arc::new(AppState::from_config(&ServerConfig::default()).unwrap())
    }

    fn present(request_json: &str, attributes: IdentityAttributes) -> String {
        let owner = KeyPair::from_secret(DEMO_OWNER_SECRET);
        let issuer = KeyPair::from_secret(DEMO_ISSUER_SECRET);
        let credential = IdentityCredential::issue(&issuer, owner.public_key(), attributes).unwrap();
        let request = PresentationRequest::from_json(request_json).unwrap();
        LocalAttestationEngine::default()
            .create_presentation(
                &owner,
                PresentationInput {
                    request: &request,
                    credentials: std::slice::from_ref(&credential),
                    verifier_identity: ORIGIN,
                },
            )
            .unwrap()
            .to_json()
            .unwrap()
    }

    async fn issue(state: &Arc<AppState>, badge: &str) -> PresentationRequestResponse {
        let Json(resp) = handle_presentation_request(
            State(state.clone()),
            Ok(Json(json!({ "badgeType": badge, "origin": ORIGIN }))),
        )
        .await
        .unwrap();
        resp
    }

    async fn verify(state: &Arc<AppState>, body: Value) -> Result<VerifyPresentationResponse, ApiError> {
        handle_verify_presentation(State(state.clone()), Ok(Json(body)))
            .await
            .map(|Json(resp)| resp)
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = handle_health(State(state())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.badges, 12);
    }

    #[tokio::test]
    async fn test_badges_in_catalog_order() {
        let Json(badges) = handle_badges(State(state())).await;
        assert_eq!(badges.len(), 12);
        assert_eq!(badges[0].id, "age-16");
        let value = serde_json::to_value(&badges[3]).unwrap();
        assert_eq!(value["id"], "non-us");
        assert!(value.get("rules").is_none());
    }

    #[tokio::test]
    async fn test_presentation_request_shape() {
        let state = state();
        let resp = issue(&state, "age-18").await;
        assert!(resp.success);
        assert_eq!(resp.badge_type, "age-18");
        assert!(!resp.request_id.is_empty());
        assert!(resp.expires_at > chrono::Utc::now().timestamp_millis());
        assert!(state.lifecycle.store().contains(&resp.request_id));

        let value = serde_json::to_value(&resp).unwrap();
        for key in ["success", "badgeType", "requestId", "requestJson", "expiresAt"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_presentation_request_unknown_badge() {
        let state = state();
        for body in [json!({"badgeType": "age-99"}), json!({"badgeType": 18}), json!({})] {
            let (status, Json(err)) =
                handle_presentation_request(State(state.clone()), Ok(Json(body)))
                    .await
                    .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err.reason, "Unknown badge type");
            assert!(!err.success);
        }
        assert!(state.lifecycle.store().is_empty());
    }

    #[tokio::test]
    async fn test_verify_success_then_gone() {
        let state = state();
        let issued = issue(&state, "age-18").await;
        let body = json!({
            "badgeType": "age-18",
            "requestId": issued.request_id,
            "presentationJson": present(&issued.request_json, IdentityAttributes::demo()),
            "origin": ORIGIN,
        });

        let ok = verify(&state, body.clone()).await.unwrap();
        assert!(ok.success);
        assert_eq!(ok.badge_type, "age-18");
        assert_eq!(ok.issuer, state.issuer);

        let (status, Json(err)) = verify(&state, body).await.unwrap_err();
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(err.reason, "Request expired or unknown");
    }

    #[tokio::test]
    async fn test_verify_invalid_payload() {
        let state = state();
        let bodies = [
            json!({"badgeType": "age-18", "presentationJson": "{}"}),
            json!({"badgeType": "age-18", "requestId": 5, "presentationJson": "{}"}),
            Value::Null,
        ];
        for body in bodies {
            let (status, Json(err)) = verify(&state, body).await.unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err.reason, "Invalid payload");
        }
    }

    #[tokio::test]
    async fn test_verify_badge_mismatch_keeps_request() {
        let state = state();
        let issued = issue(&state, "age-18").await;
        let (status, Json(err)) = verify(
            &state,
            json!({
                "badgeType": "age-21",
                "requestId": issued.request_id,
                "presentationJson": "{}",
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.reason, "Badge mismatch");
        assert!(state.lifecycle.store().contains(&issued.request_id));
    }

    #[tokio::test]
    async fn test_verify_failure_reports_badge_type() {
        let state = state();
        let issued = issue(&state, "non-us").await;
        let mut attributes = IdentityAttributes::demo();
        attributes.nationality = "US".into();
        let (status, Json(err)) = verify(
            &state,
            json!({
                "badgeType": "non-us",
                "requestId": issued.request_id,
                "presentationJson": present(&issued.request_json, attributes),
                "origin": ORIGIN,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.badge_type.as_deref(), Some("non-us"));
        assert!(!err.reason.is_empty());
        assert!(state.lifecycle.store().contains(&issued.request_id));
    }

    #[tokio::test]
    async fn test_verify_malformed_presentation() {
        let state = state();
        let issued = issue(&state, "kyc-basic").await;
        let (status, Json(err)) = verify(
            &state,
            json!({
                "badgeType": "kyc-basic",
                "requestId": issued.request_id,
                "presentationJson": "not json",
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err.reason.starts_with("malformed presentation"));
    }

    #[test]
    fn test_error_response_omits_missing_badge_type() {
        let (_, Json(err)) = reject(StatusCode::GONE, "Request expired or unknown");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, json!({"success": false, "reason": "Request expired or unknown"}));
    }
}
