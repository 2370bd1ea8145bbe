//! HTTP client for the badge server.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use badgekit_core::BadgeSummary;

/// Reply to `POST /presentation-request`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReply {
    pub badge_type: String,
    pub request_id: String,
    pub request_json: String,
    /// Unix milliseconds.
    pub expires_at: i64,
}

/// Body of `POST /verify-presentation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationPayload {
    pub badge_type: String,
    pub request_id: String,
    pub presentation_json: String,
    pub origin: String,
}

/// Reply to a successful `POST /verify-presentation`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub success: bool,
    pub badge_type: String,
    pub issuer: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub version: String,
    pub badges: usize,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    reason: Option<String>,
}

/// The verifier a badge flow talks to.
#[async_trait]
pub trait BadgeBackend: Send + Sync {
    async fn list_badges(&self) -> anyhow::Result<Vec<BadgeSummary>>;

    async fn request_presentation(&self, badge_type: &str, origin: &str)
        -> anyhow::Result<RequestReply>;

    async fn send_presentation(&self, payload: &PresentationPayload)
        -> anyhow::Result<Verification>;
}

/// [`BadgeBackend`] over HTTP.
pub struct BadgeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl BadgeClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn health(&self) -> anyhow::Result<HealthReply> {
        let resp = self.http.get(self.url("/health")).send().await?;
        read_reply(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        read_reply(resp).await
    }
}

#[async_trait]
impl BadgeBackend for BadgeClient {
    async fn list_badges(&self) -> anyhow::Result<Vec<BadgeSummary>> {
        let resp = self.http.get(self.url("/badges")).send().await?;
        read_reply(resp).await
    }

    async fn request_presentation(
        &self,
        badge_type: &str,
        origin: &str,
    ) -> anyhow::Result<RequestReply> {
        self.post(
            "/presentation-request",
            &serde_json::json!({ "badgeType": badge_type, "origin": origin }),
        )
        .await
    }

    async fn send_presentation(&self, payload: &PresentationPayload) -> anyhow::Result<Verification> {
        self.post("/verify-presentation", payload).await
    }
}

/// Decode a success body, or fail with the server's `reason`.
async fn read_reply<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let reply = resp.json::<ErrorReply>().await.unwrap_or_default();
    anyhow::bail!(
        "{}",
        reply
            .reason
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()))
    )
}
