//! # HTTP Backend
//!
//! `InventoryBackend` over HTTP with `reqwest`.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reqwest timeout            ──►  ClientError::Timeout   (retryable)    │
//! │  connect / send failure     ──►  ClientError::Network   (retryable)    │
//! │  non-2xx status             ──►  ClientError::Backend { status, msg }  │
//! │      msg = body.message ?? body.error ?? body text ?? status reason    │
//! │  body does not parse        ──►  ClientError::Decode                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use depot_core::{EngineerHoldings, PhotoEvidence, ReturnPayload};

use crate::backend::InventoryBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("depot-returns/", env!("CARGO_PKG_VERSION"));

/// Inventory backend reached over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    token: Option<String>,
    request_timeout_secs: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    photo_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl HttpBackend {
    /// Builds a client from validated configuration.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(HttpBackend {
            http,
            base_url: Url::parse(config.base_url())?,
            token: config.backend.api_token.clone(),
            request_timeout_secs: config.backend.request_timeout_secs,
        })
    }

    /// `{base}/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> ClientResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "Backend responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        warn!(operation, status = status.as_u16(), %message, "Backend rejected request");

        Err(ClientError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json<T: DeserializeOwned>(&self, operation: &str, response: Response) -> ClientResult<T> {
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(operation, e))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout {
                operation: operation.to_string(),
                secs: self.request_timeout_secs,
                dispatched: false,
            }
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::network(err.to_string())
        }
    }
}

#[async_trait]
impl InventoryBackend for HttpBackend {
    async fn engineer_holdings(&self, engineer_id: &str, warehouse_id: &str) -> ClientResult<EngineerHoldings> {
        const OPERATION: &str = "GetEngineerHoldings";

        let mut url = self.endpoint(&["api", "engineers", engineer_id, "holdings"])?;
        url.query_pairs_mut().append_pair("warehouseId", warehouse_id);

        debug!(%url, "Fetching engineer holdings");
        let response = self.send(OPERATION, self.http.get(url)).await?;
        self.read_json(OPERATION, response).await
    }

    async fn upload_photo(&self, photo: &PhotoEvidence) -> ClientResult<String> {
        const OPERATION: &str = "UploadPhoto";

        let part = reqwest::multipart::Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.content_type)
            .map_err(|e| ClientError::InvalidConfig(format!("photo content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("photo", part);

        let url = self.endpoint(&["api", "uploads", "photos"])?;
        debug!(%url, size = photo.bytes.len(), "Uploading photo");
        let response = self.send(OPERATION, self.http.post(url).multipart(form)).await?;

        let uploaded: UploadResponse = self.read_json(OPERATION, response).await?;
        Ok(uploaded.photo_url)
    }

    async fn submit_return(&self, payload: &ReturnPayload) -> ClientResult<()> {
        const OPERATION: &str = "SubmitReturn";

        let url = self.endpoint(&["api", "inventory", "returns"])?;
        debug!(%url, lines = payload.items.len(), "Submitting return");
        self.send(OPERATION, self.http.post(url).json(payload)).await?;
        Ok(())
    }
}

/// Message from a JSON error body (`message`, then `error`), else the
/// trimmed body text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let non_empty = |m: &String| !m.trim().is_empty();
        if let Some(message) = parsed.message.filter(non_empty).or(parsed.error.filter(non_empty)) {
            return Some(message);
        }
    }

    Some(body.to_string())
}
