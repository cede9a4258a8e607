//! HTTP client for the UniAI inference service.
//!
//! ## Streaming protocol
//!
//! `/api/generate` and `/api/chat` answer with newline-delimited JSON: one
//! event object per line, the last one carrying `"done": true`. For every
//! line the client
//!
//! 1. checks for an `error` field and stops with [`UniAiError::Server`] if it
//!    is non-empty, whatever the HTTP status;
//! 2. stops with [`UniAiError::Status`] if the HTTP status was ≥ 400;
//! 3. otherwise decodes the typed event and hands it to the caller's handler.
//!
//! The handler is the only cancellation point: returning `Err` from it stops
//! reading immediately and the error comes back as
//! [`UniAiError::HandlerAborted`].
//!
//! ## No retries
//!
//! A failed request is reported once. Callers that want backoff wrap the
//! call themselves.

mod ndjson;
mod types;

pub use ndjson::{LineFramer, MAX_LINE_BYTES};
pub use types::{
    ChatRequest, ChatResponse, GenerateRequest, GenerateResponse, ImageData, Message, Metrics,
    Options, StatusError, DEFAULT_MODEL,
};

use crate::error::{HandlerError, UniAiError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};
use types::VersionResponse;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for the inference service.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    /// `base64(secret)`, computed once at construction.
    auth_basic: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("auth_basic", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

impl Client {
    /// Build a client with a default `reqwest::Client`.
    ///
    /// `base_url` falls back to [`DEFAULT_BASE_URL`] when `None` or empty.
    /// Fails without touching the network if `credential` is empty.
    pub fn new(base_url: Option<&str>, credential: &str) -> Result<Self, UniAiError> {
        Self::with_http_client(base_url, credential, reqwest::Client::new())
    }

    /// Build a client around a caller-configured `reqwest::Client`
    /// (timeouts, proxies, TLS roots).
    pub fn with_http_client(
        base_url: Option<&str>,
        credential: &str,
        http: reqwest::Client,
    ) -> Result<Self, UniAiError> {
        if credential.is_empty() {
            return Err(UniAiError::InvalidConfig(
                "credential for Basic auth cannot be empty (set API_AUTH)".into(),
            ));
        }

        let raw = match base_url {
            Some(url) if !url.trim().is_empty() => url.trim(),
            _ => DEFAULT_BASE_URL,
        };
        let base_url = Url::parse(raw).map_err(|e| UniAiError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(UniAiError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }

        Ok(Self {
            http,
            base_url,
            auth_basic: STANDARD.encode(credential.as_bytes()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Generate a completion for one prompt, streaming events to `on_event`.
    ///
    /// `on_event` runs once per decoded line, in order. Return `Err` from it to
    /// stop the stream; no further lines are read.
    pub async fn generate<F>(&self, req: &GenerateRequest, on_event: F) -> Result<(), UniAiError>
    where
        F: FnMut(GenerateResponse) -> Result<(), HandlerError>,
    {
        self.stream::<_, GenerateResponse, _>("/api/generate", req, on_event)
            .await
    }

    /// Produce the next chat message, streaming events to `on_event`.
    ///
    /// Same stop contract as [`Client::generate`].
    pub async fn chat<F>(&self, req: &ChatRequest, on_event: F) -> Result<(), UniAiError>
    where
        F: FnMut(ChatResponse) -> Result<(), HandlerError>,
    {
        self.stream::<_, ChatResponse, _>("/api/chat", req, on_event)
            .await
    }

    /// `Ok(())` if the service is up and answering.
    pub async fn heartbeat(&self) -> Result<(), UniAiError> {
        self.send_once::<serde_json::Value>(Method::HEAD, "/")
            .await?;
        Ok(())
    }

    /// Version string reported by the service.
    pub async fn version(&self) -> Result<String, UniAiError> {
        let resp = self
            .send_once::<VersionResponse>(Method::GET, "/api/version")
            .await?;
        Ok(resp.map(|v| v.version).unwrap_or_default())
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    fn headers(&self, accept: &'static str) -> Result<HeaderMap, UniAiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent())
                .map_err(|e| UniAiError::Internal(format!("user agent: {e}")))?,
        );
        let auth = HeaderValue::from_str(&format!("Basic {}", self.auth_basic))
            .map_err(|e| UniAiError::InvalidConfig(format!("credential: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    /// Request/decode-once contract for non-streaming endpoints.
    ///
    /// Returns `Ok(None)` when the body is empty (e.g. `HEAD`).
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Option<T>, UniAiError> {
        let url = self.endpoint(path);
        debug!("{} {}", method, url);

        let response = self
            .http
            .request(method, url)
            .headers(self.headers("application/json")?)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(status_error(status, &bytes).into());
        }
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn stream<B, T, F>(&self, path: &str, body: &B, mut on_line: F) -> Result<(), UniAiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
        F: FnMut(T) -> Result<(), HandlerError>,
    {
        let url = self.endpoint(path);
        debug!("POST {} (streaming)", url);

        let response = self
            .http
            .post(url)
            .headers(self.headers("application/x-ndjson")?)
            .json(body)
            .send()
            .await?;
        let status = response.status();

        let mut framer = LineFramer::default();
        let mut saw_line = false;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            for line in framer.push(&chunk?)? {
                saw_line = true;
                dispatch_line(status, &line, &mut on_line)?;
            }
        }
        if let Some(line) = framer.finish()? {
            saw_line = true;
            dispatch_line(status, &line, &mut on_line)?;
        }

        if !saw_line && is_error_status(status) {
            return Err(status_error(status, &[]).into());
        }
        Ok(())
    }
}

/// Apply the per-line protocol to one framed line.
fn dispatch_line<T, F>(status: StatusCode, line: &[u8], on_line: &mut F) -> Result<(), UniAiError>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<(), HandlerError>,
{
    trace!("stream line: {} bytes", line.len());

    let envelope: ErrorEnvelope = match serde_json::from_slice(line) {
        Ok(envelope) => envelope,
        Err(_) if is_error_status(status) => return Err(status_error(status, line).into()),
        Err(e) => return Err(e.into()),
    };

    if let Some(message) = envelope.error.filter(|m| !m.is_empty()) {
        return Err(UniAiError::Server { message });
    }

    if is_error_status(status) {
        return Err(StatusError {
            status_code: status.as_u16(),
            status: status.to_string(),
            error_message: String::new(),
        }
        .into());
    }

    let event: T = serde_json::from_slice(line)?;
    on_line(event).map_err(UniAiError::HandlerAborted)
}

fn is_error_status(status: StatusCode) -> bool {
    status.as_u16() >= 400
}

/// Build a [`StatusError`] from a body that may or may not be `{"error": …}`.
fn status_error(status: StatusCode, body: &[u8]) -> StatusError {
    let mut err = serde_json::from_slice::<StatusError>(body).unwrap_or_else(|_| StatusError {
        error_message: String::from_utf8_lossy(body).trim().to_string(),
        ..Default::default()
    });
    err.status_code = status.as_u16();
    err.status = status.to_string();
    err
}

fn user_agent() -> String {
    format!(
        "{}/{} ({} {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}
