//! Wire types for the inference service API.
//!
//! Requests serialise to the JSON bodies the service expects; responses
//! deserialise leniently (`#[serde(default)]`) because streaming events only
//! carry the fields relevant to their position in the stream. Metrics, for
//! instance, are present only on the final `done` event.

use crate::error::UniAiError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "uniai01:7b";

// ── Images ───────────────────────────────────────────────────────────────

/// Raw image bytes, carried over the wire as a base64 string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ImageData(pub Vec<u8>);

impl ImageData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ImageData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(ImageData)
            .map_err(serde::de::Error::custom)
    }
}

// ── Options ──────────────────────────────────────────────────────────────

/// Sampling parameters sent with every request.
///
/// Defaults: temperature 0.25, top-k 40, top-p 0.95. Low temperature keeps
/// transcription faithful to what is on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Sampling temperature, 0.0–2.0.
    pub temperature: f32,
    /// Number of highest-probability tokens considered, ≥ 1.
    pub top_k: u32,
    /// Nucleus sampling mass, 0.0–1.0.
    pub top_p: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            temperature: 0.25,
            top_k: 40,
            top_p: 0.95,
        }
    }
}

impl Options {
    /// Reject values the service would clamp or refuse.
    pub fn validate(&self) -> Result<(), UniAiError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(UniAiError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                self.temperature
            )));
        }
        if self.top_k == 0 {
            return Err(UniAiError::InvalidConfig("top_k must be ≥ 1".into()));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(UniAiError::InvalidConfig(format!(
                "top_p must be 0.0–1.0, got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

// ── Generate ─────────────────────────────────────────────────────────────

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system: String,
    pub options: Options,
    /// `None` lets the service pick its default (streaming).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Response format, e.g. `"json"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// How long the model stays loaded after the request, e.g. `"5m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Context returned by a previous response, for short conversational memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
}

/// One event of a `/api/generate` stream.
///
/// `response` is an incremental delta, not the cumulative text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateResponse {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// A single chat turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user_with_images(content: impl Into<String>, images: Vec<ImageData>) -> Self {
        Self {
            images,
            ..Self::user(content)
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// One event of a `/api/chat` stream; `message.content` is a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    pub model: String,
    pub created_at: String,
    pub message: Message,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

// ── Metrics ──────────────────────────────────────────────────────────────

/// Timing and token counters reported on the final event of a stream.
///
/// Durations are nanoseconds on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl Metrics {
    /// Human-readable block, one counter per line. Missing counters are omitted.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ns) = self.total_duration {
            lines.push(format!("total duration:       {:?}", Duration::from_nanos(ns)));
        }
        if let Some(ns) = self.load_duration {
            lines.push(format!("load duration:        {:?}", Duration::from_nanos(ns)));
        }
        if let Some(count) = self.prompt_eval_count {
            lines.push(format!("prompt eval count:    {count} token(s)"));
        }
        if let Some(ns) = self.prompt_eval_duration {
            lines.push(format!("prompt eval duration: {:?}", Duration::from_nanos(ns)));
            if let Some(rate) = rate(self.prompt_eval_count, ns) {
                lines.push(format!("prompt eval rate:     {rate:.2} tokens/s"));
            }
        }
        if let Some(count) = self.eval_count {
            lines.push(format!("eval count:           {count} token(s)"));
        }
        if let Some(ns) = self.eval_duration {
            lines.push(format!("eval duration:        {:?}", Duration::from_nanos(ns)));
            if let Some(rate) = rate(self.eval_count, ns) {
                lines.push(format!("eval rate:            {rate:.2} tokens/s"));
            }
        }

        lines.join("\n")
    }
}

fn rate(count: Option<u64>, duration_ns: u64) -> Option<f64> {
    match count {
        Some(count) if duration_ns > 0 => Some(count as f64 / (duration_ns as f64 / 1e9)),
        _ => None,
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// The service answered with HTTP status ≥ 400.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusError {
    #[serde(skip)]
    pub status_code: u16,
    #[serde(skip)]
    pub status: String,
    #[serde(rename = "error", default)]
    pub error_message: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status.is_empty(), self.error_message.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.status, self.error_message),
            (false, true) => f.write_str(&self.status),
            (true, false) => f.write_str(&self.error_message),
            (true, true) => f.write_str(
                "something went wrong, please see the server logs for details",
            ),
        }
    }
}

impl std::error::Error for StatusError {}

/// Body of `GET /api/version`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub version: String,
}
