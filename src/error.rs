//! Error types for the uniai-client library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`UniAiError`] — **Fatal** for the operation that returns it: the run
//!   cannot start (bad input file, malformed page range, missing credential),
//!   or a single request to the inference service terminated (HTTP status,
//!   in-stream `error` field, handler abort).
//!
//! * [`PageError`] — **Non-fatal**: one page could not be rendered. The
//!   scheduler logs it, reports it to the progress callback and moves on, so
//!   one bad page never costs the rest of the document.
//!
//! Nothing in this crate retries. A failed request surfaces exactly once.

use crate::client::StatusError;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by a streaming event handler to stop the stream.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// All fatal errors returned by the uniai-client library.
#[derive(Debug, Error)]
pub enum UniAiError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The `--pages` expression could not be parsed.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(#[from] PageRangeError),

    /// The path exists but is not a regular file.
    #[error("'{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// The file could be opened but reading its header failed.
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or client validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The base URL of the inference service is unusable.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    // ── Inference service errors ──────────────────────────────────────────
    /// The request never produced a usable response (connect, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with HTTP status ≥ 400.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// A stream line carried a non-empty `error` field.
    #[error("{message}")]
    Server { message: String },

    /// A response body or stream line was not the JSON we expected.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A single stream line exceeded the framing limit.
    #[error("Stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// The caller's event handler asked to stop the stream.
    #[error("Stream stopped by handler: {0}")]
    HandlerAborted(#[source] HandlerError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory or file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A malformed page-selector expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    /// A range item did not split into exactly two parts around `-`.
    #[error("invalid page range format: '{0}'")]
    InvalidRange(String),

    /// A part was not a non-negative integer.
    #[error("invalid page number: '{0}'")]
    InvalidNumber(String),

    /// `start` was greater than `end`.
    #[error("page range '{start}-{end}' runs backwards")]
    ReversedRange { start: usize, end: usize },

    /// A page number beyond anything a PDF can address.
    #[error("page {page} exceeds the maximum page number {max}")]
    PageTooLarge { page: usize, max: usize },
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Requested page is outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    OutOfRange { page: usize, total: usize },

    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered image could not be written.
    #[error("Page {page}: failed to write '{path}': {detail}")]
    WriteFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },
}

impl PageError {
    /// The 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::OutOfRange { page, .. }
            | PageError::RenderFailed { page, .. }
            | PageError::WriteFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_message_verbatim() {
        let e = UniAiError::Server {
            message: "quota exceeded".into(),
        };
        assert_eq!(e.to_string(), "quota exceeded");
    }

    #[test]
    fn status_error_is_transparent() {
        let e = UniAiError::from(StatusError {
            status_code: 404,
            status: "404 Not Found".into(),
            error_message: "model not found".into(),
        });
        assert_eq!(e.to_string(), "404 Not Found: model not found");
    }

    #[test]
    fn page_range_error_names_substring() {
        let e = UniAiError::from(PageRangeError::InvalidNumber("x".into()));
        assert!(e.to_string().contains("'x'"), "got: {e}");
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::RenderFailed {
            page: 7,
            detail: "boom".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("Page 7"));
    }

    #[test]
    fn handler_abort_keeps_source() {
        use std::error::Error as _;
        let inner: HandlerError = "disk full".into();
        let e = UniAiError::HandlerAborted(inner);
        assert_eq!(e.source().map(|s| s.to_string()), Some("disk full".into()));
    }
}
