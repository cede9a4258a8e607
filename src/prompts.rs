//! System instructions sent alongside every page.
//!
//! Callers can override the default via
//! [`crate::config::RunConfigBuilder::system_prompt`]; the constant here is
//! used only when no override is given.

/// Default system instruction for page requests.
///
/// Lets users opt into OCR-first behaviour from the prompt alone by asking
/// for "high precision".
pub const DEFAULT_SYSTEM_PROMPT: &str = "If user mentioned to process with 'high precision', \
it means prioritize to OCR the image file from request";
