//! Per-page generation: one streaming request per rendered page.
//!
//! Pages are sent in page order, one at a time. Each delta is written and
//! flushed to the page's writer as soon as it arrives; the final event adds
//! a newline and the timing summary. A page that fails (unreadable image,
//! sink error, request error) is logged and counted, and the next page is
//! attempted.

use crate::client::{Client, GenerateRequest, GenerateResponse, ImageData, Options, DEFAULT_MODEL};
use crate::config::RunConfig;
use crate::error::HandlerError;
use crate::pipeline::schedule::RenderedPages;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::sink::ResponseSink;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, info, warn};

/// The parts of a [`GenerateRequest`] shared by every page of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    pub model: String,
    pub prompt: String,
    pub system: String,
    pub options: Options,
    pub keep_alive: Option<String>,
}

impl RequestTemplate {
    /// Template with the default model, system instruction and options.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: prompt.into(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            options: Options::default(),
            keep_alive: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            system: config.system_prompt.clone(),
            options: config.options,
            keep_alive: None,
        }
    }

    /// Streaming request for one page image.
    pub fn request_for(&self, image: ImageData) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            images: vec![image],
            system: self.system.clone(),
            options: self.options,
            stream: Some(true),
            format: None,
            keep_alive: self.keep_alive.clone(),
            context: None,
        }
    }
}

/// Page counts from a generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Send every rendered page to the service, streaming responses into `sink`.
pub async fn generate_pages(
    client: &Client,
    pages: &RenderedPages,
    template: &RequestTemplate,
    sink: &mut dyn ResponseSink,
) -> GenerationOutcome {
    let mut outcome = GenerationOutcome::default();

    for page in pages.iter() {
        let bytes = match tokio::fs::read(&page.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "Page {}: cannot read image {}: {}",
                    page.page_num,
                    page.path.display(),
                    e
                );
                outcome.failed += 1;
                continue;
            }
        };
        debug!("Page {}: sending {} image bytes", page.page_num, bytes.len());
        let request = template.request_for(ImageData::new(bytes));

        let mut writer = match sink.page_writer(page.page_num) {
            Ok(w) => w,
            Err(e) => {
                warn!("Page {}: cannot open response output: {}", page.page_num, e);
                outcome.failed += 1;
                continue;
            }
        };

        let result = client
            .generate(&request, |event: GenerateResponse| -> Result<(), HandlerError> {
                writer.write_all(event.response.as_bytes())?;
                if event.done {
                    writer.write_all(done_trailer(&event).as_bytes())?;
                }
                writer.flush()?;
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                info!("Page {}: response complete", page.page_num);
                outcome.succeeded += 1;
            }
            Err(e) => {
                warn!("Page {}: generation failed: {}", page.page_num, e);
                outcome.failed += 1;
            }
        }
    }

    outcome
}

/// Text written after the last delta of a page.
fn done_trailer(event: &GenerateResponse) -> String {
    let summary = event.metrics.summary();
    if summary.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{summary}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Metrics;

    #[test]
    fn template_defaults() {
        let t = RequestTemplate::new("Describe");
        assert_eq!(t.model, DEFAULT_MODEL);
        assert_eq!(t.system, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(t.options, Options::default());
    }

    #[test]
    fn request_embeds_one_image_and_streams() {
        let t = RequestTemplate::new("Describe");
        let req = t.request_for(ImageData::new(vec![1, 2, 3]));
        assert_eq!(req.images.len(), 1);
        assert_eq!(req.stream, Some(true));
        assert_eq!(req.prompt, "Describe");
        assert_eq!(req.system, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn template_follows_run_config() {
        let config = RunConfig::builder("a.pdf", "Transcribe")
            .model("other:1b")
            .system_prompt("be terse")
            .build()
            .unwrap();
        let t = RequestTemplate::from_config(&config);
        assert_eq!(t.model, "other:1b");
        assert_eq!(t.system, "be terse");
        assert_eq!(t.prompt, "Transcribe");
    }

    #[test]
    fn trailer_includes_summary_when_present() {
        let bare = GenerateResponse {
            done: true,
            ..Default::default()
        };
        assert_eq!(done_trailer(&bare), "\n");

        let with_metrics = GenerateResponse {
            done: true,
            metrics: Metrics {
                eval_count: Some(10),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(done_trailer(&with_metrics), "\neval count:           10 token(s)\n");
    }
}
