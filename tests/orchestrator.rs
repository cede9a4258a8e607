//! Render → generate → sink, with a fake renderer and a mocked service.

use httpmock::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uniai_client::{
    generate_pages, render_pages, run_pages, Client, FileSink, NoopProgress, PageError,
    PageRenderer, PageSelection, ProgressCallback, RenderedPages, RequestTemplate, RunConfig,
    WriterSink,
};

/// Writes a tiny placeholder image per page, like the pdfium renderer would.
struct DiskRenderer {
    dir: PathBuf,
}

impl PageRenderer for DiskRenderer {
    fn render_page(&self, page_num: usize) -> Result<PathBuf, PageError> {
        let path = self.dir.join(format!("page_{page_num}.jpg"));
        std::fs::write(&path, format!("image-{page_num}")).map_err(|e| PageError::WriteFailed {
            page: page_num,
            path: path.clone(),
            detail: e.to_string(),
        })?;
        Ok(path)
    }
}

fn noop() -> ProgressCallback {
    Arc::new(NoopProgress)
}

async fn rendered(dir: &Path, pages: &[usize], total: usize) -> RenderedPages {
    let renderer = Arc::new(DiskRenderer {
        dir: dir.to_path_buf(),
    });
    render_pages(renderer, pages, total, 2, &noop()).await
}

async fn answering_server() -> MockServer {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body(concat!(
                r#"{"response":"Hello ","done":false}"#,
                "\n",
                r#"{"response":"page","done":false}"#,
                "\n",
                r#"{"response":"","done":true,"eval_count":4,"eval_duration":2000000000}"#,
                "\n",
            ));
        })
        .await;
    server
}

#[tokio::test]
async fn deltas_and_summary_reach_the_writer_sink() {
    let tmp = tempfile::tempdir().unwrap();
    let server = answering_server().await;
    let client = Client::new(Some(&server.base_url()), "k").unwrap();
    let pages = rendered(tmp.path(), &[1, 2], 2).await;

    let mut sink = WriterSink::new(Vec::new());
    let outcome = generate_pages(&client, &pages, &RequestTemplate::new("Describe"), &mut sink).await;

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 0);
    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out.matches("Hello page\n").count(), 2);
    assert!(out.contains("eval count:           4 token(s)"));
    assert!(out.contains("eval rate:            2.00 tokens/s"));
}

#[tokio::test]
async fn missing_image_is_skipped_and_later_pages_continue() {
    let tmp = tempfile::tempdir().unwrap();
    let server = answering_server().await;
    let client = Client::new(Some(&server.base_url()), "k").unwrap();
    let pages = rendered(tmp.path(), &[1, 2, 3], 3).await;
    std::fs::remove_file(&pages.get(2).unwrap().path).unwrap();

    let out_dir = tmp.path().join("response");
    let mut sink = FileSink::new(&out_dir);
    let outcome = generate_pages(&client, &pages, &RequestTemplate::new("Describe"), &mut sink).await;

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);
    assert!(out_dir.join("page_1.txt").exists());
    assert!(!out_dir.join("page_2.txt").exists());
    let page3 = std::fs::read_to_string(out_dir.join("page_3.txt")).unwrap();
    assert!(page3.starts_with("Hello page\n"));
}

#[tokio::test]
async fn service_error_on_one_page_does_not_stop_the_others() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start_async().await;
    // Page 2's image is "image-2", base64 "aW1hZ2UtMg==".
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_includes(r#"{"images":["aW1hZ2UtMg=="]}"#);
            then.status(200).body("{\"error\":\"image too large\"}\n");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body("{\"response\":\"ok\",\"done\":true}\n");
        })
        .await;
    let client = Client::new(Some(&server.base_url()), "k").unwrap();
    let pages = rendered(tmp.path(), &[1, 2, 3], 3).await;

    let mut sink = FileSink::new(tmp.path().join("response"));
    let outcome = generate_pages(&client, &pages, &RequestTemplate::new("Describe"), &mut sink).await;

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(
        std::fs::read_to_string(sink.page_path(3)).unwrap(),
        "ok\n"
    );
}

#[tokio::test]
async fn run_pages_reports_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let server = answering_server().await;
    let client = Client::new(Some(&server.base_url()), "k").unwrap();

    let config = RunConfig::builder(tmp.path().join("doc.pdf"), "Describe")
        .output_dir(tmp.path())
        .pages("1-2,4,9".parse::<PageSelection>().unwrap())
        .parallel(true)
        .concurrency(2)
        .build()
        .unwrap();
    let renderer = Arc::new(DiskRenderer {
        dir: tmp.path().to_path_buf(),
    });

    let mut sink = WriterSink::new(Vec::new());
    let report = run_pages(&client, &config, renderer, 5, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.total_pages, 5);
    assert_eq!(report.requested_pages, 4);
    assert_eq!(report.rendered_pages, 3);
    assert_eq!(report.generated_pages, 3);
    assert_eq!(report.failed_pages, 1);
    assert!(!report.is_complete());
}
