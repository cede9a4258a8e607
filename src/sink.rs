//! Where per-page responses go.
//!
//! The orchestrator asks the sink for a writer at the start of every page
//! and streams deltas into it. [`WriterSink`] funnels every page into one
//! writer; [`FileSink`] gives each page its own `page_<N>.txt`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-page output destination.
pub trait ResponseSink: Send {
    /// Writer for one page's response. Dropped when the page is finished.
    fn page_writer(&mut self, page_num: usize) -> io::Result<Box<dyn Write + Send + '_>>;
}

/// Sends every page to the same writer, e.g. stdout.
#[derive(Debug)]
pub struct WriterSink<W> {
    inner: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ResponseSink for WriterSink<W> {
    fn page_writer(&mut self, _page_num: usize) -> io::Result<Box<dyn Write + Send + '_>> {
        Ok(Box::new(&mut self.inner))
    }
}

/// Writes page `N` to `<dir>/page_<N>.txt`, creating `dir` on first use.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path page `page_num` is written to.
    pub fn page_path(&self, page_num: usize) -> PathBuf {
        self.dir.join(format!("page_{page_num}.txt"))
    }
}

impl ResponseSink for FileSink {
    fn page_writer(&mut self, page_num: usize) -> io::Result<Box<dyn Write + Send + '_>> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.page_path(page_num);
        debug!("Writing response for page {} to {}", page_num, path.display());
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_concatenates_pages() {
        let mut sink = WriterSink::new(Vec::new());
        sink.page_writer(1).unwrap().write_all(b"one ").unwrap();
        sink.page_writer(2).unwrap().write_all(b"two").unwrap();
        assert_eq!(sink.into_inner(), b"one two");
    }

    #[test]
    fn file_sink_creates_dir_and_one_file_per_page() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("doc").join("response");
        let mut sink = FileSink::new(&dir);

        {
            let mut w = sink.page_writer(4).unwrap();
            w.write_all(b"hello").unwrap();
            w.flush().unwrap();
        }
        {
            let mut w = sink.page_writer(9).unwrap();
            w.write_all(b"world").unwrap();
        }

        assert_eq!(std::fs::read_to_string(dir.join("page_4.txt")).unwrap(), "hello");
        assert_eq!(std::fs::read_to_string(dir.join("page_9.txt")).unwrap(), "world");
    }

    #[test]
    fn file_sink_truncates_on_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(tmp.path());
        sink.page_writer(1).unwrap().write_all(b"first run, long").unwrap();
        sink.page_writer(1).unwrap().write_all(b"second").unwrap();
        assert_eq!(
            std::fs::read_to_string(sink.page_path(1)).unwrap(),
            "second"
        );
    }
}
