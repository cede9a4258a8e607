//! PDF rasterisation: render one page to a JPEG on disk via pdfium.
//!
//! [`PageRenderer`] is the seam between the scheduler and the rendering
//! backend. Implementations are called from the blocking thread pool, one
//! call per page, possibly several at once, so they must be `Send + Sync`
//! and must not share non-thread-safe handles between calls.
//!
//! [`PdfiumRenderer`] reads the PDF bytes once and opens a fresh pdfium
//! document from them inside every call; pdfium documents are not `Send`.

use crate::error::{PageError, UniAiError};
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A successfully rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Where the image was written.
    pub path: PathBuf,
}

/// Renders a single page to an image file.
pub trait PageRenderer: Send + Sync + 'static {
    /// Rasterise `page_num` (1-indexed) and persist it, returning the file path.
    ///
    /// Blocking: called on the blocking thread pool.
    fn render_page(&self, page_num: usize) -> Result<PathBuf, PageError>;
}

/// File name used for a rendered page image.
pub fn page_image_name(page_num: usize) -> String {
    format!("page_{page_num}.jpg")
}

// ── pdfium binding ───────────────────────────────────────────────────────

/// Bind the pdfium library for the current call.
///
/// Resolution order: `PDFIUM_LIB_PATH`, a library in the working directory,
/// then the system library path. Bindings are not `Send`, so every blocking
/// task binds its own.
fn bind_pdfium() -> Result<Pdfium, UniAiError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| UniAiError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

// ── PdfiumRenderer ───────────────────────────────────────────────────────

/// Renders pages of one PDF to `<out_dir>/page_<N>.jpg`.
pub struct PdfiumRenderer {
    source: PathBuf,
    bytes: Vec<u8>,
    password: Option<String>,
    out_dir: PathBuf,
    width: u32,
    quality: u8,
    page_count: usize,
}

impl std::fmt::Debug for PdfiumRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRenderer")
            .field("source", &self.source)
            .field("bytes", &self.bytes.len())
            .field("out_dir", &self.out_dir)
            .field("width", &self.width)
            .field("quality", &self.quality)
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl PdfiumRenderer {
    /// Read and open the PDF once to validate it and learn its page count.
    ///
    /// Blocking; call from `spawn_blocking` in async code.
    pub fn open(
        pdf_path: &Path,
        password: Option<&str>,
        out_dir: &Path,
        width: u32,
        quality: u8,
    ) -> Result<Self, UniAiError> {
        let bytes = std::fs::read(pdf_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => UniAiError::PermissionDenied {
                path: pdf_path.to_path_buf(),
            },
            _ => UniAiError::FileNotFound {
                path: pdf_path.to_path_buf(),
            },
        })?;

        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&bytes, password)
            .map_err(|e| classify_load_error(pdf_path, password, e))?;
        let page_count = document.pages().len() as usize;
        drop(document);
        info!("PDF loaded: {} pages", page_count);

        Ok(Self {
            source: pdf_path.to_path_buf(),
            bytes,
            password: password.map(str::to_string),
            out_dir: out_dir.to_path_buf(),
            width,
            quality,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(&self, page_num: usize) -> Result<PathBuf, PageError> {
        let render_failed = |detail: String| PageError::RenderFailed {
            page: page_num,
            detail,
        };

        if page_num == 0 || page_num > self.page_count {
            return Err(PageError::OutOfRange {
                page: page_num,
                total: self.page_count,
            });
        }

        let pdfium = bind_pdfium().map_err(|e| render_failed(e.to_string()))?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, self.password.as_deref())
            .map_err(|e| render_failed(format!("{e:?}")))?;
        let index = u16::try_from(page_num - 1)
            .map_err(|_| render_failed("page index exceeds pdfium's u16 range".into()))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|e| render_failed(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new().set_target_width(self.width as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_failed(format!("{e:?}")))?;
        // JPEG has no alpha channel.
        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        let path = self.out_dir.join(page_image_name(page_num));
        let write_failed = |detail: String| PageError::WriteFailed {
            page: page_num,
            path: path.clone(),
            detail,
        };
        let file = File::create(&path).map_err(|e| write_failed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(&image)
            .map_err(|e| write_failed(e.to_string()))?;
        std::io::Write::flush(&mut writer).map_err(|e| write_failed(e.to_string()))?;

        Ok(path)
    }
}

/// Map a pdfium load failure onto the fatal error a user can act on.
fn classify_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> UniAiError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            UniAiError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            UniAiError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        UniAiError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}
