//! Page pipeline stages, ahead of the inference service.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pages ──▶ schedule ──▶ render (× N)
//! (%PDF)    (selector) (semaphore)  (pdfium → JPEG)
//! ```
//!
//! 1. [`input`]    — validate that the user-supplied path is a readable PDF
//! 2. [`pages`]    — parse a page selector such as `"1-3,5"`
//! 3. [`schedule`] — fan renders out over the blocking pool under a
//!    concurrency cap and collect them into page-indexed slots
//! 4. [`render`]   — rasterise one page and write it to disk; pdfium is not
//!    async-safe, so this always runs in `spawn_blocking`

pub mod input;
pub mod pages;
pub mod render;
pub mod schedule;
