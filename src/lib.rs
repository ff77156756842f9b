//! # pdf-bookclean
//!
//! Convert a scanned PDF book into a cleaned, linearly paginated PDF
//! suitable for text-to-speech ingestion.
//!
//! ## Why this crate?
//!
//! TTS engines narrate everything a PDF gives them: running headers on
//! every page, footnote markers glued to words, citation parentheticals,
//! standalone page numbers. A listener hears "migration twelve" where the
//! author wrote "migration¹²". This crate strips that apparatus out of the
//! extracted text, regenerates the front matter from a declarative chapter
//! config, and writes a plain, linear PDF a narration pipeline can ingest.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       scan the input directory, validate magic bytes
//!  ├─ 2. Extract     per-page text with line geometry (pdfium)
//!  ├─ 3. Classify    match configured chapter markers, assign page roles
//!  ├─ 4. Clean       footnote markers, citations, runners, page numbers
//!  ├─ 5. Front matter generated title page + table of contents
//!  └─ 6. Write       deterministic output PDF (lopdf) + text/TOC sidecars
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_bookclean::{clean_book_to_file, BookConfig, CleanOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BookConfig::from_json_file(Path::new("configs/mybook.json"))?;
//!     let report = clean_book_to_file(
//!         Path::new("input/mybook.pdf"),
//!         Path::new("output"),
//!         &config,
//!         &CleanOptions::default(),
//!     )?;
//!     println!(
//!         "{}: removed {} footnote markers",
//!         report.title, report.stats.footnote_markers_removed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bookclean` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf-bookclean = { version = "0.4", default-features = false }
//! ```
//!
//! ## Requirements
//!
//! Text extraction binds the pdfium shared library at runtime: set
//! `PDFIUM_LIB_PATH`, place the platform library next to the executable,
//! or install it system-wide. Output writing is pure Rust (lopdf) and needs
//! nothing external.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BookConfig, BookMetadata, ChapterEntry, CleanOptions, ConfigStore, Settings};
pub use convert::{clean_book, clean_book_to_file, process_batch, CleanedBook};
pub use error::BookCleanError;
pub use output::{BatchSummary, BookReport, ChapterSummary, CleanStats, TocSidecar};
pub use pipeline::analyze::{analyze_batch, analyze_book};
pub use progress::{CleanProgressCallback, NoopProgressCallback, ProgressCallback};
