//! Error types for the pdf-bookclean library.
//!
//! One enum, two tiers of severity by convention:
//!
//! * **Per-file**: the current book cannot be cleaned (unreadable PDF, no
//!   chapter markers matched, malformed config). [`crate::convert::process_batch`]
//!   catches these, logs them, and moves on to the next input file.
//!
//! * **Batch-fatal**: nothing useful can happen for any file (output
//!   directory cannot be created, input directory unreadable, pdfium not
//!   bindable). These propagate out of `process_batch` as `Err`.
//!
//! The split matters because a shelf of scanned books usually contains one
//! or two broken files; losing the whole batch to them would make re-runs
//! painful for no benefit.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-bookclean library.
#[derive(Debug, Error)]
pub enum BookCleanError {
    // ── Input errors (per-file) ───────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The input directory could not be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors (per-file) ─────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Config errors (per-file) ──────────────────────────────────────────
    /// A config file exists but cannot be used (bad JSON, missing chapter
    /// fields, empty titles).
    #[error("Invalid book config '{path}': {detail}")]
    ConfigInvalid { path: PathBuf, detail: String },

    // ── Processing errors (per-file) ──────────────────────────────────────
    /// None of the configured chapter markers matched any page.
    #[error("No chapter markers matched in '{path}'; nothing to clean")]
    NoChaptersFound { path: PathBuf },

    /// Chapters were located but every page cleaned down to nothing.
    #[error("'{path}' produced no body text after cleaning")]
    EmptyBook { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created or written. Batch-fatal.
    #[error("Output directory '{path}' is unavailable: {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// lopdf rejected the document we assembled.
    #[error("Failed to build output PDF: {detail}")]
    PdfBuildFailed { detail: String },

    // ── Pdfium binding errors (batch-fatal) ───────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place the platform library\n\
next to the executable, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookCleanError {
    /// Whether the batch driver should abort instead of skipping the file.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            BookCleanError::OutputDirUnavailable { .. }
                | BookCleanError::InputDirUnreadable { .. }
                | BookCleanError::PdfiumBindingFailed(_)
        )
    }
}
