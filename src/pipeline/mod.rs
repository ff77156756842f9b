//! Pipeline stages for cleaning a PDF book.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the extraction backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ classify ──▶ clean ──▶ frontmatter ──▶ write
//! (scan dir) (pdfium)   (chapters)   (rules)   (title+TOC)     (lopdf)
//! ```
//!
//! 1. [`input`]       — scan the input directory, validate PDF magic bytes
//! 2. [`extract`]     — per-page text with line geometry via pdfium
//! 3. [`classify`]    — match configured chapter markers, assign page roles
//! 4. [`clean`]       — strip footnote markers, citations, runners, page numbers
//! 5. [`frontmatter`] — generate the replacement title page and TOC
//! 6. [`write`]       — lay out the flow and build the output PDF with lopdf
//!
//! [`analyze`] sits beside the main flow: it reuses [`extract`] to parse a
//! book's printed TOC into a starter config instead of cleaning the book.

pub mod analyze;
pub mod classify;
pub mod clean;
pub mod extract;
pub mod frontmatter;
pub mod input;
pub mod write;
