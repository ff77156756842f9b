//! Result and statistics types returned by the cleaning pipeline.

use serde::Serialize;
use std::path::PathBuf;

/// Counters accumulated while cleaning one book.
///
/// `footnote_markers_removed` is the number the CLI reports per book; the
/// rest exist for `--json` output and for tests that pin down exactly what
/// the cleaner touched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanStats {
    /// Pages in the source document.
    pub source_pages: usize,
    /// Pages classified as chapter body text.
    pub body_pages: usize,
    /// Pages before the first chapter (original front matter, skipped).
    pub front_matter_pages: usize,
    /// Bibliography/index pages after the last chapter (skipped).
    pub excluded_pages: usize,
    /// Superscript / trailing-digit footnote markers stripped from prose.
    pub footnote_markers_removed: usize,
    /// Bracketed and author-year citation artifacts stripped.
    pub citations_removed: usize,
    /// Standalone page-number lines dropped.
    pub page_number_lines_removed: usize,
    /// Running header/footer lines dropped.
    pub header_lines_removed: usize,
    /// Footnote-sized text lines dropped.
    pub footnote_lines_removed: usize,
    /// Pages in the generated output document.
    pub output_pages: usize,
    /// Wall-clock time for the whole book.
    pub duration_ms: u64,
}

/// Where one configured chapter was found in the source.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    /// Heading as emitted in the output ("Part 1 - 3. TITLE" or "Preface").
    pub header: String,
    /// First source page of the chapter (0-indexed).
    pub start_page: usize,
    /// One past the last source page.
    pub end_page: usize,
}

/// Everything a caller needs to know about one cleaned book.
#[derive(Debug, Clone, Serialize)]
pub struct BookReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub chapters: Vec<ChapterSummary>,
    /// Configured chapter titles that never matched a page.
    pub missing_chapters: Vec<String>,
    pub stats: CleanStats,
}

/// Outcome of a whole batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<BookReport>,
    /// Files that failed, with the error rendered for display.
    pub failures: Vec<FailedBook>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedBook {
    pub source: PathBuf,
    pub error: String,
}

impl BatchSummary {
    /// Total footnote markers removed across the batch.
    pub fn total_footnote_markers(&self) -> usize {
        self.reports
            .iter()
            .map(|r| r.stats.footnote_markers_removed)
            .sum()
    }
}

/// The `_cleaned.json` sidecar consumed by downstream audiobook tooling:
/// book metadata plus the chapter list with offsets into the `_cleaned.txt`
/// sidecar.
#[derive(Debug, Clone, Serialize)]
pub struct TocSidecar {
    pub metadata: SidecarMetadata,
    pub chapters: Vec<SidecarChapter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidecarMetadata {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidecarChapter {
    pub part: String,
    pub num: String,
    pub title: String,
    /// Heading as it appears in the text sidecar.
    pub header: String,
    /// Byte offset of the heading in the text sidecar.
    pub text_offset: usize,
}
