//! Cleaning entry points: one book, or a whole input directory.
//!
//! Processing is strictly batch-sequential: one file is fully read,
//! cleaned, and written before the next begins. Nothing is shared between
//! files except the loaded [`ConfigStore`], so a failure in one book can
//! never corrupt another; the batch driver logs it and moves on. Re-running
//! the tool is the recovery mechanism: every step is deterministic and
//! output is only written after a book has fully processed.

use crate::config::{BookConfig, CleanOptions, ConfigStore};
use crate::error::BookCleanError;
use crate::output::{
    BatchSummary, BookReport, ChapterSummary, CleanStats, FailedBook, SidecarChapter,
    SidecarMetadata, TocSidecar,
};
use crate::pipeline::classify::{self, PageRole};
use crate::pipeline::clean::{self, RunningLineIndex};
use crate::pipeline::frontmatter;
use crate::pipeline::write::{self, FlowItem, Style};
use crate::pipeline::{extract, input};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// A fully cleaned book, not yet written to disk.
pub struct CleanedBook {
    /// The assembled output PDF.
    pub document: lopdf::Document,
    pub title: String,
    pub chapters: Vec<ChapterSummary>,
    pub missing_chapters: Vec<String>,
    pub stats: CleanStats,
    /// Cleaned plain text (chapter headings included), for the `.txt` sidecar.
    pub plain_text: String,
    /// Chapter index into `plain_text`, for the `.json` sidecar.
    pub toc: TocSidecar,
}

/// Clean one book in memory.
///
/// # Errors
/// Per-file errors (unreadable PDF, no chapter matched, nothing left after
/// cleaning) are returned as `Err`; the caller decides whether that ends a
/// batch. See [`BookCleanError::is_batch_fatal`].
pub fn clean_book(
    source: &Path,
    config: &BookConfig,
    options: &CleanOptions,
) -> Result<CleanedBook, BookCleanError> {
    info!("Cleaning '{}'", source.display());
    let settings = &config.settings;

    // ── Step 1: Validate input ───────────────────────────────────────────
    let source = input::resolve_pdf(source)?;

    // ── Step 2: Extract page text with geometry ──────────────────────────
    let pages = extract::extract_pages(&source, options.password.as_deref())?;
    let total_pages = pages.len();
    if let Some(ref cb) = options.progress {
        cb.on_book_start(&source, total_pages);
    }

    // ── Step 3: Locate chapters ──────────────────────────────────────────
    let classification = classify::locate_chapters(&pages, config);
    if classification.chapters.is_empty() {
        return Err(BookCleanError::NoChaptersFound {
            path: source.clone(),
        });
    }

    // ── Step 4: Clean body pages ─────────────────────────────────────────
    let mut stats = CleanStats {
        source_pages: total_pages,
        ..CleanStats::default()
    };
    for role in &classification.roles {
        match role {
            PageRole::FrontMatter => stats.front_matter_pages += 1,
            PageRole::Body { .. } => stats.body_pages += 1,
            PageRole::Excluded => stats.excluded_pages += 1,
        }
    }

    let body_pages = pages
        .iter()
        .filter(|p| matches!(classification.roles[p.index], PageRole::Body { .. }));
    let runners = RunningLineIndex::build(body_pages, settings);

    let mut chapter_texts: Vec<Vec<String>> = Vec::with_capacity(classification.chapters.len());
    for chapter in &classification.chapters {
        let mut paragraphs: Vec<String> = Vec::new();
        for page in &pages[chapter.start_page..chapter.end_page] {
            let cleaned = clean::clean_page(page, chapter, &runners, settings, &mut stats);
            paragraphs.extend(cleaned.paragraphs);
            if let Some(ref cb) = options.progress {
                cb.on_page_processed(page.index + 1, total_pages);
            }
        }
        paragraphs.retain(|p| !p.is_empty());
        chapter_texts.push(paragraphs);
    }

    if chapter_texts.iter().all(|t| t.is_empty()) {
        return Err(BookCleanError::EmptyBook {
            path: source.clone(),
        });
    }

    // ── Step 5: Assemble the output flow ─────────────────────────────────
    let mut flow = frontmatter::front_matter_flow(config);
    for (i, (chapter, paragraphs)) in classification
        .chapters
        .iter()
        .zip(&chapter_texts)
        .enumerate()
    {
        if i > 0 {
            flow.push(FlowItem::PageBreak);
        }
        flow.push(FlowItem::paragraph(
            clean::normalize_text(&chapter.entry.display_header()),
            Style::Heading,
        ));
        flow.push(FlowItem::VSpace(10.0));
        for paragraph in paragraphs {
            flow.push(FlowItem::paragraph(paragraph.clone(), Style::Body));
        }
    }

    // ── Step 6: Render the output PDF ────────────────────────────────────
    let document = write::render_document(&flow)?;
    stats.output_pages = document.get_pages().len();

    // ── Step 7: Build the sidecar views ──────────────────────────────────
    let (plain_text, toc) = build_sidecars(config, &classification.chapters, &chapter_texts);

    let chapters = classification
        .chapters
        .iter()
        .map(|c| ChapterSummary {
            header: c.entry.display_header(),
            start_page: c.start_page,
            end_page: c.end_page,
        })
        .collect();

    info!(
        "Cleaned '{}': {} chapters, {} footnote markers removed",
        source.display(),
        classification.chapters.len(),
        stats.footnote_markers_removed
    );

    Ok(CleanedBook {
        document,
        title: config.metadata.title.clone(),
        chapters,
        missing_chapters: classification.missing,
        stats,
        plain_text,
        toc,
    })
}

/// Clean one book and write the output PDF (plus sidecars) into `output_dir`.
pub fn clean_book_to_file(
    source: &Path,
    output_dir: &Path,
    config: &BookConfig,
    options: &CleanOptions,
) -> Result<BookReport, BookCleanError> {
    let started = Instant::now();

    std::fs::create_dir_all(output_dir).map_err(|e| BookCleanError::OutputDirUnavailable {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let mut cleaned = clean_book(source, config, options)?;

    let output_path = output_dir.join(input::cleaned_file_name(source));
    write::save_document(&mut cleaned.document, &output_path)?;

    if options.write_sidecars {
        let txt_path = output_path.with_extension("txt");
        std::fs::write(&txt_path, &cleaned.plain_text).map_err(|e| {
            BookCleanError::OutputWriteFailed {
                path: txt_path,
                source: e,
            }
        })?;

        let json_path = output_path.with_extension("json");
        let json = serde_json::to_string_pretty(&cleaned.toc)
            .map_err(|e| BookCleanError::Internal(e.to_string()))?;
        std::fs::write(&json_path, json).map_err(|e| BookCleanError::OutputWriteFailed {
            path: json_path,
            source: e,
        })?;
    }

    let mut stats = cleaned.stats;
    stats.duration_ms = started.elapsed().as_millis() as u64;

    Ok(BookReport {
        source: source.to_path_buf(),
        output: output_path,
        title: cleaned.title,
        chapters: cleaned.chapters,
        missing_chapters: cleaned.missing_chapters,
        stats,
    })
}

/// Clean every PDF in `input_dir`, writing results to `output_dir`.
///
/// Configs are resolved per file from `config_dir` by filename pattern,
/// falling back to the template. Per-file failures are logged and recorded
/// in the summary; batch-fatal errors propagate.
pub fn process_batch(
    input_dir: &Path,
    output_dir: &Path,
    config_dir: &Path,
    options: &CleanOptions,
) -> Result<BatchSummary, BookCleanError> {
    std::fs::create_dir_all(output_dir).map_err(|e| BookCleanError::OutputDirUnavailable {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let sources = input::scan_input_dir(input_dir)?;
    let store = ConfigStore::load_dir(config_dir);
    info!(
        "Processing {} PDF(s) with {} config(s)",
        sources.len(),
        store.len()
    );

    let mut summary = BatchSummary::default();
    for source in sources {
        let file_name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let config = store.resolve_or_template(&file_name);

        match clean_book_to_file(&source, output_dir, &config, options) {
            Ok(report) => {
                if let Some(ref cb) = options.progress {
                    cb.on_book_complete(&source, &report);
                }
                summary.reports.push(report);
            }
            Err(e) if e.is_batch_fatal() => return Err(e),
            Err(e) => {
                warn!("Skipping '{}': {}", source.display(), e);
                if let Some(ref cb) = options.progress {
                    cb.on_book_failed(&source, &e.to_string());
                }
                summary.failures.push(FailedBook {
                    source,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// Build the plain-text sidecar and its chapter index.
fn build_sidecars(
    config: &BookConfig,
    chapters: &[classify::Chapter],
    chapter_texts: &[Vec<String>],
) -> (String, TocSidecar) {
    let mut text = String::new();
    let mut sidecar_chapters = Vec::with_capacity(chapters.len());

    for (chapter, paragraphs) in chapters.iter().zip(chapter_texts) {
        let header = clean::normalize_text(&chapter.entry.display_header());
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        let offset = text.len();
        text.push_str(&header);
        text.push_str("\n\n");
        text.push_str(&paragraphs.join("\n\n"));

        sidecar_chapters.push(SidecarChapter {
            part: chapter.entry.part.clone(),
            num: chapter.entry.num.clone(),
            title: chapter.entry.title.clone(),
            header,
            text_offset: offset,
        });
    }
    text.push('\n');

    let toc = TocSidecar {
        metadata: SidecarMetadata {
            title: config.metadata.title.clone(),
            author: config.metadata.author.clone(),
        },
        chapters: sidecar_chapters,
    };

    (text, toc)
}

/// Convenience: the output path `clean_book_to_file` would use.
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(input::cleaned_file_name(source))
}
