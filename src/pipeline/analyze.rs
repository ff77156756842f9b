//! Config generation: bootstrap a [`BookConfig`] from a book's printed
//! table of contents.
//!
//! Hand-writing a chapter list for every book is the slowest part of
//! preparing a shelf, and most books carry a perfectly good TOC in their
//! first twenty pages. This stage finds it, parses `title …… page` entry
//! lines, and writes a starter config the user can touch up.
//!
//! TOC parsing is heuristic and the filters are deliberately aggressive:
//! a wrapped title fragment that slips through produces a chapter marker
//! that never matches, which is a far worse failure than a dropped entry
//! the user re-adds by hand.

use crate::config::{BookConfig, BookMetadata, ChapterEntry, Settings};
use crate::error::BookCleanError;
use crate::pipeline::extract::{self, PageText};
use crate::pipeline::input;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How many pages from the front to scan for the TOC heading.
const TOC_SCAN_PAGES: usize = 20;

/// A long TOC spills over; scan the heading page plus this many more.
const TOC_CONTINUATION_PAGES: usize = 2;

// "Chapter title ...... 123" with optional dot leaders.
static RE_TOC_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s+[.\s]*(\d{1,4})$").unwrap());
static RE_PART_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^PART\s+(?:[IVXLC]+|\d+)\b").unwrap());
static RE_TRAILING_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\s]+$").unwrap());
static RE_BARE_NUMBER_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.\s]*$").unwrap());

/// Generate a config for one book, or `None` when no TOC heading is found.
pub fn analyze_book(
    path: &Path,
    password: Option<&str>,
) -> Result<Option<BookConfig>, BookCleanError> {
    let path = input::resolve_pdf(path)?;
    let pages = extract::extract_pages(&path, password)?;

    let toc_idx = match find_toc_page(&pages) {
        Some(idx) => idx,
        None => {
            warn!("No table of contents found in '{}'", path.display());
            return Ok(None);
        }
    };
    info!("Found TOC at page {} in '{}'", toc_idx, path.display());

    let scan_end = (toc_idx + 1 + TOC_CONTINUATION_PAGES).min(pages.len());
    let lines: Vec<String> = pages[toc_idx..scan_end]
        .iter()
        .flat_map(|page| page.lines.iter().map(|l| l.text.clone()))
        .collect();

    let chapters = parse_toc_entries(&lines);
    if chapters.is_empty() {
        warn!("No chapter entries parsed from TOC in '{}'", path.display());
        return Ok(None);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());

    Ok(Some(BookConfig {
        metadata: BookMetadata {
            title: stem.replace('_', " "),
            author: "Unknown".to_string(),
            filename_pattern: stem,
        },
        settings: Settings {
            toc_end_page: scan_end,
            ..Settings::default()
        },
        chapters,
    }))
}

/// Generate configs for every PDF in `input_dir`, writing one JSON per book
/// into `config_dir`. Per-file failures are logged and skipped.
pub fn analyze_batch(
    input_dir: &Path,
    config_dir: &Path,
    password: Option<&str>,
) -> Result<Vec<(PathBuf, usize)>, BookCleanError> {
    std::fs::create_dir_all(config_dir).map_err(|e| BookCleanError::OutputDirUnavailable {
        path: config_dir.to_path_buf(),
        source: e,
    })?;

    let mut generated = Vec::new();
    for pdf in input::scan_input_dir(input_dir)? {
        match analyze_book(&pdf, password) {
            Ok(Some(config)) => {
                let out_path = config_dir.join(format!(
                    "{}.json",
                    pdf.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "book".to_string())
                ));
                let json = serde_json::to_string_pretty(&config)
                    .map_err(|e| BookCleanError::Internal(e.to_string()))?;
                std::fs::write(&out_path, json).map_err(|e| {
                    BookCleanError::OutputWriteFailed {
                        path: out_path.clone(),
                        source: e,
                    }
                })?;
                info!(
                    "Generated '{}' with {} chapters",
                    out_path.display(),
                    config.chapters.len()
                );
                generated.push((out_path, config.chapters.len()));
            }
            Ok(None) => {}
            Err(e) if e.is_batch_fatal() => return Err(e),
            Err(e) => warn!("Skipping '{}': {}", pdf.display(), e),
        }
    }
    Ok(generated)
}

/// Find the page whose top lines carry a `CONTENTS` heading.
fn find_toc_page(pages: &[PageText]) -> Option<usize> {
    pages.iter().take(TOC_SCAN_PAGES).position(|page| {
        page.lines.iter().take(5).any(|line| {
            let upper = line.text.trim().to_uppercase();
            upper == "CONTENTS" || upper == "TABLE OF CONTENTS"
        })
    })
}

/// Parse TOC entry lines into chapter entries, applying the junk filters.
fn parse_toc_entries(lines: &[String]) -> Vec<ChapterEntry> {
    let mut chapters: Vec<ChapterEntry> = Vec::new();
    let mut seen_titles: Vec<String> = Vec::new();
    let mut part_context = "Part 1".to_string();
    let mut chapter_num = 1usize;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.contains("CONTENTS") && line.len() < 20 {
            continue;
        }
        if RE_PART_HEADER.is_match(&upper) {
            part_context = title_case(line);
            continue;
        }

        let caps = match RE_TOC_ENTRY.captures(line) {
            Some(caps) => caps,
            None => continue,
        };
        let title = RE_TRAILING_DOTS.replace(caps[1].trim(), "").into_owned();

        // Junk filters: wrapped fragments, duplicates, stray numbers.
        if title.len() < 4 {
            continue;
        }
        if title.chars().all(|c| !c.is_uppercase()) {
            continue;
        }
        if RE_BARE_NUMBER_TITLE.is_match(&title) {
            continue;
        }
        if seen_titles.contains(&title) {
            continue;
        }

        let title_upper = title.to_uppercase();
        if title_upper.contains("BIBLIOGRAPHY") || title_upper.contains("INDEX") {
            // Back matter is auto-detected at clean time, not configured.
            continue;
        }
        let is_preface = title_upper.contains("PREFACE");

        seen_titles.push(title.clone());
        chapters.push(ChapterEntry {
            part: if is_preface {
                "Front".to_string()
            } else {
                part_context.clone()
            },
            num: if is_preface {
                "0".to_string()
            } else {
                chapter_num.to_string()
            },
            title,
            special_type: is_preface.then(|| "preface".to_string()),
        });
        if !is_preface {
            chapter_num += 1;
        }
    }

    chapters
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
