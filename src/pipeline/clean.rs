//! Content cleaning: deterministic rules that turn extracted page text into
//! narratable prose.
//!
//! Text-to-speech engines read *everything* they are given, so artifacts a
//! human reader filters out unconsciously (footnote markers, page numbers,
//! running headers, citation parentheticals) become spoken garbage. This
//! module applies cheap, deterministic regex/string rules that remove those
//! artifacts without touching the surrounding prose. Each rule is a pure
//! function and independently testable.
//!
//! ## Rule order
//!
//! Rules must run in this order: normalisation first (so every later
//! pattern sees one canonical representation of dashes, spaces, and
//! ligatures), structural line filters next (margins, footnote-sized text,
//! page numbers, runners), inline filters last (footnote markers, citation
//! artifacts), then paragraph assembly.

use crate::config::Settings;
use crate::output::CleanStats;
use crate::pipeline::classify::{match_key, Chapter};
use crate::pipeline::extract::PageText;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Vertical gap (in multiples of the local line height) that separates
/// paragraphs rather than lines.
const PARAGRAPH_GAP_FACTOR: f32 = 1.5;

/// A top/bottom line must repeat on at least this many pages to be treated
/// as a running header or footer.
const RUNNING_LINE_MIN_REPEATS: usize = 3;

/// Running headers are short; longer repeated lines are more likely real
/// prose (epigraphs, refrains) and are left alone.
const RUNNING_LINE_MAX_LEN: usize = 80;

// ── Rule 1: Unicode normalisation ────────────────────────────────────────────

/// NFC-normalise and scrub the PDF artifact codepoints that survive
/// extraction: zero-width junk, soft hyphens, exotic spaces, dash variants,
/// unexpanded ligatures. Whitespace is collapsed afterwards because the
/// replacements can leave doubled spaces behind.
pub fn normalize_text(input: &str) -> String {
    let composed: String = input.nfc().collect();

    let mut out = String::with_capacity(composed.len());
    for c in composed.chars() {
        match c {
            '\u{200B}' | '\u{FEFF}' | '\u{00AD}' | '\u{200C}' | '\u{200D}' | '\u{2060}' => {}
            '\u{00A0}' | '\u{202F}' | '\u{2009}' => out.push(' '),
            '\u{2011}' | '\u{2013}' | '\u{2014}' | '\u{F0B7}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            other => out.push(other),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Rule 2: Footnote markers ─────────────────────────────────────────────────

static RE_SUPERSCRIPT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{00B9}\u{00B2}\u{00B3}\u{2070}\u{2074}-\u{2079}]+").unwrap());

// A short digit run glued onto the end of a word or its closing
// punctuation is a footnote reference, not prose: "migration.12 Next".
// Years and figures are written with a space ("in 1984") and survive.
static RE_TRAILING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\p{L}]['"]?[.,;:!?]['"]?)(\d{1,3})(\s|$)"#).unwrap());

/// Strip footnote markers, returning the cleaned text and how many markers
/// were removed. The count is the user-visible per-book metric.
pub fn strip_footnote_markers(input: &str) -> (String, usize) {
    let mut count = RE_SUPERSCRIPT_MARKER.find_iter(input).count();
    let stripped = RE_SUPERSCRIPT_MARKER.replace_all(input, "");

    count += RE_TRAILING_MARKER.find_iter(&stripped).count();
    let stripped = RE_TRAILING_MARKER.replace_all(&stripped, "$1$3");

    (stripped.into_owned(), count)
}

// ── Rule 3: Citation artifacts ───────────────────────────────────────────────

// Bracketed numeric references: [7], [3, 5], [12-15].
static RE_BRACKET_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{1,3}(?:\s*[,;–-]\s*\d{1,3})*\]").unwrap());

// Parenthetical author-year citations: (Phan 2016), (Smith, 2004, 33-35),
// (see Jones 2011; Brown 2019), (Smith and Jones 2004), (Smith et al. 2019).
static RE_PAREN_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\(\s*(?:see\s+|cf\.\s+)?[A-Z][A-Za-z'-]+(?:\s+(?:and|&)\s+[A-Z][A-Za-z'-]+)?(?:\s+et\s+al\.?)?,?\s+\d{4}[a-z]?(?:\s*,\s*(?:pp?\.\s*)?\d+(?:\s*-\s*\d+)?)?(?:\s*;[^()]{1,80})?\s*\)",
    )
    .unwrap()
});

/// Strip citation artifacts, returning cleaned text and removal count.
pub fn strip_citations(input: &str) -> (String, usize) {
    let mut count = RE_BRACKET_CITATION.find_iter(input).count();
    let stripped = RE_BRACKET_CITATION.replace_all(input, "");

    count += RE_PAREN_CITATION.find_iter(&stripped).count();
    let stripped = RE_PAREN_CITATION.replace_all(&stripped, "");

    (tidy_spacing(&stripped), count)
}

static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([.,;:!?])").unwrap());
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Repair the spacing damage left by inline removals.
fn tidy_spacing(input: &str) -> String {
    let s = RE_MULTI_SPACE.replace_all(input, " ");
    RE_SPACE_BEFORE_PUNCT.replace_all(&s, "$1").trim().to_string()
}

// ── Rule 4: Standalone page-number lines ─────────────────────────────────────

static RE_BARE_NUMBER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s-]*\d+[\s-]*$").unwrap());
static RE_PAGE_WORD_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^page\s+\d+$").unwrap());

/// A line that is nothing but a page number ("17", "- 17 -", "Page 17").
pub fn is_page_number_line(line: &str) -> bool {
    RE_BARE_NUMBER_LINE.is_match(line) || RE_PAGE_WORD_LINE.is_match(line)
}

// ── Rule 5: Running headers and footers ──────────────────────────────────────

/// Index of line keys that repeat in top/bottom position across body pages.
///
/// Geometry catches headers inside the configured margins; this index
/// catches the rest, because the defining property of a running header is
/// repetition across consecutive pages, not position alone.
#[derive(Debug, Default)]
pub struct RunningLineIndex {
    counts: HashMap<String, usize>,
}

impl RunningLineIndex {
    /// Count the first and last body-zone line of every given page.
    pub fn build<'a>(pages: impl Iterator<Item = &'a PageText>, settings: &Settings) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for page in pages {
            let body: Vec<_> = page.body_lines(settings).collect();
            let mut edges = Vec::new();
            if let Some(first) = body.first() {
                edges.push(*first);
            }
            if body.len() > 1 {
                if let Some(last) = body.last() {
                    edges.push(*last);
                }
            }
            for line in edges {
                if line.text.len() > RUNNING_LINE_MAX_LEN {
                    continue;
                }
                let key = match_key(&line.text);
                if !key.is_empty() {
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }
        Self { counts }
    }

    pub fn is_running(&self, line: &str) -> bool {
        let key = match_key(line);
        !key.is_empty()
            && self
                .counts
                .get(&key)
                .map(|&n| n >= RUNNING_LINE_MIN_REPEATS)
                .unwrap_or(false)
    }
}

/// A line that repeats the current chapter's own title or number is a
/// runner when it carries nothing beyond the title itself.
fn is_chapter_runner(line: &str, chapter: &Chapter) -> bool {
    let title = chapter.entry.title.trim();
    if !title.is_empty()
        && line.to_lowercase().contains(&title.to_lowercase())
        && line.len() < title.len() + 10
    {
        return true;
    }
    let num = chapter.entry.num.trim();
    !num.is_empty() && line.contains(&format!("Chapter {num}"))
}

// ── Orchestration ────────────────────────────────────────────────────────────

/// Cleaned prose for one source page.
#[derive(Debug, Clone)]
pub struct CleanedPage {
    pub paragraphs: Vec<String>,
}

impl CleanedPage {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// Run every rule over one body page.
pub fn clean_page(
    page: &PageText,
    chapter: &Chapter,
    runners: &RunningLineIndex,
    settings: &Settings,
    stats: &mut CleanStats,
) -> CleanedPage {
    let body: Vec<_> = page.body_lines(settings).collect();
    let body_count = body.len();

    // Margin lines never reach the output; classify them for the stats.
    for line in page.lines.iter() {
        if page.is_marginal(line, settings) {
            let text = normalize_text(&line.text);
            if text.is_empty() {
                continue;
            }
            if is_page_number_line(&text) {
                stats.page_number_lines_removed += 1;
            } else {
                stats.header_lines_removed += 1;
            }
        }
    }

    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut prev_kept: Option<(f32, f32)> = None; // (y_top, avg_height)

    for (pos, line) in body.iter().enumerate() {
        if line.avg_height > 0.0 && line.avg_height < settings.footnote_size_threshold {
            stats.footnote_lines_removed += 1;
            continue;
        }

        let text = normalize_text(&line.text);
        if text.is_empty() {
            continue;
        }
        if is_page_number_line(&text) {
            stats.page_number_lines_removed += 1;
            continue;
        }

        let is_edge = pos == 0 || pos + 1 == body_count;
        if is_chapter_runner(&text, chapter) || (is_edge && runners.is_running(&text)) {
            stats.header_lines_removed += 1;
            continue;
        }

        let (text, markers) = strip_footnote_markers(&text);
        stats.footnote_markers_removed += markers;
        let (text, citations) = strip_citations(&text);
        stats.citations_removed += citations;
        let text = tidy_spacing(&text);
        if text.is_empty() {
            continue;
        }

        let starts_paragraph = match prev_kept {
            Some((prev_y, prev_h)) => {
                let gap = prev_y - line.y_top;
                let normal = prev_h.max(line.avg_height).max(1.0);
                gap > normal * PARAGRAPH_GAP_FACTOR * 1.2
            }
            None => true,
        };
        if starts_paragraph || paragraphs.is_empty() {
            paragraphs.push(Vec::new());
        }
        if let Some(current) = paragraphs.last_mut() {
            current.push(text);
        }
        prev_kept = Some((line.y_top, line.avg_height));
    }

    CleanedPage {
        paragraphs: paragraphs
            .into_iter()
            .map(|lines| lines.join(" "))
            .filter(|p| !p.is_empty())
            .collect(),
    }
}
