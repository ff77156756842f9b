//! Text extraction: pull per-page text with geometry out of the source PDF.
//!
//! pdfium reports characters, not lines, so this stage reconstructs lines
//! itself: collect every character with its loose bounds, sort top-to-bottom
//! then left-to-right, group by Y proximity, and join each group into a
//! [`TextLine`]. The grouping tolerances are derived from the median glyph
//! height of the page rather than fixed constants, which keeps the same code
//! working across large-print and pocket editions.
//!
//! Geometry is kept on every line (top edge, average glyph height) because
//! the downstream cleaner needs it: running headers live inside the page
//! margins, and footnote text is recognisably smaller than body prose.

use crate::config::Settings;
use crate::error::BookCleanError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// One reconstructed text line with the geometry the cleaner filters on.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    /// Top edge in PDF points. PDF origin is bottom-left, so larger is
    /// higher on the page.
    pub y_top: f32,
    /// Average glyph height, a font-size proxy.
    pub avg_height: f32,
}

/// Extracted plain text for one source page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 0-indexed position in the source document.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Lines in reading order, top to bottom.
    pub lines: Vec<TextLine>,
}

static PAGE_NUMBER_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").unwrap());

impl PageText {
    /// Whether a line sits inside the configured header/footer margins.
    pub fn is_marginal(&self, line: &TextLine, settings: &Settings) -> bool {
        line.y_top >= self.height - settings.header_margin || line.y_top <= settings.footer_margin
    }

    /// Lines outside the margin zones, i.e. candidate body prose.
    pub fn body_lines<'a>(&'a self, settings: &'a Settings) -> impl Iterator<Item = &'a TextLine> {
        self.lines
            .iter()
            .filter(move |line| !self.is_marginal(line, settings))
    }

    /// The printed page number, when a margin line is digits-only.
    pub fn resolved_page_number(&self, settings: &Settings) -> Option<u32> {
        self.lines
            .iter()
            .filter(|line| self.is_marginal(line, settings))
            .find_map(|line| {
                let trimmed = line.text.trim();
                if PAGE_NUMBER_DIGITS.is_match(trimmed) {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
    }

    /// All line text joined with newlines, margins included. Used by the
    /// classifier, which scans whole pages for chapter markers.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

/// Extract every page of `path` into [`PageText`] records.
pub fn extract_pages(path: &Path, password: Option<&str>) -> Result<Vec<PageText>, BookCleanError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| map_open_error(e, path, password))?;

    let pages = document.pages();
    let total = pages.len();
    info!("PDF loaded: {} pages", total);

    let mut result = Vec::with_capacity(total as usize);
    for index in 0..total {
        let page = pages.get(index).map_err(|e| BookCleanError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("failed to get page {}: {}", index + 1, e),
        })?;

        let chars = collect_chars(&page);
        let (y_tolerance, space_threshold) = dynamic_thresholds(&chars);
        let lines = group_into_lines(chars, y_tolerance, space_threshold);
        debug!("Page {}: {} lines", index + 1, lines.len());

        result.push(PageText {
            index: index as usize,
            width: page.width().value,
            height: page.height().value,
            lines,
        });
    }

    Ok(result)
}

/// Bind pdfium, preferring an explicitly configured library location.
///
/// Order: `PDFIUM_LIB_PATH`, the current directory, the system library.
fn bind_pdfium() -> Result<Pdfium, BookCleanError> {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(dir) = std::env::var("PDFIUM_LIB_PATH") {
        if !dir.is_empty() {
            candidates.push(dir);
        }
    }
    candidates.push("./".to_string());

    let mut last_err: Option<PdfiumError> = None;
    for dir in &candidates {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir.as_str())) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => last_err = Some(e),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => Err(BookCleanError::PdfiumBindingFailed(match last_err {
            Some(prior) => format!("{prior}; {e}"),
            None => e.to_string(),
        })),
    }
}

fn map_open_error(err: PdfiumError, path: &Path, password: Option<&str>) -> BookCleanError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if password.is_some() {
                BookCleanError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                BookCleanError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        }
        other => BookCleanError::CorruptPdf {
            path: path.to_path_buf(),
            detail: other.to_string(),
        },
    }
}

/// Character with position, as reported by pdfium.
#[derive(Debug, Clone)]
struct CharInfo {
    ch: char,
    x: f32,
    y_top: f32,
    height: f32,
}

fn collect_chars(page: &PdfPage) -> Vec<CharInfo> {
    let text = match page.text() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    let mut chars = Vec::new();
    for segment in text.segments().iter() {
        if let Ok(segment_chars) = segment.chars() {
            for ch in segment_chars.iter() {
                if let Some(c) = ch.unicode_char() {
                    if let Ok(bounds) = ch.loose_bounds() {
                        chars.push(CharInfo {
                            ch: c,
                            x: bounds.left().value,
                            y_top: bounds.top().value,
                            height: bounds.height().value,
                        });
                    }
                }
            }
        }
    }
    chars
}

/// Derive line-grouping tolerances from the page's median glyph height.
///
/// Y tolerance ~40% of the median height absorbs baseline wobble within a
/// line; the space threshold ~30% separates words without splitting kerned
/// pairs.
fn dynamic_thresholds(chars: &[CharInfo]) -> (f32, f32) {
    let mut heights: Vec<f32> = chars
        .iter()
        .filter(|c| c.height > 0.0)
        .map(|c| c.height)
        .collect();

    if heights.is_empty() {
        return (5.0, 10.0);
    }

    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = heights[heights.len() / 2];
    ((median * 0.4).max(2.0), (median * 0.3).max(3.0))
}

/// Group characters into reading-order lines.
fn group_into_lines(chars: Vec<CharInfo>, y_tolerance: f32, space_threshold: f32) -> Vec<TextLine> {
    if chars.is_empty() {
        return Vec::new();
    }

    // Top to bottom, then left to right.
    let mut sorted = chars;
    sorted.sort_by(|a, b| {
        let y_cmp = b
            .y_top
            .partial_cmp(&a.y_top)
            .unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut groups: Vec<Vec<CharInfo>> = Vec::new();
    let mut current: Vec<CharInfo> = Vec::new();
    let mut current_y: Option<f32> = None;

    for ch in sorted {
        match current_y {
            Some(y) if (y - ch.y_top).abs() <= y_tolerance => current.push(ch),
            _ => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current_y = Some(ch.y_top);
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

            let y_top = group
                .iter()
                .map(|c| c.y_top)
                .fold(f32::MIN, f32::max);
            let avg_height = group.iter().map(|c| c.height).sum::<f32>() / group.len() as f32;

            let mut text = String::with_capacity(group.len() + 8);
            let mut prev_x: Option<f32> = None;
            for c in &group {
                if let Some(px) = prev_x {
                    if c.x - px > space_threshold && c.ch != ' ' && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                text.push(c.ch);
                prev_x = Some(c.x);
            }

            let text = text.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(TextLine {
                    text,
                    y_top,
                    avg_height,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char, x: f32, y: f32, h: f32) -> CharInfo {
        CharInfo {
            ch: c,
            x,
            y_top: y,
            height: h,
        }
    }

    fn page(lines: Vec<TextLine>) -> PageText {
        PageText {
            index: 0,
            width: 612.0,
            height: 792.0,
            lines,
        }
    }

    fn line(text: &str, y_top: f32, avg_height: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            y_top,
            avg_height,
        }
    }

    #[test]
    fn groups_chars_into_two_lines() {
        let chars = vec![
            ch('l', 14.0, 680.0, 10.0),
            ch('o', 10.0, 700.0, 10.0),
            ch('H', 0.0, 700.0, 10.0),
            ch('a', 10.0, 680.0, 10.0),
            ch('i', 5.0, 700.0, 10.0),
        ];
        let lines = group_into_lines(chars, 4.0, 6.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hio");
        assert_eq!(lines[1].text, "al");
        assert!(lines[0].y_top > lines[1].y_top);
    }

    #[test]
    fn inserts_word_spaces_on_gaps() {
        let chars = vec![
            ch('H', 0.0, 700.0, 10.0),
            ch('i', 6.0, 700.0, 10.0),
            // Big gap: next word.
            ch('y', 40.0, 700.0, 10.0),
            ch('o', 46.0, 700.0, 10.0),
        ];
        let lines = group_into_lines(chars, 4.0, 10.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hi yo");
    }

    #[test]
    fn thresholds_fall_back_on_empty_page() {
        assert_eq!(dynamic_thresholds(&[]), (5.0, 10.0));
    }

    #[test]
    fn thresholds_scale_with_glyph_height() {
        let chars = vec![ch('A', 0.0, 0.0, 20.0), ch('B', 0.0, 0.0, 20.0)];
        let (y_tol, space) = dynamic_thresholds(&chars);
        assert!((y_tol - 8.0).abs() < 0.001);
        assert!((space - 6.0).abs() < 0.001);
    }

    #[test]
    fn marginal_lines_are_detected() {
        let settings = Settings::default();
        let p = page(vec![
            line("RUNNING HEADER", 760.0, 9.0),
            line("Body prose here.", 400.0, 11.0),
            line("17", 30.0, 9.0),
        ]);
        assert!(p.is_marginal(&p.lines[0], &settings));
        assert!(!p.is_marginal(&p.lines[1], &settings));
        assert!(p.is_marginal(&p.lines[2], &settings));
        assert_eq!(p.body_lines(&settings).count(), 1);
    }

    #[test]
    fn resolves_printed_page_number_from_margin() {
        let settings = Settings::default();
        let p = page(vec![
            line("Body prose here.", 400.0, 11.0),
            line("17", 30.0, 9.0),
        ]);
        assert_eq!(p.resolved_page_number(&settings), Some(17));
    }

    #[test]
    fn body_digits_are_not_a_page_number() {
        let settings = Settings::default();
        let p = page(vec![line("1984", 400.0, 11.0)]);
        assert_eq!(p.resolved_page_number(&settings), None);
    }
}
