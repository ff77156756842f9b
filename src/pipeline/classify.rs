//! Page classification: match configured chapter markers against page text.
//!
//! Chapter titles as configured and as printed rarely agree byte-for-byte:
//! scans introduce ligatures and stray punctuation, headings get letter-
//! spaced ("M I G R A T I O N"), case varies. Both sides are therefore
//! reduced to a canonical *match key* (punctuation stripped, whitespace
//! collapsed, uppercased) and compared by substring.
//!
//! Search is sequential in configured chapter order, each search resuming
//! after the previous hit. That single invariant buys three behaviours:
//! a printed TOC can never claim a chapter (search starts past
//! `toc_end_page`), a title reused in running text cannot match earlier
//! than its real heading, and when two configured titles appear on one
//! page the earlier configured chapter wins the page.

use crate::config::{BookConfig, ChapterEntry};
use crate::pipeline::extract::PageText;
use tracing::{info, warn};

/// How many lines from the top of a page count as "near the top" when
/// deciding whether a marker hit is a real chapter heading.
const TOP_WINDOW_LINES: usize = 12;

/// Back-matter headings are short pages; anything with this much text is
/// running prose that merely mentions the word.
const BACK_MATTER_MAX_TEXT: usize = 1000;

/// One located chapter: `[start_page, end_page)` in source page indices.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub entry: ChapterEntry,
    pub start_page: usize,
    pub end_page: usize,
}

/// The role a source page plays in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    /// Original front matter (cover, copyright, printed TOC): replaced by
    /// generated front matter, so excluded from output.
    FrontMatter,
    /// Body text of the chapter with this index.
    Body { chapter: usize },
    /// Bibliography/index pages after the last chapter.
    Excluded,
}

/// Result of scanning a whole book against its config.
#[derive(Debug)]
pub struct Classification {
    pub chapters: Vec<Chapter>,
    /// One role per source page, same indexing as the page list.
    pub roles: Vec<PageRole>,
    /// Configured titles that never matched.
    pub missing: Vec<String>,
    /// First bibliography/index page, when detected.
    pub back_matter_start: Option<usize>,
}

/// Reduce text to its canonical matching form: alphanumerics and spaces
/// only, uppercased, whitespace collapsed.
pub fn match_key(text: &str) -> String {
    let stripped: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                // Punctuation and symbols become spaces so "RELIGION(S)"
                // and "RELIGION S " produce the same key.
                ' '
            }
        })
        .collect();

    stripped
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match key over the top window of a page.
fn page_top_key(page: &PageText) -> String {
    let text: String = page
        .lines
        .iter()
        .take(TOP_WINDOW_LINES)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    match_key(&text)
}

/// Scan pages from `start_idx` for the first page whose top window contains
/// the title's match key.
fn find_chapter_start(pages: &[PageText], title: &str, start_idx: usize) -> Option<usize> {
    let target = match_key(title);
    if target.is_empty() {
        return None;
    }
    (start_idx..pages.len()).find(|&i| page_top_key(&pages[i]).contains(&target))
}

/// Scan for the bibliography or index heading that closes the last chapter.
fn find_back_matter_start(pages: &[PageText], start_idx: usize) -> Option<usize> {
    (start_idx..pages.len()).find(|&i| {
        let page = &pages[i];
        let key = page_top_key(page);
        (key.contains("BIBLIOGRAPHY") || key.contains("INDEX"))
            && page.plain_text().len() < BACK_MATTER_MAX_TEXT
    })
}

/// Locate every configured chapter and assign a role to every page.
pub fn locate_chapters(pages: &[PageText], config: &BookConfig) -> Classification {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut search_idx = config.settings.toc_end_page.min(pages.len());

    for entry in &config.chapters {
        match find_chapter_start(pages, &entry.title, search_idx) {
            Some(page_idx) => {
                info!(
                    "Found '{}. {}' at page {} (physical {})",
                    entry.num,
                    entry.title,
                    page_idx,
                    page_idx + 1
                );
                if let Some(prev) = chapters.last_mut() {
                    prev.end_page = page_idx;
                }
                chapters.push(Chapter {
                    entry: entry.clone(),
                    start_page: page_idx,
                    end_page: pages.len(),
                });
                search_idx = page_idx + 1;
            }
            None => {
                if entry.is_preface() {
                    warn!("Could not find preface; skipping");
                } else {
                    warn!("Could not find chapter: {}", entry.title);
                }
                missing.push(entry.title.clone());
            }
        }
    }

    let back_matter_start = find_back_matter_start(pages, search_idx);
    if let Some(idx) = back_matter_start {
        info!("Found back matter at page {} (physical {})", idx, idx + 1);
        if let Some(last) = chapters.last_mut() {
            last.end_page = idx;
        }
    }

    let mut roles = vec![PageRole::FrontMatter; pages.len()];
    for (chapter_idx, chapter) in chapters.iter().enumerate() {
        for role in roles
            .iter_mut()
            .take(chapter.end_page)
            .skip(chapter.start_page)
        {
            *role = PageRole::Body {
                chapter: chapter_idx,
            };
        }
    }
    if let Some(idx) = back_matter_start {
        for role in roles.iter_mut().skip(idx) {
            *role = PageRole::Excluded;
        }
    }

    Classification {
        chapters,
        roles,
        missing,
        back_matter_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BookConfig, BookMetadata, ChapterEntry, Settings};
    use crate::pipeline::extract::TextLine;

    fn page_from(lines: &[&str]) -> PageText {
        PageText {
            index: 0,
            width: 612.0,
            height: 792.0,
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, text)| TextLine {
                    text: text.to_string(),
                    y_top: 700.0 - i as f32 * 14.0,
                    avg_height: 11.0,
                })
                .collect(),
        }
    }

    fn config_with(toc_end_page: usize, chapters: Vec<ChapterEntry>) -> BookConfig {
        BookConfig {
            metadata: BookMetadata {
                title: "T".into(),
                author: "A".into(),
                filename_pattern: "t".into(),
            },
            settings: Settings {
                toc_end_page,
                ..Settings::default()
            },
            chapters,
        }
    }

    fn entry(part: &str, num: &str, title: &str) -> ChapterEntry {
        ChapterEntry {
            part: part.into(),
            num: num.into(),
            title: title.into(),
            special_type: None,
        }
    }

    #[test]
    fn match_key_strips_punctuation_and_case() {
        assert_eq!(
            match_key("Religion(s) and  Migration!"),
            "RELIGION S AND MIGRATION"
        );
        assert_eq!(match_key("RELIGION S AND MIGRATION"), match_key("Religion(s) and Migration"));
    }

    #[test]
    fn verbatim_title_classifies_chapter_start() {
        let pages = vec![
            page_from(&["front matter"]),
            page_from(&["CHAPTER ONE", "It begins here."]),
            page_from(&["more prose"]),
        ];
        let config = config_with(0, vec![entry("Part 1", "1", "CHAPTER ONE")]);
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.chapters.len(), 1);
        assert_eq!(classification.chapters[0].start_page, 1);
        assert_eq!(classification.chapters[0].end_page, 3);
        assert_eq!(classification.roles[0], PageRole::FrontMatter);
        assert_eq!(classification.roles[1], PageRole::Body { chapter: 0 });
    }

    #[test]
    fn toc_end_page_bounds_the_search() {
        // Page 0 is the printed TOC and contains every title; the real
        // chapter opens on page 2.
        let pages = vec![
            page_from(&["Contents", "CHAPTER ONE 5"]),
            page_from(&["preface text"]),
            page_from(&["CHAPTER ONE", "prose"]),
        ];
        let config = config_with(1, vec![entry("Part 1", "1", "CHAPTER ONE")]);
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.chapters[0].start_page, 2);
    }

    #[test]
    fn first_configured_title_wins_a_shared_page() {
        let pages = vec![page_from(&["ALPHA", "BETA", "prose"]), page_from(&["BETA"])];
        let config = config_with(
            0,
            vec![entry("Part 1", "1", "ALPHA"), entry("Part 1", "2", "BETA")],
        );
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.chapters[0].start_page, 0);
        // BETA's search resumed after ALPHA's hit, so it lands on page 1.
        assert_eq!(classification.chapters[1].start_page, 1);
        assert_eq!(classification.roles[0], PageRole::Body { chapter: 0 });
    }

    #[test]
    fn missing_chapter_is_recorded_not_fatal() {
        let pages = vec![page_from(&["ONLY CHAPTER", "prose"])];
        let config = config_with(
            0,
            vec![
                entry("Part 1", "1", "ONLY CHAPTER"),
                entry("Part 1", "2", "NEVER PRINTED"),
            ],
        );
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.chapters.len(), 1);
        assert_eq!(classification.missing, vec!["NEVER PRINTED".to_string()]);
    }

    #[test]
    fn bibliography_closes_last_chapter() {
        let pages = vec![
            page_from(&["CHAPTER ONE", "prose"]),
            page_from(&["prose continues"]),
            page_from(&["Bibliography"]),
            page_from(&["Adams, J. ..."]),
        ];
        let config = config_with(0, vec![entry("Part 1", "1", "CHAPTER ONE")]);
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.back_matter_start, Some(2));
        assert_eq!(classification.chapters[0].end_page, 2);
        assert_eq!(classification.roles[2], PageRole::Excluded);
        assert_eq!(classification.roles[3], PageRole::Excluded);
    }

    #[test]
    fn title_deep_in_page_is_not_a_heading() {
        let mut lines: Vec<String> = (0..TOP_WINDOW_LINES + 2)
            .map(|i| format!("filler prose line {i}"))
            .collect();
        lines.push("CHAPTER ONE".to_string());
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let pages = vec![page_from(&refs), page_from(&["CHAPTER ONE", "prose"])];
        let config = config_with(0, vec![entry("Part 1", "1", "CHAPTER ONE")]);
        let classification = locate_chapters(&pages, &config);
        assert_eq!(classification.chapters[0].start_page, 1);
    }
}
