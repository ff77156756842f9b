//! PDF output: lay cleaned text out onto fresh pages and build the final
//! document with lopdf.
//!
//! The output is deliberately plain: US-Letter pages, one-inch margins,
//! Helvetica with WinAnsiEncoding. A Base-14 font means nothing has to be
//! embedded, and WinAnsi covers the Latin accented range, so names like
//! "Phan" with diacritics survive the trip into a TTS engine. Characters
//! outside WinAnsi have already been folded to ASCII by the cleaner's
//! normalisation pass; anything still unmappable becomes `?` rather than
//! corrupting the string.
//!
//! Everything here is deterministic: object numbering follows insertion
//! order, no creation date is stamped, no document ID is generated. Running
//! the tool twice over the same input produces byte-identical files, which
//! makes re-runs safe to diff and cache.

use crate::error::BookCleanError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::io::Write;
use std::path::Path;

/// US Letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Text styles, sized after the reportlab stylesheet the original output
/// was tuned against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Title,
    Author,
    Heading,
    Body,
    TocLine,
}

impl Style {
    fn font_size(self) -> f32 {
        match self {
            Style::Title => 24.0,
            Style::Author => 18.0,
            Style::Heading => 16.0,
            Style::Body => 12.0,
            Style::TocLine => 12.0,
        }
    }

    fn leading(self) -> f32 {
        match self {
            Style::Title => 28.0,
            Style::Author => 22.0,
            Style::Heading => 20.0,
            Style::Body => 14.0,
            Style::TocLine => 15.0,
        }
    }

    fn space_after(self) -> f32 {
        match self {
            Style::Title => 20.0,
            Style::Author => 20.0,
            Style::Heading => 16.0,
            Style::Body => 12.0,
            Style::TocLine => 6.0,
        }
    }

    fn centered(self) -> bool {
        matches!(self, Style::Title | Style::Author)
    }
}

/// One element of the output flow, in reading order.
#[derive(Debug, Clone)]
pub enum FlowItem {
    Paragraph { text: String, style: Style },
    /// Vertical gap in points.
    VSpace(f32),
    /// Start a fresh page. A no-op when the cursor is already at the top of
    /// an empty page, so chapters never produce doubled blanks.
    PageBreak,
}

impl FlowItem {
    pub fn paragraph(text: impl Into<String>, style: Style) -> Self {
        FlowItem::Paragraph {
            text: text.into(),
            style,
        }
    }
}

/// A line placed on a page: WinAnsi bytes plus position and size.
///
/// Coordinates are rounded to whole points at placement time; all content
/// stream operands stay integers, which keeps the emitted bytes stable.
#[derive(Debug, Clone)]
struct PlacedLine {
    bytes: Vec<u8>,
    x: i64,
    y: i64,
    font_size: i64,
}

#[derive(Debug, Default)]
struct PageLayout {
    lines: Vec<PlacedLine>,
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Flow the items onto pages.
fn layout_flow(flow: &[FlowItem]) -> Vec<PageLayout> {
    let mut pages: Vec<PageLayout> = vec![PageLayout::default()];
    let top = PAGE_HEIGHT - MARGIN;
    let mut cursor = top;

    let fresh = |pages: &[PageLayout], cursor: f32| -> bool {
        pages
            .last()
            .map(|p| p.lines.is_empty())
            .unwrap_or(false)
            && (cursor - top).abs() < 0.01
    };

    for item in flow {
        match item {
            FlowItem::PageBreak => {
                if !fresh(&pages, cursor) {
                    pages.push(PageLayout::default());
                    cursor = top;
                }
            }
            FlowItem::VSpace(height) => {
                cursor -= height;
                if cursor < MARGIN {
                    pages.push(PageLayout::default());
                    cursor = top;
                }
            }
            FlowItem::Paragraph { text, style } => {
                let wrapped = wrap_text(text, style.font_size(), USABLE_WIDTH);
                for line in wrapped {
                    if cursor - style.leading() < MARGIN {
                        pages.push(PageLayout::default());
                        cursor = top;
                    }
                    cursor -= style.leading();

                    let x = if style.centered() {
                        let width = text_width(&line, style.font_size());
                        (MARGIN + (USABLE_WIDTH - width) / 2.0).max(MARGIN)
                    } else {
                        MARGIN
                    };

                    if let Some(page) = pages.last_mut() {
                        page.lines.push(PlacedLine {
                            bytes: encode_winansi(&line),
                            x: x.round() as i64,
                            y: cursor.round() as i64,
                            font_size: style.font_size() as i64,
                        });
                    }
                }
                cursor -= style.space_after();
            }
        }
    }

    pages
}

/// Greedy word wrap against the Helvetica metrics.
fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ── Helvetica metrics ────────────────────────────────────────────────────────

// AFM widths (thousandths of an em) for U+0020..U+007E.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance width of one character, in thousandths of an em.
///
/// Non-ASCII (the WinAnsi accented range) is approximated by the Helvetica
/// average lowercase width; wrap decisions only need to be close, not exact.
fn char_width_millis(c: char) -> u16 {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        556
    }
}

/// Rendered width of a string at `font_size`, in points.
fn text_width(text: &str, font_size: f32) -> f32 {
    let millis: u32 = text.chars().map(|c| char_width_millis(c) as u32).sum();
    millis as f32 / 1000.0 * font_size
}

// ── WinAnsi encoding ─────────────────────────────────────────────────────────

/// Encode text as WinAnsi (CP1252) bytes for a literal PDF string.
///
/// Latin-1 maps through directly; the CP1252 specials (curly quotes,
/// dashes, ellipsis) land in 0x80–0x9F; everything else becomes `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            match c {
                '\u{20AC}' => 0x80,
                '\u{201A}' => 0x82,
                '\u{0192}' => 0x83,
                '\u{201E}' => 0x84,
                '\u{2026}' => 0x85,
                '\u{2020}' => 0x86,
                '\u{2021}' => 0x87,
                '\u{02C6}' => 0x88,
                '\u{2030}' => 0x89,
                '\u{0160}' => 0x8A,
                '\u{2039}' => 0x8B,
                '\u{0152}' => 0x8C,
                '\u{017D}' => 0x8E,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201C}' => 0x93,
                '\u{201D}' => 0x94,
                '\u{2022}' => 0x95,
                '\u{2013}' => 0x96,
                '\u{2014}' => 0x97,
                '\u{02DC}' => 0x98,
                '\u{2122}' => 0x99,
                '\u{0161}' => 0x9A,
                '\u{203A}' => 0x9B,
                '\u{0153}' => 0x9C,
                '\u{017E}' => 0x9E,
                '\u{0178}' => 0x9F,
                _ if code <= 0x7E || (0xA0..=0xFF).contains(&code) => code as u8,
                _ => b'?',
            }
        })
        .collect()
}

// ── Document assembly ────────────────────────────────────────────────────────

/// Build the output document from a flow.
pub fn render_document(flow: &[FlowItem]) -> Result<Document, BookCleanError> {
    let pages = layout_flow(flow);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in &pages {
        let mut operations = Vec::with_capacity(page.lines.len() * 5);
        for line in &page.lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), line.font_size.into()],
            ));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.bytes.clone(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| BookCleanError::PdfBuildFailed {
                detail: e.to_string(),
            })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (PAGE_WIDTH as i64).into(),
                (PAGE_HEIGHT as i64).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    Ok(doc)
}

/// Serialise a built document to a file.
pub fn save_document(doc: &mut Document, path: &Path) -> Result<(), BookCleanError> {
    let file = std::fs::File::create(path).map_err(|e| BookCleanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    doc.save_to(&mut writer)
        .map_err(|e| BookCleanError::PdfBuildFailed {
            detail: e.to_string(),
        })?;
    writer
        .flush()
        .map_err(|e| BookCleanError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Serialise a built document to bytes. Used by tests and the idempotency
/// guarantee; identical flows must yield identical bytes.
pub fn document_bytes(doc: &mut Document) -> Result<Vec<u8>, BookCleanError> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| BookCleanError::PdfBuildFailed {
            detail: e.to_string(),
        })?;
    Ok(bytes)
}
