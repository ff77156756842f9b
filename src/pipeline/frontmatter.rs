//! Front-matter generation: the title page and table of contents that
//! replace whatever the source book opened with.
//!
//! The original front matter (half-title, copyright block, printed TOC with
//! dot leaders) is noise to a listener, so it is dropped wholesale and
//! rebuilt from the config: one centered title page, then one TOC page
//! listing every configured chapter in order. All text goes through the
//! cleaner's normalisation so the emitted strings are NFC-composed before
//! they reach the WinAnsi encoder.

use crate::config::BookConfig;
use crate::pipeline::clean::normalize_text;
use crate::pipeline::write::{FlowItem, Style};

/// Build the generated front matter as a flow: title page, page break,
/// table of contents, page break.
pub fn front_matter_flow(config: &BookConfig) -> Vec<FlowItem> {
    let mut flow = Vec::with_capacity(config.chapters.len() + 8);

    // Title page.
    flow.push(FlowItem::VSpace(150.0));
    flow.push(FlowItem::paragraph(
        normalize_text(&config.metadata.title),
        Style::Title,
    ));
    flow.push(FlowItem::VSpace(20.0));
    flow.push(FlowItem::paragraph(
        normalize_text(&config.metadata.author),
        Style::Author,
    ));
    flow.push(FlowItem::PageBreak);

    // Table of contents: exactly one line per configured chapter.
    flow.push(FlowItem::paragraph("Table of Contents", Style::Heading));
    flow.push(FlowItem::VSpace(10.0));
    for chapter in &config.chapters {
        flow.push(FlowItem::paragraph(
            normalize_text(&chapter.display_header()),
            Style::TocLine,
        ));
    }
    flow.push(FlowItem::PageBreak);

    flow
}
