//! Prepared page content, produced once per generation.

use serde::Serialize;

/// Result of the prepare-for-render phase for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageContent {
    /// Final HTML with shortcodes executed.
    pub html: String,
    /// `<nav id="TableOfContents">` block, empty without headings.
    pub table_of_contents: String,
    pub summary: String,
    /// True when the summary is shorter than the content.
    pub truncated: bool,
    pub word_count: usize,
    /// Minutes, rounded up.
    pub reading_time: usize,
}
