//! Page types: metadata, kinds, output formats and the page entity.

mod content;
mod entity;
mod kind;
mod meta;
mod output;

pub use content::PageContent;
pub use entity::{Page, PageRef, TaxonomyRef, compare_pages, sort_pages};
pub use kind::PageKind;
pub use meta::{MenuRef, PageMeta};
pub use output::OutputFormat;

/// A JSON object map for storing arbitrary metadata fields.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests;
