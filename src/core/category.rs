//! File category definitions.

use std::path::Path;

/// Kind of content file, determines how the body is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Markdown file (.md) - converted with pulldown-cmark
    Markdown,
    /// HTML file (.html) - body used as-is
    Html,
}

impl ContentKind {
    /// Detect content kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" | "mdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect content kind from file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Display name for this content kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }

    /// Check if a path is a content file.
    #[inline]
    pub fn is_content_file(path: &Path) -> bool {
        Self::from_path(path).is_some()
    }
}

/// Category of a changed file, determines rebuild strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Site config (site.toml) - full rebuild
    Config,
    /// Template under `layouts/` - re-prepare and re-render everything
    Layout,
    /// Shared data under `data/`
    Data,
    /// Translation strings under `i18n/`
    I18n,
    /// Anything inside a content dir, bundle resources included
    Content,
    /// File under `static/` - copied as-is
    Static,
    /// Outside watched dirs - ignored
    Unknown,
}

impl FileCategory {
    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Layout => "layout",
            Self::Data => "data",
            Self::I18n => "i18n",
            Self::Content => "content",
            Self::Static => "static",
            Self::Unknown => "unknown",
        }
    }

    /// Changes that can affect the output of any page.
    pub fn affects_all_pages(self) -> bool {
        matches!(self, Self::Layout | Self::Data | Self::I18n)
    }
}
