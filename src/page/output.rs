//! Output formats a page renders to.

use std::fmt;

use super::PageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    Html,
    Rss,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "html" => Some(Self::Html),
            "rss" | "xml" => Some(Self::Rss),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Rss => "rss",
        }
    }

    /// File written below the page's permalink directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Html => "index.html",
            Self::Rss => "index.xml",
        }
    }

    /// Extension used in layout file names.
    pub fn layout_suffix(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Rss => "xml",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Rss => "application/rss+xml",
        }
    }

    /// Formats used when front matter declares no `outputs`.
    pub fn defaults_for(kind: PageKind) -> Vec<Self> {
        match kind {
            PageKind::Home | PageKind::Section | PageKind::Taxonomy => {
                vec![Self::Html, Self::Rss]
            }
            PageKind::Page | PageKind::TaxonomyTerm | PageKind::NotFound => vec![Self::Html],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(OutputFormat::from_name("HTML"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_name("rss"), Some(OutputFormat::Rss));
        assert_eq!(OutputFormat::from_name("amp"), None);
    }

    #[test]
    fn test_defaults_by_kind() {
        assert_eq!(
            OutputFormat::defaults_for(PageKind::Section),
            vec![OutputFormat::Html, OutputFormat::Rss]
        );
        assert_eq!(
            OutputFormat::defaults_for(PageKind::Page),
            vec![OutputFormat::Html]
        );
    }
}
