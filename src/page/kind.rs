//! Structural role of a page.

use std::fmt;

/// Page kind, a closed set.
///
/// `Taxonomy` is one term's page (`/tags/rust/`), `TaxonomyTerm` the
/// listing of all terms (`/tags/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageKind {
    Home,
    Section,
    Page,
    Taxonomy,
    TaxonomyTerm,
    NotFound,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Section => "section",
            Self::Page => "page",
            Self::Taxonomy => "taxonomy",
            Self::TaxonomyTerm => "taxonomyTerm",
            Self::NotFound => "404",
        }
    }

    /// Regular content page, as opposed to a list page.
    #[inline]
    pub fn is_regular(self) -> bool {
        matches!(self, Self::Page)
    }

    /// Home, section and taxonomy pages list other pages.
    #[inline]
    pub fn is_node(self) -> bool {
        matches!(
            self,
            Self::Home | Self::Section | Self::Taxonomy | Self::TaxonomyTerm
        )
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(PageKind::TaxonomyTerm.as_str(), "taxonomyTerm");
        assert_eq!(PageKind::NotFound.to_string(), "404");
    }

    #[test]
    fn test_node_kinds() {
        assert!(PageKind::Home.is_node());
        assert!(PageKind::Taxonomy.is_node());
        assert!(!PageKind::Page.is_node());
        assert!(!PageKind::NotFound.is_node());
        assert!(PageKind::Page.is_regular());
    }
}
