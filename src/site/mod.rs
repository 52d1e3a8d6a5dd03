//! One language's site.
//!
//! # Module Structure
//!
//! ```text
//! site/
//! ├── collections.rs   # lazily computed page views
//! ├── data.rs          # data/ tree and i18n tables
//! ├── menu.rs          # menus from front matter
//! ├── structure.rs     # synthesized home/section/taxonomy pages
//! ├── taxonomy.rs      # plural -> term -> pages
//! └── translations.rs  # cross-language linking
//! ```

mod collections;
mod data;
mod menu;
mod structure;
mod taxonomy;
mod translations;

pub use collections::{PageCollections, PageList};
pub use data::{SiteData, translate};
pub use menu::{MenuEntry, Menus};
pub use structure::term_page_keys;
pub use taxonomy::{Taxonomies, Taxonomy, Term, term_keys};
pub use translations::TranslationMap;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::SiteConfig;
use crate::core::UrlPath;
use crate::language::Language;
use crate::page::{PageKind, PageRef};

/// A site: one language's pages and the structures derived from them.
pub struct Site {
    language: Arc<Language>,
    config: Arc<SiteConfig>,
    collections: PageCollections,
    taxonomies: RwLock<Arc<Taxonomies>>,
    menus: RwLock<Menus>,
}

impl Site {
    /// `all_raw` is the page list shared by every site of the set.
    pub fn new(
        language: Arc<Language>,
        config: Arc<SiteConfig>,
        all_raw: Arc<RwLock<Vec<PageRef>>>,
    ) -> Self {
        Self {
            language,
            config,
            collections: PageCollections::new(all_raw),
            taxonomies: RwLock::default(),
            menus: RwLock::default(),
        }
    }

    /// A site outside any site set.
    pub fn standalone(language: Arc<Language>, config: Arc<SiteConfig>) -> Self {
        Self::new(language, config, Arc::default())
    }

    #[inline]
    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    #[inline]
    pub fn lang(&self) -> &str {
        &self.language.code
    }

    #[inline]
    pub fn config(&self) -> &Arc<SiteConfig> {
        &self.config
    }

    #[inline]
    pub fn collections(&self) -> &PageCollections {
        &self.collections
    }

    /// Language title, falling back to the site title.
    pub fn title(&self) -> &str {
        self.language.title.as_deref().unwrap_or(&self.config.title)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn absolute_url(&self, path: &UrlPath) -> String {
        path.absolute(&self.config.base_url)
    }

    /// Site root for this language, e.g. `/fr/`.
    pub fn home_url(&self) -> UrlPath {
        UrlPath::from_page(&self.language.url_prefix)
    }

    pub fn home(&self) -> Option<PageRef> {
        self.collections.find_structural(PageKind::Home, &[])
    }

    pub fn taxonomies(&self) -> Arc<Taxonomies> {
        self.taxonomies.read().clone()
    }

    pub fn menus(&self) -> Menus {
        self.menus.read().clone()
    }

    /// Recompute taxonomies and menus from the current pages.
    pub fn assemble(&self) {
        let pages = self.collections.pages();
        *self.taxonomies.write() = Arc::new(Taxonomies::assemble(&self.config, &pages));
        *self.menus.write() = Menus::assemble(&pages);
    }

    /// Start a new generation with no pages.
    pub fn reset(&self) {
        self.collections.rebuild(Vec::new());
        *self.taxonomies.write() = Arc::default();
        *self.menus.write() = Menus::default();
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("lang", &self.language.code)
            .field("pages", &self.collections.raw_len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{language, page};
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_assemble_taxonomies_and_menus() {
        let en = language("en");
        let site = Site::standalone(en.clone(), Arc::new(test_parse_config("")));
        site.collections().rebuild(vec![
            page(&en, "a.md", "+++\ntitle = \"A\"\ntags = [\"x\"]\nmenu = \"main\"\n+++\n"),
            page(&en, "b.md", "+++\ntitle = \"B\"\ntags = [\"x\"]\n+++\n"),
        ]);
        assert!(site.taxonomies().is_empty());

        site.assemble();
        assert_eq!(site.taxonomies().get("tags").unwrap().term("x").unwrap().pages.len(), 2);
        assert_eq!(site.menus().get("main").len(), 1);

        site.reset();
        assert_eq!(site.collections().raw_len(), 0);
        assert!(site.menus().is_empty());
    }

    #[test]
    fn test_urls_and_title() {
        let fr = language("fr");
        let config = Arc::new(test_parse_config(""));
        let site = Site::standalone(fr, config);
        assert_eq!(site.home_url().as_str(), "/fr/");
        assert_eq!(site.title(), "Test");
        assert_eq!(
            site.absolute_url(&UrlPath::from_page("/fr/a/")),
            "https://example.org/fr/a/"
        );
    }
}
