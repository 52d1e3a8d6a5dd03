//! Synthesis of structural pages that have no content file.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::Site;
use super::taxonomy::{Taxonomies, term_keys};
use crate::page::{Page, PageKind, PageRef, TaxonomyRef};
use crate::sites::BuildError;

impl Site {
    /// Create the home page, top-level section pages, taxonomy listing and
    /// term pages that content implies but no `_index` file provides.
    ///
    /// `with_404` adds a not-found page when none exists. Running twice
    /// creates nothing the second time. Returns the created pages.
    pub fn create_missing_pages(&self, with_404: bool) -> Result<Vec<PageRef>, BuildError> {
        let raw = self.collections().raw();
        let lang = self.language().clone();
        let title = self.title();
        let mut created: Vec<PageRef> = Vec::new();

        let homes = raw.iter().filter(|p| p.kind() == PageKind::Home).count();
        if homes > 1 {
            return Err(BuildError::Invariant(format!(
                "too many home pages ({homes}) in language {}",
                self.lang()
            )));
        }
        if homes == 0 {
            created.push(Arc::new(Page::structural(
                PageKind::Home,
                lang.clone(),
                Vec::new(),
                None,
                title,
            )));
        }

        // top-level sections only; nested ones need an explicit `_index`
        let plurals: FxHashSet<&str> = self.config().taxonomy_plurals().into_iter().collect();
        let existing: FxHashSet<&str> = raw
            .iter()
            .filter(|p| p.kind() == PageKind::Section && p.sections().len() == 1)
            .map(|p| p.sections()[0].as_str())
            .collect();
        let mut wanted: Vec<&str> = raw
            .iter()
            .filter(|p| p.kind() == PageKind::Page)
            .filter_map(|p| p.sections().first().map(String::as_str))
            .filter(|s| !plurals.contains(s) && !existing.contains(s))
            .collect();
        wanted.sort_unstable();
        wanted.dedup();
        for section in wanted {
            created.push(Arc::new(Page::structural(
                PageKind::Section,
                lang.clone(),
                vec![section.to_string()],
                None,
                title,
            )));
        }

        let taxonomies = Taxonomies::assemble(self.config(), &raw);
        for plural in self.config().taxonomies.values() {
            let has_listing = raw.iter().any(|p| {
                p.kind() == PageKind::TaxonomyTerm
                    && p.taxonomy().is_some_and(|t| t.plural == *plural)
            });
            if !has_listing {
                created.push(Arc::new(Page::structural(
                    PageKind::TaxonomyTerm,
                    lang.clone(),
                    vec![plural.clone()],
                    Some(TaxonomyRef::listing(plural)),
                    title,
                )));
            }

            let Some(taxonomy) = taxonomies.get(plural) else {
                continue;
            };
            let existing_terms: FxHashSet<String> = raw
                .iter()
                .filter(|p| p.kind() == PageKind::Taxonomy)
                .filter_map(|p| p.taxonomy())
                .filter(|t| t.plural == *plural)
                .filter_map(|t| t.term_key())
                .collect();
            for term in taxonomy.terms.values() {
                if existing_terms.contains(&term.key) {
                    continue;
                }
                created.push(Arc::new(Page::structural(
                    PageKind::Taxonomy,
                    lang.clone(),
                    vec![plural.clone(), term.key.clone()],
                    Some(TaxonomyRef::term(plural, &term.name)),
                    title,
                )));
            }
        }

        if with_404 && !raw.iter().any(|p| p.kind() == PageKind::NotFound) {
            created.push(Arc::new(Page::structural(
                PageKind::NotFound,
                lang,
                Vec::new(),
                None,
                title,
            )));
        }

        if !created.is_empty() {
            for page in &created {
                self.collections().push_raw(page.clone());
            }
            self.collections().reset();
        }
        Ok(created)
    }
}

/// Term pages of `page` in its own site, for rebuild neighbor computation.
pub fn term_page_keys(page: &Page, plurals: &[&str]) -> Vec<(String, String)> {
    plurals
        .iter()
        .flat_map(|plural| {
            term_keys(page, plural)
                .into_iter()
                .map(|(key, _)| (plural.to_string(), key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::test_parse_config;
    use crate::page::PageKind;
    use crate::site::Site;
    use crate::site::test_support::{language, page};

    fn site_with(pages: &[(&str, &str)]) -> Site {
        let en = language("en");
        let site = Site::standalone(en.clone(), Arc::new(test_parse_config("")));
        let raw = pages.iter().map(|(path, src)| page(&en, path, src)).collect();
        site.collections().rebuild(raw);
        site
    }

    fn count(site: &Site, kind: PageKind) -> usize {
        site.collections()
            .raw()
            .iter()
            .filter(|p| p.kind() == kind)
            .count()
    }

    #[test]
    fn test_missing_section_created_once() {
        let site = site_with(&[("blog/one.md", ""), ("blog/two.md", "")]);

        let created = site.create_missing_pages(false).unwrap();
        assert!(created.iter().any(|p| p.kind() == PageKind::Section));
        assert_eq!(count(&site, PageKind::Section), 1);
        assert_eq!(count(&site, PageKind::Home), 1);

        let again = site.create_missing_pages(false).unwrap();
        assert!(again.is_empty());
        assert_eq!(count(&site, PageKind::Section), 1);

        let section = site
            .collections()
            .find_structural(PageKind::Section, &["blog".to_string()])
            .unwrap();
        assert_eq!(section.permalink().as_str(), "/blog/");
        assert_eq!(section.title(), "Blog");
    }

    #[test]
    fn test_explicit_index_is_kept() {
        let site = site_with(&[
            ("_index.md", "+++\ntitle = \"Home\"\n+++\n"),
            ("blog/_index.md", "+++\ntitle = \"My Blog\"\n+++\n"),
            ("blog/one.md", ""),
        ]);
        site.create_missing_pages(false).unwrap();
        assert_eq!(count(&site, PageKind::Home), 1);
        assert_eq!(count(&site, PageKind::Section), 1);
        let section = site
            .collections()
            .find_structural(PageKind::Section, &["blog".to_string()])
            .unwrap();
        assert_eq!(section.title(), "My Blog");
    }

    #[test]
    fn test_nested_dirs_create_top_level_only() {
        let site = site_with(&[("docs/guide/intro.md", "")]);
        site.create_missing_pages(false).unwrap();
        let sections: Vec<_> = site
            .collections()
            .raw()
            .iter()
            .filter(|p| p.kind() == PageKind::Section)
            .map(|p| p.sections().join("/"))
            .collect();
        assert_eq!(sections, vec!["docs"]);
    }

    #[test]
    fn test_taxonomy_pages() {
        let site = site_with(&[
            ("a.md", "+++\ntags = [\"Rust\"]\n+++\n"),
            ("b.md", "+++\ntags = [\"rust\", \"web\"]\n+++\n"),
        ]);
        site.create_missing_pages(false).unwrap();

        // one listing per configured taxonomy, one page per term
        assert_eq!(count(&site, PageKind::TaxonomyTerm), 2);
        assert_eq!(count(&site, PageKind::Taxonomy), 2);

        let urls: Vec<String> = site
            .collections()
            .raw()
            .iter()
            .filter(|p| p.kind() == PageKind::Taxonomy)
            .map(|p| p.permalink().to_string())
            .collect();
        assert!(urls.contains(&"/tags/rust/".to_string()));
        assert!(urls.contains(&"/tags/web/".to_string()));

        assert!(site.create_missing_pages(false).unwrap().is_empty());
    }

    #[test]
    fn test_not_found_page_on_request() {
        let site = site_with(&[]);
        site.create_missing_pages(true).unwrap();
        assert_eq!(count(&site, PageKind::NotFound), 1);
        assert!(site.create_missing_pages(true).unwrap().is_empty());
    }

    #[test]
    fn test_two_homes_is_fatal() {
        let en = language("en");
        let site = Site::standalone(en.clone(), Arc::new(test_parse_config("")));
        site.collections()
            .rebuild(vec![page(&en, "_index.md", ""), page(&en, "_index.en.md", "")]);
        let err = site.create_missing_pages(false).unwrap_err();
        assert!(err.is_fatal());
    }
}
