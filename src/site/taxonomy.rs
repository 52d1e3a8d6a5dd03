//! Per-site taxonomies: `plural -> term -> pages`.

use std::collections::BTreeMap;

use crate::config::SiteConfig;
use crate::page::{Page, PageRef, sort_pages};
use crate::utils::slug::urlize;

/// One term and the pages carrying it.
#[derive(Debug, Clone)]
pub struct Term {
    /// Name as first written in front matter.
    pub name: String,
    /// Urlized key, used in permalinks.
    pub key: String,
    pub pages: Vec<PageRef>,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub singular: String,
    pub plural: String,
    /// Keyed by term key.
    pub terms: BTreeMap<String, Term>,
}

impl Taxonomy {
    pub fn term(&self, key: &str) -> Option<&Term> {
        self.terms.get(key)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Every configured taxonomy of one site.
#[derive(Debug, Clone, Default)]
pub struct Taxonomies {
    by_plural: BTreeMap<String, Taxonomy>,
}

impl Taxonomies {
    /// Assemble from regular, non-headless pages.
    pub fn assemble(config: &SiteConfig, pages: &[PageRef]) -> Self {
        let mut by_plural = BTreeMap::new();
        for (singular, plural) in &config.taxonomies {
            let mut terms: BTreeMap<String, Term> = BTreeMap::new();
            for page in pages {
                if !page.kind().is_regular() || page.is_headless() {
                    continue;
                }
                for (key, name) in term_keys(page, plural) {
                    terms
                        .entry(key.clone())
                        .or_insert_with(|| Term {
                            name,
                            key,
                            pages: Vec::new(),
                        })
                        .pages
                        .push(page.clone());
                }
            }
            for term in terms.values_mut() {
                sort_pages(&mut term.pages);
            }
            by_plural.insert(
                plural.clone(),
                Taxonomy {
                    singular: singular.clone(),
                    plural: plural.clone(),
                    terms,
                },
            );
        }
        Self { by_plural }
    }

    pub fn get(&self, plural: &str) -> Option<&Taxonomy> {
        self.by_plural.get(plural)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Taxonomy> {
        self.by_plural.values()
    }

    pub fn is_empty(&self) -> bool {
        self.by_plural.is_empty()
    }
}

/// `(key, name)` of every term `page` declares for `plural`, deduplicated
/// by key.
pub fn term_keys(page: &Page, plural: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for name in page.meta().terms(plural) {
        let key = urlize(&name);
        if key.is_empty() || out.iter().any(|(k, _)| *k == key) {
            continue;
        }
        out.push((key, name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::site::test_support::{language, page};

    #[test]
    fn test_assemble_groups_terms() {
        let config = test_parse_config("");
        let en = language("en");
        let pages = vec![
            page(&en, "a.md", "+++\ntitle = \"A\"\ntags = [\"Rust\", \"Web Dev\"]\n+++\n"),
            page(&en, "b.md", "+++\ntitle = \"B\"\ntags = [\"rust\"]\ncategories = [\"notes\"]\n+++\n"),
            page(&en, "c.md", "+++\ntitle = \"C\"\nheadless = true\ntags = [\"rust\"]\n+++\n"),
        ];
        let tax = Taxonomies::assemble(&config, &pages);

        let tags = tax.get("tags").unwrap();
        assert_eq!(tags.singular, "tag");
        assert_eq!(tags.len(), 2);
        let rust = tags.term("rust").unwrap();
        assert_eq!(rust.name, "Rust");
        assert_eq!(rust.pages.len(), 2);
        assert!(tags.term("web-dev").is_some());

        assert_eq!(tax.get("categories").unwrap().term("notes").unwrap().pages.len(), 1);
    }

    #[test]
    fn test_term_keys_dedup() {
        let en = language("en");
        let p = page(&en, "a.md", "+++\ntags = [\"Go\", \"go\", \" \"]\n+++\n");
        assert_eq!(term_keys(&p, "tags"), vec![("go".to_string(), "Go".to_string())]);
    }
}
