//! Reference index: lowercased path-like keys to pages.
//!
//! Each page contributes several keys so that `ref`/`relref`/`GetPage`
//! accept absolute content paths, legacy relative paths, bare file names
//! and bundle directories:
//!
//! ```text
//! sect/doc1.fr.md  ->  /sect/doc1.fr.md  /sect/doc1.md  /sect/doc1
//!                      sect/doc1.fr.md   sect/doc1.md   sect/doc1
//!                      doc1.fr.md        doc1.md        doc1
//! a/b1/index.md    ->  ... plus  /a/b1  a/b1  b1
//! (section blog)   ->  /blog
//! ```
//!
//! A key claimed by two different pages turns into [`IndexEntry::Ambiguous`]
//! for the rest of the generation, whatever the insertion order.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::page::{PageKind, PageRef};
use crate::utils::normalize_rel_path;

/// Keys contributed by one page.
pub type RefKeys = SmallVec<[String; 12]>;

#[derive(Debug, Clone)]
pub enum IndexEntry {
    Unique(PageRef),
    Ambiguous,
}

impl IndexEntry {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous)
    }
}

#[derive(Debug, Default)]
pub struct RefIndex {
    entries: FxHashMap<String, IndexEntry>,
}

impl RefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every page, headless ones included.
    pub fn build(pages: &[PageRef]) -> Self {
        let mut index = Self::new();
        for page in pages {
            for key in ref_keys(page) {
                index.insert(key, page);
            }
        }
        index
    }

    /// Claim `key` for `page`; a second claimant makes it ambiguous.
    pub fn insert(&mut self, key: String, page: &PageRef) {
        let key = normalize_key(&key);
        if key.is_empty() {
            return;
        }
        match self.entries.get_mut(&key) {
            Some(IndexEntry::Unique(existing)) if Arc::ptr_eq(existing, page) => {}
            Some(entry) => *entry = IndexEntry::Ambiguous,
            None => {
                self.entries.insert(key, IndexEntry::Unique(page.clone()));
            }
        }
    }

    /// Look up a key after normalization.
    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase, `/` separators, dot segments resolved, no trailing slash.
///
/// A leading slash is kept; the root stays `/`.
pub fn normalize_key(key: &str) -> String {
    let key = key.trim();
    let absolute = key.starts_with('/') || key.starts_with('\\');
    let inner = normalize_rel_path(key).to_lowercase();
    match (absolute, inner.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{inner}"),
        (false, _) => inner,
    }
}

/// Every key a page is reachable by.
pub fn ref_keys(page: &PageRef) -> RefKeys {
    let mut keys = RefKeys::new();

    match page.kind() {
        PageKind::Home => keys.push("/".to_string()),
        PageKind::Section | PageKind::Taxonomy | PageKind::TaxonomyTerm => {
            let structural = match page.taxonomy() {
                Some(tax) => match tax.term_key() {
                    Some(term) => format!("{}/{term}", tax.plural),
                    None => tax.plural.clone(),
                },
                None => page.sections().join("/"),
            };
            // absolute only; the bare form comes from a backing `_index` file
            if !structural.is_empty() {
                keys.push(format!("/{structural}"));
            }
        }
        PageKind::Page | PageKind::NotFound => {}
    }

    let Some(source) = page.source() else {
        return keys;
    };

    let dir_prefix = if source.dir().is_empty() {
        String::new()
    } else {
        format!("{}/", source.dir())
    };
    let file_name = source.file_name();
    let plain_name = if source.ext().is_empty() {
        source.base_name().to_string()
    } else {
        format!("{}.{}", source.base_name(), source.ext())
    };

    // /sect/doc1.fr.md, sect/doc1.fr.md, doc1.fr.md
    for name in [file_name, plain_name.as_str()] {
        keys.push(format!("/{dir_prefix}{name}"));
        keys.push(format!("{dir_prefix}{name}"));
        keys.push(name.to_string());
    }

    match source.bundle() {
        Some(_) => {
            let dir = source.dir();
            if !dir.is_empty() {
                keys.push(format!("/{dir}"));
                keys.push(dir.to_string());
                keys.push(source.dir_name().to_string());
            }
        }
        None => {
            let logical = source.logical_path();
            keys.push(format!("/{logical}"));
            keys.push(logical);
            keys.push(source.base_name().to_string());
        }
    }

    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::test_support::{language, page};

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("/Sect/Doc1/"), "/sect/doc1");
        assert_eq!(normalize_key("./doc1.md"), "doc1.md");
        assert_eq!(normalize_key("/"), "/");
        assert_eq!(normalize_key("a\\b"), "a/b");
        assert_eq!(normalize_key("/a/../b"), "/b");
    }

    #[test]
    fn test_keys_of_regular_page() {
        let lang = language("fr");
        let keys = ref_keys(&page(&lang, "sect/doc1.fr.md", ""));
        for key in [
            "/sect/doc1.fr.md",
            "/sect/doc1.md",
            "/sect/doc1",
            "sect/doc1.fr.md",
            "sect/doc1.md",
            "sect/doc1",
            "doc1.fr.md",
            "doc1.md",
            "doc1",
        ] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
    }

    #[test]
    fn test_keys_of_bundles_and_sections() {
        let lang = language("en");
        let leaf = ref_keys(&page(&lang, "a/b1/index.md", ""));
        assert!(leaf.iter().any(|k| k == "/a/b1"));
        assert!(leaf.iter().any(|k| k == "b1"));

        let section = ref_keys(&page(&lang, "blog/_index.md", ""));
        assert!(section.iter().any(|k| k == "/blog"));
        assert!(section.iter().any(|k| k == "blog"));

        let home = ref_keys(&page(&lang, "_index.md", ""));
        assert!(home.iter().any(|k| k == "/"));
    }

    #[test]
    fn test_collision_marks_ambiguous_in_any_order() {
        let lang = language("en");
        let a = page(&lang, "sect1/doc.md", "");
        let b = page(&lang, "sect2/doc.md", "");

        for pages in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
            let index = RefIndex::build(&pages);
            assert!(index.get("doc").unwrap().is_ambiguous());
            assert!(index.get("doc.md").unwrap().is_ambiguous());
            assert!(matches!(
                index.get("/sect1/doc"),
                Some(IndexEntry::Unique(p)) if Arc::ptr_eq(p, &a)
            ));
        }
    }

    #[test]
    fn test_same_page_twice_stays_unique() {
        let lang = language("en");
        let a = page(&lang, "doc.md", "");
        let mut index = RefIndex::new();
        index.insert("doc".into(), &a);
        index.insert("DOC".into(), &a);
        assert!(matches!(index.get("doc"), Some(IndexEntry::Unique(_))));
        assert_eq!(index.len(), 1);
    }
}
