//! Cross-language translation linking.
//!
//! Pages of every site are grouped by translation key; each page then links
//! (weakly) to the other members of its group in language order.

use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::page::{Page, PageRef};
use crate::sites::BuildError;

/// `translation key -> pages`, at most one page per language.
#[derive(Debug, Default)]
pub struct TranslationMap {
    groups: FxHashMap<String, Vec<PageRef>>,
}

impl TranslationMap {
    /// Group the merged page set of all sites.
    ///
    /// Within one language the first page for a key wins; later ones are
    /// left without translations.
    pub fn group(pages: &[PageRef]) -> Result<Self, BuildError> {
        let mut groups: FxHashMap<String, Vec<PageRef>> = FxHashMap::default();
        for page in pages {
            if page.lang().is_empty() {
                return Err(BuildError::Invariant(format!(
                    "page \"{}\" has no language",
                    page.display_path()
                )));
            }
            let group = groups.entry(page.translation_key().to_string()).or_default();
            if !group.iter().any(|p| p.lang() == page.lang()) {
                group.push(page.clone());
            }
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.language().sort_key().cmp(&b.language().sort_key()));
        }
        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group members for `key`, in language order.
    pub fn get(&self, key: &str) -> Option<&[PageRef]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Set every page's translations to the other members of its group.
    pub fn assign(&self, pages: &[PageRef]) {
        for page in pages {
            page.set_translations(self.others(page));
        }
    }

    /// Swap in a re-parsed page whose structure did not change and relink
    /// its group.
    ///
    /// Returns false when the page's key has no group, meaning the caller
    /// must regroup from scratch.
    pub fn replace(&mut self, page: &PageRef) -> bool {
        let Some(group) = self.groups.get_mut(page.translation_key()) else {
            return false;
        };
        match group.iter_mut().find(|p| p.lang() == page.lang()) {
            Some(slot) => *slot = page.clone(),
            None => return false,
        }
        let members = group.clone();
        self.assign(&members);
        true
    }

    fn others(&self, page: &Page) -> Vec<Weak<Page>> {
        let Some(group) = self.groups.get(page.translation_key()) else {
            return Vec::new();
        };
        // a same-language duplicate that lost the group links nothing
        if !group.iter().any(|p| std::ptr::eq(Arc::as_ptr(p), page)) {
            return Vec::new();
        }
        group
            .iter()
            .filter(|p| p.lang() != page.lang())
            .map(Arc::downgrade)
            .collect()
    }
}
