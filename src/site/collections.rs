//! Lazily computed page views for one site.
//!
//! Every view is computed once per generation from the raw page list that
//! exists at first read. `rebuild` swaps the raw list and discards every
//! memoized view; mutating the raw list without `rebuild` is invisible to
//! views that were already read.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::RefIndex;
use crate::core::LazyValue;
use crate::page::{PageKind, PageRef, sort_pages};

/// Ordered, shareable page list.
pub type PageList = Arc<[PageRef]>;

type RawPages = Arc<RwLock<Vec<PageRef>>>;

pub struct PageCollections {
    raw: RawPages,
    /// Raw pages of every site, shared by all collections of a site set.
    all_raw: RawPages,
    pages: LazyValue<PageList>,
    regular_pages: LazyValue<PageList>,
    all_pages: LazyValue<PageList>,
    all_regular_pages: LazyValue<PageList>,
    ref_index: LazyValue<Arc<RefIndex>>,
}

impl PageCollections {
    /// Collections over `all_raw`, the list shared with sibling sites.
    pub fn new(all_raw: Arc<RwLock<Vec<PageRef>>>) -> Self {
        let raw: RawPages = Arc::new(RwLock::new(Vec::new()));
        Self {
            pages: LazyValue::new(listed(raw.clone(), |_| true)),
            regular_pages: LazyValue::new(listed(raw.clone(), |p| p.kind().is_regular())),
            all_pages: LazyValue::new(listed(all_raw.clone(), |_| true)),
            all_regular_pages: LazyValue::new(listed(all_raw.clone(), |p| p.kind().is_regular())),
            ref_index: LazyValue::new({
                let raw = raw.clone();
                move || Arc::new(RefIndex::build(&raw.read()))
            }),
            raw,
            all_raw,
        }
    }

    /// Standalone collections that see only their own pages.
    pub fn standalone() -> Self {
        Self::new(Arc::new(RwLock::new(Vec::new())))
    }

    /// Replace the raw page list and start a new generation of views.
    pub fn rebuild(&self, raw: Vec<PageRef>) {
        *self.raw.write() = raw;
        self.reset();
    }

    /// Discard memoized views, keeping the raw list.
    pub fn reset(&self) {
        self.pages.reset();
        self.regular_pages.reset();
        self.all_pages.reset();
        self.all_regular_pages.reset();
        self.ref_index.reset();
    }

    /// Snapshot of the raw list, headless pages included.
    pub fn raw(&self) -> Vec<PageRef> {
        self.raw.read().clone()
    }

    pub fn raw_len(&self) -> usize {
        self.raw.read().len()
    }

    /// Append to the raw list without invalidating views.
    ///
    /// Only valid before the first read of a generation; call `reset`
    /// afterward otherwise.
    pub fn push_raw(&self, page: PageRef) {
        self.raw.write().push(page);
    }

    /// Swap `old` for `new` in the raw list. Views are left alone.
    pub fn replace_raw(&self, old: &PageRef, new: PageRef) -> bool {
        let mut raw = self.raw.write();
        match raw.iter().position(|p| Arc::ptr_eq(p, old)) {
            Some(i) => {
                raw[i] = new;
                true
            }
            None => false,
        }
    }

    /// Every non-headless page of this site.
    pub fn pages(&self) -> PageList {
        self.pages.get()
    }

    pub fn regular_pages(&self) -> PageList {
        self.regular_pages.get()
    }

    /// Every non-headless page of every site.
    pub fn all_pages(&self) -> PageList {
        self.all_pages.get()
    }

    pub fn all_regular_pages(&self) -> PageList {
        self.all_regular_pages.get()
    }

    /// Reference index over this site's raw pages, headless included.
    pub fn ref_index(&self) -> Arc<RefIndex> {
        self.ref_index.get()
    }

    /// Pages of `kind` in default order.
    pub fn by_kind(&self, kind: PageKind) -> Vec<PageRef> {
        self.pages()
            .iter()
            .filter(|p| p.kind() == kind)
            .cloned()
            .collect()
    }

    /// First page with `kind` and `sections`, headless included.
    pub fn find_structural(&self, kind: PageKind, sections: &[String]) -> Option<PageRef> {
        self.raw
            .read()
            .iter()
            .find(|p| p.kind() == kind && p.sections() == sections)
            .cloned()
    }
}

fn listed(
    raw: RawPages,
    keep: fn(&PageRef) -> bool,
) -> impl Fn() -> PageList + Send + Sync + 'static {
    move || {
        let mut pages: Vec<PageRef> = raw
            .read()
            .iter()
            .filter(|p| !p.is_headless() && keep(p))
            .cloned()
            .collect();
        sort_pages(&mut pages);
        pages.into()
    }
}

impl std::fmt::Debug for PageCollections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCollections")
            .field("raw", &self.raw.read().len())
            .field("all_raw", &self.all_raw.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::test_support::{language, page};
    use std::thread;

    #[test]
    fn test_views_filter_and_sort() {
        let lang = language("en");
        let collections = PageCollections::standalone();
        collections.rebuild(vec![
            page(&lang, "b.md", "---\nweight: 2\n---\n"),
            page(&lang, "a.md", "---\nweight: 1\n---\n"),
            page(&lang, "hidden.md", "---\nheadless: true\n---\n"),
            page(&lang, "_index.md", ""),
        ]);

        let regular: Vec<_> = collections
            .regular_pages()
            .iter()
            .map(|p| p.source_ref().to_string())
            .collect();
        assert_eq!(regular, vec!["a.md", "b.md"]);
        assert_eq!(collections.pages().len(), 3);
        assert_eq!(collections.raw_len(), 4);
        assert_eq!(collections.by_kind(PageKind::Home).len(), 1);
    }

    #[test]
    fn test_reads_are_stale_until_rebuild() {
        let lang = language("en");
        let collections = PageCollections::standalone();
        collections.rebuild(vec![page(&lang, "a.md", "")]);
        assert_eq!(collections.regular_pages().len(), 1);

        collections.push_raw(page(&lang, "b.md", ""));
        assert_eq!(collections.regular_pages().len(), 1);

        collections.rebuild(collections.raw());
        assert_eq!(collections.regular_pages().len(), 2);
    }

    #[test]
    fn test_all_pages_span_sites() {
        let all_raw = Arc::new(RwLock::new(Vec::new()));
        let en = PageCollections::new(all_raw.clone());
        let fr = PageCollections::new(all_raw.clone());

        let en_lang = language("en");
        let fr_lang = language("fr");
        let en_pages = vec![page(&en_lang, "a.md", "")];
        let fr_pages = vec![page(&fr_lang, "a.md", ""), page(&fr_lang, "b.md", "")];
        *all_raw.write() = en_pages.iter().chain(&fr_pages).cloned().collect();
        en.rebuild(en_pages);
        fr.rebuild(fr_pages);

        assert_eq!(en.regular_pages().len(), 1);
        assert_eq!(en.all_regular_pages().len(), 3);
        assert_eq!(fr.all_pages().len(), 3);
    }

    #[test]
    fn test_concurrent_first_read_agrees() {
        let lang = language("en");
        let collections = PageCollections::standalone();
        collections.rebuild((0..50).map(|i| page(&lang, &format!("p{i}.md"), "")).collect());

        let lists: Vec<PageList> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| collections.pages())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for list in &lists[1..] {
            assert!(Arc::ptr_eq(list, &lists[0]));
        }
    }
}
