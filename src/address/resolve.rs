//! `GetPage` / `ref` / `relref` resolution.
//!
//! Lookup order, first unique hit wins:
//!
//! 1. `/`-prefixed refs are looked up as absolute content paths
//! 2. otherwise, with a context page, `<context sections>/<ref>`
//! 3. the ref as written
//! 4. the ref with a `/` prepended (warned once when a context page was given)
//! 5. the ref without its leading slash
//!
//! An ambiguous key at any step fails the whole lookup. A miss everywhere is
//! `Ok(None)`; the caller decides whether that is fatal.

use smallvec::SmallVec;
use thiserror::Error;

use super::index::{IndexEntry, RefIndex, normalize_key};
use crate::logger::DistinctLog;
use crate::page::{Page, PageRef};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefError {
    #[error("ambiguous reference \"{reference}\"{}", in_page(.context))]
    Ambiguous {
        reference: String,
        /// Source path of the page the lookup came from.
        context: Option<String>,
    },
}

fn in_page(context: &Option<String>) -> String {
    context
        .as_deref()
        .map(|ctx| format!(" in page \"{ctx}\""))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Absolute,
    Relative,
    AsIs,
    SlashPrepended,
    SlashStripped,
}

/// Resolves references against one site's index.
pub struct RefResolver<'a> {
    index: &'a RefIndex,
    warnings: Option<&'a DistinctLog>,
}

impl<'a> RefResolver<'a> {
    pub fn new(index: &'a RefIndex) -> Self {
        Self {
            index,
            warnings: None,
        }
    }

    /// Route fallback warnings through a per-generation dedup log.
    pub fn with_warnings(mut self, log: &'a DistinctLog) -> Self {
        self.warnings = Some(log);
        self
    }

    pub fn resolve(
        &self,
        reference: &str,
        context: Option<&Page>,
    ) -> Result<Option<PageRef>, RefError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        for (step, key) in candidate_keys(reference, context) {
            match self.index.get(&key) {
                Some(IndexEntry::Unique(page)) => {
                    if step == Step::SlashPrepended
                        && let Some(ctx) = context
                    {
                        self.warn_slash_fallback(reference, ctx);
                    }
                    return Ok(Some(page.clone()));
                }
                Some(IndexEntry::Ambiguous) => {
                    return Err(RefError::Ambiguous {
                        reference: reference.to_string(),
                        context: context.map(Page::display_path),
                    });
                }
                None => {}
            }
        }
        Ok(None)
    }

    fn warn_slash_fallback(&self, reference: &str, context: &Page) {
        let message = format!(
            "reference \"{reference}\" in \"{}\" only resolved with a leading \"/\"; make it absolute",
            context.display_path()
        );
        match self.warnings {
            Some(log) => {
                log.warn("warning", message);
            }
            None => crate::debug!("ref"; "{}", message),
        }
    }
}

fn candidate_keys(reference: &str, context: Option<&Page>) -> SmallVec<[(Step, String); 5]> {
    let mut keys: SmallVec<[(Step, String); 5]> = SmallVec::new();
    let mut push = |step: Step, raw: String| {
        let key = normalize_key(&raw);
        if !key.is_empty() && !keys.iter().any(|(_, k)| *k == key) {
            keys.push((step, key));
        }
    };

    let absolute = reference.starts_with('/');
    if absolute {
        push(Step::Absolute, reference.to_string());
    } else if let Some(ctx) = context {
        let base = ctx.sections().join("/");
        push(Step::Relative, format!("/{base}/{reference}"));
    }
    push(Step::AsIs, reference.to_string());
    if !absolute {
        push(Step::SlashPrepended, format!("/{reference}"));
    }
    push(Step::SlashStripped, reference.trim_start_matches('/').to_string());
    keys
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::site::test_support::{language, page};

    fn resolve(index: &RefIndex, reference: &str, ctx: Option<&Page>) -> Option<PageRef> {
        RefResolver::new(index).resolve(reference, ctx).unwrap()
    }

    #[test]
    fn test_absolute_and_bare_refs() {
        let lang = language("en");
        let doc = page(&lang, "sect/doc1.md", "");
        let index = RefIndex::build(&[doc.clone(), page(&lang, "other/doc2.md", "")]);

        let found = resolve(&index, "/sect/doc1", None).unwrap();
        assert!(Arc::ptr_eq(&found, &doc));
        let bare = resolve(&index, "doc1", None).unwrap();
        assert!(Arc::ptr_eq(&bare, &doc));
        assert!(resolve(&index, "/SECT/DOC1.md", None).is_some());
        assert!(resolve(&index, "missing", None).is_none());
    }

    #[test]
    fn test_relative_to_context_wins() {
        let lang = language("en");
        let a = page(&lang, "a/doc.md", "");
        let b = page(&lang, "b/doc.md", "");
        let ctx = page(&lang, "b/index-of-b.md", "");
        let index = RefIndex::build(&[a, b.clone(), ctx.clone()]);

        let found = resolve(&index, "doc", Some(&*ctx)).unwrap();
        assert!(Arc::ptr_eq(&found, &b));
    }

    #[test]
    fn test_ambiguous_fails_with_context() {
        let lang = language("en");
        let a = page(&lang, "a/doc.md", "");
        let b = page(&lang, "b/doc.md", "");
        let ctx = page(&lang, "home.md", "");
        let index = RefIndex::build(&[a, b, ctx.clone()]);

        let err = RefResolver::new(&index)
            .resolve("doc.md", Some(&*ctx))
            .unwrap_err();
        assert_eq!(
            err,
            RefError::Ambiguous {
                reference: "doc.md".into(),
                context: Some("home.md".into()),
            }
        );
        assert!(err.to_string().contains("in page \"home.md\""));
    }

    #[test]
    fn test_slash_fallback_warns_once() {
        use crate::page::PageKind;

        let lang = language("en");
        let section: PageRef = Arc::new(Page::structural(
            PageKind::Section,
            lang.clone(),
            vec!["blog".into()],
            None,
            "Site",
        ));
        let ctx = page(&lang, "other/page.md", "");
        let index = RefIndex::build(&[section.clone(), ctx.clone()]);
        let log = DistinctLog::new();

        let resolver = RefResolver::new(&index).with_warnings(&log);
        let found = resolver.resolve("blog", Some(&*ctx)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, &section));
        resolver.resolve("blog", Some(&*ctx)).unwrap();
        assert_eq!(log.len(), 1);

        // no context, no warning
        resolver.resolve("blog", None).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_candidate_order() {
        let lang = language("en");
        let ctx = page(&lang, "blog/post.md", "");
        let keys: Vec<_> = candidate_keys("Doc", Some(&*ctx))
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(keys, vec!["/blog/doc", "doc", "/doc"]);

        let keys: Vec<_> = candidate_keys("/x/y", None)
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(keys, vec!["/x/y", "x/y"]);
    }
}
