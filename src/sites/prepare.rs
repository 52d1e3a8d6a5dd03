//! Prepare-for-render: shortcodes, Markdown, TOC, summary and word count.
//!
//! A fixed pool of scoped threads drains a bounded queue of pages. Each
//! page is handed to exactly one worker and writes only its own one-shot
//! content slot, so workers share nothing mutable besides the error
//! collector.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam::channel;

use super::{BuildError, BuildPhase, ErrorCollector, SiteSet};
use crate::address::{RefError, RefResolver};
use crate::core::ContentKind;
use crate::debug;
use crate::logger::DistinctLog;
use crate::page::{Page, PageContent, PageRef};
use crate::render::markdown::{self, MarkdownOptions};
use crate::render::shortcode::{RefLookup, ShortcodeExpander};
use crate::render::{RenderError, Renderer, summary};
use crate::site::Site;
use crate::utils::html::strip_tags;

/// Heading levels that make it into the table of contents.
const TOC_LEVELS: (u8, u8) = (2, 3);

impl SiteSet {
    /// Prepare every page whose content slot is empty, or every page when
    /// layouts changed since the last generation.
    pub fn prepare(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Prepared)?;
        self.checkpoint()?;

        let mut work: Vec<(usize, PageRef)> = Vec::new();
        for (index, site) in self.sites.iter().enumerate() {
            for page in site.collections().pages().iter() {
                if self.force_prepare {
                    page.content_slot().reset();
                }
                if !page.content_slot().is_set() {
                    work.push((index, page.clone()));
                }
            }
        }

        let errors = ErrorCollector::new(self.config.build.diagnostics.max_errors);
        let prepared = AtomicUsize::new(0);
        let workers = self.config.build.worker_count().min(work.len()).max(1);
        debug!("prepare"; "{} pages on {} workers", work.len(), workers);

        let job = Preparer {
            sites: &self.sites,
            renderer: self.collab.renderer.as_ref(),
            warnings: &self.warnings,
            summary_length: self.config.build.summary_length,
        };
        let deadline = &self.deadline;

        let (tx, rx) = channel::bounded::<(usize, PageRef)>(workers * 2);
        thread::scope(|s| {
            for _ in 0..workers {
                let rx = rx.clone();
                let (job, errors, prepared) = (&job, &errors, &prepared);
                s.spawn(move || {
                    for (site, page) in rx {
                        if deadline.is_expired() {
                            continue;
                        }
                        let result =
                            panic::catch_unwind(AssertUnwindSafe(|| job.prepare_page(site, &page)))
                                .unwrap_or_else(|_| {
                                    Err(BuildError::Render {
                                        page: page.display_path(),
                                        message: "prepare panicked".into(),
                                    })
                                });
                        match result {
                            Ok(()) => {
                                prepared.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(err) => errors.push(err),
                        }
                    }
                });
            }
            drop(rx);

            for item in work {
                if deadline.is_expired() || tx.send(item).is_err() {
                    break;
                }
            }
            drop(tx);
        });

        self.report.prepared += prepared.into_inner();
        self.checkpoint()?;
        self.settle(errors)?;
        self.phase = BuildPhase::Prepared;
        Ok(())
    }
}

/// Read-only inputs shared by the prepare workers.
struct Preparer<'a> {
    sites: &'a [Site],
    renderer: &'a dyn Renderer,
    warnings: &'a DistinctLog,
    summary_length: usize,
}

impl Preparer<'_> {
    fn prepare_page(&self, site_index: usize, page: &PageRef) -> Result<(), BuildError> {
        let site = &self.sites[site_index];
        let index = site.collections().ref_index();
        let context: &Page = page;

        let lookup = |target: &str, lang: Option<&str>| -> Result<Option<PageRef>, RefError> {
            match lang {
                Some(code) if code != site.lang() => {
                    let Some(other) = self.sites.iter().find(|s| s.lang() == code) else {
                        return Ok(None);
                    };
                    let other_index = other.collections().ref_index();
                    RefResolver::new(&other_index)
                        .with_warnings(self.warnings)
                        .resolve(target, Some(context))
                }
                _ => RefResolver::new(&index)
                    .with_warnings(self.warnings)
                    .resolve(target, Some(context)),
            }
        };

        page.content_slot()
            .get_or_try_init(|| self.prepare_content(site, context, &lookup))
            .map(|_| ())
            .map_err(|err| BuildError::from_render(&page.display_path(), err))
    }

    fn prepare_content(
        &self,
        site: &Site,
        page: &Page,
        lookup: &RefLookup<'_>,
    ) -> Result<PageContent, RenderError> {
        let expander = ShortcodeExpander::new(self.renderer, lookup, page, site.base_url());
        let expanded = expander.expand(page.body())?;

        let (html, headings) = match page.content_kind() {
            Some(ContentKind::Markdown) => {
                let out = markdown::to_html(&expanded.text, &MarkdownOptions::all());
                (expanded.restore(&out.html), out.headings)
            }
            _ => (expanded.restore(&expanded.text), Vec::new()),
        };
        let table_of_contents = markdown::table_of_contents(&headings, TOC_LEVELS.0, TOC_LEVELS.1);

        let cjk = page.language().has_cjk_language;
        let (html, before_divider) = summary::split_divider(&html);
        let excerpt = summary::summarize(
            &html,
            page.meta().summary.as_deref(),
            before_divider.as_deref(),
            self.summary_length,
            cjk,
        );
        let word_count = summary::word_count(&strip_tags(&html), cjk);

        Ok(PageContent {
            html,
            table_of_contents,
            summary: excerpt.text,
            truncated: excerpt.truncated,
            word_count,
            reading_time: summary::reading_time(word_count, cjk),
        })
    }
}
