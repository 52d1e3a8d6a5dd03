//! Build summary.

use std::time::Duration;

use crate::log;
use crate::utils::plural_count;

/// Counts for one language site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteReport {
    pub lang: String,
    /// Non-headless pages after synthesis.
    pub pages: usize,
    /// Structural pages created this generation.
    pub synthesized: usize,
    /// Files written for this site, aliases included.
    pub rendered: usize,
}

/// What one `build` or `rebuild` did.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub sites: Vec<SiteReport>,
    /// Pages whose content was prepared.
    pub prepared: usize,
    /// Static files copied or removed.
    pub static_files: usize,
    /// Cross-site artifacts such as sitemaps.
    pub artifacts: usize,
    /// Non-fatal errors that were logged and skipped.
    pub errors: usize,
    pub elapsed: Duration,
    /// Whether every page was re-read.
    pub full: bool,
}

impl BuildReport {
    /// Report for a rebuild that found nothing to do.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub(super) fn site_mut(&mut self, lang: &str) -> &mut SiteReport {
        let index = match self.sites.iter().position(|s| s.lang == lang) {
            Some(index) => index,
            None => {
                self.sites.push(SiteReport {
                    lang: lang.to_string(),
                    ..SiteReport::default()
                });
                self.sites.len() - 1
            }
        };
        &mut self.sites[index]
    }

    pub fn site(&self, lang: &str) -> Option<&SiteReport> {
        self.sites.iter().find(|s| s.lang == lang)
    }

    pub fn pages(&self) -> usize {
        self.sites.iter().map(|s| s.pages).sum()
    }

    pub fn rendered(&self) -> usize {
        self.sites.iter().map(|s| s.rendered).sum()
    }

    /// True when nothing was prepared, rendered or copied.
    pub fn is_noop(&self) -> bool {
        self.prepared == 0 && self.rendered() == 0 && self.static_files == 0 && self.artifacts == 0
    }

    /// `12 pages, 30 files in 41ms`
    pub fn summary(&self) -> String {
        let mut parts = vec![
            plural_count(self.pages(), "page"),
            plural_count(self.rendered() + self.artifacts, "file"),
        ];
        if self.static_files > 0 {
            parts.push(plural_count(self.static_files, "static file"));
        }
        if self.errors > 0 {
            parts.push(plural_count(self.errors, "error"));
        }
        format!("{} in {}ms", parts.join(", "), self.elapsed.as_millis())
    }

    /// One line per language, then the total.
    pub fn log(&self) {
        if self.sites.len() > 1 {
            for site in &self.sites {
                log!(
                    "build";
                    "{}: {}, {} synthesized, {}",
                    site.lang,
                    plural_count(site.pages, "page"),
                    site.synthesized,
                    plural_count(site.rendered, "file")
                );
            }
        }
        log!("build"; "{}", self.summary());
    }
}
