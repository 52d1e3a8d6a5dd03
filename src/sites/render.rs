//! Render phase, static files and cross-site artifacts.

use std::fs;
use std::path::Path;

use jwalk::WalkDir;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::{BuildError, BuildPhase, ErrorCollector, SiteSet};
use crate::core::ContentKind;
use crate::generator::write_sitemaps;
use crate::page::{OutputFormat, Page, PageKind, PageRef};
use crate::render::publish::{redirect_html, redirect_output_path};
use crate::render::{RenderContext, layout_candidates};
use crate::site::Site;
use crate::utils::normalize_rel_path;
use crate::{debug, log};

/// Pages written by the current render pass.
#[derive(Debug, Clone, Default)]
pub(crate) enum RenderScope {
    #[default]
    All,
    /// `(lang, permalink)` pairs.
    Pages(FxHashSet<(String, String)>),
}

impl RenderScope {
    pub(crate) fn pages() -> Self {
        Self::Pages(FxHashSet::default())
    }

    pub(crate) fn includes(&self, page: &Page) -> bool {
        match self {
            Self::All => true,
            Self::Pages(set) => set.contains(&scope_key(page)),
        }
    }

    pub(crate) fn add(&mut self, page: &Page) {
        if let Self::Pages(set) = self {
            set.insert(scope_key(page));
        }
    }

    pub(crate) fn len(&self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Pages(set) => Some(set.len()),
        }
    }
}

fn scope_key(page: &Page) -> (String, String) {
    (page.lang().to_string(), page.permalink().as_str().to_string())
}

impl SiteSet {
    /// Render every page in scope to each of its output formats.
    pub fn render(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Rendered)?;
        self.checkpoint()?;

        if self.cfg.skip_render {
            self.phase = BuildPhase::Rendered;
            return Ok(());
        }

        let errors = ErrorCollector::new(self.config.build.diagnostics.max_errors);
        for site in &self.sites {
            let written = self.render_site(site, &errors);
            self.report.site_mut(site.lang()).rendered += written;
            self.checkpoint()?;
        }

        if self.copy_statics {
            self.report.static_files += self.copy_static()?;
        }

        self.settle(errors)?;
        self.phase = BuildPhase::Rendered;
        Ok(())
    }

    /// Cross-site artifacts once every site rendered.
    pub fn finish(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Done)?;
        if !self.cfg.skip_render && self.config.build.sitemap.enable {
            self.report.artifacts +=
                write_sitemaps(&self.sites, self.collab.publisher.as_ref())?;
        }
        self.phase = BuildPhase::Done;
        Ok(())
    }

    fn render_site(&self, site: &Site, errors: &ErrorCollector) -> usize {
        let pages = site.collections().pages();
        let visited = &self.cfg.recently_visited;
        pages
            .par_iter()
            .filter(|page| self.scope.includes(page))
            .filter(|page| {
                !self.cfg.partial_re_render || visited.contains(page.permalink().as_str())
            })
            .map(|page| match self.render_page(site, page) {
                Ok(written) => written,
                Err(err) => {
                    errors.push(err);
                    0
                }
            })
            .sum()
    }

    fn render_page(&self, site: &Site, page: &PageRef) -> Result<usize, BuildError> {
        let listed = listed_pages(site, page);
        let ctx = RenderContext {
            page: page.as_ref(),
            content: page.content(),
            pages: &listed,
            site,
            data: self.data.data(),
            i18n: self.data.i18n(site.lang()),
        };

        let mut written = 0;
        for &format in page.outputs() {
            let candidates = layout_candidates(page, format);
            if !self.collab.renderer.has_layout(&candidates) {
                self.warnings.warn(
                    "render",
                    format!(
                        "no {} layout for kind \"{}\", tried {}",
                        format.name(),
                        page.kind().as_str(),
                        candidates.join(", ")
                    ),
                );
                continue;
            }
            let bytes = self
                .collab
                .renderer
                .render(&candidates, &ctx, format)
                .map_err(|err| BuildError::from_render(&page.display_path(), err))?;
            self.publish(&page.permalink().output_file(format.file_name()), &bytes)?;
            written += 1;
        }

        if !page.outputs().is_empty() {
            self.publish_resources(page)?;
        }

        if page.outputs().contains(&OutputFormat::Html) {
            let canonical = site.absolute_url(page.permalink());
            for alias in &page.meta().aliases {
                let alias = language_alias(&site.language().url_prefix, alias);
                self.publish(&redirect_output_path(&alias), redirect_html(&canonical).as_bytes())?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Copy a leaf bundle's non-content files beside its output.
    fn publish_resources(&self, page: &Page) -> Result<(), BuildError> {
        for resource in page.resources() {
            if ContentKind::is_content_file(Path::new(resource)) {
                continue;
            }
            let Some(target) = page.resource_output(resource) else {
                continue;
            };
            let bytes = self
                .collab
                .source
                .read_bytes(resource, page.resource_root())
                .map_err(|e| BuildError::io(format!("failed to read {resource}"), e))?;
            match bytes {
                Some(bytes) => self.publish(&target, &bytes)?,
                None => debug!("render"; "resource {} disappeared", resource),
            }
        }
        Ok(())
    }

    pub(super) fn publish(&self, path: &str, bytes: &[u8]) -> Result<(), BuildError> {
        let mut reader = bytes;
        self.collab
            .publisher
            .write(path, &mut reader)
            .map_err(|e| BuildError::io(format!("failed to write {path}"), e))
    }

    /// Copy everything under the static dir through the publisher.
    fn copy_static(&self) -> Result<usize, BuildError> {
        let dir = self.config.root_join(&self.config.build.static_dir);
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut copied = 0;
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| {
                BuildError::io("failed to walk static dir", std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(rel) = static_relative(&dir, &path) else {
                continue;
            };
            let bytes = fs::read(&path)
                .map_err(|e| BuildError::io(format!("failed to read {}", path.display()), e))?;
            self.publish(&rel, &bytes)?;
            copied += 1;
        }
        debug!("static"; "copied {} files", copied);
        Ok(copied)
    }
}

fn static_relative(dir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(dir).ok()?;
    Some(normalize_rel_path(&rel.to_string_lossy()))
}

/// Aliases are relative to the language root.
fn language_alias(prefix: &str, alias: &str) -> String {
    let alias = format!("/{}", alias.trim_start_matches('/'));
    if prefix.is_empty() || alias.starts_with(&format!("{prefix}/")) {
        alias
    } else {
        format!("{prefix}{alias}")
    }
}

/// Pages a node lists, in default order.
fn listed_pages(site: &Site, page: &Page) -> Vec<PageRef> {
    match page.kind() {
        PageKind::Home => site.collections().regular_pages().to_vec(),
        PageKind::Section => site
            .collections()
            .regular_pages()
            .iter()
            .filter(|p| p.sections().starts_with(page.sections()))
            .cloned()
            .collect(),
        PageKind::Taxonomy => {
            let Some(tax) = page.taxonomy() else {
                return Vec::new();
            };
            let taxonomies = site.taxonomies();
            tax.term_key()
                .and_then(|key| {
                    taxonomies
                        .get(&tax.plural)
                        .and_then(|t| t.term(&key))
                        .map(|term| term.pages.clone())
                })
                .unwrap_or_default()
        }
        PageKind::TaxonomyTerm => {
            let Some(tax) = page.taxonomy() else {
                return Vec::new();
            };
            site.collections()
                .by_kind(PageKind::Taxonomy)
                .into_iter()
                .filter(|p| p.taxonomy().is_some_and(|t| t.plural == tax.plural))
                .collect()
        }
        PageKind::Page | PageKind::NotFound => Vec::new(),
    }
}

/// Log render scope for a partial pass.
pub(super) fn log_scope(scope: &RenderScope) {
    if let Some(n) = scope.len() {
        log!("rebuild"; "re-rendering {} pages", n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_alias() {
        assert_eq!(language_alias("", "old/"), "/old/");
        assert_eq!(language_alias("/fr", "/old/"), "/fr/old/");
        assert_eq!(language_alias("/fr", "/fr/old/"), "/fr/old/");
    }

    #[test]
    fn test_scope_membership() {
        let en = crate::site::test_support::language("en");
        let a = crate::site::test_support::page(&en, "a.md", "");
        let b = crate::site::test_support::page(&en, "b.md", "");
        let mut scope = RenderScope::pages();
        scope.add(&a);
        assert!(scope.includes(&a));
        assert!(!scope.includes(&b));
        assert!(RenderScope::All.includes(&b));
        assert_eq!(scope.len(), Some(1));
    }
}
