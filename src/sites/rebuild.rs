//! Watch-mode partial rebuilds.
//!
//! Events are sorted by category first. Config changes rebuild from
//! scratch; static files go straight to the publisher; layout, data and
//! i18n changes re-prepare or re-render everything on the existing pages.
//! Content edits that keep a page's front matter are patched in place and
//! re-render only the page's neighbors; anything else re-reads the whole
//! content tree.

use std::fs;
use std::io;
use std::sync::Arc;

use super::build::{Loaded, PageLoader};
use super::render::{RenderScope, log_scope};
use super::{BuildCfg, BuildError, BuildPhase, BuildReport, SiteSet};
use crate::content::BundleType;
use crate::page::{PageKind, PageRef};
use crate::reload::{ChangeSet, ContentChange, FsEvent, FsOp, Owner, StaticChange, classify_events};
use crate::site::{SiteData, term_page_keys};
use crate::{debug, log};

/// What a batch of content changes requires.
#[derive(Debug)]
enum Plan {
    /// Re-read every content file.
    Structural(String),
    /// Swap re-parsed pages in and re-render `touched` plus neighbors.
    Patch {
        patches: Vec<(PageRef, PageRef)>,
        touched: Vec<PageRef>,
    },
}

impl Plan {
    fn structural(reason: impl Into<String>) -> Self {
        Self::Structural(reason.into())
    }
}

impl SiteSet {
    /// Apply file system events to the last generation.
    ///
    /// Falls back to a full build when no generation completed yet.
    pub fn rebuild(&mut self, cfg: BuildCfg, events: &[FsEvent]) -> Result<BuildReport, BuildError> {
        let result = self.run_rebuild(cfg, events);
        if let Err(err) = &result
            && err.is_fatal()
        {
            self.reset();
        }
        result
    }

    fn run_rebuild(&mut self, cfg: BuildCfg, events: &[FsEvent]) -> Result<BuildReport, BuildError> {
        let mut changes = classify_events(events, &self.roots);
        self.expand_symlinked(&mut changes);
        if changes.is_empty() {
            debug!("rebuild"; "no relevant changes in {} events", events.len());
            return Ok(BuildReport::unchanged());
        }
        debug!("rebuild"; "changed: {}", changes.summary());

        if changes.config {
            log!("rebuild"; "config changed, rebuilding everything");
            let config = self.config.reload()?;
            return self.build(BuildCfg {
                reset_state: true,
                new_config: Some(Arc::new(config)),
                ..cfg
            });
        }
        if self.phase != BuildPhase::Done {
            return self.build(BuildCfg {
                reset_state: true,
                ..cfg
            });
        }

        self.begin(cfg);
        self.report.static_files += self.sync_statics(&changes.statics)?;

        if changes.layouts {
            self.collab.renderer.invalidate();
            self.force_prepare = true;
        }
        if changes.data || changes.i18n {
            self.data = SiteData::load(&self.config)?;
        }

        if changes.content.is_empty() && !changes.affects_all_pages() {
            return Ok(self.take_report());
        }

        let plan = if changes.content.is_empty() {
            Plan::Patch {
                patches: Vec::new(),
                touched: Vec::new(),
            }
        } else {
            self.plan_content(&changes.content)?
        };

        match plan {
            Plan::Structural(reason) => {
                debug!("rebuild"; "re-reading content: {}", reason);
                self.reset();
                self.collect()?;
                self.link()?;
                self.synthesize()?;
                self.report.full = true;
                self.scope = RenderScope::All;
            }
            Plan::Patch { patches, touched } => {
                let scope = self.apply_patches(patches, touched)?;
                self.scope = if changes.affects_all_pages() {
                    RenderScope::All
                } else {
                    scope
                };
                self.phase = BuildPhase::Synthesized;
            }
        }
        log_scope(&self.scope);

        self.prepare()?;
        self.render()?;
        self.finish()?;
        Ok(self.take_report())
    }

    /// Turn events on symlink targets into events on every content path
    /// they back.
    fn expand_symlinked(&self, changes: &mut ChangeSet) {
        for (path, op) in std::mem::take(&mut changes.other) {
            let real = path.to_string_lossy().replace('\\', "/");
            for (virtual_path, lang) in self.change_map.virtual_paths(&real) {
                changes.content.push(ContentChange {
                    path: virtual_path,
                    lang,
                    op,
                    abs: path.clone(),
                });
            }
        }
    }

    fn sync_statics(&self, statics: &[StaticChange]) -> Result<usize, BuildError> {
        for change in statics {
            let bytes = if change.op.is_removal() {
                None
            } else {
                match fs::read(&change.abs) {
                    Ok(bytes) => Some(bytes),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                    Err(e) => {
                        return Err(BuildError::io(
                            format!("failed to read {}", change.abs.display()),
                            e,
                        ));
                    }
                }
            };
            match bytes {
                Some(bytes) => self.publish(&change.path, &bytes)?,
                None => self
                    .collab
                    .publisher
                    .remove(&change.path)
                    .map_err(|e| BuildError::io(format!("failed to remove {}", change.path), e))?,
            }
        }
        Ok(statics.len())
    }

    /// Decide between patching pages in place and re-reading everything.
    fn plan_content(&self, changes: &[ContentChange]) -> Result<Plan, BuildError> {
        let loader = PageLoader::new(&self.config, &self.languages, self.collab.parser.as_ref());
        let all = self.all_raw.read().clone();
        let mut patches: Vec<(PageRef, PageRef)> = Vec::new();
        let mut touched: Vec<PageRef> = Vec::new();

        for change in changes {
            let classified = self.change_map.classify(&change.path);
            // no discovery pass runs on a patch, so put the entry back
            if let Owner::Bundle { root, bundle } = &classified.owner {
                self.change_map.record_bundle(root, *bundle);
            }

            if change.op != FsOp::Write {
                return Ok(Plan::structural(format!("{} was {:?}", change.path, change.op)));
            }

            let path = loader.parse_path(&change.path);
            match &classified.owner {
                Owner::NewBundle { root, .. } => {
                    return Ok(Plan::structural(format!("new bundle at {root}")));
                }
                Owner::Bundle {
                    root,
                    bundle: BundleType::Leaf,
                } if !(path.bundle() == Some(BundleType::Leaf)
                    && root.trim_matches('/') == path.dir()) =>
                {
                    // a resource of the bundle
                    let dir = root.trim_matches('/');
                    touched.extend(
                        all.iter()
                            .filter(|p| {
                                p.is_bundle()
                                    && p.resource_root() == change.lang.as_deref()
                                    && p.source().is_some_and(|s| s.dir() == dir)
                            })
                            .cloned(),
                    );
                    continue;
                }
                _ if !path.is_content() => continue,
                _ => {}
            }

            let Some(lang) = loader.language_for(change.lang.as_deref(), &path) else {
                continue;
            };
            let Some(old) = all
                .iter()
                .find(|p| p.lang() == lang.code && p.source_ref() == change.path)
                .cloned()
            else {
                return Ok(Plan::structural(format!("{} is not a known page", change.path)));
            };

            let file = self
                .collab
                .source
                .read_file(&change.path, change.lang.as_deref())
                .map_err(|e| BuildError::io(format!("failed to read {}", change.path), e))?;
            let Some(file) = file else {
                return Ok(Plan::structural(format!("{} disappeared", change.path)));
            };

            let page = match loader.reload(&file, old.resources().to_vec())? {
                Loaded::Page(page) => page,
                Loaded::Skipped(reason) => {
                    return Ok(Plan::structural(format!("{} is now {reason}", change.path)));
                }
                Loaded::Disabled => continue,
            };
            if page.meta_fingerprint() != old.meta_fingerprint()
                || page.translation_key() != old.translation_key()
                || page.permalink() != old.permalink()
            {
                return Ok(Plan::structural(format!("front matter of {} changed", change.path)));
            }
            patches.push((old, page));
        }

        Ok(Plan::Patch { patches, touched })
    }

    /// Swap re-parsed pages into every list that holds them and return the
    /// pages to re-render.
    fn apply_patches(
        &mut self,
        patches: Vec<(PageRef, PageRef)>,
        touched: Vec<PageRef>,
    ) -> Result<RenderScope, BuildError> {
        let mut relink = false;
        for (old, new) in &patches {
            {
                let mut all = self.all_raw.write();
                if let Some(slot) = all.iter_mut().find(|p| Arc::ptr_eq(p, old)) {
                    *slot = new.clone();
                }
            }
            if let Some(site) = self.site(new.lang()) {
                site.collections().replace_raw(old, new.clone());
            }

            // a losing same-language duplicate stays unlinked
            let owns_slot = self
                .translations
                .get(old.translation_key())
                .is_some_and(|group| group.iter().any(|p| Arc::ptr_eq(p, old)));
            if owns_slot && !self.translations.replace(new) {
                relink = true;
            }
        }
        if relink {
            self.relink()?;
        }
        for site in &self.sites {
            site.collections().reset();
            site.assemble();
        }

        let mut scope = RenderScope::pages();
        for page in patches.iter().map(|(_, new)| new).chain(&touched) {
            self.add_neighbors(&mut scope, page);
        }
        Ok(scope)
    }

    /// The page, its translations, its section pages, the taxonomy pages of
    /// its terms and its home page.
    fn add_neighbors(&self, scope: &mut RenderScope, page: &PageRef) {
        scope.add(page);
        for translation in page.translations() {
            scope.add(&translation);
        }

        let Some(site) = self.site(page.lang()) else {
            return;
        };
        let collections = site.collections();
        let sections = page.sections();
        if let Some(top) = sections.first()
            && let Some(section) = collections.find_structural(PageKind::Section, &[top.clone()])
        {
            scope.add(&section);
        }
        if sections.len() > 1
            && let Some(section) = collections.find_structural(PageKind::Section, sections)
        {
            scope.add(&section);
        }

        for (plural, key) in term_page_keys(page, &self.config.taxonomy_plurals()) {
            if let Some(term) = collections.find_structural(PageKind::Taxonomy, &[plural.clone(), key])
            {
                scope.add(&term);
            }
            if let Some(listing) = collections.find_structural(PageKind::TaxonomyTerm, &[plural]) {
                scope.add(&listing);
            }
        }

        if let Some(home) = site.home() {
            scope.add(&home);
        }
    }
}
