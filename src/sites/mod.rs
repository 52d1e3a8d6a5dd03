//! The site set: one [`Site`] per language and the build lifecycle that
//! drives them.
//!
//! # Module Structure
//!
//! ```text
//! sites/
//! ├── build.rs    # full build: collect -> link -> synthesize
//! ├── prepare.rs  # parallel prepare-for-render worker pool
//! ├── render.rs   # rendering, aliases, static files, sitemaps
//! ├── rebuild.rs  # watch-mode partial rebuilds
//! ├── report.rs   # BuildReport
//! └── errors.rs   # BuildError, ErrorCollector
//! ```
//!
//! # Phases
//!
//! ```text
//! Created -> Collected -> Linked -> Synthesized -> Prepared -> Rendered -> Done
//! ```
//!
//! Each step checks that its predecessor completed, so calling them out of
//! order is a [`BuildError::Phase`] instead of a silently wrong site.

mod build;
mod errors;
mod prepare;
mod rebuild;
mod render;
mod report;

pub use crate::core::BuildPhase;
pub use errors::{BuildError, ErrorCollector};
pub use report::{BuildReport, SiteReport};

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::address::{RefError, RefResolver};
use crate::config::SiteConfig;
use crate::content::{ContentSource, DefaultFrontMatterParser, FrontMatterParser, FsContentSource};
use crate::core::Deadline;
use crate::language::Languages;
use crate::logger::DistinctLog;
use crate::page::{Page, PageRef};
use crate::reload::{ContentChangeMap, WatchRoots};
use crate::render::{FsPublisher, LayoutRenderer, Publisher, Renderer};
use crate::site::{Site, SiteData, TranslationMap};

use render::RenderScope;

/// Options for one build.
#[derive(Debug, Clone, Default)]
pub struct BuildCfg {
    /// Drop every page and start a new generation.
    pub reset_state: bool,
    /// Recreate languages and sites from this config first.
    pub new_config: Option<Arc<SiteConfig>>,
    /// Populate pages but write nothing.
    pub skip_render: bool,
    /// Running under a file watcher: per-page prepare and render errors
    /// are logged and counted instead of failing the build.
    pub watching: bool,
    /// Only re-render pages in `recently_visited`.
    pub partial_re_render: bool,
    /// Permalinks served recently, e.g. `/fr/sect/doc1/`.
    pub recently_visited: FxHashSet<String>,
}

impl BuildCfg {
    /// Full rebuild from scratch.
    pub fn full() -> Self {
        Self {
            reset_state: true,
            ..Self::default()
        }
    }
}

/// External collaborators of a build.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ContentSource>,
    pub parser: Arc<dyn FrontMatterParser>,
    pub renderer: Arc<dyn Renderer>,
    pub publisher: Arc<dyn Publisher>,
}

impl Collaborators {
    /// Filesystem defaults: content roots, `layouts/` and the output dir.
    pub fn from_config(config: &SiteConfig, languages: &Languages) -> Self {
        Self {
            source: Arc::new(FsContentSource::from_config(config, languages)),
            parser: Arc::new(DefaultFrontMatterParser),
            renderer: Arc::new(LayoutRenderer::new(config.root_join(&config.build.layouts))),
            publisher: Arc::new(FsPublisher::new(config.root_join(&config.build.output))),
        }
    }
}

/// Every language site of one project.
pub struct SiteSet {
    config: Arc<SiteConfig>,
    languages: Languages,
    sites: Vec<Site>,
    /// Raw pages of every site, shared with each site's collections.
    all_raw: Arc<RwLock<Vec<PageRef>>>,
    collab: Collaborators,
    data: SiteData,
    translations: TranslationMap,
    change_map: ContentChangeMap,
    roots: WatchRoots,
    warnings: DistinctLog,
    phase: BuildPhase,

    // per-build state
    cfg: BuildCfg,
    deadline: Deadline,
    scope: RenderScope,
    force_prepare: bool,
    copy_statics: bool,
    report: BuildReport,
}

impl SiteSet {
    /// Sites for every configured language. Fails on an unresolvable
    /// default language.
    pub fn new(config: Arc<SiteConfig>, collab: Collaborators) -> Result<Self, BuildError> {
        let languages = Languages::from_config(&config)?;
        let all_raw: Arc<RwLock<Vec<PageRef>>> = Arc::default();
        let sites = create_sites(&config, &languages, &all_raw);
        Ok(Self {
            roots: WatchRoots::from_config(&config),
            config,
            languages,
            sites,
            all_raw,
            collab,
            data: SiteData::default(),
            translations: TranslationMap::default(),
            change_map: ContentChangeMap::new(),
            warnings: DistinctLog::new(),
            phase: BuildPhase::Created,
            cfg: BuildCfg::default(),
            deadline: Deadline::unbounded(),
            scope: RenderScope::All,
            force_prepare: false,
            copy_statics: false,
            report: BuildReport::default(),
        })
    }

    /// Site set over the filesystem collaborators.
    pub fn from_config(config: Arc<SiteConfig>) -> Result<Self, BuildError> {
        let languages = Languages::from_config(&config)?;
        let collab = Collaborators::from_config(&config, &languages);
        Self::new(config, collab)
    }

    // ------------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &Arc<SiteConfig> {
        &self.config
    }

    pub fn languages(&self) -> &Languages {
        &self.languages
    }

    /// Sites in language order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, lang: &str) -> Option<&Site> {
        self.sites.iter().find(|site| site.lang() == lang)
    }

    /// Site of the default content language.
    pub fn default_site(&self) -> Option<&Site> {
        self.site(&self.languages.default_language().code)
    }

    #[inline]
    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn translations(&self) -> &TranslationMap {
        &self.translations
    }

    pub fn data(&self) -> &SiteData {
        &self.data
    }

    pub fn change_map(&self) -> &ContentChangeMap {
        &self.change_map
    }

    pub fn watch_roots(&self) -> &WatchRoots {
        &self.roots
    }

    /// Every raw page of every site, headless included.
    pub fn all_pages(&self) -> Vec<PageRef> {
        self.all_raw.read().clone()
    }

    /// `GetPage` against the site of `lang`.
    ///
    /// A page that is not found is `Ok(None)`; an ambiguous reference is an
    /// error.
    pub fn get_page(
        &self,
        lang: &str,
        reference: &str,
        context: Option<&Page>,
    ) -> Result<Option<PageRef>, RefError> {
        let Some(site) = self.site(lang) else {
            return Ok(None);
        };
        let index = site.collections().ref_index();
        RefResolver::new(&index)
            .with_warnings(&self.warnings)
            .resolve(reference, context)
    }

    // ------------------------------------------------------------------------
    // generation state
    // ------------------------------------------------------------------------

    /// Fail unless `next`'s predecessor is the current phase.
    fn require(&self, next: BuildPhase) -> Result<(), BuildError> {
        match next.predecessor() {
            Some(expected) if expected != self.phase => Err(BuildError::Phase {
                expected,
                actual: self.phase,
            }),
            _ => Ok(()),
        }
    }

    /// Surface per-page errors, or only log them while watching.
    fn settle(&mut self, errors: ErrorCollector) -> Result<(), BuildError> {
        if self.cfg.watching {
            self.report.errors += errors.log_all();
            Ok(())
        } else {
            errors.finish()
        }
    }

    fn checkpoint(&self) -> Result<(), BuildError> {
        self.deadline
            .check()
            .map_err(|elapsed| BuildError::Timeout { elapsed })
    }

    /// Forget every page and start a new generation.
    pub fn reset(&mut self) {
        for site in &self.sites {
            site.reset();
        }
        self.all_raw.write().clear();
        self.translations = TranslationMap::default();
        self.change_map.clear();
        self.warnings.clear();
        self.phase = BuildPhase::Created;
    }

    /// Swap in a new config, recreating languages and sites.
    fn apply_config(&mut self, config: Arc<SiteConfig>) -> Result<(), BuildError> {
        let languages = Languages::from_config(&config)?;
        self.all_raw = Arc::default();
        self.sites = create_sites(&config, &languages, &self.all_raw);
        self.roots = WatchRoots::from_config(&config);
        self.languages = languages;
        self.config = config;
        self.collab.renderer.invalidate();
        self.reset();
        Ok(())
    }

    /// Start a build: clear per-build state and arm the deadline.
    fn begin(&mut self, cfg: BuildCfg) {
        self.deadline = Deadline::new(self.config.build.timeout());
        self.cfg = cfg;
        self.scope = RenderScope::All;
        self.force_prepare = false;
        self.copy_statics = false;
        self.report = BuildReport::default();
        self.warnings.clear();
    }

    /// Finish the report for the current generation.
    fn take_report(&mut self) -> BuildReport {
        let mut report = std::mem::take(&mut self.report);
        report.elapsed = self.deadline.elapsed();
        for (site, entry) in self.sites.iter().zip(report.sites.iter_mut()) {
            entry.pages = site.collections().pages().len();
        }
        report
    }
}

impl std::fmt::Debug for SiteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteSet")
            .field("languages", &self.languages.codes())
            .field("phase", &self.phase)
            .field("pages", &self.all_raw.read().len())
            .finish()
    }
}

fn create_sites(
    config: &Arc<SiteConfig>,
    languages: &Languages,
    all_raw: &Arc<RwLock<Vec<PageRef>>>,
) -> Vec<Site> {
    languages
        .iter()
        .map(|lang| Site::new(lang.clone(), config.clone(), all_raw.clone()))
        .collect()
}
