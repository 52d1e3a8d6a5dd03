//! Full build: collect -> link -> synthesize, then prepare and render.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{BuildCfg, BuildError, BuildPhase, BuildReport, ErrorCollector, SiteSet};
use crate::config::SiteConfig;
use crate::content::{
    BundleType, ContentPath, FrontMatterParser, PublishPolicy, SourceFile,
};
use crate::language::{Language, Languages};
use crate::page::{Page, PageRef};
use crate::site::{SiteData, TranslationMap};
use crate::utils::date::DateTimeUtc;
use crate::debug;

/// Leaf bundle roots keyed by content root language and directory.
type LeafRoots = FxHashSet<(Option<String>, String)>;

impl SiteSet {
    /// Run the whole sequence for one generation.
    ///
    /// With `reset_state`, or when no generation got past synthesis, every
    /// page is re-read. Otherwise existing pages are kept and only
    /// prepare and render run again. A fatal error discards the
    /// generation.
    pub fn build(&mut self, cfg: BuildCfg) -> Result<BuildReport, BuildError> {
        let result = self.run_build(cfg);
        if let Err(err) = &result
            && err.is_fatal()
        {
            self.reset();
        }
        result
    }

    fn run_build(&mut self, cfg: BuildCfg) -> Result<BuildReport, BuildError> {
        if let Some(config) = cfg.new_config.clone() {
            self.apply_config(config)?;
        }
        let full = cfg.reset_state || self.phase < BuildPhase::Synthesized;
        self.begin(cfg);
        self.report.full = full;
        self.copy_statics = full;

        if full {
            self.reset();
            self.collect()?;
            self.link()?;
            self.synthesize()?;
        } else {
            // keep pages, re-run everything downstream of them
            self.data = SiteData::load(&self.config)?;
            self.force_prepare = true;
            for site in &self.sites {
                site.collections().reset();
                site.assemble();
            }
            self.phase = BuildPhase::Synthesized;
        }

        self.prepare()?;
        self.render()?;
        self.finish()?;
        Ok(self.take_report())
    }

    /// Read every content file and distribute the pages to their sites.
    pub fn collect(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Collected)?;
        self.checkpoint()?;

        self.data = SiteData::load(&self.config)?;
        let files = self
            .collab
            .source
            .list_files()
            .map_err(|e| BuildError::io("failed to list content files", e))?;

        self.change_map.clear();
        for link in self.collab.source.symlinks() {
            self.change_map
                .add_symlink(&link.real, &link.virtual_dir, link.lang.as_deref());
        }

        let loader = PageLoader::new(&self.config, &self.languages, self.collab.parser.as_ref());
        let leaf_roots = self.discover_bundles(&files, &loader);

        // bundle resources by owning leaf root
        let mut resources: FxHashMap<(Option<String>, String), Vec<String>> = FxHashMap::default();
        let mut content: Vec<(&SourceFile, ContentPath)> = Vec::new();
        for file in &files {
            let path = loader.parse_path(&file.path);
            let is_leaf_index = path.bundle() == Some(BundleType::Leaf);
            let owner = owning_leaf(&leaf_roots, &file.lang, path.dir(), !is_leaf_index);
            match owner {
                Some(root) => resources
                    .entry((file.lang.clone(), root))
                    .or_default()
                    .push(file.path.clone()),
                None if path.is_content() => content.push((file, path)),
                None => {}
            }
        }

        let errors = ErrorCollector::new(self.config.build.diagnostics.max_errors);
        let mut pages: Vec<PageRef> = Vec::with_capacity(content.len());
        for (file, path) in &content {
            let attached = match path.bundle() {
                Some(BundleType::Leaf) => resources
                    .get(&(file.lang.clone(), path.dir().to_string()))
                    .cloned()
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            match loader.load(file, path.clone(), attached) {
                Ok(Loaded::Page(page)) => pages.push(page),
                Ok(Loaded::Skipped(reason)) => debug!("collect"; "skipping {} ({})", file.path, reason),
                Ok(Loaded::Disabled) => {}
                Err(err) => errors.push(err),
            }
        }

        if !content.is_empty() && pages.is_empty() && !errors.is_empty() {
            return errors.finish();
        }
        self.report.errors += errors.log_all();

        *self.all_raw.write() = pages.clone();
        for site in &self.sites {
            let own: Vec<PageRef> = pages
                .iter()
                .filter(|p| p.lang() == site.lang())
                .cloned()
                .collect();
            self.report.site_mut(site.lang()).pages = own.len();
            site.collections().rebuild(own);
        }

        debug!("collect"; "{} pages from {} files", pages.len(), files.len());
        self.phase = BuildPhase::Collected;
        Ok(())
    }

    /// Record every bundle in the change map and return the leaf roots.
    fn discover_bundles(&self, files: &[SourceFile], loader: &PageLoader<'_>) -> LeafRoots {
        let mut leafs = LeafRoots::default();
        for file in files {
            let path = loader.parse_path(&file.path);
            let Some(bundle) = path.bundle() else {
                continue;
            };
            self.change_map.record_bundle(path.dir(), bundle);
            if bundle == BundleType::Leaf && !path.dir().is_empty() {
                leafs.insert((file.lang.clone(), path.dir().to_string()));
            }
        }
        leafs
    }

    /// Group the merged page set by translation key and cross-link it.
    pub fn link(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Linked)?;
        self.relink()?;
        self.phase = BuildPhase::Linked;
        Ok(())
    }

    pub(super) fn relink(&mut self) -> Result<(), BuildError> {
        let pages = self.all_raw.read().clone();
        self.translations = TranslationMap::group(&pages)?;
        self.translations.assign(&pages);
        Ok(())
    }

    /// Create missing home, section, taxonomy and 404 pages in every site,
    /// then relink so the new pages get their translations.
    pub fn synthesize(&mut self) -> Result<(), BuildError> {
        self.require(BuildPhase::Synthesized)?;
        self.checkpoint()?;

        for site in &self.sites {
            let created = site.create_missing_pages(true)?;
            if created.is_empty() {
                continue;
            }
            self.report.site_mut(site.lang()).synthesized += created.len();
            self.all_raw.write().extend(created);
        }
        self.relink()?;
        for site in &self.sites {
            site.collections().reset();
            site.assemble();
        }

        self.phase = BuildPhase::Synthesized;
        Ok(())
    }
}

/// Deepest leaf root owning `dir`; `include_self` lets `dir` itself match.
fn owning_leaf(
    roots: &LeafRoots,
    lang: &Option<String>,
    dir: &str,
    include_self: bool,
) -> Option<String> {
    if roots.is_empty() {
        return None;
    }
    let mut current = if include_self {
        Some(dir)
    } else {
        dir.rsplit_once('/').map(|(parent, _)| parent)
    };
    while let Some(candidate) = current {
        if candidate.is_empty() {
            break;
        }
        if roots.contains(&(lang.clone(), candidate.to_string())) {
            return Some(candidate.to_string());
        }
        current = candidate.rsplit_once('/').map(|(parent, _)| parent);
    }
    None
}

// ============================================================================
// page loading
// ============================================================================

pub(super) enum Loaded {
    Page(PageRef),
    /// Excluded by the publish policy.
    Skipped(&'static str),
    /// Belongs to a disabled language.
    Disabled,
}

/// Turns source files into pages.
pub(super) struct PageLoader<'a> {
    languages: &'a Languages,
    parser: &'a dyn FrontMatterParser,
    /// Every configured code, disabled ones included, so `doc.de.md` of a
    /// disabled `de` is recognized and dropped.
    codes: Vec<&'a str>,
    plurals: Vec<&'a str>,
    policy: PublishPolicy,
    now: DateTimeUtc,
}

impl<'a> PageLoader<'a> {
    pub(super) fn new(
        config: &'a SiteConfig,
        languages: &'a Languages,
        parser: &'a dyn FrontMatterParser,
    ) -> Self {
        let mut codes: Vec<&str> = languages.codes();
        for code in config.languages.keys() {
            if !codes.contains(&code.as_str()) {
                codes.push(code);
            }
        }
        Self {
            languages,
            parser,
            codes,
            plurals: config.taxonomy_plurals(),
            policy: PublishPolicy::from_config(&config.build),
            now: DateTimeUtc::now(),
        }
    }

    pub(super) fn parse_path(&self, path: &str) -> ContentPath {
        ContentPath::parse(path, &self.codes)
    }

    /// Language from the content root, then the file suffix, then the
    /// default. `None` for a disabled language.
    pub(super) fn language_for(&self, tag: Option<&str>, path: &ContentPath) -> Option<Arc<Language>> {
        let code = tag
            .or(path.lang())
            .unwrap_or(self.languages.default_language().code.as_str());
        self.languages.by_code(code).cloned()
    }

    pub(super) fn load(
        &self,
        file: &SourceFile,
        path: ContentPath,
        resources: Vec<String>,
    ) -> Result<Loaded, BuildError> {
        let Some(lang) = self.language_for(file.lang.as_deref(), &path) else {
            return Ok(Loaded::Disabled);
        };
        let parsed = self
            .parser
            .parse(&file.bytes)
            .map_err(|e| BuildError::file(&file.path, e.line, e.message))?;
        if let Some(reason) = self.policy.skip_reason(&parsed.meta, self.now) {
            return Ok(Loaded::Skipped(reason));
        }
        let page = Page::from_source(path, lang, parsed, &self.plurals, file.modified)
            .with_resources(file.lang.clone(), resources);
        Ok(Loaded::Page(Arc::new(page)))
    }

    /// Load a single re-read file with the resources its old page had.
    pub(super) fn reload(
        &self,
        file: &SourceFile,
        resources: Vec<String>,
    ) -> Result<Loaded, BuildError> {
        self.load(file, self.parse_path(&file.path), resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots(entries: &[(Option<&str>, &str)]) -> LeafRoots {
        entries
            .iter()
            .map(|(lang, dir)| (lang.map(str::to_string), dir.to_string()))
            .collect()
    }

    #[test]
    fn test_owning_leaf_prefers_deepest() {
        let roots = roots(&[(None, "posts/trip"), (None, "posts/trip/day1")]);
        assert_eq!(
            owning_leaf(&roots, &None, "posts/trip/day1/img", true).as_deref(),
            Some("posts/trip/day1")
        );
        assert_eq!(
            owning_leaf(&roots, &None, "posts/trip", true).as_deref(),
            Some("posts/trip")
        );
        // the bundle's own index is not a resource of itself
        assert_eq!(owning_leaf(&roots, &None, "posts/trip", false), None);
        assert_eq!(
            owning_leaf(&roots, &None, "posts/trip/day1", false).as_deref(),
            Some("posts/trip")
        );
    }

    #[test]
    fn test_owning_leaf_respects_root_language() {
        let roots = roots(&[(Some("fr"), "trip")]);
        assert_eq!(owning_leaf(&roots, &None, "trip", true), None);
        assert!(owning_leaf(&roots, &Some("fr".into()), "trip", true).is_some());
    }
}
