//! File Classification Pipeline
//!
//! Pure functions that sort watcher events into rebuild categories.
//! No watcher machinery, no side effects.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

pub use crate::core::FileCategory;
use crate::config::SiteConfig;
use crate::utils::{normalize_path, normalize_rel_path};

// =============================================================================
// Events
// =============================================================================

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
}

impl FsOp {
    /// Whether the path is gone after this event.
    #[inline]
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Remove | Self::Rename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// A changed file below a content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// Root-relative path with `/` separators.
    pub path: String,
    /// Language of a `[languages.<code>] content_dir` root.
    pub lang: Option<String>,
    pub op: FsOp,
    pub abs: PathBuf,
}

/// A changed file below the static directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticChange {
    pub path: String,
    pub op: FsOp,
    pub abs: PathBuf,
}

/// Events sorted by what they invalidate.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Every event with its category (for logging).
    pub classified: Vec<(PathBuf, FileCategory)>,
    /// Config changed - requires full rebuild
    pub config: bool,
    pub layouts: bool,
    pub data: bool,
    pub i18n: bool,
    pub content: Vec<ContentChange>,
    pub statics: Vec<StaticChange>,
    /// Paths outside every watched root; may back a symlinked content dir.
    pub other: Vec<(PathBuf, FsOp)>,
}

impl ChangeSet {
    /// Nothing a rebuild has to act on.
    pub fn is_empty(&self) -> bool {
        !self.config
            && !self.affects_all_pages()
            && self.content.is_empty()
            && self.statics.is_empty()
    }

    /// Layout, data or i18n changes can alter any page.
    pub fn affects_all_pages(&self) -> bool {
        self.layouts || self.data || self.i18n
    }

    /// `content, layout` style list of the categories present.
    pub fn summary(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for (_, category) in &self.classified {
            if *category != FileCategory::Unknown && !names.contains(&category.name()) {
                names.push(category.name());
            }
        }
        names.join(", ")
    }
}

/// Watched directories, resolved once per config.
#[derive(Debug, Clone)]
pub struct WatchRoots {
    config_path: PathBuf,
    output: PathBuf,
    layouts: PathBuf,
    data: PathBuf,
    i18n: PathBuf,
    static_dir: PathBuf,
    /// Language roots first so nested roots win over the main one.
    content: Vec<(PathBuf, Option<String>)>,
}

impl WatchRoots {
    pub fn from_config(config: &SiteConfig) -> Self {
        let resolve = |p: &Path| normalize_path(&config.root_join(p));
        let mut content: Vec<(PathBuf, Option<String>)> = config
            .enabled_languages()
            .filter_map(|(code, lang)| {
                lang.content_dir
                    .as_deref()
                    .map(|dir| (resolve(dir), Some(code.clone())))
            })
            .collect();
        content.sort_by(|a, b| b.0.as_os_str().len().cmp(&a.0.as_os_str().len()));
        content.push((resolve(&config.build.content), None));

        Self {
            config_path: normalize_path(&config.config_path),
            output: resolve(&config.build.output),
            layouts: resolve(&config.build.layouts),
            data: resolve(&config.build.data),
            i18n: resolve(&config.build.i18n),
            static_dir: resolve(&config.build.static_dir),
            content,
        }
    }

    /// Directories a watcher should observe.
    pub fn watched_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = vec![&self.layouts, &self.data, &self.i18n, &self.static_dir];
        dirs.extend(self.content.iter().map(|(dir, _)| dir.as_path()));
        dirs
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Content root containing `path`, with the path relative to it.
    pub fn content_relative(&self, path: &Path) -> Option<(String, Option<String>)> {
        self.content.iter().find_map(|(root, lang)| {
            let rel = path.strip_prefix(root).ok()?;
            Some((normalize_rel_path(&rel.to_string_lossy()), lang.clone()))
        })
    }

    /// Categorize a normalized path.
    pub fn categorize(&self, path: &Path) -> FileCategory {
        if path.starts_with(&self.output) {
            // our own output
            FileCategory::Unknown
        } else if path == self.config_path {
            FileCategory::Config
        } else if path.starts_with(&self.layouts) {
            FileCategory::Layout
        } else if path.starts_with(&self.data) {
            FileCategory::Data
        } else if path.starts_with(&self.i18n) {
            FileCategory::I18n
        } else if path.starts_with(&self.static_dir) {
            FileCategory::Static
        } else if self.content.iter().any(|(root, _)| path.starts_with(root)) {
            FileCategory::Content
        } else {
            FileCategory::Unknown
        }
    }
}

/// Sort events into a [`ChangeSet`]. The last event for a path wins.
pub fn classify_events(events: &[FsEvent], roots: &WatchRoots) -> ChangeSet {
    let mut latest: FxHashMap<PathBuf, FsOp> = FxHashMap::default();
    let mut order: Vec<PathBuf> = Vec::new();
    for event in events {
        let normalized = normalize_path(&event.path);
        if latest.insert(normalized.clone(), event.op).is_none() {
            order.push(normalized);
        }
    }

    let mut set = ChangeSet::default();
    for path in order {
        let op = latest[&path];
        let category = roots.categorize(&path);
        match category {
            FileCategory::Config => set.config = true,
            FileCategory::Layout => set.layouts = true,
            FileCategory::Data => set.data = true,
            FileCategory::I18n => set.i18n = true,
            FileCategory::Content => {
                if let Some((rel, lang)) = roots.content_relative(&path) {
                    set.content.push(ContentChange {
                        path: rel,
                        lang,
                        op,
                        abs: path.clone(),
                    });
                }
            }
            FileCategory::Static => {
                if let Ok(rel) = path.strip_prefix(&roots.static_dir) {
                    set.statics.push(StaticChange {
                        path: normalize_rel_path(&rel.to_string_lossy()),
                        op,
                        abs: path.clone(),
                    });
                }
            }
            FileCategory::Unknown => set.other.push((path.clone(), op)),
        }
        set.classified.push((path, category));
    }
    set
}
