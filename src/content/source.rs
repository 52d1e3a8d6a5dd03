//! Content sources.
//!
//! A source lists the files under every content root. Roots configured
//! through `[languages.<code>] content_dir` tag their files with that
//! language; the main content root leaves the language to the file name.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::WalkDir;
use parking_lot::RwLock;

use crate::config::SiteConfig;
use crate::core::ContentKind;
use crate::language::Languages;
use crate::utils::normalize_rel_path;

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// One file under a content root.
///
/// `bytes` is only loaded for content files; bundle resources carry their
/// path alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Root-relative path with `/` separators.
    pub path: String,
    /// Language of the root the file was found in.
    pub lang: Option<String>,
    pub bytes: Vec<u8>,
    pub modified: Option<SystemTime>,
}

/// A symlinked directory inside a content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkDir {
    /// Target as reported by change events.
    pub real: String,
    /// Location inside the content root.
    pub virtual_dir: String,
    /// Language of the content root holding the link.
    pub lang: Option<String>,
}

/// Provides the raw content files.
pub trait ContentSource: Send + Sync {
    /// Every file under every root.
    fn list_files(&self) -> io::Result<Vec<SourceFile>>;

    /// Re-read one file. `Ok(None)` when it no longer exists.
    fn read_file(&self, path: &str, lang: Option<&str>) -> io::Result<Option<SourceFile>>;

    /// Raw bytes of any file, bundle resources included. `Ok(None)` when
    /// it no longer exists.
    fn read_bytes(&self, path: &str, lang: Option<&str>) -> io::Result<Option<Vec<u8>>>;

    /// Files below a directory (`""` = whole root) of one root.
    fn list_dir(&self, dir: &str, lang: Option<&str>) -> io::Result<Vec<SourceFile>> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir.trim_matches('/'))
        };
        Ok(self
            .list_files()?
            .into_iter()
            .filter(|f| f.lang.as_deref() == lang && f.path.starts_with(&prefix))
            .collect())
    }

    /// Symlinked directories discovered while listing.
    fn symlinks(&self) -> Vec<SymlinkDir> {
        Vec::new()
    }
}

// ============================================================================
// Filesystem
// ============================================================================

#[derive(Debug, Clone)]
struct ContentRoot {
    dir: PathBuf,
    lang: Option<String>,
}

/// Walks content roots on disk with `jwalk`.
#[derive(Debug)]
pub struct FsContentSource {
    roots: Vec<ContentRoot>,
    symlinks: RwLock<Vec<SymlinkDir>>,
}

impl FsContentSource {
    /// Single untagged root.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![ContentRoot {
                dir: dir.into(),
                lang: None,
            }],
            symlinks: RwLock::new(Vec::new()),
        }
    }

    /// Main content root plus every language `content_dir`.
    pub fn from_config(config: &SiteConfig, languages: &Languages) -> Self {
        let mut roots = vec![ContentRoot {
            dir: config.root_join(&config.build.content),
            lang: None,
        }];
        for lang in languages.iter() {
            if let Some(dir) = &lang.content_dir {
                roots.push(ContentRoot {
                    dir: config.root_join(dir),
                    lang: Some(lang.code.clone()),
                });
            }
        }
        Self {
            roots,
            symlinks: RwLock::new(Vec::new()),
        }
    }

    fn root_for(&self, lang: Option<&str>) -> Option<&ContentRoot> {
        self.roots.iter().find(|root| root.lang.as_deref() == lang)
    }

    /// Other roots nested inside `root`, skipped while walking it.
    fn nested_roots(&self, root: &ContentRoot) -> Vec<&Path> {
        self.roots
            .iter()
            .filter(|other| other.dir != root.dir && other.dir.starts_with(&root.dir))
            .map(|other| other.dir.as_path())
            .collect()
    }

    fn load(root: &ContentRoot, abs: &Path) -> io::Result<Option<SourceFile>> {
        let Ok(rel) = abs.strip_prefix(&root.dir) else {
            return Ok(None);
        };
        let meta = match std::fs::metadata(abs) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let bytes = if ContentKind::is_content_file(abs) {
            std::fs::read(abs)?
        } else {
            Vec::new()
        };
        Ok(Some(SourceFile {
            path: normalize_rel_path(&rel.to_string_lossy()),
            lang: root.lang.clone(),
            bytes,
            modified: meta.modified().ok(),
        }))
    }
}

impl ContentSource for FsContentSource {
    fn list_files(&self) -> io::Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        let mut symlinks = Vec::new();

        for root in &self.roots {
            if !root.dir.is_dir() {
                continue;
            }
            let nested = self.nested_roots(root);
            for entry in WalkDir::new(&root.dir).follow_links(true) {
                let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
                let path = entry.path();
                if nested.iter().any(|n| path.starts_with(n)) {
                    continue;
                }
                if entry.path_is_symlink()
                    && entry.file_type().is_dir()
                    && let Ok(real) = std::fs::canonicalize(&path)
                    && let Ok(rel) = path.strip_prefix(&root.dir)
                {
                    symlinks.push(SymlinkDir {
                        real: real.to_string_lossy().replace('\\', "/"),
                        virtual_dir: normalize_rel_path(&rel.to_string_lossy()),
                        lang: root.lang.clone(),
                    });
                }
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_str().unwrap_or_default();
                if IGNORED_FILES.contains(&name) || name.starts_with('.') {
                    continue;
                }
                if let Some(file) = Self::load(root, &path)? {
                    files.push(file);
                }
            }
        }

        *self.symlinks.write() = symlinks;
        files.sort_by(|a, b| a.lang.cmp(&b.lang).then_with(|| a.path.cmp(&b.path)));
        Ok(files)
    }

    fn read_file(&self, path: &str, lang: Option<&str>) -> io::Result<Option<SourceFile>> {
        let Some(root) = self.root_for(lang) else {
            return Ok(None);
        };
        Self::load(root, &root.dir.join(normalize_rel_path(path)))
    }

    fn read_bytes(&self, path: &str, lang: Option<&str>) -> io::Result<Option<Vec<u8>>> {
        let Some(root) = self.root_for(lang) else {
            return Ok(None);
        };
        match std::fs::read(root.dir.join(normalize_rel_path(path))) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn symlinks(&self) -> Vec<SymlinkDir> {
        self.symlinks.read().clone()
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory source for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<BTreeMap<(Option<String>, String), Vec<u8>>>,
    symlinks: RwLock<Vec<SymlinkDir>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert into the main root.
    pub fn with(self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.files
            .write()
            .insert((None, normalize_rel_path(path)), content.as_bytes().to_vec());
    }

    /// Insert into a language-tagged root.
    pub fn insert_lang(&self, lang: &str, path: &str, content: &str) {
        self.files.write().insert(
            (Some(lang.to_string()), normalize_rel_path(path)),
            content.as_bytes().to_vec(),
        );
    }

    /// Report `virtual_dir` as a link to the directory `real`.
    pub fn add_symlink(&self, real: &str, virtual_dir: &str, lang: Option<&str>) {
        self.symlinks.write().push(SymlinkDir {
            real: real.replace('\\', "/"),
            virtual_dir: normalize_rel_path(virtual_dir),
            lang: lang.map(str::to_string),
        });
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .remove(&(None, normalize_rel_path(path)))
            .is_some()
    }
}

impl ContentSource for MemorySource {
    fn list_files(&self) -> io::Result<Vec<SourceFile>> {
        Ok(self
            .files
            .read()
            .iter()
            .map(|((lang, path), bytes)| SourceFile {
                path: path.clone(),
                lang: lang.clone(),
                bytes: bytes.clone(),
                modified: None,
            })
            .collect())
    }

    fn read_file(&self, path: &str, lang: Option<&str>) -> io::Result<Option<SourceFile>> {
        let key = (lang.map(str::to_string), normalize_rel_path(path));
        Ok(self.files.read().get(&key).map(|bytes| SourceFile {
            path: key.1.clone(),
            lang: key.0.clone(),
            bytes: bytes.clone(),
            modified: None,
        }))
    }

    fn read_bytes(&self, path: &str, lang: Option<&str>) -> io::Result<Option<Vec<u8>>> {
        let key = (lang.map(str::to_string), normalize_rel_path(path));
        Ok(self.files.read().get(&key).cloned())
    }

    fn symlinks(&self) -> Vec<SymlinkDir> {
        self.symlinks.read().clone()
    }
}
