//! Content-relative path anatomy.
//!
//! ```text
//! sect/doc1.fr.md
//! ├─ dir         = "sect"
//! ├─ base_name   = "doc1"        (language suffix and extension stripped)
//! ├─ lang        = Some("fr")    (only configured codes count)
//! └─ ext         = "md"
//! ```
//!
//! `index.*` marks a leaf bundle, `_index.*` a branch bundle.

use std::fmt;

use crate::core::ContentKind;
use crate::utils::normalize_rel_path;

/// Bundle flavor of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleType {
    /// `index.md`: the directory and its whole subtree are one page
    Leaf,
    /// `_index.md`: section-like, owns only its direct files
    Branch,
}

impl BundleType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Branch => "branch",
        }
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed content-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentPath {
    /// Normalized path with `/` separators, no leading slash.
    path: String,
    /// Parent directory, `""` at the content root.
    dir: String,
    /// File name without language suffix and extension.
    base_name: String,
    ext: String,
    lang: Option<String>,
    bundle: Option<BundleType>,
}

impl ContentPath {
    /// Parse `path`, treating `.xx.` as a language suffix only when `xx` is
    /// one of `languages`.
    pub fn parse(path: &str, languages: &[&str]) -> Self {
        let path = normalize_rel_path(path);
        let (dir, file_name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir.to_string(), name.to_string()),
            None => (String::new(), path.clone()),
        };

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
            _ => (file_name.clone(), String::new()),
        };

        let (base_name, lang) = match stem.rsplit_once('.') {
            Some((base, code)) if languages.contains(&code) => {
                (base.to_string(), Some(code.to_string()))
            }
            _ => (stem, None),
        };

        let is_content = ContentKind::from_extension(&ext).is_some();
        let bundle = match base_name.as_str() {
            "index" if is_content => Some(BundleType::Leaf),
            "_index" if is_content => Some(BundleType::Branch),
            _ => None,
        };

        Self {
            path,
            dir,
            base_name,
            ext,
            lang,
            bundle,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    #[inline]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[inline]
    pub fn ext(&self) -> &str {
        &self.ext
    }

    #[inline]
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    #[inline]
    pub fn bundle(&self) -> Option<BundleType> {
        self.bundle
    }

    pub fn content_kind(&self) -> Option<ContentKind> {
        ContentKind::from_extension(&self.ext)
    }

    pub fn is_content(&self) -> bool {
        self.content_kind().is_some()
    }

    /// File name as written, e.g. `doc1.fr.md`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Directory segments, root yields none.
    pub fn dir_segments(&self) -> Vec<&str> {
        self.dir.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Path without language suffix and extension: `sect/doc1`.
    ///
    /// For bundle index files this is the bundle directory.
    pub fn logical_path(&self) -> String {
        if self.bundle.is_some() {
            return self.dir.clone();
        }
        if self.dir.is_empty() {
            self.base_name.clone()
        } else {
            format!("{}/{}", self.dir, self.base_name)
        }
    }

    /// Name of the directory holding this file, `""` at the root.
    pub fn dir_name(&self) -> &str {
        self.dir.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Directory key used by the change map: `/a/b1/`, root is `/`.
pub fn dir_key(dir: &str) -> String {
    let inner = dir.trim_matches('/');
    if inner.is_empty() {
        "/".to_string()
    } else {
        format!("/{inner}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGS: &[&str] = &["en", "fr"];

    #[test]
    fn test_parse_regular_with_language() {
        let p = ContentPath::parse("sect/doc1.fr.md", LANGS);
        assert_eq!(p.dir(), "sect");
        assert_eq!(p.base_name(), "doc1");
        assert_eq!(p.lang(), Some("fr"));
        assert_eq!(p.ext(), "md");
        assert_eq!(p.bundle(), None);
        assert_eq!(p.logical_path(), "sect/doc1");
        assert_eq!(p.file_name(), "doc1.fr.md");
    }

    #[test]
    fn test_unknown_suffix_is_part_of_name() {
        let p = ContentPath::parse("sect/v1.2.md", LANGS);
        assert_eq!(p.base_name(), "v1.2");
        assert_eq!(p.lang(), None);
    }

    #[test]
    fn test_bundle_markers() {
        let leaf = ContentPath::parse("a/b1/index.md", LANGS);
        assert_eq!(leaf.bundle(), Some(BundleType::Leaf));
        assert_eq!(leaf.logical_path(), "a/b1");
        assert_eq!(leaf.dir_name(), "b1");

        let branch = ContentPath::parse("a/_index.fr.md", LANGS);
        assert_eq!(branch.bundle(), Some(BundleType::Branch));
        assert_eq!(branch.lang(), Some("fr"));

        let not_content = ContentPath::parse("a/index.json", LANGS);
        assert_eq!(not_content.bundle(), None);
    }

    #[test]
    fn test_root_file() {
        let p = ContentPath::parse("/_index.md", LANGS);
        assert_eq!(p.as_str(), "_index.md");
        assert_eq!(p.dir(), "");
        assert!(p.dir_segments().is_empty());
        assert_eq!(p.logical_path(), "");
    }

    #[test]
    fn test_dir_key() {
        assert_eq!(dir_key(""), "/");
        assert_eq!(dir_key("a/b1"), "/a/b1/");
        assert_eq!(dir_key("/a/"), "/a/");
    }
}
