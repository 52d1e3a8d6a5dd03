//! Publishers: where rendered bytes end up.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::Publisher;
use crate::core::UrlPath;
use crate::utils::normalize_rel_path;

const REDIRECT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>{url}</title>
<link rel="canonical" href="{url}">
<meta name="robots" content="noindex">
<meta charset="utf-8">
<meta http-equiv="refresh" content="0; url={url}">
</head>
</html>
"#;

/// Redirect page for an alias pointing at `canonical`.
pub fn redirect_html(canonical: &str) -> String {
    REDIRECT_HTML.replace("{url}", canonical)
}

/// `/old-url/` -> `old-url/index.html`
pub fn redirect_output_path(alias: &str) -> String {
    let url = if alias.ends_with(".html") {
        UrlPath::from_file(alias)
    } else {
        UrlPath::from_page(alias)
    };
    url.output_file("index.html")
}

/// Writes below an output directory.
#[derive(Debug, Clone)]
pub struct FsPublisher {
    root: PathBuf,
}

impl FsPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, path: &str) -> PathBuf {
        self.root.join(normalize_rel_path(path))
    }
}

impl Publisher for FsPublisher {
    fn write(&self, path: &str, content: &mut dyn Read) -> io::Result<()> {
        let target = self.target(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        fs::write(&target, bytes)
    }

    fn exists(&self, path: &str) -> bool {
        self.target(path).is_file()
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        match fs::remove_file(self.target(path)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Keeps output in memory, for tests and analysis runs.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().get(&normalize_rel_path(path)).cloned()
    }

    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Published paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    pub fn clear(&self) {
        self.files.write().clear();
    }
}

impl Publisher for MemoryPublisher {
    fn write(&self, path: &str, content: &mut dyn Read) -> io::Result<()> {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        self.files.write().insert(normalize_rel_path(path), bytes);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(&normalize_rel_path(path))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.files.write().remove(&normalize_rel_path(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_publisher() {
        let publisher = MemoryPublisher::new();
        publisher
            .write("/sect/doc1/index.html", &mut "hello".as_bytes())
            .unwrap();
        assert!(publisher.exists("sect/doc1/index.html"));
        assert_eq!(
            publisher.get_string("sect/doc1/index.html").as_deref(),
            Some("hello")
        );
        publisher.remove("sect/doc1/index.html").unwrap();
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_fs_publisher_writes_nested() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FsPublisher::new(dir.path());
        publisher
            .write("a/b/index.html", &mut "<p>x</p>".as_bytes())
            .unwrap();
        assert!(publisher.exists("a/b/index.html"));
        assert_eq!(
            fs::read_to_string(dir.path().join("a/b/index.html")).unwrap(),
            "<p>x</p>"
        );
        publisher.remove("a/b/index.html").unwrap();
        publisher.remove("a/b/index.html").unwrap();
        assert!(!publisher.exists("a/b/index.html"));
    }

    #[test]
    fn test_redirects() {
        assert_eq!(redirect_output_path("/old-url/"), "old-url/index.html");
        assert_eq!(redirect_output_path("old.html"), "old.html");
        assert!(redirect_html("/new/").contains("url=/new/"));
    }
}
