//! URL path type for permalinks.
//!
//! - Internal representation: always decoded (human-readable)
//! - Output boundary: percent-encode when writing absolute URLs

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Decoded site-relative URL path
///
/// Invariants:
/// - Always decoded (no percent-encoding)
/// - Always starts with `/`
/// - Page URLs end with `/`, file URLs (`/404.html`) do not
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UrlPath(Arc<str>);

impl UrlPath {
    /// Root URL `/`.
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    /// Create page URL (with trailing slash). Strips query string and fragment.
    pub fn from_page(decoded: &str) -> Self {
        let path = decoded.trim().split(['?', '#']).next().unwrap_or_default();
        let inner = path.trim_matches('/');
        if inner.is_empty() {
            return Self::root();
        }
        Self(Arc::from(format!("/{inner}/")))
    }

    /// Create file URL (no trailing slash normalization).
    pub fn from_file(decoded: &str) -> Self {
        let trimmed = decoded.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Self::root();
        }
        Self(Arc::from(format!("/{trimmed}")))
    }

    /// Join page URL segments, skipping empty ones.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined = segments
            .iter()
            .map(|s| s.as_ref().trim_matches('/'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self::from_page(&joined)
    }

    /// Get the decoded URL path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode for output (percent-encode non-ASCII and special characters).
    pub fn to_encoded(&self) -> String {
        use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
        const SEGMENT: &AsciiSet = &CONTROLS
            .add(b' ')
            .add(b'"')
            .add(b'#')
            .add(b'%')
            .add(b'<')
            .add(b'>')
            .add(b'?')
            .add(b'`')
            .add(b'{')
            .add(b'}');
        self.0
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Absolute URL against a base such as `https://example.org/`.
    pub fn absolute(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.to_encoded())
    }

    /// Output file path relative to the publish root.
    ///
    /// `/sect/doc1/` + `index.html` -> `sect/doc1/index.html`,
    /// `/404.html` -> `404.html`
    pub fn output_file(&self, file_name: &str) -> String {
        let inner = self.0.trim_start_matches('/');
        if self.is_page_url() {
            format!("{inner}{file_name}")
        } else {
            inner.to_string()
        }
    }

    /// Check if this is a page URL (ends with `/`).
    #[inline]
    pub fn is_page_url(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Get parent URL path.
    ///
    /// `/posts/hello/` -> `/posts/`, `/posts/` -> `/`, `/` -> `None`
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(Arc::from(format!("{}/", &trimmed[..idx])))),
        }
    }
}

impl std::fmt::Display for UrlPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UrlPath {
    fn default() -> Self {
        Self::root()
    }
}

impl AsRef<str> for UrlPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UrlPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for UrlPath {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for UrlPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UrlPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_page(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_page() {
        assert_eq!(UrlPath::from_page("/posts/hello/").as_str(), "/posts/hello/");
        assert_eq!(UrlPath::from_page("posts/hello").as_str(), "/posts/hello/");
        assert_eq!(UrlPath::from_page("").as_str(), "/");
        assert_eq!(UrlPath::from_page("/posts/hello?v=1#top").as_str(), "/posts/hello/");
    }

    #[test]
    fn test_from_segments_skips_empty() {
        let url = UrlPath::from_segments(&["", "fr", "sect", "doc1"]);
        assert_eq!(url.as_str(), "/fr/sect/doc1/");
        let root: UrlPath = UrlPath::from_segments::<&str>(&[]);
        assert_eq!(root.as_str(), "/");
    }

    #[test]
    fn test_output_file() {
        assert_eq!(
            UrlPath::from_page("/sect/doc1/").output_file("index.html"),
            "sect/doc1/index.html"
        );
        assert_eq!(UrlPath::root().output_file("index.xml"), "index.xml");
        assert_eq!(UrlPath::from_file("/fr/404.html").output_file("index.html"), "fr/404.html");
    }

    #[test]
    fn test_to_encoded() {
        let url = UrlPath::from_page("/posts/中文/");
        assert_eq!(url.to_encoded(), "/posts/%E4%B8%AD%E6%96%87/");
        let url = UrlPath::from_page("/posts/hello world/");
        assert_eq!(url.to_encoded(), "/posts/hello%20world/");
    }

    #[test]
    fn test_absolute() {
        let url = UrlPath::from_page("/sect/");
        assert_eq!(url.absolute("https://example.org/"), "https://example.org/sect/");
        assert_eq!(url.absolute("https://example.org"), "https://example.org/sect/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            UrlPath::from_page("/posts/hello/").parent(),
            Some(UrlPath::from_page("/posts/"))
        );
        assert_eq!(UrlPath::from_page("/posts/").parent(), Some(UrlPath::root()));
        assert_eq!(UrlPath::root().parent(), None);
    }

    #[test]
    fn test_serialize_deserialize() {
        let url = UrlPath::from_page("/posts/中文/");
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, r#""/posts/中文/""#);
        let parsed: UrlPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, url);
    }
}
