//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! content = "content"     # Content root (relative to site root)
//! layouts = "layouts"     # Templates handed to the renderer
//! output = "public"       # Publish root
//! drafts = false          # Include `draft = true` pages
//! workers = 0             # Prepare workers (0 = available parallelism)
//! timeout_ms = 30000      # Abort the build after this many milliseconds
//! summary_length = 70     # Words in an automatic summary
//!
//! [build.diagnostics]
//! max_errors = 10         # Max collected errors to log
//!
//! [build.sitemap]
//! enable = true
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Content source directory.
    pub content: PathBuf,

    /// Layout (template) directory.
    pub layouts: PathBuf,

    /// Shared data files (`.toml` / `.json`).
    pub data: PathBuf,

    /// Translation string tables, one `<lang>.toml` per language.
    pub i18n: PathBuf,

    /// Files copied verbatim to the output.
    #[serde(rename = "static")]
    pub static_dir: PathBuf,

    /// Build output directory.
    pub output: PathBuf,

    /// Publish pages marked `draft = true`.
    pub drafts: bool,

    /// Publish pages dated in the future.
    pub future: bool,

    /// Publish pages past their `expiryDate`.
    pub expired: bool,

    /// Prepare-for-render workers, 0 = available parallelism.
    pub workers: usize,

    /// Wall-clock budget for one build.
    pub timeout_ms: Option<u64>,

    /// Words kept by an automatic summary.
    pub summary_length: usize,

    pub diagnostics: DiagnosticsConfig,

    pub sitemap: SitemapConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content: "content".into(),
            layouts: "layouts".into(),
            data: "data".into(),
            i18n: "i18n".into(),
            static_dir: "static".into(),
            output: "public".into(),
            drafts: false,
            future: false,
            expired: false,
            workers: 0,
            timeout_ms: None,
            summary_length: 70,
            diagnostics: DiagnosticsConfig::default(),
            sitemap: SitemapConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Number of prepare workers to spawn.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.summary_length == 0 {
            diag.error_with_hint(
                "build.summary_length",
                "summary length must be positive",
                "remove the field to use the default of 70 words",
            );
        }
        if self.timeout_ms == Some(0) {
            diag.error("build.timeout_ms", "timeout of 0ms would abort every build");
        }
        if self.content == self.output {
            diag.error("build.output", "output directory must differ from the content directory");
        }
    }
}

/// `[build.diagnostics]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum collected errors to log.
    pub max_errors: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { max_errors: 10 }
    }
}

/// `[build.sitemap]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    pub enable: bool,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self { enable: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.content, PathBuf::from("content"));
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.static_dir, PathBuf::from("static"));
        assert_eq!(config.build.summary_length, 70);
        assert_eq!(config.build.diagnostics.max_errors, 10);
        assert!(config.build.sitemap.enable);
        assert!(!config.build.drafts);
        assert!(config.build.timeout().is_none());
    }

    #[test]
    fn test_custom_build() {
        let config = test_parse_config(
            r#"
[build]
static = "assets"
workers = 3
timeout_ms = 1500

[build.diagnostics]
max_errors = 2
"#,
        );
        assert_eq!(config.build.static_dir, PathBuf::from("assets"));
        assert_eq!(config.build.worker_count(), 3);
        assert_eq!(config.build.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.build.diagnostics.max_errors, 2);
    }

    #[test]
    fn test_validate_summary_length() {
        let build = BuildConfig {
            summary_length: 0,
            ..BuildConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }
}
