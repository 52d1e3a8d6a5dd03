//! Site configuration management for `site.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [build] and [languages.*] sections
//! ├── error.rs       # ConfigError, ConfigDiagnostics
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! The loaded `SiteConfig` is immutable and handed to every component as
//! `Arc<SiteConfig>`; there is no process-wide config handle.

mod error;
pub mod section;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{BuildConfig, DiagnosticsConfig, LanguageConfig, SitemapConfig};

use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "site.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing site.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute base URL, e.g. `https://example.org/`
    pub base_url: String,

    pub title: String,

    /// Language served at the root; first language by weight when unset.
    pub default_content_language: Option<String>,

    /// Also prefix the default language's URLs with its code.
    pub default_content_language_in_subdir: bool,

    /// Free-form site params handed to the renderer.
    pub params: JsonMap<String, JsonValue>,

    pub build: BuildConfig,

    /// Singular -> plural taxonomy names.
    pub taxonomies: BTreeMap<String, String>,

    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            base_url: String::new(),
            title: String::new(),
            default_content_language: None,
            default_content_language_in_subdir: false,
            params: JsonMap::new(),
            build: BuildConfig::default(),
            taxonomies: default_taxonomies(),
            languages: BTreeMap::new(),
        }
    }
}

fn default_taxonomies() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("category".to_string(), "categories".to_string()),
        ("tag".to_string(), "tags".to_string()),
    ])
}

impl SiteConfig {
    /// Load and validate configuration from a `site.toml` path.
    ///
    /// The project root is the config file's parent directory.
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = path
            .canonicalize()
            .with_context(|| format!("config file `{}` not found", path.display()))?;

        let mut config = Self::from_path(&config_path)?;
        config.root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;

        config.validate()?;
        Ok(config)
    }

    /// Re-read the file this config was loaded from.
    pub fn reload(&self) -> Result<Self, ConfigError> {
        let mut config = Self::from_path(&self.config_path)?;
        config.root = self.root.clone();
        config.config_path = self.config_path.clone();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// Unknown fields are reported as a warning, not an error.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, Path::new(CONFIG_FILE));
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the site root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Configured languages that are not disabled.
    pub fn enabled_languages(&self) -> impl Iterator<Item = (&String, &LanguageConfig)> {
        self.languages.iter().filter(|(_, lang)| !lang.disabled)
    }

    /// Plural taxonomy names in a stable order.
    pub fn taxonomy_plurals(&self) -> Vec<&str> {
        let mut plurals: Vec<&str> = self.taxonomies.values().map(String::as_str).collect();
        plurals.sort_unstable();
        plurals.dedup();
        plurals
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if !self.base_url.is_empty() && !self.base_url.contains("://") {
            diag.error_with_hint(
                "base_url",
                format!("`{}` is not an absolute URL", self.base_url),
                "use a full URL such as https://example.org/",
            );
        }

        self.build.validate(&mut diag);
        self.validate_taxonomies(&mut diag);
        self.validate_languages(&mut diag);

        diag.print_warnings();
        diag.into_result()
    }

    fn validate_taxonomies(&self, diag: &mut ConfigDiagnostics) {
        let mut seen = Vec::new();
        for (singular, plural) in &self.taxonomies {
            let field = format!("taxonomies.{singular}");
            if plural.trim().is_empty() || plural.contains('/') {
                diag.error(field.as_str(), format!("invalid taxonomy name `{plural}`"));
            } else if seen.contains(&plural) {
                diag.error(field.as_str(), format!("taxonomy `{plural}` is declared twice"));
            }
            seen.push(plural);
        }
    }

    fn validate_languages(&self, diag: &mut ConfigDiagnostics) {
        for code in self.languages.keys() {
            if code.is_empty() || code.contains(['/', '.', ' ']) {
                diag.error(
                    format!("languages.{code}").as_str(),
                    format!("invalid language code `{code}`"),
                );
            }
        }

        let Some(default) = &self.default_content_language else {
            return;
        };
        if self.languages.is_empty() {
            return;
        }
        match self.languages.get(default) {
            None => diag.error_with_hint(
                "default_content_language",
                format!("`{default}` is not a configured language"),
                format!("add a [languages.{default}] section"),
            ),
            Some(lang) if lang.disabled => diag.error(
                "default_content_language",
                format!("default language `{default}` is disabled"),
            ),
            Some(_) => {}
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> SiteConfig {
    let config = format!("base_url = \"https://example.org/\"\ntitle = \"Test\"\n{extra}");
    let (parsed, ignored) = SiteConfig::parse_with_ignored(&config).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[build\ncontent = \"x\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_site_config_default() {
        let config = SiteConfig::default();
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.taxonomies.get("tag").map(String::as_str), Some("tags"));
        assert_eq!(config.taxonomy_plurals(), vec!["categories", "tags"]);
        assert!(config.languages.is_empty());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "title = \"Test\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.title, "Test");
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_languages_parsed() {
        let config = test_parse_config(
            r#"
default_content_language = "en"

[languages.en]
weight = 1

[languages.fr]
weight = 2
title = "Mon Site"
content_dir = "content/fr"
"#,
        );
        assert_eq!(config.languages.len(), 2);
        assert_eq!(config.languages["fr"].title.as_deref(), Some("Mon Site"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_default_language_is_fatal() {
        let config = test_parse_config(
            r#"
default_content_language = "de"

[languages.en]
weight = 1
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Diagnostics(_)));
        assert!(format!("{err}").contains("default_content_language"));
    }

    #[test]
    fn test_custom_taxonomies_replace_defaults() {
        let config = test_parse_config(
            r#"
[taxonomies]
series = "series"
"#,
        );
        assert_eq!(config.taxonomy_plurals(), vec!["series"]);
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let config = SiteConfig {
            base_url: "example.org".into(),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_sets_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "title = \"Disk\"\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "Disk");
        assert_eq!(config.root, dir.path().canonicalize().unwrap());
        assert_eq!(
            config.root_relative(config.root_join("content/a.md")),
            PathBuf::from("content/a.md")
        );
    }
}
