//! Language registry.
//!
//! Produces the ordered list of active languages for one build generation.
//! Languages are sorted by weight, ties broken by code, and exactly one of
//! them is the default content language.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::{ConfigError, LanguageConfig, SiteConfig};

/// Fallback code when no language is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Input for [`Languages::register`].
#[derive(Debug, Clone, Default)]
pub struct LanguageSpec {
    pub code: String,
    pub weight: i64,
    pub title: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub content_dir: Option<PathBuf>,
    pub has_cjk_language: bool,
    pub params: JsonMap<String, JsonValue>,
}

impl LanguageSpec {
    pub fn new(code: impl Into<String>, weight: i64) -> Self {
        Self {
            code: code.into(),
            weight,
            ..Self::default()
        }
    }

    fn from_config(code: &str, config: &LanguageConfig) -> Self {
        Self {
            code: code.to_string(),
            weight: config.weight,
            title: config.title.clone(),
            locale: config.locale.clone(),
            time_zone: config.time_zone.clone(),
            content_dir: config.content_dir.clone(),
            has_cjk_language: config.has_cjk_language,
            params: config.params.clone(),
        }
    }
}

/// One active language. Immutable for the generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    pub code: String,
    pub weight: i64,
    pub title: Option<String>,
    pub is_default: bool,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub content_dir: Option<PathBuf>,
    pub has_cjk_language: bool,
    pub params: JsonMap<String, JsonValue>,
    /// `""` for the default language served at the root, else `/<code>`.
    pub url_prefix: String,
}

impl Language {
    /// Position key used everywhere languages are ordered.
    #[inline]
    pub fn sort_key(&self) -> (i64, &str) {
        (self.weight, self.code.as_str())
    }
}

/// Ordered set of active languages.
#[derive(Debug, Clone)]
pub struct Languages {
    list: Vec<Arc<Language>>,
    default_index: usize,
}

impl Languages {
    /// Validate, order and pick the default language.
    ///
    /// `default_code` wins when given and must name one of `specs`; without
    /// it the first language in weight order is the default. An empty
    /// list yields a single default language.
    pub fn register(
        mut specs: Vec<LanguageSpec>,
        default_code: Option<&str>,
        default_in_subdir: bool,
    ) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            specs.push(LanguageSpec::new(default_code.unwrap_or(DEFAULT_LANGUAGE), 0));
        }

        {
            let mut seen = FxHashSet::default();
            if let Some(dup) = specs.iter().find(|spec| !seen.insert(spec.code.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "language `{}` is declared twice",
                    dup.code
                )));
            }
        }

        specs.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.code.cmp(&b.code)));

        let default_index = match default_code {
            Some(code) => specs
                .iter()
                .position(|spec| spec.code == code)
                .ok_or_else(|| ConfigError::UnknownDefaultLanguage(code.to_string()))?,
            None => 0,
        };

        let list = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let is_default = i == default_index;
                let url_prefix = if is_default && !default_in_subdir {
                    String::new()
                } else {
                    format!("/{}", spec.code)
                };
                Arc::new(Language {
                    code: spec.code,
                    weight: spec.weight,
                    title: spec.title,
                    is_default,
                    locale: spec.locale,
                    time_zone: spec.time_zone,
                    content_dir: spec.content_dir,
                    has_cjk_language: spec.has_cjk_language,
                    params: spec.params,
                    url_prefix,
                })
            })
            .collect();

        Ok(Self {
            list,
            default_index,
        })
    }

    /// Build the registry from `[languages.*]`, skipping disabled ones.
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let specs = config
            .enabled_languages()
            .map(|(code, lang)| LanguageSpec::from_config(code, lang))
            .collect();
        Self::register(
            specs,
            config.default_content_language.as_deref(),
            config.default_content_language_in_subdir,
        )
    }

    pub fn by_code(&self, code: &str) -> Option<&Arc<Language>> {
        self.list.iter().find(|lang| lang.code == code)
    }

    pub fn default_language(&self) -> &Arc<Language> {
        &self.list[self.default_index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Language>> {
        self.list.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.list.iter().map(|lang| lang.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn is_multilingual(&self) -> bool {
        self.list.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(items: &[(&str, i64)]) -> Vec<LanguageSpec> {
        items
            .iter()
            .map(|(code, weight)| LanguageSpec::new(*code, *weight))
            .collect()
    }

    #[test]
    fn test_sorted_by_weight_then_code() {
        let langs =
            Languages::register(specs(&[("fr", 2), ("en", 1), ("de", 2)]), None, false).unwrap();
        assert_eq!(langs.codes(), vec!["en", "de", "fr"]);
        assert_eq!(langs.default_language().code, "en");
        assert!(langs.is_multilingual());
    }

    #[test]
    fn test_explicit_default_and_prefixes() {
        let langs =
            Languages::register(specs(&[("en", 1), ("fr", 2)]), Some("fr"), false).unwrap();
        let fr = langs.by_code("fr").unwrap();
        let en = langs.by_code("en").unwrap();
        assert!(fr.is_default);
        assert!(!en.is_default);
        assert_eq!(fr.url_prefix, "");
        assert_eq!(en.url_prefix, "/en");
    }

    #[test]
    fn test_default_in_subdir() {
        let langs = Languages::register(specs(&[("en", 1)]), None, true).unwrap();
        assert_eq!(langs.default_language().url_prefix, "/en");
    }

    #[test]
    fn test_unknown_default_is_fatal() {
        let err = Languages::register(specs(&[("en", 1)]), Some("de"), false).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDefaultLanguage(code) if code == "de"));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let err = Languages::register(specs(&[("en", 1), ("en", 2)]), None, false).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_yields_single_default() {
        let langs = Languages::register(Vec::new(), None, false).unwrap();
        assert_eq!(langs.codes(), vec![DEFAULT_LANGUAGE]);
        assert!(langs.default_language().is_default);
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let config = crate::config::test_parse_config(
            r#"
[languages.en]
weight = 1

[languages.fr]
weight = 2

[languages.de]
weight = 3
disabled = true
"#,
        );
        let langs = Languages::from_config(&config).unwrap();
        assert_eq!(langs.codes(), vec!["en", "fr"]);
        assert!(langs.by_code("de").is_none());
    }
}
