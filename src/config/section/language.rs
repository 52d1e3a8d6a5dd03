//! `[languages.<code>]` sections.
//!
//! ```toml
//! [languages.en]
//! weight = 1
//! title = "My Site"
//!
//! [languages.fr]
//! weight = 2
//! content_dir = "content/fr"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Ordering weight; lower sorts first, ties broken by code.
    pub weight: i64,

    /// Site title override for this language.
    pub title: Option<String>,

    pub locale: Option<String>,

    pub time_zone: Option<String>,

    /// Separate content root for this language.
    pub content_dir: Option<PathBuf>,

    /// Count words per CJK character.
    pub has_cjk_language: bool,

    /// Skip this language entirely.
    pub disabled: bool,

    /// Language-specific params merged over the site params.
    pub params: JsonMap<String, JsonValue>,
}
