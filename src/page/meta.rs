//! Page metadata from front matter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::JsonMap;
use crate::utils::date::DateTimeUtc;

/// Page metadata from front matter
///
/// # Standard Fields
///
/// | Field            | Type          | Description                          |
/// |------------------|---------------|--------------------------------------|
/// | `title`          | `String`      | Page title                           |
/// | `linkTitle`      | `String`      | Shorter title for menus and lists    |
/// | `date`           | `String`      | Publication date                     |
/// | `publishDate`    | `String`      | Hidden before this date              |
/// | `expiryDate`     | `String`      | Hidden from this date on             |
/// | `lastmod`        | `String`      | Last modification (sitemap)          |
/// | `draft`          | `bool`        | Draft status                         |
/// | `weight`         | `i64`         | Ordering weight, 0 sorts last        |
/// | `slug` / `url`   | `String`      | Permalink overrides                  |
/// | `translationKey` | `String`      | Groups translations across languages |
/// | `headless`       | `bool`        | Indexed but never rendered           |
/// | `outputs`        | `[String]`    | Output format names                  |
/// | `menu`           | string/list/table | Menu membership                  |
///
/// Taxonomies other than `tags` and `categories` are read from `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    #[serde(deserialize_with = "string_like")]
    pub title: Option<String>,
    #[serde(alias = "linkTitle", deserialize_with = "string_like")]
    pub link_title: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub date: Option<String>,
    #[serde(alias = "publishDate", deserialize_with = "string_like")]
    pub publish_date: Option<String>,
    #[serde(alias = "expiryDate", deserialize_with = "string_like")]
    pub expiry_date: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub lastmod: Option<String>,
    pub draft: bool,
    #[serde(deserialize_with = "lenient_i64")]
    pub weight: i64,
    #[serde(deserialize_with = "string_like")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub url: Option<String>,
    #[serde(rename = "type", deserialize_with = "string_like")]
    pub page_type: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub layout: Option<String>,
    #[serde(alias = "translationKey", deserialize_with = "string_like")]
    pub translation_key: Option<String>,
    pub headless: bool,
    #[serde(deserialize_with = "string_list")]
    pub outputs: Vec<String>,
    #[serde(deserialize_with = "string_like")]
    pub summary: Option<String>,
    #[serde(alias = "menus")]
    pub menu: Option<JsonValue>,
    #[serde(deserialize_with = "string_list")]
    pub aliases: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub categories: Vec<String>,
    /// Additional user-defined fields.
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A page's membership in one menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRef {
    pub menu: String,
    pub name: Option<String>,
    pub weight: Option<i64>,
}

impl PageMeta {
    pub fn date(&self) -> Option<DateTimeUtc> {
        self.date.as_deref().and_then(DateTimeUtc::parse)
    }

    /// `publishDate`, falling back to `date`.
    pub fn publish_date(&self) -> Option<DateTimeUtc> {
        self.publish_date
            .as_deref()
            .and_then(DateTimeUtc::parse)
            .or_else(|| self.date())
    }

    pub fn expiry_date(&self) -> Option<DateTimeUtc> {
        self.expiry_date.as_deref().and_then(DateTimeUtc::parse)
    }

    /// `lastmod`, falling back to `date`.
    pub fn lastmod(&self) -> Option<DateTimeUtc> {
        self.lastmod
            .as_deref()
            .and_then(DateTimeUtc::parse)
            .or_else(|| self.date())
    }

    /// Terms this page declares for a plural taxonomy name.
    pub fn terms(&self, plural: &str) -> Vec<String> {
        let terms = match plural {
            "tags" => self.tags.clone(),
            "categories" => self.categories.clone(),
            other => match self.extra.get(other) {
                Some(JsonValue::String(s)) => vec![s.clone()],
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            },
        };
        terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Menus declared via `menu = "main"`, `menu = ["main", "footer"]`
    /// or `[menu.main] weight = 2`.
    pub fn menu_refs(&self) -> Vec<MenuRef> {
        let simple = |menu: &str| MenuRef {
            menu: menu.to_string(),
            name: None,
            weight: None,
        };
        match &self.menu {
            Some(JsonValue::String(menu)) => vec![simple(menu)],
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(simple)
                .collect(),
            Some(JsonValue::Object(menus)) => menus
                .iter()
                .map(|(menu, entry)| MenuRef {
                    menu: menu.clone(),
                    name: entry
                        .get("name")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string),
                    weight: entry.get("weight").and_then(JsonValue::as_i64),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Accept strings, numbers and booleans as text.
fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept a list, a single string, or `null`.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => vec![s],
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                JsonValue::String(s) => Some(s),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: JsonValue) -> PageMeta {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_camel_case_aliases() {
        let m = meta(json!({
            "linkTitle": "Short",
            "publishDate": "2024-01-02",
            "translationKey": "about",
        }));
        assert_eq!(m.link_title.as_deref(), Some("Short"));
        assert_eq!(m.publish_date(), DateTimeUtc::parse("2024-01-02"));
        assert_eq!(m.translation_key.as_deref(), Some("about"));
        assert!(m.extra.is_empty());
    }

    #[test]
    fn test_lenient_values() {
        let m = meta(json!({ "title": 2024, "weight": "3", "tags": "rust" }));
        assert_eq!(m.title.as_deref(), Some("2024"));
        assert_eq!(m.weight, 3);
        assert_eq!(m.tags, vec!["rust"]);
    }

    #[test]
    fn test_terms_from_extra() {
        let m = meta(json!({ "tags": ["a", " "], "series": ["intro"] }));
        assert_eq!(m.terms("tags"), vec!["a"]);
        assert_eq!(m.terms("series"), vec!["intro"]);
        assert!(m.terms("categories").is_empty());
    }

    #[test]
    fn test_menu_refs() {
        assert_eq!(meta(json!({ "menu": "main" })).menu_refs().len(), 1);
        assert_eq!(
            meta(json!({ "menus": ["main", "footer"] })).menu_refs().len(),
            2
        );
        let refs = meta(json!({ "menu": { "main": { "weight": 5, "name": "Home" } } })).menu_refs();
        assert_eq!(
            refs,
            vec![MenuRef {
                menu: "main".into(),
                name: Some("Home".into()),
                weight: Some(5),
            }]
        );
    }

    #[test]
    fn test_date_fallbacks() {
        let m = meta(json!({ "date": "2024-05-01" }));
        assert_eq!(m.lastmod(), DateTimeUtc::parse("2024-05-01"));
        assert_eq!(m.publish_date(), DateTimeUtc::parse("2024-05-01"));
        assert_eq!(m.expiry_date(), None);
    }
}
