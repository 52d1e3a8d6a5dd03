//! Shared `data/` tree and per-language `i18n/` tables.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use jwalk::WalkDir;
use rustc_hash::FxHashMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::SiteConfig;
use crate::sites::BuildError;
use crate::utils::normalize_rel_path;

/// Data handed to the renderer, shared by every site.
#[derive(Debug, Clone)]
pub struct SiteData {
    data: Arc<JsonValue>,
    i18n: Arc<FxHashMap<String, JsonMap<String, JsonValue>>>,
}

impl Default for SiteData {
    fn default() -> Self {
        Self {
            data: Arc::new(JsonValue::Object(JsonMap::new())),
            i18n: Arc::default(),
        }
    }
}

impl SiteData {
    /// Load `build.data` and `build.i18n`; missing directories are empty.
    pub fn load(config: &SiteConfig) -> Result<Self, BuildError> {
        let data = load_data_dir(&config.root_join(&config.build.data))?;
        let i18n = load_i18n_dir(&config.root_join(&config.build.i18n))?;
        Ok(Self {
            data: Arc::new(data),
            i18n: Arc::new(i18n),
        })
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn i18n(&self, lang: &str) -> Option<&JsonMap<String, JsonValue>> {
        self.i18n.get(lang)
    }

    /// Translation of `key`; entries are plain strings or `{ other = ".." }`.
    pub fn translate(&self, lang: &str, key: &str) -> Option<String> {
        translate(self.i18n(lang)?, key)
    }
}

pub fn translate(table: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    match table.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(forms) => forms
            .get("other")
            .or_else(|| forms.get("one"))
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// `data/a/b.toml` becomes `{"a": {"b": {...}}}`.
fn load_data_dir(dir: &Path) -> Result<JsonValue, BuildError> {
    let mut root = JsonMap::new();
    if !dir.is_dir() {
        return Ok(JsonValue::Object(root));
    }

    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();
    files.sort();

    for path in files {
        let Some(value) = parse_file(&path)? else {
            continue;
        };
        let Ok(rel) = path.with_extension("").strip_prefix(dir).map(Path::to_path_buf) else {
            continue;
        };
        let rel = normalize_rel_path(&rel.to_string_lossy());
        let mut segments: Vec<&str> = rel.split('/').collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };

        insert_at(&mut root, &segments, leaf, value);
    }
    Ok(JsonValue::Object(root))
}

fn insert_at(node: &mut JsonMap<String, JsonValue>, dirs: &[&str], leaf: &str, value: JsonValue) {
    let Some((first, rest)) = dirs.split_first() else {
        merge_into(node, leaf, value);
        return;
    };
    let entry = node
        .entry(first.to_string())
        .or_insert_with(|| JsonValue::Object(JsonMap::new()));
    if !entry.is_object() {
        *entry = JsonValue::Object(JsonMap::new());
    }
    if let JsonValue::Object(map) = entry {
        insert_at(map, rest, leaf, value);
    }
}

/// Objects merge key by key; anything else replaces.
fn merge_into(node: &mut JsonMap<String, JsonValue>, key: &str, value: JsonValue) {
    match (node.get_mut(key), value) {
        (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) => {
            for (k, v) in incoming {
                existing.insert(k, v);
            }
        }
        (_, value) => {
            node.insert(key.to_string(), value);
        }
    }
}

fn load_i18n_dir(dir: &Path) -> Result<FxHashMap<String, JsonMap<String, JsonValue>>, BuildError> {
    let mut tables = FxHashMap::default();
    if !dir.is_dir() {
        return Ok(tables);
    }
    let entries = fs::read_dir(dir).map_err(|e| BuildError::io(dir.display().to_string(), e))?;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(JsonValue::Object(table)) = parse_file(&path)? {
            tables.insert(code.to_string(), table);
        }
    }
    Ok(tables)
}

/// Parse a TOML or JSON file; other extensions are skipped.
fn parse_file(path: &Path) -> Result<Option<JsonValue>, BuildError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !matches!(ext, "toml" | "json") {
        return Ok(None);
    }
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| BuildError::io(display.clone(), e))?;

    let value = if ext == "toml" {
        toml::from_str::<JsonValue>(&text).map_err(|e| {
            let line = e.span().map(|span| line_of(&text, span.start));
            BuildError::file(&display, line, e.message())
        })?
    } else {
        serde_json::from_str::<JsonValue>(&text)
            .map_err(|e| BuildError::file(&display, Some(e.line()), e.to_string()))?
    };
    Ok(Some(value))
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> SiteConfig {
        let mut config = test_parse_config("");
        config.root = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_missing_dirs_are_empty() {
        let dir = TempDir::new().unwrap();
        let data = SiteData::load(&config_in(&dir)).unwrap();
        assert_eq!(data.data(), &JsonValue::Object(JsonMap::new()));
        assert!(data.i18n("en").is_none());
    }

    #[test]
    fn test_nested_data_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data/authors")).unwrap();
        fs::write(dir.path().join("data/site.toml"), "name = \"Demo\"\n").unwrap();
        fs::write(dir.path().join("data/authors/jo.json"), r#"{"email": "jo@example.org"}"#).unwrap();
        fs::write(dir.path().join("data/notes.txt"), "ignored").unwrap();

        let data = SiteData::load(&config_in(&dir)).unwrap();
        assert_eq!(data.data()["site"]["name"], "Demo");
        assert_eq!(data.data()["authors"]["jo"]["email"], "jo@example.org");
        assert!(data.data().get("notes").is_none());
    }

    #[test]
    fn test_i18n_tables() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("i18n")).unwrap();
        fs::write(
            dir.path().join("i18n/fr.toml"),
            "home = \"Accueil\"\n[readMore]\nother = \"Lire la suite\"\n",
        )
        .unwrap();

        let data = SiteData::load(&config_in(&dir)).unwrap();
        assert_eq!(data.translate("fr", "home").as_deref(), Some("Accueil"));
        assert_eq!(data.translate("fr", "readMore").as_deref(), Some("Lire la suite"));
        assert!(data.translate("fr", "missing").is_none());
        assert!(data.translate("en", "home").is_none());
    }

    #[test]
    fn test_bad_toml_has_line() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/bad.toml"), "a = 1\nb = \n").unwrap();

        let err = SiteData::load(&config_in(&dir)).unwrap_err();
        assert!(err.has_file_context());
        assert!(matches!(err, BuildError::File { line: Some(2), .. }));
    }
}
