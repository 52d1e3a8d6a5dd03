//! Front matter extraction.
//!
//! Supports TOML (`+++`) and a simple YAML-like (`---`) `key: value` form.
//! Everything is first read into a JSON map so the raw metadata can be
//! fingerprinted and handed to the renderer alongside the typed
//! [`PageMeta`].

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::page::{JsonMap, PageMeta};

/// Front matter failure with the 1-based line when known.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FrontMatterError {
    pub line: Option<usize>,
    pub message: String,
}

impl FrontMatterError {
    pub fn new(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Front matter syntax found at the top of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterFormat {
    Toml,
    YamlLike,
}

/// Result of splitting a content file.
#[derive(Debug, Clone, Default)]
pub struct ParsedContent {
    pub meta: PageMeta,
    /// Raw metadata as written.
    pub params: JsonMap,
    pub body: String,
    /// 1-based line where the body starts.
    pub body_line: usize,
}

/// Splits raw bytes into metadata and body.
pub trait FrontMatterParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedContent, FrontMatterError>;
}

/// Default parser for `+++` and `---` front matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFrontMatterParser;

impl FrontMatterParser for DefaultFrontMatterParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedContent, FrontMatterError> {
        let content = std::str::from_utf8(bytes).map_err(|e| {
            FrontMatterError::new(None, format!("content is not valid UTF-8: {e}"))
        })?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let Some(block) = detect_frontmatter(content)? else {
            return Ok(ParsedContent {
                body: content.to_string(),
                body_line: 1,
                ..ParsedContent::default()
            });
        };

        let params = match block.format {
            FrontMatterFormat::Toml => parse_toml(block.raw, block.first_line)?,
            FrontMatterFormat::YamlLike => parse_yaml_like(block.raw, block.first_line)?,
        };

        let meta: PageMeta = serde_json::from_value(JsonValue::Object(params.clone()))
            .map_err(|e| FrontMatterError::new(Some(block.first_line), e.to_string()))?;

        Ok(ParsedContent {
            meta,
            params,
            body: block.body.to_string(),
            body_line: block.body_line,
        })
    }
}

struct Block<'a> {
    format: FrontMatterFormat,
    raw: &'a str,
    body: &'a str,
    /// 1-based line of the first front matter line.
    first_line: usize,
    body_line: usize,
}

/// Locate the front matter block, if the file opens with one.
fn detect_frontmatter(content: &str) -> Result<Option<Block<'_>>, FrontMatterError> {
    let leading = content.len() - content.trim_start_matches(['\n', '\r']).len();
    let skipped_lines = content[..leading].matches('\n').count();
    let trimmed = &content[leading..];

    let (fence, format) = if trimmed.starts_with("+++") {
        ("+++", FrontMatterFormat::Toml)
    } else if trimmed.starts_with("---") {
        ("---", FrontMatterFormat::YamlLike)
    } else {
        return Ok(None);
    };

    let after_open = match trimmed[3..].find('\n') {
        Some(i) => 3 + i + 1,
        None => {
            return Err(FrontMatterError::new(
                Some(skipped_lines + 1),
                format!("unclosed `{fence}` front matter"),
            ));
        }
    };

    let rest = &trimmed[after_open..];
    let close = std::iter::once(0)
        .chain(rest.match_indices('\n').map(|(i, _)| i + 1))
        .find(|&start| {
            rest[start..]
                .lines()
                .next()
                .is_some_and(|line| line.trim_end() == fence)
        })
        .ok_or_else(|| {
            FrontMatterError::new(
                Some(skipped_lines + 1),
                format!("unclosed `{fence}` front matter"),
            )
        })?;

    let raw = &rest[..close];
    let after_close = &rest[close..];
    let body_start = after_close.find('\n').map_or(after_close.len(), |i| i + 1);
    let body = &after_close[body_start..];

    let first_line = skipped_lines + 2;
    let body_line = first_line + raw.matches('\n').count() + 1;

    Ok(Some(Block {
        format,
        raw,
        body,
        first_line,
        body_line,
    }))
}

fn parse_toml(raw: &str, first_line: usize) -> Result<JsonMap, FrontMatterError> {
    let table: toml::Table = toml::from_str(raw).map_err(|e| {
        let line = e
            .span()
            .map(|span| first_line + raw[..span.start.min(raw.len())].matches('\n').count());
        FrontMatterError::new(line, format!("invalid TOML front matter: {}", e.message()))
    })?;
    Ok(table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect())
}

/// TOML value to JSON; datetimes become their RFC 3339 text.
fn toml_to_json(value: toml::Value) -> JsonValue {
    match value {
        toml::Value::String(s) => JsonValue::String(s),
        toml::Value::Integer(i) => JsonValue::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        toml::Value::Boolean(b) => JsonValue::Bool(b),
        toml::Value::Datetime(dt) => JsonValue::String(dt.to_string()),
        toml::Value::Array(items) => JsonValue::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => JsonValue::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Parse simple YAML-like front matter (`key: value`, `- item` lists).
fn parse_yaml_like(raw: &str, first_line: usize) -> Result<JsonMap, FrontMatterError> {
    let mut map = JsonMap::new();
    let mut open_list: Option<String> = None;

    for (offset, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ")
            && let Some(key) = &open_list
        {
            if let Some(JsonValue::Array(items)) = map.get_mut(key) {
                items.push(parse_yaml_value(unquote(item.trim())));
            }
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            return Err(FrontMatterError::new(
                Some(first_line + offset),
                format!("expected `key: value`, found `{trimmed}`"),
            ));
        };
        let key = key.trim().to_string();
        let value = value.trim();

        if value.is_empty() {
            map.insert(key.clone(), JsonValue::Array(Vec::new()));
            open_list = Some(key);
            continue;
        }

        open_list = None;
        map.insert(key, parse_yaml_value(value));
    }

    // `key:` with no items is null, not an empty list
    for value in map.values_mut() {
        if matches!(value, JsonValue::Array(items) if items.is_empty()) {
            *value = JsonValue::Null;
        }
    }

    Ok(map)
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse a YAML-like value string to JSON value
///
/// - Booleans: `true`, `false`
/// - Numbers: `123`, `3.14`
/// - Arrays: `[a, b]` or `a, b` -> `["a", "b"]`
/// - Quoted strings keep their content verbatim
fn parse_yaml_value(s: &str) -> JsonValue {
    if s.len() >= 2 && (s.starts_with('"') || s.starts_with('\'')) && unquote(s) != s {
        return JsonValue::String(unquote(s).to_string());
    }

    if s.eq_ignore_ascii_case("true") {
        return JsonValue::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return JsonValue::Bool(false);
    }
    if s.eq_ignore_ascii_case("null") || s == "~" {
        return JsonValue::Null;
    }

    if let Ok(n) = s.parse::<i64>() {
        return JsonValue::Number(n.into());
    }
    if let Ok(n) = s.parse::<f64>()
        && let Some(num) = serde_json::Number::from_f64(n)
    {
        return JsonValue::Number(num);
    }

    let list = s
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'));
    if list.is_some() || s.contains(',') {
        let inner = list.unwrap_or(s);
        let items = inner
            .split(',')
            .map(|item| unquote(item.trim()).to_string())
            .filter(|item| !item.is_empty())
            .map(JsonValue::String)
            .collect();
        return JsonValue::Array(items);
    }

    JsonValue::String(s.to_string())
}
