//! Layout lookup and the default file-based renderer.
//!
//! [`layout_candidates`] gives the ordered list of layout files tried for a
//! page and output format; the first one that exists wins.
//!
//! [`LayoutRenderer`] loads every file under `layouts/` as a
//! [`Template`](super::template::Template) and executes it against the
//! page. A built-in RSS layout backs the last RSS candidate.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use jwalk::WalkDir;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use super::shortcode::ShortcodeCall;
use super::template::{Scope, Template, Value};
use super::{RenderContext, RenderError, Renderer};
use crate::page::{OutputFormat, Page, PageContent, PageKind};
use crate::site::{MenuEntry, translate};
use crate::utils::normalize_rel_path;

/// Last RSS candidate, always available.
pub const INTERNAL_RSS: &str = "_internal/_default/rss.xml";

const BUILTIN_RSS: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<rss version="2.0">
<channel>
<title>{{ .Title }}</title>
<link>{{ .Permalink }}</link>
<language>{{ $.Site.LanguageCode }}</language>
{{ range .Pages }}<item>
<title>{{ .Title }}</title>
<link>{{ .Permalink }}</link>
<guid>{{ .Permalink }}</guid>
{{ if .Date }}<pubDate>{{ .Date }}</pubDate>
{{ end }}<description><![CDATA[{{ .Summary }}]]></description>
</item>
{{ end }}</channel>
</rss>
"#;

static BUILTIN_RSS_TEMPLATE: LazyLock<Option<Arc<Template>>> =
    LazyLock::new(|| Template::parse(BUILTIN_RSS).ok().map(Arc::new));

/// Ordered layout files to try for `page` in `format`.
pub fn layout_candidates(page: &Page, format: OutputFormat) -> Vec<String> {
    let ext = format.layout_suffix();
    let mut out: Vec<String> = Vec::new();

    if format == OutputFormat::Rss {
        match page.kind() {
            PageKind::Home => {
                out.push(format!("index.rss.{ext}"));
                out.push(format!("home.rss.{ext}"));
            }
            PageKind::Section => {
                let section = page.section();
                out.push(format!("section/{section}.rss.{ext}"));
                out.push(format!("{section}/rss.{ext}"));
            }
            PageKind::Taxonomy | PageKind::TaxonomyTerm => {
                if let Some(tax) = page.taxonomy() {
                    out.push(format!("taxonomy/{}.rss.{ext}", tax.plural));
                }
            }
            _ => {}
        }
        out.push(format!("_default/rss.{ext}"));
        out.push(INTERNAL_RSS.to_string());
        return out;
    }

    match page.kind() {
        PageKind::Page => {
            let page_type = page
                .meta()
                .page_type
                .clone()
                .unwrap_or_else(|| match page.section() {
                    "" => "page".to_string(),
                    section => section.to_string(),
                });
            let layout = page.meta().layout.as_deref();
            if let Some(layout) = layout {
                out.push(format!("{page_type}/{layout}.{ext}"));
            }
            out.push(format!("{page_type}/single.{ext}"));
            if let Some(layout) = layout {
                out.push(format!("_default/{layout}.{ext}"));
            }
            out.push(format!("_default/single.{ext}"));
        }
        PageKind::Home => {
            out.push(format!("index.{ext}"));
            out.push(format!("home.{ext}"));
            out.push(format!("_default/list.{ext}"));
        }
        PageKind::Section => {
            let section = page.section();
            out.push(format!("section/{section}.{ext}"));
            out.push(format!("{section}/list.{ext}"));
            out.push(format!("_default/section.{ext}"));
            out.push(format!("_default/list.{ext}"));
        }
        PageKind::Taxonomy => {
            if let Some(tax) = page.taxonomy() {
                out.push(format!("taxonomy/{}.{ext}", tax.plural));
                out.push(format!("{}/taxonomy.{ext}", tax.plural));
            }
            out.push(format!("_default/taxonomy.{ext}"));
            out.push(format!("_default/list.{ext}"));
        }
        PageKind::TaxonomyTerm => {
            if let Some(tax) = page.taxonomy() {
                out.push(format!("taxonomy/{}.terms.{ext}", tax.plural));
                out.push(format!("{}/terms.{ext}", tax.plural));
            }
            out.push(format!("_default/terms.{ext}"));
            out.push(format!("_default/list.{ext}"));
        }
        PageKind::NotFound => out.push(format!("404.{ext}")),
    }
    out
}

type TemplateMap = FxHashMap<String, Arc<Template>>;

/// Renderer over the files of a layouts directory.
pub struct LayoutRenderer {
    /// `None` for renderers built from in-memory templates.
    dir: Option<PathBuf>,
    templates: RwLock<Option<Arc<TemplateMap>>>,
}

impl LayoutRenderer {
    /// Templates are loaded on first use and after [`Renderer::invalidate`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            templates: RwLock::new(None),
        }
    }

    /// Fixed in-memory templates, keyed like files under `layouts/`.
    pub fn from_templates<'s>(
        templates: impl IntoIterator<Item = (&'s str, &'s str)>,
    ) -> Result<Self, RenderError> {
        let mut map = TemplateMap::default();
        for (name, src) in templates {
            map.insert(name.to_string(), Arc::new(parse_named(name, src)?));
        }
        Ok(Self {
            dir: None,
            templates: RwLock::new(Some(Arc::new(map))),
        })
    }

    fn templates(&self) -> Result<Arc<TemplateMap>, RenderError> {
        if let Some(map) = self.templates.read().as_ref() {
            return Ok(map.clone());
        }
        let mut slot = self.templates.write();
        if let Some(map) = slot.as_ref() {
            return Ok(map.clone());
        }
        let map = Arc::new(match &self.dir {
            Some(dir) => load_dir(dir)?,
            None => TemplateMap::default(),
        });
        *slot = Some(map.clone());
        Ok(map)
    }

    fn find(&self, candidates: &[String]) -> Result<Option<Arc<Template>>, RenderError> {
        let templates = self.templates()?;
        Ok(candidates.iter().find_map(|name| {
            templates.get(name.as_str()).cloned().or_else(|| builtin(name))
        }))
    }
}

fn builtin(name: &str) -> Option<Arc<Template>> {
    (name == INTERNAL_RSS)
        .then(|| BUILTIN_RSS_TEMPLATE.clone())
        .flatten()
}

fn parse_named(name: &str, src: &str) -> Result<Template, RenderError> {
    Template::parse(src).map_err(|e| RenderError::Template(format!("{name}: {e}")))
}

fn load_dir(dir: &Path) -> Result<TemplateMap, RenderError> {
    let mut map = TemplateMap::default();
    if !dir.is_dir() {
        return Ok(map);
    }
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| RenderError::Template(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(dir) else {
            continue;
        };
        let name = normalize_rel_path(&rel.to_string_lossy());
        let src = std::fs::read_to_string(&path)?;
        map.insert(name.clone(), Arc::new(parse_named(&name, &src)?));
    }
    Ok(map)
}

impl Renderer for LayoutRenderer {
    fn render(
        &self,
        candidates: &[String],
        ctx: &RenderContext<'_>,
        _format: OutputFormat,
    ) -> Result<Vec<u8>, RenderError> {
        let Some(template) = self.find(candidates)? else {
            return Err(RenderError::MissingLayout {
                candidates: candidates.to_vec(),
            });
        };
        let root = RootScope {
            page: PageScope {
                page: ctx.page,
                content: ctx.content.clone(),
                base_url: ctx.site.base_url(),
            },
            ctx,
        };
        Ok(template.execute(&root)?.into_bytes())
    }

    fn render_shortcode(&self, call: &ShortcodeCall<'_>) -> Result<Option<String>, RenderError> {
        let templates = self.templates()?;
        let Some(template) = templates.get(&format!("shortcodes/{}.html", call.name)) else {
            return Ok(None);
        };
        template
            .execute(&ShortcodeScope { call })
            .map(Some)
            .map_err(|e| RenderError::at(Some(call.line), e.to_string()))
    }

    fn has_layout(&self, candidates: &[String]) -> bool {
        match self.find(candidates) {
            Ok(found) => found.is_some(),
            // let `render` report the load error
            Err(_) => true,
        }
    }

    fn invalidate(&self) {
        if self.dir.is_some() {
            *self.templates.write() = None;
        }
    }
}

// ============================================================================
// scopes
// ============================================================================

fn json_at(value: &JsonValue, path: &[&str]) -> Option<Value> {
    let mut node = value;
    for key in path {
        node = node.get(*key)?;
    }
    Some(match node {
        JsonValue::String(s) => Value::text(s.clone()),
        JsonValue::Null => Value::text(""),
        other => Value::text(other.to_string()),
    })
}

fn flag(b: bool) -> Value {
    Value::text(b.to_string())
}

/// A page seen by a template, at the root or as a list item.
struct PageScope<'a, P> {
    page: P,
    content: Option<Arc<PageContent>>,
    base_url: &'a str,
}

impl<'a, P: Deref<Target = Page>> PageScope<'a, P> {
    fn html(&self, pick: impl Fn(&PageContent) -> String) -> Value {
        Value::Html(self.content.as_deref().map(pick).unwrap_or_default())
    }

    fn stat(&self, pick: impl Fn(&PageContent) -> usize) -> Value {
        Value::text(self.content.as_deref().map_or(0, pick).to_string())
    }
}

impl<'a, P: Deref<Target = Page>> Scope for PageScope<'a, P> {
    fn field(&self, path: &[&str]) -> Option<Value> {
        let page: &Page = &self.page;
        Some(match path {
            ["Title"] => Value::text(page.title()),
            ["LinkTitle"] => Value::text(page.link_title()),
            ["Permalink"] => Value::text(page.permalink().absolute(self.base_url)),
            ["RelPermalink"] => Value::text(page.permalink().to_encoded()),
            ["Kind"] => Value::text(page.kind().as_str()),
            ["Lang"] => Value::text(page.lang()),
            ["Section"] => Value::text(page.section()),
            ["Type"] => Value::text(page.meta().page_type.as_deref().unwrap_or(page.section())),
            ["Date"] => Value::text(page.date().map(|d| d.to_rfc3339()).unwrap_or_default()),
            ["Lastmod"] => Value::text(page.lastmod().map(|d| d.to_rfc3339()).unwrap_or_default()),
            ["Draft"] => flag(page.meta().draft),
            ["Weight"] => Value::text(page.weight().to_string()),
            ["IsHome"] => flag(page.kind() == PageKind::Home),
            ["IsPage"] => flag(page.kind().is_regular()),
            ["IsNode"] => flag(page.kind().is_node()),
            ["Content"] => self.html(|c| c.html.clone()),
            ["Summary"] => self.html(|c| c.summary.clone()),
            ["TableOfContents"] => self.html(|c| c.table_of_contents.clone()),
            ["Truncated"] => flag(self.content.as_ref().is_some_and(|c| c.truncated)),
            ["WordCount"] => self.stat(|c| c.word_count),
            ["ReadingTime"] => self.stat(|c| c.reading_time),
            ["Params", rest @ ..] if !rest.is_empty() => {
                return json_at(&JsonValue::Object(page.params().clone()), rest);
            }
            _ => return None,
        })
    }

    fn items(&self, path: &[&str]) -> Option<Vec<Box<dyn Scope + '_>>> {
        match path {
            ["Translations"] => Some(page_items(self.page.translations(), self.base_url)),
            ["Resources"] => Some(
                self.page
                    .resources()
                    .iter()
                    .filter_map(|resource| {
                        Some(Box::new(ResourceScope {
                            name: self.page.resource_name(resource)?.to_string(),
                            output: self.page.resource_output(resource)?,
                        }) as Box<dyn Scope>)
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn page_items<'a>(
    pages: impl IntoIterator<Item = crate::page::PageRef>,
    base_url: &'a str,
) -> Vec<Box<dyn Scope + 'a>> {
    pages
        .into_iter()
        .map(|page| {
            let content = page.content();
            Box::new(PageScope {
                page,
                content,
                base_url,
            }) as Box<dyn Scope + 'a>
        })
        .collect()
}

/// A leaf bundle file as seen by `range .Resources`.
struct ResourceScope {
    name: String,
    output: String,
}

impl Scope for ResourceScope {
    fn field(&self, path: &[&str]) -> Option<Value> {
        Some(match path {
            ["Name"] => Value::text(self.name.clone()),
            ["RelPermalink"] => Value::text(format!("/{}", self.output)),
            _ => return None,
        })
    }
}

struct MenuScope {
    entry: MenuEntry,
}

impl Scope for MenuScope {
    fn field(&self, path: &[&str]) -> Option<Value> {
        Some(match path {
            ["Name"] => Value::text(self.entry.name.clone()),
            ["URL"] => Value::text(self.entry.url.clone()),
            ["Weight"] => Value::text(self.entry.weight.to_string()),
            _ => return None,
        })
    }
}

/// Root of a layout: the page plus site-wide values.
struct RootScope<'a> {
    page: PageScope<'a, &'a Page>,
    ctx: &'a RenderContext<'a>,
}

impl Scope for RootScope<'_> {
    fn field(&self, path: &[&str]) -> Option<Value> {
        let site = self.ctx.site;
        match path {
            ["Site", "Title"] => Some(Value::text(site.title())),
            ["Site", "BaseURL"] => Some(Value::text(site.base_url())),
            ["Site", "LanguageCode"] => Some(Value::text(
                site.language().locale.as_deref().unwrap_or(site.lang()),
            )),
            ["Site", "Params", rest @ ..] if !rest.is_empty() => {
                json_at(&JsonValue::Object(site.config().params.clone()), rest)
            }
            ["Site", "Data", rest @ ..] | ["Data", rest @ ..] if !rest.is_empty() => {
                json_at(self.ctx.data, rest)
            }
            _ => self.page.field(path),
        }
    }

    fn items(&self, path: &[&str]) -> Option<Vec<Box<dyn Scope + '_>>> {
        let site = self.ctx.site;
        let base_url = site.base_url();
        match path {
            ["Pages"] => Some(page_items(self.ctx.pages.iter().cloned(), base_url)),
            ["RegularPages"] => Some(page_items(
                self.ctx.pages.iter().filter(|p| p.kind().is_regular()).cloned(),
                base_url,
            )),
            ["Site", "Pages"] => Some(page_items(site.collections().pages().iter().cloned(), base_url)),
            ["Site", "RegularPages"] => Some(page_items(
                site.collections().regular_pages().iter().cloned(),
                base_url,
            )),
            ["Site", "Menus", menu] => Some(
                self.ctx
                    .menus()
                    .get(menu)
                    .iter()
                    .map(|entry| {
                        Box::new(MenuScope {
                            entry: entry.clone(),
                        }) as Box<dyn Scope>
                    })
                    .collect(),
            ),
            _ => self.page.items(path),
        }
    }

    fn call(&self, name: &str, args: &[String]) -> Option<Value> {
        let arg = args.first()?;
        match name {
            "i18n" | "T" => Some(Value::text(
                self.ctx
                    .i18n
                    .and_then(|table| translate(table, arg))
                    .unwrap_or_default(),
            )),
            "absURL" => Some(Value::text(format!(
                "{}/{}",
                self.ctx.site.base_url().trim_end_matches('/'),
                arg.trim_start_matches('/')
            ))),
            "relURL" => Some(Value::text(format!("/{}", arg.trim_start_matches('/')))),
            _ => None,
        }
    }
}

/// Scope of a user shortcode.
struct ShortcodeScope<'a, 'p> {
    call: &'a ShortcodeCall<'p>,
}

impl Scope for ShortcodeScope<'_, '_> {
    fn field(&self, path: &[&str]) -> Option<Value> {
        match path {
            ["Name"] => Some(Value::text(self.call.name.clone())),
            ["Inner"] => Some(Value::Html(self.call.inner.clone().unwrap_or_default())),
            ["Params", key] => self.call.get_named(key).map(Value::text),
            ["Page", rest @ ..] => PageScope {
                page: self.call.page,
                content: None,
                base_url: "",
            }
            .field(rest),
            _ => None,
        }
    }

    fn call(&self, name: &str, args: &[String]) -> Option<Value> {
        if name != "Get" {
            return None;
        }
        let arg = args.first()?;
        let value = match arg.parse::<usize>() {
            Ok(index) => self.call.get(index),
            Err(_) => self.call.get_named(arg),
        };
        Some(Value::text(value.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::test_support::{language, page};

    #[test]
    fn test_single_page_candidates() {
        let en = language("en");
        let p = page(&en, "posts/hello.md", "+++\nlayout = \"wide\"\n+++\n");
        assert_eq!(
            layout_candidates(&p, OutputFormat::Html),
            vec![
                "posts/wide.html",
                "posts/single.html",
                "_default/wide.html",
                "_default/single.html"
            ]
        );

        let typed = page(&en, "about.md", "+++\ntype = \"info\"\n+++\n");
        assert_eq!(
            layout_candidates(&typed, OutputFormat::Html),
            vec!["info/single.html", "_default/single.html"]
        );

        let root = page(&en, "about.md", "");
        assert_eq!(layout_candidates(&root, OutputFormat::Html)[0], "page/single.html");
    }

    #[test]
    fn test_list_candidates() {
        let en = language("en");
        let section = page(&en, "blog/_index.md", "");
        assert_eq!(
            layout_candidates(&section, OutputFormat::Html),
            vec![
                "section/blog.html",
                "blog/list.html",
                "_default/section.html",
                "_default/list.html"
            ]
        );
        let rss = layout_candidates(&section, OutputFormat::Rss);
        assert_eq!(rss.last().map(String::as_str), Some(INTERNAL_RSS));
        assert_eq!(rss[0], "section/blog.rss.xml");

        let home = page(&en, "_index.md", "");
        assert_eq!(layout_candidates(&home, OutputFormat::Html)[0], "index.html");
    }

    #[test]
    fn test_taxonomy_candidates() {
        let en = language("en");
        let listing = page(&en, "tags/_index.md", "");
        assert_eq!(
            layout_candidates(&listing, OutputFormat::Html)[0],
            "taxonomy/tags.terms.html"
        );
        let term = page(&en, "tags/rust/_index.md", "");
        assert_eq!(layout_candidates(&term, OutputFormat::Html)[0], "taxonomy/tags.html");
    }

    #[test]
    fn test_find_prefers_first_candidate_and_builtin_rss() {
        let renderer = LayoutRenderer::from_templates([
            ("_default/single.html", "default"),
            ("posts/single.html", "posts"),
        ])
        .unwrap();
        let found = renderer
            .find(&["posts/single.html".into(), "_default/single.html".into()])
            .unwrap()
            .unwrap();
        assert_eq!(found.execute(&EmptyScope).unwrap(), "posts");

        assert!(renderer.has_layout(&[INTERNAL_RSS.to_string()]));
        assert!(!renderer.has_layout(&["missing.html".to_string()]));
    }

    #[test]
    fn test_load_dir_and_invalidate() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("_default")).unwrap();
        std::fs::write(dir.path().join("_default/single.html"), "v1").unwrap();

        let renderer = LayoutRenderer::new(dir.path());
        let candidates = vec!["_default/single.html".to_string()];
        let first = renderer.find(&candidates).unwrap().unwrap();
        assert_eq!(first.execute(&EmptyScope).unwrap(), "v1");

        std::fs::write(dir.path().join("_default/single.html"), "v2").unwrap();
        let cached = renderer.find(&candidates).unwrap().unwrap();
        assert_eq!(cached.execute(&EmptyScope).unwrap(), "v1");

        renderer.invalidate();
        let fresh = renderer.find(&candidates).unwrap().unwrap();
        assert_eq!(fresh.execute(&EmptyScope).unwrap(), "v2");
    }

    #[test]
    fn test_bad_template_names_file() {
        let err = LayoutRenderer::from_templates([("broken.html", "{{ range .Pages }}")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("broken.html"));
    }

    #[test]
    fn test_user_shortcode() {
        let renderer = LayoutRenderer::from_templates([(
            "shortcodes/note.html",
            "<aside class=\"{{ .Get 0 }}\" title=\"{{ .Get \"title\" }}\">{{ .Inner }}</aside>",
        )])
        .unwrap();
        let en = language("en");
        let host = page(&en, "a.md", "");
        let call = ShortcodeCall {
            name: "note".into(),
            positional: vec!["warn".into()],
            named: vec![("title".into(), "Heads up".into())],
            inner: Some("<b>x</b>".into()),
            markdown: false,
            page: &host,
            line: 1,
        };
        assert_eq!(
            renderer.render_shortcode(&call).unwrap().unwrap(),
            "<aside class=\"warn\" title=\"Heads up\"><b>x</b></aside>"
        );

        let unknown = ShortcodeCall {
            name: "nope".into(),
            ..call
        };
        assert!(renderer.render_shortcode(&unknown).unwrap().is_none());
    }

    struct EmptyScope;

    impl Scope for EmptyScope {
        fn field(&self, _path: &[&str]) -> Option<Value> {
            None
        }
    }
}
