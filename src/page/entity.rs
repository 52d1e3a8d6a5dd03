//! The page entity.
//!
//! A `Page` is immutable once built except for two slots: its translation
//! list (written by the linker) and its prepared content (written once by
//! the prepare worker that owns it). Pages are shared as `PageRef`
//! (`Arc<Page>`); identity is pointer identity for one generation.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::RwLock;

use super::{JsonMap, OutputFormat, PageContent, PageKind, PageMeta};
use crate::content::{BundleType, ContentPath, ParsedContent};
use crate::core::{ContentKind, OnceSlot, UrlPath};
use crate::language::Language;
use crate::utils::date::DateTimeUtc;
use crate::utils::slug::{path_segment, urlize};

/// Shared page handle, valid for one build generation.
pub type PageRef = Arc<Page>;

/// Taxonomy a list page belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaxonomyRef {
    /// Plural name, e.g. `tags`
    pub plural: String,
    /// Term as written; `None` for the terms listing page.
    pub term: Option<String>,
}

impl TaxonomyRef {
    pub fn listing(plural: &str) -> Self {
        Self {
            plural: plural.to_string(),
            term: None,
        }
    }

    pub fn term(plural: &str, term: &str) -> Self {
        Self {
            plural: plural.to_string(),
            term: Some(term.to_string()),
        }
    }

    /// URL-safe term key.
    pub fn term_key(&self) -> Option<String> {
        self.term.as_deref().map(urlize)
    }
}

#[derive(Debug)]
pub struct Page {
    kind: PageKind,
    lang: Arc<Language>,
    source: Option<ContentPath>,
    meta: PageMeta,
    params: JsonMap,
    body: String,
    body_line: usize,
    sections: Vec<String>,
    translation_key: String,
    permalink: UrlPath,
    outputs: Vec<OutputFormat>,
    resources: Vec<String>,
    /// Language of the content root holding the resources.
    resource_root: Option<String>,
    taxonomy: Option<TaxonomyRef>,
    title: String,
    meta_fingerprint: blake3::Hash,
    modified: Option<SystemTime>,
    translations: RwLock<Vec<Weak<Page>>>,
    content: OnceSlot<PageContent>,
}

impl Page {
    /// Build a page from a parsed content file.
    ///
    /// `taxonomies` are the configured plural names; `_index` files under
    /// a taxonomy directory become taxonomy pages.
    pub fn from_source(
        path: ContentPath,
        lang: Arc<Language>,
        parsed: ParsedContent,
        taxonomies: &[&str],
        modified: Option<SystemTime>,
    ) -> Self {
        let segments: Vec<String> = path.dir_segments().iter().map(|s| s.to_string()).collect();

        let (kind, sections, taxonomy) = match path.bundle() {
            Some(BundleType::Branch) if segments.is_empty() => (PageKind::Home, Vec::new(), None),
            Some(BundleType::Branch) if taxonomies.contains(&segments[0].as_str()) => {
                match segments.as_slice() {
                    [plural] => (
                        PageKind::TaxonomyTerm,
                        segments.clone(),
                        Some(TaxonomyRef::listing(plural)),
                    ),
                    [plural, term] => (
                        PageKind::Taxonomy,
                        segments.clone(),
                        Some(TaxonomyRef::term(plural, term)),
                    ),
                    _ => (PageKind::Section, segments.clone(), None),
                }
            }
            Some(BundleType::Branch) => (PageKind::Section, segments, None),
            Some(BundleType::Leaf) => {
                let mut parents = segments;
                parents.pop();
                (PageKind::Page, parents, None)
            }
            None => (PageKind::Page, segments, None),
        };

        let meta_fingerprint = fingerprint_params(&parsed.params);
        let fallback_title = match kind {
            PageKind::Page if path.bundle() == Some(BundleType::Leaf) => path.dir_name().to_string(),
            PageKind::Page => path.base_name().to_string(),
            _ => default_title(kind, &sections, taxonomy.as_ref(), ""),
        };

        let mut page = Self {
            kind,
            lang,
            source: Some(path),
            title: parsed.meta.title.clone().unwrap_or(fallback_title),
            meta: parsed.meta,
            params: parsed.params,
            body: parsed.body,
            body_line: parsed.body_line,
            sections,
            translation_key: String::new(),
            permalink: UrlPath::root(),
            outputs: Vec::new(),
            resources: Vec::new(),
            resource_root: None,
            taxonomy,
            meta_fingerprint,
            modified,
            translations: RwLock::new(Vec::new()),
            content: OnceSlot::new(),
        };
        page.finish();
        page
    }

    /// Synthesize a structural page with no backing file.
    pub fn structural(
        kind: PageKind,
        lang: Arc<Language>,
        sections: Vec<String>,
        taxonomy: Option<TaxonomyRef>,
        site_title: &str,
    ) -> Self {
        let title = default_title(kind, &sections, taxonomy.as_ref(), site_title);
        let mut page = Self {
            kind,
            lang,
            source: None,
            meta: PageMeta::default(),
            params: JsonMap::new(),
            body: String::new(),
            body_line: 1,
            sections,
            translation_key: String::new(),
            permalink: UrlPath::root(),
            outputs: Vec::new(),
            resources: Vec::new(),
            resource_root: None,
            taxonomy,
            title,
            meta_fingerprint: fingerprint_params(&JsonMap::new()),
            modified: None,
            translations: RwLock::new(Vec::new()),
            content: OnceSlot::new(),
        };
        page.finish();
        page
    }

    /// Attach leaf bundle resources, paths relative to the content root
    /// tagged `root`.
    pub fn with_resources(mut self, root: Option<String>, mut resources: Vec<String>) -> Self {
        resources.sort();
        self.resources = resources;
        self.resource_root = root;
        self
    }

    fn finish(&mut self) {
        self.translation_key = self.compute_translation_key();
        self.permalink = self.compute_permalink();
        self.outputs = self.compute_outputs();
    }

    fn compute_translation_key(&self) -> String {
        if let Some(key) = &self.meta.translation_key {
            return key.clone();
        }
        match self.kind {
            PageKind::Home => "home".to_string(),
            PageKind::Section => format!("section/{}", self.sections.join("/")),
            PageKind::TaxonomyTerm => match &self.taxonomy {
                Some(tax) => format!("taxonomy/{}", tax.plural),
                None => format!("taxonomy/{}", self.sections.join("/")),
            },
            PageKind::Taxonomy => match &self.taxonomy {
                Some(tax) => format!(
                    "term/{}/{}",
                    tax.plural,
                    tax.term_key().unwrap_or_default()
                ),
                None => format!("term/{}", self.sections.join("/")),
            },
            PageKind::NotFound => "404".to_string(),
            PageKind::Page => self
                .source
                .as_ref()
                .map(ContentPath::logical_path)
                .unwrap_or_default(),
        }
    }

    fn compute_permalink(&self) -> UrlPath {
        let prefix = self.lang.url_prefix.as_str();

        if let Some(url) = &self.meta.url {
            return if url.ends_with(".html") || url.ends_with(".xml") {
                UrlPath::from_file(url)
            } else {
                UrlPath::from_page(url)
            };
        }

        let mut segments: Vec<String> = vec![prefix.to_string()];
        match self.kind {
            PageKind::Home => {}
            PageKind::NotFound => return UrlPath::from_file(&format!("{prefix}/404.html")),
            PageKind::Taxonomy | PageKind::TaxonomyTerm => {
                if let Some(tax) = &self.taxonomy {
                    segments.push(path_segment(&tax.plural));
                    if let Some(term) = tax.term_key() {
                        segments.push(term);
                    }
                }
            }
            PageKind::Section => {
                segments.extend(self.sections.iter().map(|s| path_segment(s)));
            }
            PageKind::Page => {
                let Some(source) = &self.source else {
                    return UrlPath::from_segments(&segments);
                };
                segments.extend(self.sections.iter().map(|s| path_segment(s)));
                let name = match source.bundle() {
                    Some(BundleType::Leaf) => source.dir_name(),
                    _ => source.base_name(),
                };
                let last = self.meta.slug.as_deref().unwrap_or(name);
                segments.push(path_segment(last));
            }
        }
        UrlPath::from_segments(&segments)
    }

    fn compute_outputs(&self) -> Vec<OutputFormat> {
        if self.meta.headless {
            return Vec::new();
        }
        let declared: Vec<OutputFormat> = self
            .meta
            .outputs
            .iter()
            .filter_map(|name| OutputFormat::from_name(name))
            .collect();
        if declared.is_empty() {
            OutputFormat::defaults_for(self.kind)
        } else {
            declared
        }
    }

    // ------------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    #[inline]
    pub fn language(&self) -> &Arc<Language> {
        &self.lang
    }

    #[inline]
    pub fn lang(&self) -> &str {
        &self.lang.code
    }

    /// Backing file; `None` for synthesized structural pages.
    #[inline]
    pub fn source(&self) -> Option<&ContentPath> {
        self.source.as_ref()
    }

    /// Root-relative source path, `""` for structural pages.
    pub fn source_ref(&self) -> &str {
        self.source.as_ref().map_or("", ContentPath::as_str)
    }

    /// Source path or permalink, for messages.
    pub fn display_path(&self) -> String {
        match &self.source {
            Some(source) => source.as_str().to_string(),
            None => format!("{} ({})", self.permalink, self.kind),
        }
    }

    pub fn content_kind(&self) -> Option<ContentKind> {
        self.source.as_ref().and_then(ContentPath::content_kind)
    }

    #[inline]
    pub fn meta(&self) -> &PageMeta {
        &self.meta
    }

    /// Front matter as written.
    #[inline]
    pub fn params(&self) -> &JsonMap {
        &self.params
    }

    #[inline]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// 1-based line of the body's first line in the source file.
    #[inline]
    pub fn body_line(&self) -> usize {
        self.body_line
    }

    #[inline]
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// First section, `""` at the root.
    pub fn section(&self) -> &str {
        self.sections.first().map_or("", String::as_str)
    }

    #[inline]
    pub fn translation_key(&self) -> &str {
        &self.translation_key
    }

    #[inline]
    pub fn permalink(&self) -> &UrlPath {
        &self.permalink
    }

    #[inline]
    pub fn outputs(&self) -> &[OutputFormat] {
        &self.outputs
    }

    #[inline]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    #[inline]
    pub fn resource_root(&self) -> Option<&str> {
        self.resource_root.as_deref()
    }

    /// Resource path relative to the bundle directory.
    pub fn resource_name<'r>(&self, resource: &'r str) -> Option<&'r str> {
        let dir = self.source.as_ref()?.dir();
        resource.strip_prefix(dir)?.strip_prefix('/')
    }

    /// Where a resource is published: beside the page's own output.
    ///
    /// `/trip/` + `trip/img/a.png` -> `trip/img/a.png`
    pub fn resource_output(&self, resource: &str) -> Option<String> {
        let name = self.resource_name(resource)?;
        let link = self.permalink.as_str().trim_start_matches('/');
        let dir = if self.permalink.is_page_url() {
            link
        } else {
            link.rsplit_once('/').map_or("", |(dir, _)| dir)
        };
        Some(if dir.is_empty() || dir.ends_with('/') {
            format!("{dir}{name}")
        } else {
            format!("{dir}/{name}")
        })
    }

    #[inline]
    pub fn taxonomy(&self) -> Option<&TaxonomyRef> {
        self.taxonomy.as_ref()
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link_title(&self) -> &str {
        self.meta.link_title.as_deref().unwrap_or(&self.title)
    }

    #[inline]
    pub fn weight(&self) -> i64 {
        self.meta.weight
    }

    pub fn date(&self) -> Option<DateTimeUtc> {
        self.meta.date()
    }

    /// Last modification: front matter, then file mtime.
    pub fn lastmod(&self) -> Option<DateTimeUtc> {
        self.meta
            .lastmod()
            .or_else(|| self.modified.map(DateTimeUtc::from_system_time))
    }

    #[inline]
    pub fn is_headless(&self) -> bool {
        self.meta.headless
    }

    /// Synthesized page with no backing file.
    #[inline]
    pub fn is_structural(&self) -> bool {
        self.source.is_none()
    }

    /// Leaf bundle index page.
    pub fn is_bundle(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|s| s.bundle() == Some(BundleType::Leaf))
    }

    /// Hash of the raw front matter; differs when structure may change.
    #[inline]
    pub fn meta_fingerprint(&self) -> blake3::Hash {
        self.meta_fingerprint
    }

    // ------------------------------------------------------------------------
    // translations
    // ------------------------------------------------------------------------

    /// Other-language versions of this page, in language order.
    pub fn translations(&self) -> Vec<PageRef> {
        self.translations
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn set_translations(&self, translations: Vec<Weak<Page>>) {
        *self.translations.write() = translations;
    }

    // ------------------------------------------------------------------------
    // prepared content
    // ------------------------------------------------------------------------

    /// One-shot slot for the prepare phase.
    #[inline]
    pub fn content_slot(&self) -> &OnceSlot<PageContent> {
        &self.content
    }

    /// Prepared content, if this generation prepared it already.
    pub fn content(&self) -> Option<Arc<PageContent>> {
        self.content.get()
    }
}

fn fingerprint_params(params: &JsonMap) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    // serde_json keeps insertion order; sort for a stable digest
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update(&[0]);
        hasher.update(params[key.as_str()].to_string().as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

fn default_title(
    kind: PageKind,
    sections: &[String],
    taxonomy: Option<&TaxonomyRef>,
    site_title: &str,
) -> String {
    match kind {
        PageKind::Home => site_title.to_string(),
        PageKind::Section => sections.last().map(|s| humanize(s)).unwrap_or_default(),
        PageKind::TaxonomyTerm => taxonomy.map(|t| humanize(&t.plural)).unwrap_or_default(),
        PageKind::Taxonomy => taxonomy
            .and_then(|t| t.term.clone())
            .unwrap_or_default(),
        PageKind::NotFound => "404 Page not found".to_string(),
        PageKind::Page => String::new(),
    }
}

/// `my-posts` -> `My posts`
fn humanize(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default page order: weight (0 sorts last), date descending, link title,
/// then source path.
pub fn compare_pages(a: &Page, b: &Page) -> Ordering {
    let weight = |p: &Page| if p.weight() == 0 { i64::MAX } else { p.weight() };
    weight(a)
        .cmp(&weight(b))
        .then_with(|| b.date().cmp(&a.date()))
        .then_with(|| a.link_title().cmp(b.link_title()))
        .then_with(|| a.source_ref().cmp(b.source_ref()))
        .then_with(|| a.permalink().cmp(b.permalink()))
}

/// Sort in the default page order.
pub fn sort_pages(pages: &mut [PageRef]) {
    pages.sort_by(|a, b| compare_pages(a, b));
}
