//! Sitemap generation.
//!
//! Every site gets a `sitemap.xml` listing its rendered pages. A build with
//! more than one language additionally writes a root sitemap index that
//! points at the per-language files.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
//!         xmlns:xhtml="http://www.w3.org/1999/xhtml">
//!   <url>
//!     <loc>https://example.org/sect/doc1/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <xhtml:link rel="alternate" hreflang="fr" href="https://example.org/fr/sect/doc1/"/>
//!   </url>
//! </urlset>
//! ```

use std::borrow::Cow;

use crate::core::UrlPath;
use crate::page::{OutputFormat, Page, PageKind};
use crate::render::Publisher;
use crate::site::Site;
use crate::sites::BuildError;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Where a site's sitemap goes: `sitemap.xml`, or `<code>/sitemap.xml`
/// when a root index exists.
pub fn sitemap_path(site: &Site, multilingual: bool) -> String {
    if multilingual {
        format!("{}/{SITEMAP_FILE}", site.lang())
    } else {
        SITEMAP_FILE.to_string()
    }
}

#[derive(Debug, Default)]
pub struct Sitemap {
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
    /// `(hreflang, href)` of translations.
    alternates: Vec<(String, String)>,
}

impl Sitemap {
    /// Pages of `site` that render HTML; the not-found page is left out.
    pub fn build(site: &Site) -> Self {
        let urls = site
            .collections()
            .pages()
            .iter()
            .filter(|page| include(page))
            .map(|page| UrlEntry {
                loc: site.absolute_url(page.permalink()),
                lastmod: page.lastmod().or_else(|| page.date()).map(|d| d.to_date_string()),
                alternates: page
                    .translations()
                    .iter()
                    .filter(|t| include(t))
                    .map(|t| (t.lang().to_string(), t.permalink().absolute(site.base_url())))
                    .collect(),
            })
            .collect();
        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"");
        xml.push_str(SITEMAP_NS);
        xml.push_str("\" xmlns:xhtml=\"");
        xml.push_str(XHTML_NS);
        xml.push_str("\">\n");

        for entry in self.urls {
            xml.push_str("  <url>\n    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n");
            if let Some(lastmod) = entry.lastmod {
                xml.push_str("    <lastmod>");
                xml.push_str(&lastmod);
                xml.push_str("</lastmod>\n");
            }
            for (lang, href) in &entry.alternates {
                xml.push_str("    <xhtml:link rel=\"alternate\" hreflang=\"");
                xml.push_str(&escape_xml(lang));
                xml.push_str("\" href=\"");
                xml.push_str(&escape_xml(href));
                xml.push_str("\"/>\n");
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    pub fn write(self, publisher: &dyn Publisher, path: &str) -> Result<(), BuildError> {
        let xml = self.into_xml();
        publisher
            .write(path, &mut xml.as_bytes())
            .map_err(|e| BuildError::io(format!("failed to write {path}"), e))
    }
}

fn include(page: &Page) -> bool {
    page.kind() != PageKind::NotFound && page.outputs().contains(&OutputFormat::Html)
}

/// Root `sitemapindex` listing absolute sitemap URLs.
pub fn sitemap_index(locations: &[String]) -> String {
    let mut xml = String::with_capacity(256 + locations.len() * 96);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<sitemapindex xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");
    for loc in locations {
        xml.push_str("  <sitemap>\n    <loc>");
        xml.push_str(&escape_xml(loc));
        xml.push_str("</loc>\n  </sitemap>\n");
    }
    xml.push_str("</sitemapindex>\n");
    xml
}

/// Write every site's sitemap plus the index when there is more than one
/// site. Returns the number of files written.
pub fn write_sitemaps(sites: &[Site], publisher: &dyn Publisher) -> Result<usize, BuildError> {
    let multilingual = sites.len() > 1;
    let mut locations = Vec::with_capacity(sites.len());

    for site in sites {
        let path = sitemap_path(site, multilingual);
        Sitemap::build(site).write(publisher, &path)?;
        locations.push(site.absolute_url(&UrlPath::from_file(&path)));
    }

    if !multilingual {
        return Ok(sites.len());
    }
    let index = sitemap_index(&locations);
    publisher
        .write(SITEMAP_FILE, &mut index.as_bytes())
        .map_err(|e| BuildError::io(format!("failed to write {SITEMAP_FILE}"), e))?;
    Ok(sites.len() + 1)
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
