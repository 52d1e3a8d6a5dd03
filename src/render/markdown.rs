//! Markdown to HTML with heading anchors and a table of contents.

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use rustc_hash::FxHashMap;

use crate::utils::html::escape;
use crate::utils::slug::anchorize;

/// Options for markdown conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    /// Enable tables extension
    pub tables: bool,
    /// Enable footnotes extension
    pub footnotes: bool,
    /// Enable strikethrough extension
    pub strikethrough: bool,
    /// Enable task lists extension
    pub task_lists: bool,
    /// Enable heading attributes extension (e.g., `# Heading {#custom-id}`)
    pub heading_attributes: bool,
}

impl MarkdownOptions {
    /// Create options with all extensions enabled
    pub fn all() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            heading_attributes: true,
        }
    }

    fn to_pulldown_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.heading_attributes {
            opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        opts
    }
}

/// A heading found while converting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    /// Escaped heading text.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownOutput {
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Convert Markdown, giving every heading a unique id.
pub fn to_html(markdown: &str, options: &MarkdownOptions) -> MarkdownOutput {
    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options.to_pulldown_options()).collect();

    let mut used: FxHashMap<String, usize> = FxHashMap::default();
    let mut headings = Vec::new();
    let mut out_events = Vec::with_capacity(events.len());

    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) = &events[i]
        else {
            out_events.push(events[i].clone());
            i += 1;
            continue;
        };

        let end = events[i..]
            .iter()
            .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
            .map_or(events.len(), |offset| i + offset);
        let text = heading_text(&events[i + 1..end]);

        let base = id.as_deref().map_or_else(|| anchorize(&text), str::to_string);
        let unique = unique_id(&mut used, base);

        headings.push(Heading {
            level: level_number(*level),
            id: unique.clone(),
            text: escape(&text).into_owned(),
        });
        out_events.push(Event::Start(Tag::Heading {
            level: *level,
            id: Some(CowStr::from(unique)),
            classes: classes.clone(),
            attrs: attrs.clone(),
        }));
        i += 1;
    }

    let mut html_out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_out, out_events.into_iter());
    MarkdownOutput {
        html: html_out,
        headings,
    }
}

fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// `intro`, `intro-1`, `intro-2`, ...
fn unique_id(used: &mut FxHashMap<String, usize>, base: String) -> String {
    let Some(&seen) = used.get(&base) else {
        used.insert(base.clone(), 0);
        return base;
    };
    let mut n = seen;
    loop {
        n += 1;
        let candidate = format!("{base}-{n}");
        if !used.contains_key(&candidate) {
            used.insert(candidate.clone(), 0);
            used.insert(base, n);
            return candidate;
        }
    }
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Nested `<nav id="TableOfContents">` for headings in `start..=end`.
///
/// Empty when no heading falls in range.
pub fn table_of_contents(headings: &[Heading], start: u8, end: u8) -> String {
    let selected: Vec<&Heading> = headings
        .iter()
        .filter(|h| (start..=end).contains(&h.level))
        .collect();
    if selected.is_empty() {
        return String::new();
    }

    let base = selected.iter().map(|h| h.level).min().unwrap_or(start);
    let mut out = String::from("<nav id=\"TableOfContents\">\n");
    let mut depth = 0usize;

    for heading in selected {
        let target = usize::from(heading.level - base) + 1;
        if target > depth {
            while depth < target {
                if depth > 0 {
                    out.push('\n');
                }
                out.push_str("<ul>\n<li>");
                depth += 1;
            }
        } else {
            while depth > target {
                out.push_str("</li>\n</ul>\n");
                depth -= 1;
            }
            out.push_str("</li>\n<li>");
        }
        out.push_str(&format!("<a href=\"#{}\">{}</a>", heading.id, heading.text));
    }
    while depth > 0 {
        out.push_str("</li>\n</ul>\n");
        depth -= 1;
    }
    out.push_str("</nav>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_ids_are_unique() {
        let out = to_html("# Intro\n\n## Intro\n\n## Intro\n", &MarkdownOptions::all());
        let ids: Vec<_> = out.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "intro-1", "intro-2"]);
        assert!(out.html.contains("<h2 id=\"intro-1\">Intro</h2>"));
    }

    #[test]
    fn test_explicit_heading_id_kept() {
        let out = to_html("## Setup {#custom}\n", &MarkdownOptions::all());
        assert_eq!(out.headings[0].id, "custom");
        assert_eq!(out.headings[0].text, "Setup");
    }

    #[test]
    fn test_heading_text_with_code() {
        let out = to_html("## Use `cargo` & co\n", &MarkdownOptions::all());
        assert_eq!(out.headings[0].id, "use-cargo-co");
        assert_eq!(out.headings[0].text, "Use cargo &amp; co");
    }

    #[test]
    fn test_toc_nesting() {
        let out = to_html("## A\n\n### A1\n\n## B\n", &MarkdownOptions::all());
        let toc = table_of_contents(&out.headings, 2, 3);
        assert!(toc.starts_with("<nav id=\"TableOfContents\">"));
        assert_eq!(toc.matches("<ul>").count(), 2);
        assert_eq!(toc.matches("</ul>").count(), 2);
        assert!(toc.contains("<a href=\"#a1\">A1</a>"));
        let a = toc.find("#a\"").unwrap();
        let a1 = toc.find("#a1").unwrap();
        let b = toc.find("#b\"").unwrap();
        assert!(a < a1 && a1 < b);
    }

    #[test]
    fn test_toc_empty_without_headings() {
        let out = to_html("just text", &MarkdownOptions::all());
        assert_eq!(table_of_contents(&out.headings, 2, 3), "");
    }
}
