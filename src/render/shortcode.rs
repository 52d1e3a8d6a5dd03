//! Shortcodes: `{{< name args >}}` and `{{% name args %}}`.
//!
//! Shortcodes run before Markdown conversion. `{{% %}}` output is spliced
//! into the Markdown source; `{{< >}}` output is swapped for an opaque
//! placeholder and restored after conversion so Markdown never sees it.
//!
//! ```text
//! {{< ref "sect/doc1" >}}              built-in, absolute permalink
//! {{< relref path="doc1" lang="fr" >}} built-in, site-relative permalink
//! {{< note >}}inner{{< /note >}}       delegated to the renderer
//! {{</* note */>}}                     written out literally
//! ```

use std::sync::LazyLock;

use regex::Regex;

use super::{RenderError, Renderer};
use crate::address::RefError;
use crate::page::{Page, PageRef};

static ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:(\w+)\s*=\s*)?(?:"((?:[^"\\]|\\.)*)"|`([^`]*)`|(\S+))"#).unwrap()
});

/// One shortcode invocation.
#[derive(Debug, Clone)]
pub struct ShortcodeCall<'a> {
    pub name: String,
    pub positional: Vec<String>,
    pub named: Vec<(String, String)>,
    /// Content between opening and closing tags, shortcodes expanded.
    pub inner: Option<String>,
    /// `{{% %}}` form; output is treated as Markdown.
    pub markdown: bool,
    pub page: &'a Page,
    /// 1-based line in the page source.
    pub line: usize,
}

impl ShortcodeCall<'_> {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn get_named(&self, key: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Shortcode-expanded source plus the protected outputs.
#[derive(Debug, Default)]
pub struct Expanded {
    pub text: String,
    placeholders: Vec<String>,
}

impl Expanded {
    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Put protected outputs back into converted HTML.
    pub fn restore(&self, html: &str) -> String {
        let mut out = html.to_string();
        // outer shortcodes were registered after their inner ones
        for (n, output) in self.placeholders.iter().enumerate().rev() {
            let key = placeholder(n);
            out = out
                .replace(&format!("<p>{key}</p>"), output)
                .replace(&key, output);
        }
        out
    }
}

fn placeholder(n: usize) -> String {
    format!("XSHORTCODEPLACEHOLDER{n}X")
}

/// Looks up pages for `ref`/`relref`: `(path, lang)`.
pub type RefLookup<'a> = dyn Fn(&str, Option<&str>) -> Result<Option<PageRef>, RefError> + 'a;

/// Expands the shortcodes of one page.
pub struct ShortcodeExpander<'a> {
    renderer: &'a dyn Renderer,
    lookup: &'a RefLookup<'a>,
    page: &'a Page,
    base_url: &'a str,
}

#[derive(Debug)]
struct TagMatch {
    start: usize,
    end: usize,
    markdown: bool,
    closing: bool,
    self_closing: bool,
    /// `{{</* x */>}}` written out literally.
    literal: Option<String>,
    name: String,
    args: String,
}

impl<'a> ShortcodeExpander<'a> {
    pub fn new(
        renderer: &'a dyn Renderer,
        lookup: &'a RefLookup<'a>,
        page: &'a Page,
        base_url: &'a str,
    ) -> Self {
        Self {
            renderer,
            lookup,
            page,
            base_url,
        }
    }

    /// Expand every shortcode in `body`.
    pub fn expand(&self, body: &str) -> Result<Expanded, RenderError> {
        let mut expanded = Expanded::default();
        expanded.text = self.expand_into(body, 0, &mut expanded.placeholders)?;
        Ok(expanded)
    }

    fn expand_into(
        &self,
        src: &str,
        offset: usize,
        placeholders: &mut Vec<String>,
    ) -> Result<String, RenderError> {
        let mut out = String::with_capacity(src.len());
        let mut pos = 0;

        while let Some(tag) = self.next_tag(src, pos, offset)? {
            out.push_str(&src[pos..tag.start]);
            pos = tag.end;

            if let Some(literal) = &tag.literal {
                out.push_str(literal);
                continue;
            }
            let line = self.line_of(offset + tag.start);
            if tag.closing {
                return Err(RenderError::at(
                    Some(line),
                    format!("closing shortcode \"{}\" without opening tag", tag.name),
                ));
            }

            let mut inner = None;
            if !tag.self_closing
                && !is_builtin(&tag.name)
                && let Some(close) = self.find_close(src, &tag, offset)?
            {
                let raw = &src[tag.end..close.start];
                inner = Some(self.expand_into(raw, offset + tag.end, placeholders)?);
                pos = close.end;
            }

            let (positional, named) = parse_args(&tag.args);
            let call = ShortcodeCall {
                name: tag.name.clone(),
                positional,
                named,
                inner,
                markdown: tag.markdown,
                page: self.page,
                line,
            };
            let output = self.execute(&call)?;

            if tag.markdown {
                out.push_str(&output);
            } else {
                out.push_str(&placeholder(placeholders.len()));
                placeholders.push(output);
            }
        }

        out.push_str(&src[pos..]);
        Ok(out)
    }

    fn execute(&self, call: &ShortcodeCall<'_>) -> Result<String, RenderError> {
        match call.name.as_str() {
            "ref" => self.builtin_ref(call, false),
            "relref" => self.builtin_ref(call, true),
            _ => match self.renderer.render_shortcode(call) {
                Ok(Some(output)) => Ok(output),
                Ok(None) => Err(RenderError::at(
                    Some(call.line),
                    format!("unknown shortcode \"{}\"", call.name),
                )),
                Err(RenderError::Reference(err)) => Err(RenderError::Reference(err)),
                Err(RenderError::Source { line, message }) => {
                    Err(RenderError::at(line.or(Some(call.line)), message))
                }
                Err(err) => Err(RenderError::at(
                    Some(call.line),
                    format!("shortcode \"{}\": {err}", call.name),
                )),
            },
        }
    }

    fn builtin_ref(&self, call: &ShortcodeCall<'_>, relative: bool) -> Result<String, RenderError> {
        let path = call
            .get(0)
            .or_else(|| call.get_named("path"))
            .ok_or_else(|| {
                RenderError::at(Some(call.line), format!("{} needs a page path", call.name))
            })?;
        let lang = call.get(1).or_else(|| call.get_named("lang"));

        let (target, fragment) = match path.split_once('#') {
            Some((target, fragment)) => (target, Some(fragment)),
            None => (path, None),
        };

        let permalink = if target.is_empty() {
            self.page.permalink().clone()
        } else {
            let page = (self.lookup)(target, lang)?.ok_or_else(|| {
                RenderError::at(
                    Some(call.line),
                    format!("{} \"{path}\": page not found", call.name),
                )
            })?;
            page.permalink().clone()
        };

        let mut url = if relative {
            permalink.to_encoded()
        } else {
            permalink.absolute(self.base_url)
        };
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Ok(url)
    }

    fn line_of(&self, byte: usize) -> usize {
        let body = self.page.body();
        let byte = byte.min(body.len());
        self.page.body_line() + body.as_bytes()[..byte].iter().filter(|&&b| b == b'\n').count()
    }

    /// Next tag at or after `from`.
    fn next_tag(&self, src: &str, from: usize, offset: usize) -> Result<Option<TagMatch>, RenderError> {
        let rest = &src[from..];
        let Some(rel) = rest.find("{{<").into_iter().chain(rest.find("{{%")).min() else {
            return Ok(None);
        };
        let start = from + rel;
        let markdown = src[start..].starts_with("{{%");
        let close_delim = if markdown { "%}}" } else { ">}}" };

        let body_start = start + 3;
        let Some(close_rel) = find_outside_quotes(&src[body_start..], close_delim) else {
            return Err(RenderError::at(
                Some(self.line_of(offset + start)),
                "unclosed shortcode",
            ));
        };
        let end = body_start + close_rel + close_delim.len();
        let inner = src[body_start..body_start + close_rel].trim();

        if let Some(comment) = inner.strip_prefix("/*").and_then(|s| s.strip_suffix("*/")) {
            let (open, close) = if markdown { ("{{%", "%}}") } else { ("{{<", ">}}") };
            return Ok(Some(TagMatch {
                start,
                end,
                markdown,
                closing: false,
                self_closing: true,
                literal: Some(format!("{open} {} {close}", comment.trim())),
                name: String::new(),
                args: String::new(),
            }));
        }

        let closing = inner.starts_with('/');
        let inner = inner.trim_start_matches('/').trim_start();
        let self_closing = inner.ends_with('/');
        let inner = inner.trim_end_matches('/').trim_end();
        let (name, args) = match inner.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (inner, ""),
        };
        if name.is_empty() {
            return Err(RenderError::at(
                Some(self.line_of(offset + start)),
                "shortcode without a name",
            ));
        }

        Ok(Some(TagMatch {
            start,
            end,
            markdown,
            closing,
            self_closing,
            literal: None,
            name: name.to_string(),
            args: args.to_string(),
        }))
    }

    /// Matching closing tag of `open`, honoring nested same-name tags.
    fn find_close(
        &self,
        src: &str,
        open: &TagMatch,
        offset: usize,
    ) -> Result<Option<TagMatch>, RenderError> {
        let mut depth = 0usize;
        let mut pos = open.end;
        while let Some(tag) = self.next_tag(src, pos, offset)? {
            pos = tag.end;
            if tag.literal.is_some() || tag.name != open.name {
                continue;
            }
            if tag.closing {
                if depth == 0 {
                    return Ok(Some(tag));
                }
                depth -= 1;
            } else if !tag.self_closing {
                depth += 1;
            }
        }
        Ok(None)
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(name, "ref" | "relref")
}

fn find_outside_quotes(s: &str, needle: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if in_quote => {
                escaped = !escaped;
                continue;
            }
            '"' if !escaped => in_quote = !in_quote,
            _ if !in_quote && s[i..].starts_with(needle) => return Some(i),
            _ => {}
        }
        escaped = false;
    }
    None
}

/// Split shortcode arguments into positional and `key=value` pairs.
pub fn parse_args(args: &str) -> (Vec<String>, Vec<(String, String)>) {
    let mut positional = Vec::new();
    let mut named = Vec::new();
    for caps in ARG.captures_iter(args) {
        let value = caps
            .get(2)
            .map(|m| m.as_str().replace("\\\"", "\""))
            .or_else(|| caps.get(3).map(|m| m.as_str().to_string()))
            .or_else(|| caps.get(4).map(|m| m.as_str().to_string()))
            .unwrap_or_default();
        match caps.get(1) {
            Some(key) => named.push((key.as_str().to_string(), value)),
            None => positional.push(value),
        }
    }
    (positional, named)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::OutputFormat;
    use crate::render::RenderContext;
    use crate::site::test_support::{language, page};

    /// Knows one shortcode, `upper`, which upper-cases its inner text.
    struct UpperRenderer;

    impl Renderer for UpperRenderer {
        fn render(
            &self,
            _: &[String],
            _: &RenderContext<'_>,
            _: OutputFormat,
        ) -> Result<Vec<u8>, RenderError> {
            Ok(Vec::new())
        }

        fn render_shortcode(&self, call: &ShortcodeCall<'_>) -> Result<Option<String>, RenderError> {
            Ok(match call.name.as_str() {
                "upper" => Some(
                    call.inner
                        .clone()
                        .or_else(|| call.get(0).map(str::to_string))
                        .unwrap_or_default()
                        .to_uppercase(),
                ),
                _ => None,
            })
        }

        fn has_layout(&self, _: &[String]) -> bool {
            true
        }
    }

    fn expand_with(body: &str, targets: &[PageRef]) -> Result<Expanded, RenderError> {
        let lang = language("en");
        let host = page(&lang, "sect/host.md", body);
        let targets: Vec<PageRef> = targets.to_vec();
        let lookup = move |path: &str, _lang: Option<&str>| -> Result<Option<PageRef>, RefError> {
            Ok(targets
                .iter()
                .find(|p| p.translation_key() == path.trim_start_matches('/'))
                .cloned())
        };
        let expander = ShortcodeExpander::new(&UpperRenderer, &lookup, &host, "https://example.org/");
        expander.expand(host.body())
    }

    #[test]
    fn test_parse_args() {
        let (pos, named) = parse_args(r#""a b" c key="v \"q\"" n=1"#);
        assert_eq!(pos, vec!["a b", "c"]);
        assert_eq!(
            named,
            vec![("key".into(), "v \"q\"".into()), ("n".into(), "1".into())]
        );
    }

    #[test]
    fn test_ref_and_relref() {
        let lang = language("en");
        let doc = page(&lang, "sect/doc1.md", "");
        let out = expand_with(
            "[a]({{< ref \"sect/doc1\" >}}) [b]({{< relref \"sect/doc1#intro\" >}})",
            &[doc],
        )
        .unwrap();
        let html = out.restore(&out.text);
        assert_eq!(
            html,
            "[a](https://example.org/sect/doc1/) [b](/sect/doc1/#intro)"
        );
    }

    #[test]
    fn test_ref_not_found_has_line() {
        let err = expand_with("line one\n\n{{< ref \"missing\" >}}", &[]).unwrap_err();
        assert!(matches!(err, RenderError::Source { line: Some(3), .. }));
    }

    #[test]
    fn test_markdown_form_is_spliced() {
        let out = expand_with("{{% upper %}}*hi*{{% /upper %}}", &[]).unwrap();
        assert_eq!(out.text, "*HI*");
        assert!(!out.has_placeholders());
    }

    #[test]
    fn test_html_form_is_protected_and_nested() {
        let out = expand_with("{{< upper >}}a {{< upper \"b\" />}}{{< /upper >}}", &[]).unwrap();
        assert_eq!(out.text, "XSHORTCODEPLACEHOLDER1X");
        assert_eq!(out.restore(&format!("<p>{}</p>", out.text)), "A B");
    }

    #[test]
    fn test_unknown_shortcode_is_error() {
        let err = expand_with("\n{{< gist 123 >}}", &[]).unwrap_err();
        assert!(
            matches!(err, RenderError::Source { line: Some(2), ref message } if message.contains("gist"))
        );
    }

    #[test]
    fn test_literal_and_unclosed() {
        let out = expand_with("{{</* upper */>}}", &[]).unwrap();
        assert_eq!(out.text, "{{< upper >}}");
        assert!(expand_with("{{< upper ", &[]).is_err());
    }

    #[test]
    fn test_self_reference_fragment() {
        let out = expand_with("{{< relref \"#top\" >}}", &[]).unwrap();
        assert_eq!(out.restore(&out.text), "/sect/host/#top");
    }
}
