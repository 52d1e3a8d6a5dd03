//! Placeholder templates for the default layout renderer.
//!
//! Supports a small subset of Go-template syntax:
//!
//! ```text
//! {{ .Title }}                  field of the current scope (escaped)
//! {{ .Params.author }}          nested field
//! {{ $.Site.Title }}            field of the root scope
//! {{ i18n "home" }}             function call with literal arguments
//! {{ range .Pages }}..{{ end }} iterate a list, each item becomes the scope
//! {{ if .Draft }}..{{ else }}..{{ end }}
//! {{/* comment */}}
//! ```

use std::sync::LazyLock;

use regex::Regex;

use super::RenderError;
use crate::utils::html::escape;

static ACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{-?\s*(.*?)\s*-?\}\}").unwrap());

/// Output of one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain text, escaped on output.
    Text(String),
    /// Trusted markup.
    Html(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Html(s) => s,
        }
    }

    fn is_truthy(&self) -> bool {
        !matches!(self.as_str(), "" | "false" | "0")
    }
}

/// Something a template can read from.
pub trait Scope {
    /// `.A.B` -> `field(&["A", "B"])`
    fn field(&self, path: &[&str]) -> Option<Value>;

    /// Items for `range`.
    fn items(&self, _path: &[&str]) -> Option<Vec<Box<dyn Scope + '_>>> {
        None
    }

    /// `name "arg" 1` function calls.
    fn call(&self, _name: &str, _args: &[String]) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Expr(String),
    Range {
        expr: String,
        body: Vec<Node>,
    },
    If {
        expr: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

enum Frame {
    Root(Vec<Node>),
    Range(String, Vec<Node>),
    If {
        expr: String,
        then: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
}

impl Frame {
    fn nodes(&mut self) -> &mut Vec<Node> {
        match self {
            Self::Root(nodes) | Self::Range(_, nodes) => nodes,
            Self::If {
                otherwise: Some(nodes),
                ..
            } => nodes,
            Self::If { then, .. } => then,
        }
    }
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, RenderError> {
        let mut stack = vec![Frame::Root(Vec::new())];
        let mut pos = 0;

        for caps in ACTION.captures_iter(src) {
            let (Some(whole), Some(action)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let top = stack.last_mut().ok_or_else(unbalanced)?;
            if whole.start() > pos {
                top.nodes().push(Node::Text(src[pos..whole.start()].to_string()));
            }
            pos = whole.end();

            let action = action.as_str().trim();
            if action.starts_with("/*") {
                continue;
            }
            if let Some(expr) = action.strip_prefix("range ") {
                stack.push(Frame::Range(expr.trim().to_string(), Vec::new()));
            } else if let Some(expr) = action.strip_prefix("if ") {
                stack.push(Frame::If {
                    expr: expr.trim().to_string(),
                    then: Vec::new(),
                    otherwise: None,
                });
            } else if action == "else" {
                match stack.last_mut() {
                    Some(Frame::If { otherwise, .. }) if otherwise.is_none() => {
                        *otherwise = Some(Vec::new());
                    }
                    _ => return Err(RenderError::Template("unexpected {{ else }}".into())),
                }
            } else if action == "end" {
                let node = match stack.pop() {
                    Some(Frame::Range(expr, body)) => Node::Range { expr, body },
                    Some(Frame::If {
                        expr,
                        then,
                        otherwise,
                    }) => Node::If {
                        expr,
                        then,
                        otherwise: otherwise.unwrap_or_default(),
                    },
                    _ => return Err(RenderError::Template("unexpected {{ end }}".into())),
                };
                stack.last_mut().ok_or_else(unbalanced)?.nodes().push(node);
            } else {
                top.nodes().push(Node::Expr(action.to_string()));
            }
        }

        let mut root = match stack.pop() {
            Some(Frame::Root(nodes)) if stack.is_empty() => nodes,
            _ => return Err(RenderError::Template("missing {{ end }}".into())),
        };
        if pos < src.len() {
            root.push(Node::Text(src[pos..].to_string()));
        }
        Ok(Self { nodes: root })
    }

    /// Execute against `root`.
    pub fn execute(&self, root: &dyn Scope) -> Result<String, RenderError> {
        let mut out = String::new();
        execute_nodes(&self.nodes, root, root, &mut out)?;
        Ok(out)
    }
}

fn unbalanced() -> RenderError {
    RenderError::Template("unbalanced template actions".into())
}

fn execute_nodes(
    nodes: &[Node],
    root: &dyn Scope,
    dot: &dyn Scope,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Expr(expr) => match evaluate(expr, root, dot)? {
                Value::Text(text) => out.push_str(&escape(&text)),
                Value::Html(html) => out.push_str(&html),
            },
            Node::Range { expr, body } => {
                let (scope, path) = target(expr, root, dot)?;
                for item in scope.items(&path).unwrap_or_default() {
                    execute_nodes(body, root, item.as_ref(), out)?;
                }
            }
            Node::If {
                expr,
                then,
                otherwise,
            } => {
                let truthy = match evaluate(expr, root, dot) {
                    Ok(value) => value.is_truthy(),
                    Err(_) => {
                        let (scope, path) = target(expr, root, dot)?;
                        scope.items(&path).is_some_and(|items| !items.is_empty())
                    }
                };
                let branch = if truthy { then } else { otherwise };
                execute_nodes(branch, root, dot, out)?;
            }
        }
    }
    Ok(())
}

/// Split `$.A.B` / `.A.B` into the scope and path.
fn target<'s>(
    expr: &'s str,
    root: &'s dyn Scope,
    dot: &'s dyn Scope,
) -> Result<(&'s dyn Scope, Vec<&'s str>), RenderError> {
    let (scope, path) = if let Some(path) = expr.strip_prefix('$') {
        (root, path)
    } else {
        (dot, expr)
    };
    let Some(path) = path.strip_prefix('.') else {
        return Err(RenderError::Template(format!("cannot evaluate \"{expr}\"")));
    };
    Ok((scope, path.split('.').filter(|s| !s.is_empty()).collect()))
}

fn evaluate(expr: &str, root: &dyn Scope, dot: &dyn Scope) -> Result<Value, RenderError> {
    let name = expr.split_whitespace().next().unwrap_or_default();
    let rest = expr[name.len()..].trim();

    if rest.is_empty() && (expr.starts_with('.') || expr.starts_with('$')) {
        let (scope, path) = target(expr, root, dot)?;
        if path.is_empty() {
            return Ok(Value::text(""));
        }
        return scope
            .field(&path)
            .ok_or_else(|| RenderError::Template(format!("can't evaluate field {expr}")));
    }

    // `.Get 0` is a method on the current scope
    let (name, method) = match name.strip_prefix('.') {
        Some(method) => (method, true),
        None => (name, false),
    };
    let args: Vec<String> = split_call_args(rest)
        .into_iter()
        .map(|arg| {
            if arg.starts_with('.') || arg.starts_with('$') {
                evaluate(&arg, root, dot).map(|v| v.as_str().to_string())
            } else {
                Ok(arg)
            }
        })
        .collect::<Result<_, _>>()?;

    let value = if method {
        dot.call(name, &args)
    } else {
        dot.call(name, &args).or_else(|| root.call(name, &args))
    };
    value.ok_or_else(|| RenderError::Template(format!("function \"{name}\" not defined")))
}

fn split_call_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = args.trim();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            out.push(quoted[..end].to_string());
            rest = quoted.get(end + 1..).unwrap_or_default().trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            out.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl Scope for Item {
        fn field(&self, path: &[&str]) -> Option<Value> {
            (path == ["Name"]).then(|| Value::text(self.0))
        }
    }

    struct Root;

    impl Scope for Root {
        fn field(&self, path: &[&str]) -> Option<Value> {
            match path {
                ["Title"] => Some(Value::text("A & B")),
                ["Content"] => Some(Value::Html("<p>x</p>".into())),
                ["Site", "Title"] => Some(Value::text("Site")),
                ["Draft"] => Some(Value::text("false")),
                _ => None,
            }
        }

        fn items(&self, path: &[&str]) -> Option<Vec<Box<dyn Scope + '_>>> {
            (path == ["Pages"]).then(|| {
                vec![Box::new(Item("one")) as Box<dyn Scope>, Box::new(Item("two"))]
            })
        }

        fn call(&self, name: &str, args: &[String]) -> Option<Value> {
            match name {
                "i18n" => Some(Value::text(format!("[{}]", args.join(",")))),
                "Get" => args.first().map(|a| Value::text(format!("get:{a}"))),
                _ => None,
            }
        }
    }

    fn run(src: &str) -> Result<String, RenderError> {
        Template::parse(src)?.execute(&Root)
    }

    #[test]
    fn test_fields_and_escaping() {
        assert_eq!(
            run("<h1>{{ .Title }}</h1>{{ .Content }}").unwrap(),
            "<h1>A &amp; B</h1><p>x</p>"
        );
        assert_eq!(run("{{ .Site.Title }}").unwrap(), "Site");
    }

    #[test]
    fn test_range_and_root_access() {
        assert_eq!(
            run("{{ range .Pages }}<li>{{ .Name }}/{{ $.Site.Title }}</li>{{ end }}").unwrap(),
            "<li>one/Site</li><li>two/Site</li>"
        );
    }

    #[test]
    fn test_if_else_and_comments() {
        assert_eq!(
            run("{{/* hidden */}}{{ if .Draft }}draft{{ else }}live{{ end }}").unwrap(),
            "live"
        );
        assert_eq!(run("{{ if .Pages }}has{{ end }}").unwrap(), "has");
    }

    #[test]
    fn test_calls() {
        assert_eq!(run("{{ i18n \"home\" }}").unwrap(), "[home]");
        assert_eq!(run("{{ .Get 0 }}|{{ .Get \"k\" }}").unwrap(), "get:0|get:k");
        assert!(run("{{ nope 1 }}").is_err());
    }

    #[test]
    fn test_unknown_field_and_unbalanced() {
        assert!(run("{{ .Missing }}").is_err());
        assert!(Template::parse("{{ range .Pages }}").is_err());
        assert!(Template::parse("{{ end }}").is_err());
    }
}
