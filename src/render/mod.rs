//! Rendering seams and page-local content processing.
//!
//! The template engine and the output sink are collaborators behind the
//! [`Renderer`] and [`Publisher`] traits; everything a page needs before it
//! can be rendered (shortcodes, Markdown, table of contents, summary, word
//! count) lives here.
//!
//! # Module Structure
//!
//! - [`layout`]: layout candidate lists and the file-based [`LayoutRenderer`]
//! - [`markdown`]: Markdown to HTML with heading ids and TOC
//! - [`shortcode`]: `{{< name >}}` parsing and execution
//! - [`summary`]: summary, word count and reading time
//! - [`publish`]: filesystem and in-memory publishers
//! - [`template`]: the placeholder template language used by layouts

pub mod layout;
pub mod markdown;
pub mod publish;
pub mod shortcode;
pub mod summary;
pub mod template;

use std::io::{self, Read};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::address::RefError;
use crate::page::{JsonMap, OutputFormat, Page, PageContent, PageRef};
use crate::site::{Menus, Site};

pub use layout::{LayoutRenderer, layout_candidates};
pub use publish::{FsPublisher, MemoryPublisher};
pub use shortcode::ShortcodeCall;

#[derive(Debug, Error)]
pub enum RenderError {
    /// No candidate layout exists.
    #[error("no layout found; tried {}", .candidates.join(", "))]
    MissingLayout { candidates: Vec<String> },

    /// Error inside page source, with the 1-based line when known.
    #[error("{message}")]
    Source {
        line: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Reference(#[from] RefError),

    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RenderError {
    pub fn at(line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Source {
            line,
            message: message.into(),
        }
    }
}

/// Everything a layout sees for one page.
pub struct RenderContext<'a> {
    pub page: &'a Page,
    /// Prepared content; `None` for pages that were not prepared.
    pub content: Option<Arc<PageContent>>,
    /// Pages listed by a node page, in default order.
    pub pages: &'a [PageRef],
    pub site: &'a Site,
    /// Merged `data/` tree.
    pub data: &'a JsonValue,
    /// Translation table of the page's language.
    pub i18n: Option<&'a JsonMap>,
}

impl RenderContext<'_> {
    pub fn menus(&self) -> Menus {
        self.site.menus()
    }
}

/// Template engine collaborator.
pub trait Renderer: Send + Sync {
    /// Render with the first candidate layout that exists.
    fn render(
        &self,
        candidates: &[String],
        ctx: &RenderContext<'_>,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RenderError>;

    /// Execute a user shortcode. `Ok(None)` when no such shortcode exists.
    fn render_shortcode(&self, call: &ShortcodeCall<'_>) -> Result<Option<String>, RenderError>;

    /// Whether any of `candidates` exists.
    fn has_layout(&self, candidates: &[String]) -> bool;

    /// Drop cached templates after layout changes.
    fn invalidate(&self) {}
}

/// Output sink collaborator. Paths are relative to the publish root.
pub trait Publisher: Send + Sync {
    fn write(&self, path: &str, content: &mut dyn Read) -> io::Result<()>;

    fn exists(&self, path: &str) -> bool;

    fn remove(&self, path: &str) -> io::Result<()>;
}
