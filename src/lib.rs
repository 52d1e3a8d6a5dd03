//! Polysite - a multilingual static site build pipeline.
//!
//! The crate turns a tree of content files into per-language sites, links
//! translations across them, synthesizes missing structural pages, prepares
//! page content in parallel and hands every page to an external renderer.
//!
//! # Module Structure
//!
//! ```text
//! cli/        # build and watch commands
//! config/     # site.toml loading and validation
//! language/   # ordered language registry
//! content/    # content source, front matter, content paths, publish policy
//! page/       # page entity, kinds, output formats, prepared content
//! site/       # one language site: collections, taxonomies, menus, synthesis
//! address/    # reference index and GetPage/ref/relref resolver
//! reload/     # change classification and bundle change map
//! render/     # renderer/publisher seams, shortcodes, markdown
//! generator/  # cross-site artifacts (sitemaps)
//! sites/      # SiteSet: the build/rebuild orchestrator
//! ```

pub mod address;
pub mod cli;
pub mod config;
pub mod content;
pub mod core;
pub mod generator;
pub mod language;
pub mod logger;
pub mod page;
pub mod reload;
pub mod render;
pub mod site;
pub mod sites;
pub mod utils;

pub use config::SiteConfig;
pub use language::{Language, Languages};
pub use page::{Page, PageKind, PageRef};
pub use sites::{BuildCfg, BuildError, BuildPhase, BuildReport, Collaborators, SiteSet};
