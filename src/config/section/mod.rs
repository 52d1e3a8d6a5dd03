//! Configuration section definitions.

mod build;
mod language;

pub use build::{BuildConfig, DiagnosticsConfig, SitemapConfig};
pub use language::LanguageConfig;
