//! Cross-site artifacts written after every site has rendered.
//!
//! - **Sitemap**: per-language `sitemap.xml`, plus a root sitemap index
//!   when more than one language is built

pub mod sitemap;

pub use sitemap::{SITEMAP_FILE, Sitemap, sitemap_index, write_sitemaps};
