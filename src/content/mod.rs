//! Content ingestion: sources, front matter, paths and publish policy.

mod frontmatter;
mod path;
mod policy;
mod source;

pub use frontmatter::{
    DefaultFrontMatterParser, FrontMatterError, FrontMatterFormat, FrontMatterParser,
    ParsedContent,
};
pub use path::{BundleType, ContentPath, dir_key};
pub use policy::{PublishPolicy, is_draft, is_expired, is_future};
pub use source::{ContentSource, FsContentSource, MemorySource, SourceFile, SymlinkDir};
