//! Core types - pure abstractions shared across the codebase.

mod category;
mod deadline;
mod lazy;
mod phase;
mod url;

pub use category::{ContentKind, FileCategory};
pub use deadline::Deadline;
pub use lazy::{LazyValue, OnceSlot};
pub use phase::BuildPhase;
pub use url::UrlPath;
