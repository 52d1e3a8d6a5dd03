//! Incremental rebuild support.
//!
//! - [`classify`]: sorts watcher events into config/layout/data/i18n/content/static
//! - [`changes`]: maps a changed content file back to the bundle owning it

pub mod changes;
pub mod classify;

pub use changes::{Classified, ContentChangeMap, Owner};
pub use classify::{
    ChangeSet, ContentChange, FsEvent, FsOp, StaticChange, WatchRoots, classify_events,
};
