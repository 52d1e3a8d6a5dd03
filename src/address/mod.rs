//! Page addressing: the reference index and its resolver.
//!
//! # Module Structure
//!
//! - [`index`]: [`RefIndex`], lowercased keys to [`IndexEntry`]
//! - [`resolve`]: [`RefResolver`], the cascading `GetPage`/`ref` lookup
//!
//! # Usage
//!
//! ```ignore
//! let index = site.collections().ref_index();
//! let page = RefResolver::new(&index).resolve("/sect/doc1", None)?;
//! ```

pub mod index;
pub mod resolve;

pub use index::{IndexEntry, RefIndex, normalize_key, ref_keys};
pub use resolve::{RefError, RefResolver};
