//! Bundle membership tracking for incremental rebuilds.
//!
//! Bundle discovery records every bundle root; a changed file is mapped
//! back to the bundle owning it. A matched entry is removed so the next
//! discovery pass re-registers it only if the bundle still exists.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::content::{BundleType, ContentPath, dir_key};

/// Who owns a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A recorded bundle rooted at `root`.
    Bundle { root: String, bundle: BundleType },
    /// Index file of a bundle that was not recorded yet.
    NewBundle { root: String, bundle: BundleType },
    /// Not part of any bundle; the file affects only itself.
    None,
}

/// Result of [`ContentChangeMap::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// Directory key of the changed file, e.g. `/a/b1/`.
    pub dir: String,
    pub owner: Owner,
}

#[derive(Debug, Default)]
struct Roots {
    branches: Vec<String>,
    leafs: Vec<String>,
}

/// Branch and leaf bundle roots plus symlinked content directories.
#[derive(Debug, Default)]
pub struct ContentChangeMap {
    roots: Mutex<Roots>,
    /// Real directory -> virtual directories with their root language.
    symlinks: Mutex<FxHashMap<String, Vec<(String, Option<String>)>>>,
}

impl ContentChangeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the root directory of a discovered bundle.
    pub fn record_bundle(&self, dir: &str, bundle: BundleType) {
        let key = dir_key(dir);
        let mut roots = self.roots.lock();
        let list = match bundle {
            BundleType::Branch => &mut roots.branches,
            BundleType::Leaf => &mut roots.leafs,
        };
        if !list.contains(&key) {
            list.push(key);
        }
    }

    /// Record `virtual_dir`, inside the content root tagged `lang`, as a
    /// link to `real_dir`.
    pub fn add_symlink(&self, real_dir: &str, virtual_dir: &str, lang: Option<&str>) {
        let real = real_dir.trim_end_matches('/').to_string();
        let location = (
            virtual_dir.trim_matches('/').to_string(),
            lang.map(str::to_string),
        );
        let mut symlinks = self.symlinks.lock();
        let entry = symlinks.entry(real).or_default();
        if !entry.contains(&location) {
            entry.push(location);
        }
    }

    /// Every content location backed by `real_path`, with the language of
    /// the root it sits in.
    pub fn virtual_paths(&self, real_path: &str) -> Vec<(String, Option<String>)> {
        let symlinks = self.symlinks.lock();
        let mut out = Vec::new();
        for (real, virtual_dirs) in symlinks.iter() {
            let Some(rest) = real_path.strip_prefix(real.as_str()) else {
                continue;
            };
            if !(rest.is_empty() || rest.starts_with('/')) {
                continue;
            }
            for (virtual_dir, lang) in virtual_dirs {
                out.push((format!("{virtual_dir}{rest}"), lang.clone()));
            }
        }
        out.sort();
        out
    }

    /// Map a changed content-relative path to its owner.
    ///
    /// Branch roots are checked first by exact directory, then leaf roots by
    /// prefix, since a leaf bundle may sit inside a branch bundle's tree.
    pub fn classify(&self, path: &str) -> Classified {
        let parsed = ContentPath::parse(path, &[]);
        let dir = dir_key(parsed.dir());
        let is_content = parsed.is_content();
        let marker = bundle_marker(parsed.file_name(), is_content);

        let mut roots = self.roots.lock();

        let branch_candidate = marker == Some(BundleType::Branch) || !is_content;
        if branch_candidate && let Some(i) = roots.branches.iter().position(|b| *b == dir) {
            let root = roots.branches.remove(i);
            return Classified {
                dir,
                owner: Owner::Bundle {
                    root,
                    bundle: BundleType::Branch,
                },
            };
        }

        if let Some(i) = roots.leafs.iter().position(|l| dir.starts_with(l.as_str())) {
            let root = roots.leafs.remove(i);
            return Classified {
                dir,
                owner: Owner::Bundle {
                    root,
                    bundle: BundleType::Leaf,
                },
            };
        }

        let owner = match marker {
            Some(bundle) if is_content => Owner::NewBundle {
                root: dir.clone(),
                bundle,
            },
            _ => Owner::None,
        };
        Classified { dir, owner }
    }

    pub fn branch_count(&self) -> usize {
        self.roots.lock().branches.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.roots.lock().leafs.len()
    }

    /// Forget all bundles; symlinks are kept.
    pub fn clear(&self) {
        let mut roots = self.roots.lock();
        roots.branches.clear();
        roots.leafs.clear();
    }
}

/// `index.*` / `_index.*`, with or without a language suffix.
fn bundle_marker(file_name: &str, is_content: bool) -> Option<BundleType> {
    if !is_content {
        return None;
    }
    match file_name.split('.').next() {
        Some("index") => Some(BundleType::Leaf),
        Some("_index") => Some(BundleType::Branch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_bundle_owns_subtree() {
        let map = ContentChangeMap::new();
        map.record_bundle("a", BundleType::Branch);
        map.record_bundle("a/b1", BundleType::Leaf);

        let classified = map.classify("a/b1/page1.md");
        assert_eq!(classified.dir, "/a/b1/");
        assert_eq!(
            classified.owner,
            Owner::Bundle {
                root: "/a/b1/".into(),
                bundle: BundleType::Leaf
            }
        );

        let nested = ContentChangeMap::new();
        nested.record_bundle("a/b1", BundleType::Leaf);
        assert_eq!(
            nested.classify("a/b1/images/deep/x.png").owner,
            Owner::Bundle {
                root: "/a/b1/".into(),
                bundle: BundleType::Leaf
            }
        );
    }

    #[test]
    fn test_classify_removes_entry() {
        let map = ContentChangeMap::new();
        map.record_bundle("a/b1", BundleType::Leaf);

        assert!(matches!(map.classify("a/b1/page1.md").owner, Owner::Bundle { .. }));
        assert_eq!(map.classify("a/b1/page1.md").owner, Owner::None);
        assert_eq!(map.leaf_count(), 0);
    }

    #[test]
    fn test_branch_matches_index_and_resources_exactly() {
        let map = ContentChangeMap::new();
        map.record_bundle("blog", BundleType::Branch);

        // a content file directly inside a branch only affects itself
        assert_eq!(map.classify("blog/post.md").owner, Owner::None);
        assert_eq!(map.branch_count(), 1);

        assert_eq!(
            map.classify("blog/banner.png").owner,
            Owner::Bundle {
                root: "/blog/".into(),
                bundle: BundleType::Branch
            }
        );

        map.record_bundle("blog", BundleType::Branch);
        assert!(matches!(
            map.classify("blog/_index.fr.md").owner,
            Owner::Bundle {
                bundle: BundleType::Branch,
                ..
            }
        ));

        map.record_bundle("blog", BundleType::Branch);
        assert_eq!(map.classify("blog/sub/other.png").owner, Owner::None);
    }

    #[test]
    fn test_branch_checked_before_leaf() {
        let map = ContentChangeMap::new();
        map.record_bundle("docs", BundleType::Leaf);
        map.record_bundle("docs", BundleType::Branch);

        assert!(matches!(
            map.classify("docs/_index.md").owner,
            Owner::Bundle {
                bundle: BundleType::Branch,
                ..
            }
        ));
    }

    #[test]
    fn test_new_bundle_candidates() {
        let map = ContentChangeMap::new();
        assert_eq!(
            map.classify("posts/trip/index.md").owner,
            Owner::NewBundle {
                root: "/posts/trip/".into(),
                bundle: BundleType::Leaf
            }
        );
        assert_eq!(
            map.classify("posts/_index.md").owner,
            Owner::NewBundle {
                root: "/posts/".into(),
                bundle: BundleType::Branch
            }
        );
        assert_eq!(map.classify("posts/plain.md").owner, Owner::None);
    }

    #[test]
    fn test_symlinked_locations() {
        let map = ContentChangeMap::new();
        map.add_symlink("/shared/notes", "docs/notes", None);
        map.add_symlink("/shared/notes", "blog/notes", None);
        map.add_symlink("/shared/notes", "notes/", Some("fr"));
        map.add_symlink("/shared/notes", "docs/notes", None);

        assert_eq!(
            map.virtual_paths("/shared/notes/a.md"),
            vec![
                ("blog/notes/a.md".to_string(), None),
                ("docs/notes/a.md".to_string(), None),
                ("notes/a.md".to_string(), Some("fr".to_string())),
            ]
        );
        assert!(map.virtual_paths("/shared/notesX/a.md").is_empty());
    }

    #[test]
    fn test_clear_keeps_symlinks() {
        let map = ContentChangeMap::new();
        map.record_bundle("a", BundleType::Branch);
        map.add_symlink("/r", "v", None);
        map.clear();
        assert_eq!(map.branch_count(), 0);
        assert_eq!(map.virtual_paths("/r/x.md"), vec![("v/x.md".to_string(), None)]);
    }
}
