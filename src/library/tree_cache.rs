// Folder lookup cache
// Owned by the application state and refreshed by whoever rescans the library.
use std::collections::HashMap;

use super::directory_tree::{normalize_path, DirectoryTree};

/// Folders keyed by normalized full path, so a folder view can be served
/// without walking (or rescanning) the whole tree.
#[derive(Debug, Default)]
pub struct TreeCache {
    nodes: HashMap<String, DirectoryTree>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache every folder of `root` as a shallow copy: its songs plus
    /// skeleton placeholders for its children
    pub fn populate(&mut self, root: &DirectoryTree) {
        for node in root.flattened_subdirs(true) {
            self.nodes
                .insert(normalize_path(&node.full_path()), node.shallow_copy());
        }
    }

    /// Store a freshly scanned subtree, dropping older entries below it
    pub fn insert(&mut self, tree: DirectoryTree) {
        let key = normalize_path(&tree.full_path());
        self.invalidate_subtree(&key);

        for node in tree.flattened_subdirs(true).into_iter().skip(1) {
            self.nodes
                .insert(normalize_path(&node.full_path()), node.shallow_copy());
        }
        self.nodes.insert(key, tree);
    }

    /// Cached folder or the uninitialized sentinel
    pub fn get(&self, path: &str) -> &DirectoryTree {
        self.nodes
            .get(&normalize_path(path))
            .unwrap_or_else(|| DirectoryTree::uninitialized())
    }

    pub fn invalidate_all(&mut self) {
        self.nodes.clear();
    }

    /// Drop a folder and everything below it
    pub fn invalidate_subtree(&mut self, path: &str) {
        let prefix = normalize_path(path);
        self.nodes.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
