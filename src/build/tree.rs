//! In-memory definition tree: relative path → file text.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use super::paths::{is_table_file, TMDL_EXTENSION};
use super::store::FileStore;

/// A set of definition files keyed by `/`-separated relative path.
///
/// Text always uses `\n` line endings; the file store converts on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionTree {
    files: BTreeMap<String, String>,
}

impl DefinitionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every `.tmdl` file below `root`. A missing root is an empty tree.
    pub fn load(store: &dyn FileStore, root: &Path) -> io::Result<Self> {
        let mut tree = Self::new();
        for rel in store.list_files(root)? {
            if !rel.ends_with(TMDL_EXTENSION) {
                continue;
            }
            if let Some(text) = store.read_text(&root.join(&rel))? {
                tree.insert(rel, text);
            }
        }
        Ok(tree)
    }

    pub fn insert(&mut self, rel: impl Into<String>, text: impl Into<String>) {
        self.files.insert(rel.into(), text.into());
    }

    pub fn get(&self, rel: &str) -> Option<&str> {
        self.files.get(rel).map(String::as_str)
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.files.contains_key(rel)
    }

    pub fn remove(&mut self, rel: &str) -> Option<String> {
        self.files.remove(rel)
    }

    /// All files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Files directly under `tables/`.
    pub fn table_files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files().filter(|(rel, _)| is_table_file(rel))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
