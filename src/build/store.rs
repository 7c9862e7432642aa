//! File store: the only place the build touches the filesystem.
//!
//! Text is handed around with `\n` line endings. [`LocalFileStore`] writes
//! UTF-8 without a byte-order mark and with CRLF line endings, and normalizes
//! both away again on read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::tmdl::format::{normalize_newlines, to_crlf};

/// Storage operations used by the builder.
pub trait FileStore: Send + Sync {
    /// Read a text file; `None` when it does not exist.
    fn read_text(&self, path: &Path) -> io::Result<Option<String>>;

    /// Files below `dir`, as sorted `/`-separated relative paths.
    ///
    /// A missing directory yields an empty list.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Write a text file, creating parent directories.
    fn write_text(&self, path: &Path, text: &str) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy every file below `from` into `to`; returns the number of files.
    fn copy_tree(&self, from: &Path, to: &Path) -> io::Result<usize>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(normalize_newlines(&text)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(dir) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
        files.sort();
        Ok(files)
    }

    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(path);
        fs::write(&tmp, to_crlf(text).as_bytes())?;
        fs::rename(&tmp, path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> io::Result<usize> {
        let files = self.list_files(from)?;
        fs::create_dir_all(to)?;
        for rel in &files {
            let dest = to.join(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(from.join(rel), dest)?;
        }
        Ok(files.len())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
