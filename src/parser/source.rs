//! Content source abstraction for reading input documents.

use anyhow::{Context, Result};
use camino::Utf8Path;

/// Trait for abstracting input I/O. The CLI reads from the filesystem;
/// tests provide in-memory sources.
pub trait ContentSource {
    /// Read the document at the given logical path into a string.
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String>;

    /// Whether a document exists at the given logical path.
    fn exists(&mut self, path: &Utf8Path) -> bool;
}

/// Reads documents directly from the local filesystem.
pub struct FsSource;

impl ContentSource for FsSource {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        std::fs::read_to_string(path.as_str()).with_context(|| format!("Failed to read {}", path))
    }

    fn exists(&mut self, path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }
}
