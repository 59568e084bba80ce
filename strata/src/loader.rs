//! Sources of template text.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::LoadError;

/// Maps a resolved template path to its source text.
///
/// Paths are always `/`-separated and relative to whatever root the loader serves.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, path: &str) -> Result<String, LoadError>;

    /// Sorted paths of the templates with `extension` this loader can serve.
    ///
    /// Loaders that cannot enumerate their templates list nothing.
    async fn list(&self, extension: &str) -> Vec<String> {
        let _ = extension;
        Vec::new()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

/// Reads templates from a directory on disk
#[derive(Debug, Clone)]
pub struct FileLoader {
    basedir: PathBuf,
}

impl FileLoader {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let mut full = self.basedir.clone();
        full.extend(path.split('/').filter(|segment| !segment.is_empty()));
        full
    }
}

#[async_trait]
impl Loader for FileLoader {
    async fn load(&self, path: &str) -> Result<String, LoadError> {
        let full = self.full_path(path);
        debug!("reading {}", full.display());
        tokio::fs::read_to_string(&full).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.to_string()),
            _ => LoadError::Io(err),
        })
    }

    /// Walks `basedir`, skipping entries that cannot be read
    async fn list(&self, extension: &str) -> Vec<String> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.basedir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry under {}: {err}", self.basedir.display());
                    continue;
                }
            };
            let path = entry.path();
            if !(path.is_file() && has_extension(path, extension)) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.basedir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
        names.sort();
        names
    }
}

/// Serves templates from memory.
///
/// ```rust
/// use strata::{Loader, MemoryLoader};
///
/// # #[tokio::main]
/// # async fn main() {
/// let loader = MemoryLoader::new().with("index.html", "hello");
/// assert_eq!(loader.load("index.html").await.unwrap(), "hello");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, builder style
    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(path.into(), source.into());
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    async fn load(&self, path: &str) -> Result<String, LoadError> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))
    }

    async fn list(&self, extension: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .keys()
            .filter(|path| has_extension(Path::new(path.as_str()), extension))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_loader_reads_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("layouts")).unwrap();
        std::fs::write(dir.path().join("layouts/base.html"), "<main/>").unwrap();

        let loader = FileLoader::new(dir.path());
        assert_eq!(loader.load("layouts/base.html").await.unwrap(), "<main/>");
        assert!(matches!(
            loader.load("layouts/missing.html").await,
            Err(LoadError::NotFound(path)) if path == "layouts/missing.html"
        ));
    }

    #[tokio::test]
    async fn memory_loader_serves_inserted_templates() {
        let mut loader = MemoryLoader::new().with("a.html", "A");
        loader.insert("b.html", "B");
        assert_eq!(loader.load("a.html").await.unwrap(), "A");
        assert_eq!(loader.load("b.html").await.unwrap(), "B");
        assert!(matches!(loader.load("c.html").await, Err(LoadError::NotFound(_))));
        assert_eq!(loader.list("html").await, vec!["a.html", "b.html"]);
        assert!(loader.list("txt").await.is_empty());
    }

    #[tokio::test]
    async fn file_loader_lists_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pages/deep")).unwrap();
        std::fs::write(dir.path().join("pages/deep/b.html"), "").unwrap();
        std::fs::write(dir.path().join("a.html"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let loader = FileLoader::new(dir.path());
        assert_eq!(loader.list("html").await, vec!["a.html", "pages/deep/b.html"]);
        assert!(FileLoader::new(dir.path().join("missing")).list("html").await.is_empty());
    }
}
