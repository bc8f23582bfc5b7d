//! Source provider collaborators: where buffers are read from and written to.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Reads and writes whole files by workspace-relative path.
pub trait SourceProvider: Send + Sync {
    /// Current text of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingFile`] when the file does not exist, or
    /// another variant when the path is rejected or reading fails.
    fn read(&self, path: &str) -> Result<String, SourceError>;

    /// Replace the text of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is rejected or writing fails.
    fn write(&self, path: &str, text: &str) -> Result<(), SourceError>;
}

impl<T: SourceProvider + ?Sized> SourceProvider for &T {
    fn read(&self, path: &str) -> Result<String, SourceError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, text: &str) -> Result<(), SourceError> {
        (**self).write(path, text)
    }
}

/// Errors surfaced by source providers.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Path was absolute.
    #[error("source path must be relative: {path}")]
    AbsolutePath {
        /// Provided path.
        path: String,
    },
    /// Path tried to leave the workspace root.
    #[error("source path must not contain parent segments: {path}")]
    PathTraversal {
        /// Provided path.
        path: String,
    },
    /// Referenced file does not exist.
    #[error("missing source file: {path}")]
    MissingFile {
        /// Missing file path.
        path: String,
    },
    /// File changed since the edits were computed.
    #[error("{path} changed since the edits were proposed")]
    Stale {
        /// Changed file.
        path: String,
    },
    /// I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Files under a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceSource {
    root: PathBuf,
}

impl WorkspaceSource {
    /// Root the provider at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the root cannot be canonicalized.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|source| SourceError::Io {
            path: display_path(root),
            source,
        })?;
        Ok(Self { root })
    }

    /// Absolute root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceProvider for WorkspaceSource {
    fn read(&self, path: &str) -> Result<String, SourceError> {
        let full = sanitize_path(&self.root, path)?;
        fs::read_to_string(&full).map_err(|source| match source.kind() {
            ErrorKind::NotFound => SourceError::MissingFile {
                path: path.to_owned(),
            },
            _ => SourceError::Io {
                path: path.to_owned(),
                source,
            },
        })
    }

    fn write(&self, path: &str, text: &str) -> Result<(), SourceError> {
        let full = sanitize_path(&self.root, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|source| SourceError::Io {
                path: display_path(parent),
                source,
            })?;
        }
        fs::write(&full, text).map_err(|source| SourceError::Io {
            path: path.to_owned(),
            source,
        })?;
        tracing::debug!(path, bytes = text.len(), "wrote source file");
        Ok(())
    }
}

/// In-memory files keyed by path.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemorySource {
    /// Provider seeded with `files`.
    pub fn new<P, T>(files: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        Self {
            files: Mutex::new(
                files
                    .into_iter()
                    .map(|(path, text)| (path.into(), text.into()))
                    .collect(),
            ),
        }
    }

    /// Copy of every file.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SourceProvider for MemorySource {
    fn read(&self, path: &str) -> Result<String, SourceError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::MissingFile {
                path: path.to_owned(),
            })
    }

    fn write(&self, path: &str, text: &str) -> Result<(), SourceError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_owned(), text.to_owned());
        Ok(())
    }
}

fn sanitize_path(root: &Path, relative: &str) -> Result<PathBuf, SourceError> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(SourceError::AbsolutePath {
            path: relative.to_owned(),
        });
    }

    if candidate
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(SourceError::PathTraversal {
            path: relative.to_owned(),
        });
    }

    Ok(root.join(candidate))
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_rejects_escaping_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = WorkspaceSource::open(dir.path()).expect("open");
        assert!(matches!(
            source.read("../secret"),
            Err(SourceError::PathTraversal { .. })
        ));
        assert!(matches!(
            source.write("/etc/passwd", ""),
            Err(SourceError::AbsolutePath { .. })
        ));
        assert!(matches!(
            source.read("missing.ts"),
            Err(SourceError::MissingFile { .. })
        ));
    }

    #[test]
    fn workspace_round_trips_nested_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = WorkspaceSource::open(dir.path()).expect("open");
        source.write("src/lib.rs", "fn main() {}\n").expect("write");
        assert_eq!(source.read("src/lib.rs").expect("read"), "fn main() {}\n");
    }

    #[test]
    fn memory_source_overwrites() {
        let source = MemorySource::new([("a.txt", "one")]);
        source.write("a.txt", "two").expect("write");
        assert_eq!(source.read("a.txt").expect("read"), "two");
        assert!(source.read("b.txt").is_err());
    }
}
