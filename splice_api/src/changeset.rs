use serde::{Deserialize, Serialize};

use super::edit::EditOperation;

/// Edits targeting one file, anchored to the content they were proposed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEditBatch {
    /// Path of the file relative to the workspace root.
    pub file_path: String,
    /// Content the edits were proposed against.
    pub original_content: String,
    /// Edits in source order.
    #[serde(default)]
    pub edits: Vec<EditOperation>,
}

impl FileEditBatch {
    /// Create an empty batch.
    pub fn new(file_path: impl Into<String>, original_content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            original_content: original_content.into(),
            edits: Vec::new(),
        }
    }

    /// Append an edit, returning the batch for chaining.
    #[must_use]
    pub fn with_edit(mut self, edit: EditOperation) -> Self {
        self.edits.push(edit);
        self
    }
}

/// A coordinated change spanning several files, validated as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MultiFileChangeSet {
    /// Per-file batches.
    #[serde(default)]
    pub files: Vec<FileEditBatch>,
    /// Agent-provided summary of the change.
    #[serde(default)]
    pub summary: String,
    /// Dependency edges (`"a -> b"`) between files of the change set.
    #[serde(default)]
    pub dependency_edges_touched: Vec<String>,
}

impl MultiFileChangeSet {
    /// Create an empty change set.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Batch for `path`, if present.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileEditBatch> {
        self.files.iter().find(|batch| batch.file_path == path)
    }

    /// Total number of edits across all files.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.files.iter().map(|batch| batch.edits.len()).sum()
    }

    /// Paths of every file in the change set.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|batch| batch.file_path.as_str())
    }
}
