//! Reject change sets whose edits overlap within a file.

use serde::Serialize;
use splice_api::{EditOperation, MultiFileChangeSet};

/// Two edits of one file whose line ranges intersect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// File both edits target.
    pub file_path: String,
    /// Range of the earlier edit for the file.
    pub first: (u32, u32),
    /// Range of the later edit for the file.
    pub second: (u32, u32),
}

impl Conflict {
    fn describe(&self) -> String {
        format!(
            "{}: edit at lines {}-{} overlaps edit at lines {}-{}",
            self.file_path, self.first.0, self.first.1, self.second.0, self.second.1
        )
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// `true` when no conflicts were found.
    pub valid: bool,
    /// One human-readable message per conflict.
    pub errors: Vec<String>,
    /// Structured conflicts, in discovery order.
    pub conflicts: Vec<Conflict>,
    /// Paths targeted by more than one batch.
    pub duplicate_paths: Vec<String>,
}

/// Change set rejected because of overlapping edits or shared paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("change set has {} conflict(s): {}", errors.len(), errors.join("; "))]
pub struct ConflictError {
    /// One message per conflict.
    pub errors: Vec<String>,
}

/// Check every pair of edits within each file for overlapping line ranges.
///
/// Ranges are inclusive on both ends, so edits at `[1, 5]` and `[5, 8]`
/// conflict while `[1, 5]` and `[6, 10]` do not. Edits in different files
/// never conflict. Batches sharing a path are checked as one file, and the
/// shared path is itself reported since each batch would be applied to the
/// same original.
#[must_use]
pub fn validate(change_set: &MultiFileChangeSet) -> ValidationReport {
    let mut by_path: Vec<(&str, Vec<&EditOperation>)> = Vec::new();
    let mut duplicate_paths = Vec::new();
    for batch in &change_set.files {
        match by_path.iter_mut().find(|(path, _)| *path == batch.file_path) {
            Some((_, edits)) => {
                if !duplicate_paths.contains(&batch.file_path) {
                    duplicate_paths.push(batch.file_path.clone());
                }
                edits.extend(&batch.edits);
            }
            None => by_path.push((batch.file_path.as_str(), batch.edits.iter().collect())),
        }
    }

    let mut conflicts = Vec::new();
    for (path, edits) in &by_path {
        for (index, first) in edits.iter().enumerate() {
            for second in &edits[index + 1..] {
                if first.overlaps(second) {
                    conflicts.push(Conflict {
                        file_path: (*path).to_owned(),
                        first: first.line_range(),
                        second: second.line_range(),
                    });
                }
            }
        }
    }

    let errors: Vec<String> = duplicate_paths
        .iter()
        .map(|path| format!("{path}: appears in more than one batch"))
        .chain(conflicts.iter().map(Conflict::describe))
        .collect();
    for error in &errors {
        tracing::warn!(%error, "conflicting edits");
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        conflicts,
        duplicate_paths,
    }
}

/// Like [`validate`], but as a `Result`.
///
/// # Errors
///
/// Returns a [`ConflictError`] listing every conflict when the set is invalid.
pub fn ensure_valid(change_set: &MultiFileChangeSet) -> Result<(), ConflictError> {
    let report = validate(change_set);
    if report.valid {
        Ok(())
    } else {
        Err(ConflictError {
            errors: report.errors,
        })
    }
}
