//! Apply or preview a multi-file change set as a unit.

use std::collections::BTreeMap;

use splice_api::{FileContext, MultiFileChangeSet};

use crate::apply::{apply_batch_with, ApplyOptions, ApplyReport};
use crate::deps::{build_dependency_graph, touched_edges};
use crate::preview::unified_patch;
use crate::source::{SourceError, SourceProvider};
use crate::validate::ensure_valid;
use crate::Result;

/// What a change set would do to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    /// Workspace-relative path.
    pub path: String,
    /// Unified diff from the original content to the edited buffer.
    pub patch: String,
    /// Per-edit outcome.
    pub report: ApplyReport,
}

/// Per-file outcome of [`apply_change_set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSetOutcome {
    /// Apply reports keyed by path.
    pub reports: BTreeMap<String, ApplyReport>,
    /// Paths whose content changed and was written.
    pub written: Vec<String>,
}

impl ChangeSetOutcome {
    /// Whether every edit in every file was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.reports.values().all(ApplyReport::is_complete)
    }

    /// Applied and skipped edit counts across all files.
    #[must_use]
    pub fn tally(&self) -> (usize, usize) {
        self.reports.values().fold((0, 0), |(ok, failed), report| {
            (ok + report.succeeded.len(), failed + report.failed.len())
        })
    }
}

/// Validate, apply, and write `change_set` through `source`.
///
/// Nothing is written unless the set has no conflicting edits and every file
/// still holds its `original_content`. Individual edits that fail to locate
/// are reported per file while the rest of that file's edits land. When a
/// write fails, files already written are restored to their original content
/// (a file the set created is left empty) before the error is returned.
///
/// # Errors
///
/// Returns [`crate::Error::Conflict`] for overlapping edits or a path shared
/// by several batches,
/// [`SourceError::Stale`] when a file changed since the set was built, and
/// any read or write failure of the source provider.
pub fn apply_change_set(
    change_set: &MultiFileChangeSet,
    source: &dyn SourceProvider,
    options: ApplyOptions,
) -> Result<ChangeSetOutcome> {
    ensure_valid(change_set)?;

    let mut current = Vec::with_capacity(change_set.files.len());
    for batch in &change_set.files {
        let text = match source.read(&batch.file_path) {
            Ok(text) => text,
            Err(SourceError::MissingFile { .. }) if batch.original_content.is_empty() => String::new(),
            Err(err) => return Err(err.into()),
        };
        if text != batch.original_content {
            tracing::warn!(path = %batch.file_path, "file changed since the edits were proposed");
            return Err(SourceError::Stale {
                path: batch.file_path.clone(),
            }
            .into());
        }
        current.push(text);
    }

    let mut outcome = ChangeSetOutcome::default();
    for (batch, text) in change_set.files.iter().zip(&current) {
        let report = apply_batch_with(text, &batch.edits, options);
        if report.buffer != *text {
            if let Err(err) = source.write(&batch.file_path, &report.buffer) {
                roll_back(change_set, &current, &outcome.written, source);
                return Err(err.into());
            }
            outcome.written.push(batch.file_path.clone());
        }
        outcome.reports.insert(batch.file_path.clone(), report);
    }

    let (applied, skipped) = outcome.tally();
    tracing::debug!(
        files = change_set.files.len(),
        written = outcome.written.len(),
        applied,
        skipped,
        "change set applied"
    );
    Ok(outcome)
}

/// Restore the files already written back to their original content.
fn roll_back(
    change_set: &MultiFileChangeSet,
    originals: &[String],
    written: &[String],
    source: &dyn SourceProvider,
) {
    for (batch, original) in change_set.files.iter().zip(originals) {
        if !written.contains(&batch.file_path) {
            continue;
        }
        match source.write(&batch.file_path, original) {
            Ok(()) => tracing::debug!(path = %batch.file_path, "write rolled back"),
            Err(err) => tracing::warn!(path = %batch.file_path, %err, "rollback failed"),
        }
    }
}

/// Validate `change_set` and preview it against each file's original content.
///
/// # Errors
///
/// Returns [`crate::Error::Conflict`] for overlapping edits and
/// [`crate::Error::Preview`] if a diff cannot be rendered.
pub fn dry_run(change_set: &MultiFileChangeSet, options: ApplyOptions) -> Result<Vec<FilePreview>> {
    ensure_valid(change_set)?;

    change_set
        .files
        .iter()
        .map(|batch| {
            let report = apply_batch_with(&batch.original_content, &batch.edits, options);
            let patch = unified_patch(&batch.file_path, &batch.original_content, &report.buffer)?;
            Ok(FilePreview {
                path: batch.file_path.clone(),
                patch,
                report,
            })
        })
        .collect()
}

/// Fill `dependency_edges_touched` from the dependency graph of `contexts`.
pub fn annotate_dependencies(
    change_set: &mut MultiFileChangeSet,
    contexts: &BTreeMap<String, FileContext>,
) {
    let graph = build_dependency_graph(contexts);
    change_set.dependency_edges_touched = touched_edges(&graph, change_set);
}
