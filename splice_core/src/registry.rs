//! Pending edits staged against the buffer of the file being edited.

use splice_api::{EditHighlight, EditOperation, EditStatus, PendingEdit};

use crate::apply::{apply_batch_with, apply_edit, ApplyOptions, ApplyReport};
use crate::locate::{LineIndex, LocateError};

/// Errors surfaced by [`PendingEdits`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No proposed edit carries the id; it may already be resolved.
    #[error("no pending edit with id {id}")]
    UnknownEdit {
        /// Requested id.
        id: String,
    },
    /// The edit could not be applied to the current buffer. It stays proposed.
    #[error("pending edit {id} could not be applied: {source}")]
    Apply {
        /// Edit id.
        id: String,
        /// Locator failure.
        #[source]
        source: LocateError,
    },
}

/// Proposed edits for one file, with the buffer they apply to.
///
/// Resolved edits leave the registry. Switching to another file discards
/// everything still proposed.
#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    file_path: Option<String>,
    buffer: String,
    entries: Vec<PendingEdit>,
    next_id: u64,
    options: ApplyOptions,
}

impl PendingEdits {
    /// Registry for `file_path` holding `buffer`.
    pub fn new(file_path: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            buffer: buffer.into(),
            ..Self::default()
        }
    }

    /// Use `options` for every accept.
    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// File the registry is scoped to.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Current buffer, including every accepted edit.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Proposed edits in staging order.
    #[must_use]
    pub fn pending(&self) -> &[PendingEdit] {
        &self.entries
    }

    /// Proposed edit with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PendingEdit> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Number of proposed edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is proposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranges and descriptions for the UI to highlight.
    #[must_use]
    pub fn highlights(&self) -> Vec<EditHighlight> {
        self.entries.iter().map(PendingEdit::highlight).collect()
    }

    /// Stage `edits` as proposed and return their ids.
    ///
    /// An edit keeps its own id unless it is missing or already taken, in
    /// which case a fresh `pending-<n>` id is assigned.
    pub fn stage(&mut self, edits: impl IntoIterator<Item = EditOperation>) -> Vec<String> {
        let mut ids = Vec::new();
        for edit in edits {
            let id = match edit.id.as_deref() {
                Some(id) if self.get(id).is_none() => id.to_owned(),
                _ => self.fresh_id(),
            };
            self.entries.push(PendingEdit::new(id.clone(), edit));
            ids.push(id);
        }
        tracing::debug!(staged = ids.len(), pending = self.entries.len(), "edits staged");
        ids
    }

    fn fresh_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("pending-{}", self.next_id);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Apply the edit `id` to the buffer and drop it from the registry.
    ///
    /// Proposed edits below the accepted range move by the number of lines
    /// the edit added or removed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEdit`] for an unknown id and
    /// [`RegistryError::Apply`] when the edit no longer fits the buffer.
    pub fn accept_one(&mut self, id: &str) -> Result<(), RegistryError> {
        let position = self.position(id)?;
        let operation = self.entries[position].operation.clone();

        let before = LineIndex::new(&self.buffer).line_count();
        apply_edit(&mut self.buffer, &operation, self.options).map_err(|source| {
            RegistryError::Apply {
                id: id.to_owned(),
                source,
            }
        })?;
        let after = LineIndex::new(&self.buffer).line_count();

        let mut entry = self.entries.remove(position);
        entry.resolve(EditStatus::Accepted);
        self.shift_below(&operation, i64::from(after) - i64::from(before));
        tracing::debug!(id, "pending edit accepted");
        Ok(())
    }

    /// Drop the edit `id` without touching the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEdit`] for an unknown id.
    pub fn reject_one(&mut self, id: &str) -> Result<(), RegistryError> {
        let position = self.position(id)?;
        let mut entry = self.entries.remove(position);
        entry.resolve(EditStatus::Rejected);
        tracing::debug!(id, "pending edit rejected");
        Ok(())
    }

    /// Apply every proposed edit as one batch, then clear the registry.
    ///
    /// Edits that fail to apply are reported and discarded with the rest.
    pub fn accept_all(&mut self) -> ApplyReport {
        let operations: Vec<EditOperation> = self
            .entries
            .drain(..)
            .map(|entry| entry.operation)
            .collect();
        let report = apply_batch_with(&self.buffer, &operations, self.options);
        self.buffer.clone_from(&report.buffer);
        tracing::debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "pending edits accepted"
        );
        report
    }

    /// Discard every proposed edit. Returns how many were dropped.
    pub fn reject_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Point the registry at another file, discarding every proposed edit.
    pub fn switch_file(&mut self, file_path: impl Into<String>, buffer: impl Into<String>) {
        let dropped = self.reject_all();
        if dropped > 0 {
            tracing::debug!(dropped, "pending edits discarded on file switch");
        }
        self.file_path = Some(file_path.into());
        self.buffer = buffer.into();
    }

    /// Replace the buffer, keeping the file and clearing proposed edits.
    pub fn reset_buffer(&mut self, buffer: impl Into<String>) {
        self.reject_all();
        self.buffer = buffer.into();
    }

    fn position(&self, id: &str) -> Result<usize, RegistryError> {
        self.entries
            .iter()
            .position(|entry| entry.id == id && entry.status == EditStatus::Proposed)
            .ok_or_else(|| RegistryError::UnknownEdit { id: id.to_owned() })
    }

    fn shift_below(&mut self, accepted: &EditOperation, delta: i64) {
        if delta == 0 {
            return;
        }
        for entry in &mut self.entries {
            let operation = &mut entry.operation;
            let below = if accepted.is_insertion() {
                operation.start_line >= accepted.start_line
            } else {
                operation.start_line > accepted.end_line
            };
            if below {
                operation.start_line = shifted(operation.start_line, delta);
                operation.end_line = shifted(operation.end_line, delta);
            }
        }
    }
}

fn shifted(line: u32, delta: i64) -> u32 {
    let moved = (i64::from(line) + delta).max(1);
    u32::try_from(moved).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_assigns_unique_ids() {
        let mut registry = PendingEdits::new("a.txt", "a\nb\n");
        let ids = registry.stage([
            EditOperation::new(1, 1, "A").with_id("edit-1"),
            EditOperation::new(2, 2, "B").with_id("edit-1"),
            EditOperation::new(2, 2, "b"),
        ]);
        assert_eq!(ids, ["edit-1", "pending-1", "pending-2"]);
    }

    #[test]
    fn accepting_shifts_edits_below() {
        let mut registry = PendingEdits::new("a.txt", "a\nb\nc\nd\n");
        let ids = registry.stage([
            EditOperation::new(1, 1, "a1\na2\na3"),
            EditOperation::new(3, 3, "C").with_old_text("c"),
        ]);
        registry.accept_one(&ids[0]).expect("accept first");
        assert_eq!(registry.highlights()[0].start_line, 5);
        registry.accept_one(&ids[1]).expect("accept second");
        assert_eq!(registry.buffer(), "a1\na2\na3\nb\nC\nd\n");
        assert!(registry.is_empty());
    }

    #[test]
    fn resolved_ids_are_unknown() {
        let mut registry = PendingEdits::new("a.txt", "a\n");
        let ids = registry.stage([EditOperation::new(1, 1, "A")]);
        registry.reject_one(&ids[0]).expect("reject");
        assert_eq!(
            registry.accept_one(&ids[0]),
            Err(RegistryError::UnknownEdit { id: ids[0].clone() })
        );
        assert_eq!(registry.buffer(), "a\n");
    }

    #[test]
    fn failed_accept_keeps_edit_proposed() {
        let mut registry = PendingEdits::new("a.txt", "a\n");
        let ids = registry.stage([EditOperation::new(1, 1, "X").with_old_text("zzz")]);
        assert!(matches!(
            registry.accept_one(&ids[0]),
            Err(RegistryError::Apply { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn switching_files_clears_pending_edits() {
        let mut registry = PendingEdits::new("a.txt", "a\n");
        registry.stage([EditOperation::new(1, 1, "A")]);
        registry.switch_file("b.txt", "b\n");
        assert!(registry.is_empty());
        assert_eq!(registry.file_path(), Some("b.txt"));
        assert_eq!(registry.accept_all().buffer, "b\n");
    }
}
