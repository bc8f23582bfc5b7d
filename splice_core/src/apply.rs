//! Apply canonical edit batches to an in-memory buffer.

use std::cmp::Reverse;

use serde::Serialize;
use splice_api::EditOperation;

use crate::locate::{verify, LineIndex, LocateError};

/// Switches for the applier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Compare `old_text` against the buffer before replacing.
    pub verify_old_text: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            verify_old_text: true,
        }
    }
}

/// An edit the applier skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEdit {
    /// Edit id, or `#<index>` for edits without one.
    pub id: String,
    /// Why the edit could not be applied.
    pub reason: LocateError,
}

/// Outcome of one [`apply_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Buffer after every successful edit.
    pub buffer: String,
    /// Ids of applied edits, in input order.
    pub succeeded: Vec<String>,
    /// Skipped edits, in input order.
    pub failed: Vec<FailedEdit>,
}

impl ApplyReport {
    /// Whether every edit was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of skipped edits.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|failed| failed.id.as_str())
    }

    /// Serializable tally for UI surfaces.
    #[must_use]
    pub fn summary(&self) -> ApplySummary {
        ApplySummary {
            succeeded: self.succeeded.clone(),
            failed: self
                .failed
                .iter()
                .map(|failed| (failed.id.clone(), failed.reason.to_string()))
                .collect(),
        }
    }
}

/// Id tallies of an [`ApplyReport`] with failure reasons rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// Applied edit ids.
    pub succeeded: Vec<String>,
    /// Skipped edit ids with their reasons.
    pub failed: Vec<(String, String)>,
}

/// Apply `edits` to `buffer` with default options.
#[must_use]
pub fn apply_batch(buffer: &str, edits: &[EditOperation]) -> ApplyReport {
    apply_batch_with(buffer, edits, ApplyOptions::default())
}

/// Apply `edits` to `buffer`, bottom of the file first.
///
/// Edits are sorted by start line (then start column) descending so that an
/// edit changing the line count never shifts the lines of edits still waiting
/// above it. At the same start position, insertions go after the other edits
/// so a replacement there still sees its original text. Each edit is located against the buffer as left by the edits
/// already applied; an edit that cannot be located or whose old text no longer
/// matches is recorded as failed and the rest of the batch continues.
#[must_use]
pub fn apply_batch_with(buffer: &str, edits: &[EditOperation], options: ApplyOptions) -> ApplyReport {
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by_key(|&index| {
        let edit = &edits[index];
        (
            Reverse(edit.start_line),
            Reverse(edit.start_column.unwrap_or(1)),
            edit.is_insertion(),
        )
    });

    let mut working = buffer.to_owned();
    let mut outcomes: Vec<Option<LocateError>> = vec![None; edits.len()];
    for index in order {
        let edit = &edits[index];
        if let Err(reason) = apply_edit(&mut working, edit, options) {
            tracing::debug!(
                id = %edit_key(edit, index),
                start_line = edit.start_line,
                end_line = edit.end_line,
                %reason,
                "edit skipped"
            );
            outcomes[index] = Some(reason);
        }
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        let id = edit_key(&edits[index], index);
        match outcome {
            None => succeeded.push(id),
            Some(reason) => failed.push(FailedEdit { id, reason }),
        }
    }

    ApplyReport {
        buffer: working,
        succeeded,
        failed,
    }
}

/// Apply a single edit in place.
///
/// The buffer is untouched when an error is returned.
///
/// # Errors
///
/// Returns a [`LocateError`] when the range leaves the buffer or the declared
/// old text does not match.
pub fn apply_edit(
    buffer: &mut String,
    edit: &EditOperation,
    options: ApplyOptions,
) -> Result<(), LocateError> {
    let index = LineIndex::new(buffer);
    let span = index.span(edit)?;
    if options.verify_old_text && !edit.is_insertion() {
        verify(&index, edit, span)?;
    }

    let appending = span.start == buffer.len() && edit.start_line > index.line_count();
    let mut replacement = if edit.is_line_edit() {
        edit.new_text
            .strip_suffix('\n')
            .unwrap_or(edit.new_text.as_str())
            .to_owned()
    } else {
        edit.new_text.clone()
    };
    if appending && !buffer.is_empty() && !buffer.ends_with('\n') && !replacement.is_empty() {
        replacement.insert(0, '\n');
    }

    buffer.replace_range(span.start..span.end, &replacement);
    Ok(())
}

fn edit_key(edit: &EditOperation, index: usize) -> String {
    edit.id.clone().unwrap_or_else(|| format!("#{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_edit_replaces_inside_line() {
        let edit = EditOperation::new(1, 1, "bar")
            .with_columns(Some(5), Some(8))
            .with_old_text("foo");
        let report = apply_batch("let foo = 1;\n", &[edit]);
        assert_eq!(report.buffer, "let bar = 1;\n");
        assert!(report.is_complete());
    }

    #[test]
    fn insertion_appends_after_unterminated_last_line() {
        let report = apply_batch("a\nb", &[EditOperation::insertion(3, "c\n")]);
        assert_eq!(report.buffer, "a\nb\nc\n");
    }

    #[test]
    fn insertion_before_first_line() {
        let report = apply_batch("b\n", &[EditOperation::insertion(1, "a\n")]);
        assert_eq!(report.buffer, "a\nb\n");
    }

    #[test]
    fn trailing_newline_of_replacement_is_not_doubled() {
        let report = apply_batch("a\nb\nc\n", &[EditOperation::new(2, 2, "B\n")]);
        assert_eq!(report.buffer, "a\nB\nc\n");
    }

    #[test]
    fn verification_can_be_disabled() {
        let edit = EditOperation::new(1, 1, "X").with_old_text("zzz");
        let strict = apply_batch("a\n", std::slice::from_ref(&edit));
        assert_eq!(strict.failed_ids().collect::<Vec<_>>(), ["#0"]);

        let lenient = apply_batch_with(
            "a\n",
            &[edit],
            ApplyOptions {
                verify_old_text: false,
            },
        );
        assert_eq!(lenient.buffer, "X\n");
    }
}
