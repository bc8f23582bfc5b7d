use serde::{Deserialize, Serialize};

/// Canonical edit produced by every wire encoding.
///
/// Lines are 1-based and inclusive. Columns are 1-based character columns;
/// `start_column` is inclusive and `end_column` exclusive. When both columns
/// are omitted the edit replaces whole lines.
///
/// `old_text` is the author's transcription of the replaced text. It is
/// advisory: the locator verifies it against the buffer before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    /// Identifier assigned by the decoder or the pending-edit registry.
    #[serde(default)]
    pub id: Option<String>,
    /// Target file when the encoding names one.
    #[serde(default)]
    pub file_name: Option<String>,
    /// First line of the replaced range.
    pub start_line: u32,
    /// Last line of the replaced range (inclusive).
    pub end_line: u32,
    /// Optional inclusive start column on `start_line`.
    #[serde(default)]
    pub start_column: Option<u32>,
    /// Optional exclusive end column on `end_line`.
    #[serde(default)]
    pub end_column: Option<u32>,
    /// Expected current text of the range.
    #[serde(default)]
    pub old_text: Option<String>,
    /// Replacement text.
    #[serde(default)]
    pub new_text: String,
    /// Human-readable summary of the change.
    #[serde(default)]
    pub description: Option<String>,
}

impl EditOperation {
    /// Whole-line replacement of `start_line..=end_line`.
    ///
    /// The range is normalized so that `start_line <= end_line` and both are at least 1.
    pub fn new(start_line: u32, end_line: u32, new_text: impl Into<String>) -> Self {
        let start = start_line.min(end_line).max(1);
        let end = start_line.max(end_line).max(1);
        Self {
            id: None,
            file_name: None,
            start_line: start,
            end_line: end,
            start_column: None,
            end_column: None,
            old_text: None,
            new_text: new_text.into(),
            description: None,
        }
    }

    /// Zero-width insertion at the start of `line`.
    ///
    /// `line` may be one past the last line to append at the end of the buffer.
    pub fn insertion(line: u32, text: impl Into<String>) -> Self {
        Self::new(line, line, text).with_columns(Some(1), Some(1))
    }

    /// Attach the expected current text of the range.
    #[must_use]
    pub fn with_old_text(mut self, old_text: impl Into<String>) -> Self {
        self.old_text = Some(old_text.into());
        self
    }

    /// Attach column bounds.
    #[must_use]
    pub fn with_columns(mut self, start: Option<u32>, end: Option<u32>) -> Self {
        self.start_column = start;
        self.end_column = end;
        self
    }

    /// Attach an identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the target file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the edit targets whole lines.
    #[must_use]
    pub const fn is_line_edit(&self) -> bool {
        self.start_column.is_none() && self.end_column.is_none()
    }

    /// Whether the edit is a zero-width insertion.
    #[must_use]
    pub fn is_insertion(&self) -> bool {
        self.start_line == self.end_line
            && self.start_column.is_some()
            && self.start_column == self.end_column
    }

    /// Inclusive line range.
    #[must_use]
    pub const fn line_range(&self) -> (u32, u32) {
        (self.start_line, self.end_line)
    }

    /// Two ranges overlap when either start lies inside the other's inclusive span.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        let (a_start, a_end) = self.line_range();
        let (b_start, b_end) = other.line_range();
        (a_start >= b_start && a_start <= b_end) || (b_start >= a_start && b_start <= a_end)
    }
}

/// Wire encodings an agent may use to express edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditEncoding {
    /// A data block with an `edits` array.
    #[default]
    Structured,
    /// `@@ -a,b +c,d @@` hunks.
    UnifiedDiff,
    /// `<<<<<<< SEARCH` / `=======` / `>>>>>>> REPLACE` blocks.
    SearchReplace,
}

impl EditEncoding {
    /// Every encoding, in the default decode order.
    pub const ALL: [Self; 3] = [Self::Structured, Self::SearchReplace, Self::UnifiedDiff];

    /// Stable identifier used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::UnifiedDiff => "unified_diff",
            Self::SearchReplace => "search_replace",
        }
    }

    /// Parse a configuration identifier, accepting a few common spellings.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "structured" | "json" => Some(Self::Structured),
            "unified_diff" | "diff" | "udiff" => Some(Self::UnifiedDiff),
            "search_replace" | "searchreplace" | "sr" => Some(Self::SearchReplace),
            _ => None,
        }
    }
}

/// Lifecycle state of a staged edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    /// Awaiting a decision from the UI.
    #[default]
    Proposed,
    /// Applied to the buffer.
    Accepted,
    /// Discarded without touching the buffer.
    Rejected,
}

impl EditStatus {
    /// Accepted and rejected edits never change state again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Proposed)
    }
}

/// An edit staged for review, identified within the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
    /// Session-unique identifier.
    pub id: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub status: EditStatus,
    /// The staged operation.
    pub operation: EditOperation,
}

impl PendingEdit {
    /// Stage an operation under `id`.
    pub fn new(id: impl Into<String>, operation: EditOperation) -> Self {
        let id = id.into();
        let operation = EditOperation {
            id: Some(id.clone()),
            ..operation
        };
        Self {
            id,
            status: EditStatus::Proposed,
            operation,
        }
    }

    /// Move a proposed edit into a terminal state.
    ///
    /// Returns `false` and leaves the edit untouched when it has already been
    /// resolved or when `status` is [`EditStatus::Proposed`].
    pub fn resolve(&mut self, status: EditStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Range and description handed to the UI for highlighting.
    #[must_use]
    pub fn highlight(&self) -> EditHighlight {
        EditHighlight {
            id: self.id.clone(),
            start_line: self.operation.start_line,
            end_line: self.operation.end_line,
            description: self.operation.description.clone(),
        }
    }
}

/// UI projection of a pending edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditHighlight {
    /// Identifier of the pending edit.
    pub id: String,
    /// First highlighted line.
    pub start_line: u32,
    /// Last highlighted line (inclusive).
    pub end_line: u32,
    /// Optional hover text.
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_normalizes_range() {
        let edit = EditOperation::new(7, 3, "x");
        assert_eq!(edit.line_range(), (3, 7));
        assert_eq!(EditOperation::new(0, 0, "").line_range(), (1, 1));
    }

    #[test]
    fn overlap_is_symmetric_and_inclusive() {
        let a = EditOperation::new(1, 5, "");
        let b = EditOperation::new(3, 8, "");
        let c = EditOperation::new(6, 10, "");
        let d = EditOperation::new(5, 5, "");
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c) && !c.overlaps(&a));
        assert!(a.overlaps(&d) && d.overlaps(&a));
    }

    #[test]
    fn insertion_is_zero_width() {
        let edit = EditOperation::insertion(4, "new\n");
        assert!(edit.is_insertion());
        assert!(!edit.is_line_edit());
        assert!(EditOperation::new(4, 4, "x").is_line_edit());
    }

    #[test]
    fn pending_edit_resolves_once() {
        let mut pending = PendingEdit::new("p-1", EditOperation::new(2, 2, "B"));
        assert_eq!(pending.operation.id.as_deref(), Some("p-1"));
        assert!(!pending.resolve(EditStatus::Proposed));
        assert!(pending.resolve(EditStatus::Rejected));
        assert!(!pending.resolve(EditStatus::Accepted));
        assert_eq!(pending.status, EditStatus::Rejected);
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!(EditEncoding::from_name("search-replace"), Some(EditEncoding::SearchReplace));
        assert_eq!(EditEncoding::from_name(" Diff "), Some(EditEncoding::UnifiedDiff));
        assert_eq!(EditEncoding::from_name("xml"), None);
        for encoding in EditEncoding::ALL {
            assert_eq!(EditEncoding::from_name(encoding.as_str()), Some(encoding));
        }
    }

    #[test]
    fn status_uses_snake_case() {
        let json = serde_json::to_string(&EditStatus::Accepted).expect("serialize status");
        assert_eq!(json, "\"accepted\"");
    }
}
