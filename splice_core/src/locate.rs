//! Translate canonical edit ranges into byte spans of a buffer.

use splice_api::EditOperation;

/// Byte span of a buffer an edit replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Inclusive byte offset.
    pub start: usize,
    /// Exclusive byte offset.
    pub end: usize,
}

/// Why a single edit could not be located in the current buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// Range start exceeds range end.
    #[error("edit range is inverted (start line {start_line} > end line {end_line})")]
    InvalidRange {
        /// Declared first line.
        start_line: u32,
        /// Declared last line.
        end_line: u32,
    },
    /// Line index falls outside of the buffer.
    #[error("line {line} is out of bounds for a buffer of {line_count} lines")]
    LineOutOfBounds {
        /// Requested line.
        line: u32,
        /// Lines in the buffer.
        line_count: u32,
    },
    /// Column index is invalid for the referenced line.
    #[error("column {column} on line {line} is out of bounds")]
    ColumnOutOfBounds {
        /// Requested line.
        line: u32,
        /// Requested column.
        column: u32,
    },
    /// The declared old text no longer matches the buffer.
    #[error("text at lines {start_line}-{end_line} no longer matches the expected old text")]
    OldTextMismatch {
        /// First line of the compared range.
        start_line: u32,
        /// Last line of the compared range.
        end_line: u32,
        /// Text the edit expected.
        expected: String,
        /// Text actually found.
        found: String,
    },
}

/// Line start offsets of a buffer.
#[derive(Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Index `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (index, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(index + 1);
            }
        }

        Self { text, line_starts }
    }

    /// Number of lines. A trailing newline does not open a new line.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        let count = if self.text.is_empty() || self.text.ends_with('\n') {
            self.line_starts.len() - 1
        } else {
            self.line_starts.len()
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn line_index(&self, line: u32) -> Result<usize, LocateError> {
        let line_count = self.line_count();
        if line == 0 || line > line_count {
            return Err(LocateError::LineOutOfBounds { line, line_count });
        }
        usize::try_from(line - 1).map_err(|_| LocateError::LineOutOfBounds { line, line_count })
    }

    /// Byte offset of the first character of `line`.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::LineOutOfBounds`] when `line` is not in the buffer.
    pub fn line_start(&self, line: u32) -> Result<usize, LocateError> {
        let index = self.line_index(line)?;
        Ok(self.line_starts[index])
    }

    /// Byte offset just past `line`'s content, excluding its newline.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::LineOutOfBounds`] when `line` is not in the buffer.
    pub fn content_end(&self, line: u32) -> Result<usize, LocateError> {
        let full_end = self.line_end(line)?;
        if self.text[..full_end].ends_with('\n') {
            Ok(full_end - 1)
        } else {
            Ok(full_end)
        }
    }

    /// Byte offset just past `line`, including its newline when present.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::LineOutOfBounds`] when `line` is not in the buffer.
    pub fn line_end(&self, line: u32) -> Result<usize, LocateError> {
        let index = self.line_index(line)?;
        Ok(self
            .line_starts
            .get(index + 1)
            .copied()
            .unwrap_or(self.text.len()))
    }

    /// Byte offset of the 1-based character `column` on `line`.
    ///
    /// The column just past the last character addresses the end of the line's
    /// content, and column 1 of the line after the last addresses the end of the
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error when the line or column is outside the buffer.
    pub fn offset(&self, line: u32, column: u32) -> Result<usize, LocateError> {
        if line == self.line_count().saturating_add(1) {
            return if column == 1 {
                Ok(self.text.len())
            } else {
                Err(LocateError::ColumnOutOfBounds { line, column })
            };
        }

        let start = self.line_start(line)?;
        let end = self.content_end(line)?;
        if column == 0 {
            return Err(LocateError::ColumnOutOfBounds { line, column });
        }

        let mut current = 1;
        for (offset, _) in self.text[start..end].char_indices() {
            if current == column {
                return Ok(start + offset);
            }
            current += 1;
        }

        if current == column {
            return Ok(end);
        }

        Err(LocateError::ColumnOutOfBounds { line, column })
    }

    /// Byte span `edit` addresses in the indexed buffer.
    ///
    /// Whole-line edits cover the lines' content and leave the final newline in
    /// place, except deletions (empty `new_text`), which also consume the line
    /// terminator.
    ///
    /// # Errors
    ///
    /// Returns an error when the range is inverted or leaves the buffer.
    pub fn span(&self, edit: &EditOperation) -> Result<Span, LocateError> {
        if edit.start_line > edit.end_line {
            return Err(LocateError::InvalidRange {
                start_line: edit.start_line,
                end_line: edit.end_line,
            });
        }

        if !edit.is_line_edit() {
            let start = self.offset(edit.start_line, edit.start_column.unwrap_or(1))?;
            let end = match edit.end_column {
                Some(column) => self.offset(edit.end_line, column)?,
                None => self.content_end(edit.end_line)?,
            };
            if start > end {
                return Err(LocateError::InvalidRange {
                    start_line: edit.start_line,
                    end_line: edit.end_line,
                });
            }
            return Ok(Span { start, end });
        }

        let mut start = self.line_start(edit.start_line)?;
        if !edit.new_text.is_empty() {
            let end = self.content_end(edit.end_line)?;
            return Ok(Span { start, end });
        }

        let end = self.line_end(edit.end_line)?;
        // The last line has no terminator of its own; take the previous one.
        if !self.text[..end].ends_with('\n') && start > 0 {
            start -= 1;
        }
        Ok(Span { start, end })
    }

    /// Text of lines `start..=end` without the final newline.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::LineOutOfBounds`] when either line is not in the buffer.
    pub fn lines_text(&self, start: u32, end: u32) -> Result<&'a str, LocateError> {
        let from = self.line_start(start)?;
        let to = self.content_end(end)?;
        Ok(&self.text[from..to.max(from)])
    }
}

/// Whitespace-insensitive comparison of two line blocks.
///
/// Both sides are split into lines and compared pairwise after trimming each
/// line. A single trailing newline on either side is ignored.
#[must_use]
pub fn texts_match(expected: &str, actual: &str) -> bool {
    let expected = normalize_lines(expected);
    let actual = normalize_lines(actual);
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(&actual)
            .all(|(left, right)| left == right)
}

fn normalize_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().map(str::trim).collect()
}

/// Check `edit.old_text` against the current text of its range.
///
/// Edits without `old_text` always pass.
///
/// # Errors
///
/// Returns [`LocateError::OldTextMismatch`] when the declared text differs
/// beyond whitespace, or a bounds error when the range leaves the buffer.
pub fn verify(index: &LineIndex<'_>, edit: &EditOperation, span: Span) -> Result<(), LocateError> {
    let Some(expected) = edit.old_text.as_deref() else {
        return Ok(());
    };

    let found = if edit.is_line_edit() {
        index.lines_text(edit.start_line, edit.end_line)?
    } else {
        &index.text[span.start..span.end]
    };

    if texts_match(expected, found) {
        Ok(())
    } else {
        Err(LocateError::OldTextMismatch {
            start_line: edit.start_line,
            end_line: edit.end_line,
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
    }
}

/// First window of `haystack` whose lines match `needle` line by line after trimming.
///
/// Returns the 1-based inclusive line range of the match. A needle made only of
/// whitespace never matches.
#[must_use]
pub fn find_block(haystack: &str, needle: &str) -> Option<(u32, u32)> {
    let wanted = normalize_lines(needle);
    if wanted.iter().all(|line| line.is_empty()) {
        return None;
    }

    let lines: Vec<&str> = haystack.lines().map(str::trim).collect();
    if wanted.len() > lines.len() {
        return None;
    }

    lines
        .windows(wanted.len())
        .position(|window| window == wanted.as_slice())
        .and_then(|index| {
            let start = u32::try_from(index + 1).ok()?;
            let len = u32::try_from(wanted.len()).ok()?;
            Some((start, start + len - 1))
        })
}
