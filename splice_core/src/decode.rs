//! Decode agent responses into canonical edit operations.
//!
//! Three encodings are understood: a structured block with an `edits` array,
//! unified-diff hunks, and search/replace blocks. Individual malformed items
//! are skipped; only a response that fits no encoding at all is an error.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use splice_api::{EditEncoding, EditOperation, FileEditBatch, MultiFileChangeSet};

use crate::locate::find_block;

const SEARCH_MARKER: &str = "<<<<<<<";
const DIVIDER_MARKER: &str = "=======";
const REPLACE_MARKER: &str = ">>>>>>>";

#[allow(clippy::expect_used)]
static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@+\s+-(?P<old_start>\d+)(?:,(?P<old_count>\d+))?\s+\+(?P<new_start>\d+)(?:,(?P<new_count>\d+))?\s+@@+")
        .expect("hunk header pattern is valid")
});

#[allow(clippy::expect_used)]
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(?P<body>.*?)```").expect("fence pattern is valid")
});

/// Errors surfaced while decoding an agent response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No supported encoding could be decoded. The response is kept for display.
    #[error("could not understand the agent response")]
    Unrecognized {
        /// Response text as received.
        response: String,
    },
    /// The structured block is not well-formed.
    #[error("structured edit block is malformed: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
    /// The structured block has no `edits` list.
    #[error("structured edit block has no `edits` list")]
    MissingEdits,
    /// The response carries none of the encoding's markers.
    #[error("response contains no {} markers", encoding.as_str())]
    NotPresent {
        /// Encoding that was attempted.
        encoding: EditEncoding,
    },
}

/// Edits decoded from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Encoding the response was decoded as.
    pub encoding: EditEncoding,
    /// Edits in the order they appear in the response.
    pub edits: Vec<EditOperation>,
    /// Summary carried by the structured encoding.
    pub summary: Option<String>,
}

/// Decode `response` against `original`, trying every encoding in the default order.
///
/// # Errors
///
/// Returns [`DecodeError::Unrecognized`] when no encoding applies.
pub fn decode(response: &str, original: &str) -> Result<Decoded, DecodeError> {
    decode_in_order(response, original, &EditEncoding::ALL)
}

/// Decode `response`, trying `order` and keeping the first encoding that applies.
///
/// # Errors
///
/// Returns [`DecodeError::Unrecognized`] when no encoding applies.
pub fn decode_in_order(
    response: &str,
    original: &str,
    order: &[EditEncoding],
) -> Result<Decoded, DecodeError> {
    for &encoding in order {
        match decode_as(encoding, response, original) {
            Ok(decoded) => return Ok(decoded),
            Err(err) => {
                tracing::debug!(encoding = encoding.as_str(), %err, "encoding did not apply");
            }
        }
    }
    Err(DecodeError::Unrecognized {
        response: response.to_owned(),
    })
}

/// Decode `response` as one specific encoding.
///
/// Search/replace blocks whose search text is not found in `original` are
/// dropped, so a response of only stale blocks decodes to zero edits.
///
/// # Errors
///
/// Returns [`DecodeError::NotPresent`] when the response has none of the
/// encoding's markers, and [`DecodeError::Malformed`] or
/// [`DecodeError::MissingEdits`] for an unusable structured block.
pub fn decode_as(
    encoding: EditEncoding,
    response: &str,
    original: &str,
) -> Result<Decoded, DecodeError> {
    let (edits, summary) = match encoding {
        EditEncoding::Structured => decode_structured(response)?,
        EditEncoding::UnifiedDiff => (decode_unified_diff(response)?, None),
        EditEncoding::SearchReplace => {
            let blocks = parse_search_replace(response)?;
            let edits = blocks
                .into_iter()
                .filter_map(|block| block.locate(original))
                .collect();
            (edits, None)
        }
    };

    Ok(Decoded {
        encoding,
        edits: assign_ids(edits),
        summary,
    })
}

/// Decode a response that may touch several files into a change set.
///
/// `originals` maps workspace paths to the content the agent saw. Edits are
/// routed by the file name the encoding carries; when only one file is known,
/// unnamed edits go to it. Edits for unknown files are dropped.
///
/// # Errors
///
/// Returns [`DecodeError::Unrecognized`] when no encoding applies.
pub fn decode_change_set(
    response: &str,
    originals: &BTreeMap<String, String>,
    order: &[EditEncoding],
) -> Result<MultiFileChangeSet, DecodeError> {
    let mut decoded = None;
    for &encoding in order {
        let attempt = match encoding {
            EditEncoding::Structured => decode_structured(response),
            EditEncoding::UnifiedDiff => decode_unified_diff(response).map(|edits| (edits, None)),
            EditEncoding::SearchReplace => parse_search_replace(response).map(|blocks| {
                let edits = blocks
                    .into_iter()
                    .filter_map(|block| locate_in_files(block, originals))
                    .collect();
                (edits, None)
            }),
        };
        match attempt {
            Ok(result) => {
                decoded = Some(result);
                break;
            }
            Err(err) => tracing::debug!(encoding = encoding.as_str(), %err, "encoding did not apply"),
        }
    }

    let Some((edits, summary)) = decoded else {
        return Err(DecodeError::Unrecognized {
            response: response.to_owned(),
        });
    };

    let mut grouped: BTreeMap<String, Vec<EditOperation>> = BTreeMap::new();
    for edit in assign_ids(edits) {
        match route(edit.file_name.as_deref(), originals) {
            Some(path) => grouped.entry(path.to_owned()).or_default().push(edit),
            None => tracing::warn!(
                file = edit.file_name.as_deref().unwrap_or("-"),
                "dropping edit for a file outside the change set"
            ),
        }
    }

    let mut set = MultiFileChangeSet::new(summary.unwrap_or_default());
    for (path, edits) in grouped {
        let original = originals.get(&path).cloned().unwrap_or_default();
        let mut batch = FileEditBatch::new(path, original);
        batch.edits = edits;
        set.files.push(batch);
    }
    Ok(set)
}

fn assign_ids(edits: Vec<EditOperation>) -> Vec<EditOperation> {
    edits
        .into_iter()
        .enumerate()
        .map(|(index, edit)| {
            if edit.id.is_some() {
                edit
            } else {
                edit.with_id(format!("edit-{}", index + 1))
            }
        })
        .collect()
}

fn route<'a>(file_name: Option<&str>, originals: &'a BTreeMap<String, String>) -> Option<&'a str> {
    let Some(name) = file_name.map(normalize_path) else {
        return if originals.len() == 1 {
            originals.keys().next().map(String::as_str)
        } else {
            None
        };
    };

    if let Some((path, _)) = originals.get_key_value(name) {
        return Some(path.as_str());
    }
    let mut suffix_matches = originals.keys().filter(|path| {
        path.ends_with(name) && path[..path.len() - name.len()].ends_with('/')
    });
    match (suffix_matches.next(), suffix_matches.next()) {
        (Some(path), None) => Some(path.as_str()),
        _ => None,
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.trim().trim_matches('`');
    path.strip_prefix("./").unwrap_or(path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn insertion_text(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

// ---- structured ------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEdit {
    #[serde(default, alias = "file_name", alias = "file", alias = "path")]
    file_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "start_line")]
    start_line: Option<u32>,
    #[serde(default, alias = "end_line")]
    end_line: Option<u32>,
    #[serde(default, alias = "start_column")]
    start_column: Option<u32>,
    #[serde(default, alias = "end_column")]
    end_column: Option<u32>,
    #[serde(default, alias = "old_text")]
    old_text: Option<String>,
    #[serde(default, alias = "new_text")]
    new_text: Option<String>,
    #[serde(default, alias = "old_start")]
    old_start: Option<u32>,
    #[serde(default, alias = "old_lines")]
    old_lines: Option<u32>,
    #[serde(default, alias = "old_code")]
    old_code: Option<String>,
    #[serde(default, alias = "new_code")]
    new_code: Option<String>,
}

impl RawEdit {
    fn into_operation(self) -> Option<EditOperation> {
        let new_text = self.new_text.or(self.new_code).unwrap_or_default();
        let old_text = non_empty(self.old_text.or(self.old_code));

        let mut edit = if let Some(start) = self.start_line {
            EditOperation::new(start, self.end_line.unwrap_or(start), new_text)
                .with_columns(self.start_column, self.end_column)
        } else if let Some(start) = self.old_start {
            match self.old_lines.unwrap_or(1) {
                0 => EditOperation::insertion(start.checked_add(1)?, insertion_text(new_text)),
                count => EditOperation::new(start, start.checked_add(count - 1)?, new_text),
            }
        } else {
            return None;
        };

        edit.old_text = old_text;
        edit.file_name = non_empty(self.file_name);
        edit.description = non_empty(self.description);
        Some(edit)
    }
}

fn structured_candidates(response: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = FENCED_BLOCK
        .captures_iter(response)
        .filter_map(|captures| captures.name("body"))
        .map(|body| body.as_str())
        .collect();
    candidates.push(response.trim());
    if let (Some(open), Some(close)) = (response.find('{'), response.rfind('}')) {
        if open < close {
            candidates.push(&response[open..=close]);
        }
    }
    candidates
}

fn decode_structured(response: &str) -> Result<(Vec<EditOperation>, Option<String>), DecodeError> {
    let mut last_error = None;
    let mut document = None;
    for candidate in structured_candidates(response) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => {
                document = Some(value);
                break;
            }
            Ok(_) => {}
            Err(err) => last_error = Some(err.to_string()),
        }
    }

    let Some(mut document) = document else {
        return Err(match last_error {
            Some(message) if response.contains('{') => DecodeError::Malformed { message },
            _ => DecodeError::NotPresent {
                encoding: EditEncoding::Structured,
            },
        });
    };

    let summary = document
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .filter(|summary| !summary.trim().is_empty());
    let Some(Value::Array(items)) = document.get_mut("edits").map(Value::take) else {
        return Err(DecodeError::MissingEdits);
    };

    let mut edits = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawEdit>(item) {
            Ok(raw) => match raw.into_operation() {
                Some(edit) => edits.push(edit),
                None => tracing::warn!(index, "structured edit has no usable line range; skipped"),
            },
            Err(err) => tracing::warn!(index, %err, "malformed structured edit skipped"),
        }
    }
    Ok((edits, summary))
}

// ---- unified diff ----------------------------------------------------------

#[derive(Debug)]
enum DiffLine {
    Context(String),
    Removed(String),
    Added(String),
}

#[derive(Debug)]
struct Hunk {
    file_name: Option<String>,
    old_start: u32,
    old_count: u32,
    lines: Vec<DiffLine>,
}

impl Hunk {
    fn into_operation(self) -> Option<EditOperation> {
        let leading = self
            .lines
            .iter()
            .take_while(|line| matches!(line, DiffLine::Context(_)))
            .count();
        if leading == self.lines.len() {
            return None;
        }
        let trailing = self
            .lines
            .iter()
            .rev()
            .take_while(|line| matches!(line, DiffLine::Context(_)))
            .count();
        let body = &self.lines[leading..self.lines.len() - trailing];

        let mut old_lines = Vec::new();
        let mut new_lines = Vec::new();
        for line in body {
            match line {
                DiffLine::Context(text) => {
                    old_lines.push(text.as_str());
                    new_lines.push(text.as_str());
                }
                DiffLine::Removed(text) => old_lines.push(text.as_str()),
                DiffLine::Added(text) => new_lines.push(text.as_str()),
            }
        }

        let Some((start, end)) = self.target_range(leading, old_lines.len()) else {
            tracing::warn!(old_start = self.old_start, "hunk range out of bounds; skipped");
            return None;
        };
        let new_text = new_lines.join("\n");
        let mut edit = match end {
            None => EditOperation::insertion(start, insertion_text(new_text)),
            Some(end) => {
                EditOperation::new(start, end, new_text).with_old_text(old_lines.join("\n"))
            }
        };
        edit.file_name = self.file_name;
        Some(edit)
    }

    /// Lines the hunk body covers, with no end line for a pure insertion.
    fn target_range(&self, leading: usize, carried: usize) -> Option<(u32, Option<u32>)> {
        let leading = u32::try_from(leading).ok()?;
        if self.old_count == 0 {
            return Some((self.old_start.checked_add(1)?, None));
        }
        if carried == 0 {
            return Some((self.old_start.checked_add(leading)?, None));
        }
        let start = self.old_start.max(1).checked_add(leading)?;
        let carried = u32::try_from(carried).ok()?;
        Some((start, Some(start.checked_add(carried - 1)?)))
    }
}

fn diff_path(header: &str) -> Option<String> {
    let path = header.split('\t').next()?.trim();
    if path == "/dev/null" {
        return None;
    }
    let path = path
        .strip_prefix("b/")
        .or_else(|| path.strip_prefix("a/"))
        .unwrap_or(path);
    Some(path.to_owned())
}

fn decode_unified_diff(response: &str) -> Result<Vec<EditOperation>, DecodeError> {
    let lines: Vec<&str> = response.lines().collect();
    let mut edits = Vec::new();
    let mut file_name: Option<String> = None;
    let mut hunk: Option<Hunk> = None;
    let mut saw_header = false;

    for (index, line) in lines.iter().enumerate() {
        if let Some(captures) = HUNK_HEADER.captures(line) {
            finish(&mut hunk, &mut edits);
            saw_header = true;
            let number = |name: &str, default: u32| {
                captures
                    .name(name)
                    .and_then(|value| value.as_str().parse::<u32>().ok())
                    .unwrap_or(default)
            };
            hunk = Some(Hunk {
                file_name: file_name.clone(),
                old_start: number("old_start", 1),
                old_count: number("old_count", 1),
                lines: Vec::new(),
            });
            continue;
        }

        let next_is_new_path = lines.get(index + 1).is_some_and(|next| next.starts_with("+++ "));
        if line.starts_with("diff --git ") || (line.starts_with("--- ") && next_is_new_path) {
            finish(&mut hunk, &mut edits);
            continue;
        }
        if let Some(path) = line.strip_prefix("+++ ") {
            if hunk.is_none() {
                file_name = diff_path(path);
                continue;
            }
        }
        if line.starts_with('\\') {
            continue;
        }
        if line.trim_start().starts_with("```") {
            finish(&mut hunk, &mut edits);
            continue;
        }

        let Some(current) = hunk.as_mut() else {
            continue;
        };
        let parsed = if let Some(text) = line.strip_prefix('-') {
            DiffLine::Removed(text.to_owned())
        } else if let Some(text) = line.strip_prefix('+') {
            DiffLine::Added(text.to_owned())
        } else {
            DiffLine::Context(line.strip_prefix(' ').unwrap_or(line).to_owned())
        };
        current.lines.push(parsed);
    }
    finish(&mut hunk, &mut edits);

    if saw_header {
        Ok(edits)
    } else {
        Err(DecodeError::NotPresent {
            encoding: EditEncoding::UnifiedDiff,
        })
    }
}

fn finish(hunk: &mut Option<Hunk>, edits: &mut Vec<EditOperation>) {
    let Some(done) = hunk.take() else {
        return;
    };
    let old_start = done.old_start;
    match done.into_operation() {
        Some(edit) => edits.push(edit),
        None => tracing::debug!(old_start, "hunk skipped"),
    }
}

// ---- search/replace --------------------------------------------------------

#[derive(Debug, Default)]
struct SearchReplaceBlock {
    file_name: Option<String>,
    search: Vec<String>,
    replace: Vec<String>,
}

impl SearchReplaceBlock {
    fn search_text(&self) -> String {
        self.search.join("\n")
    }

    fn replace_text(&self) -> String {
        self.replace.join("\n")
    }

    /// Locate the block in `original`: first by trimmed line windows, then as a
    /// literal substring for spans that do not start and end on line bounds.
    fn locate(self, original: &str) -> Option<EditOperation> {
        let search = self.search_text();
        let replace = self.replace_text();

        let edit = if search.trim().is_empty() {
            if original.trim().is_empty() {
                EditOperation::insertion(1, insertion_text(replace))
            } else {
                tracing::debug!("search/replace block with empty search text dropped");
                return None;
            }
        } else if let Some((start, end)) = find_block(original, &search) {
            EditOperation::new(start, end, replace).with_old_text(search)
        } else if let Some(offset) = original.find(&search) {
            let (start_line, start_column) = line_column(original, offset);
            let (end_line, end_column) = line_column(original, offset + search.len());
            EditOperation::new(start_line, end_line, replace)
                .with_columns(Some(start_column), Some(end_column))
                .with_old_text(search)
        } else {
            tracing::debug!(
                search = %search.lines().next().unwrap_or_default(),
                "search text not found; block dropped"
            );
            return None;
        };

        Some(match self.file_name {
            Some(file_name) => edit.with_file_name(file_name),
            None => edit,
        })
    }
}

fn line_column(text: &str, offset: usize) -> (u32, u32) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = before[line_start..].chars().count() + 1;
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

fn locate_in_files(
    block: SearchReplaceBlock,
    originals: &BTreeMap<String, String>,
) -> Option<EditOperation> {
    if let Some(path) = route(block.file_name.as_deref(), originals) {
        let original = originals.get(path)?;
        let path = path.to_owned();
        return block.locate(original).map(|edit| edit.with_file_name(path));
    }
    if block.file_name.is_some() {
        tracing::debug!(file = ?block.file_name, "search/replace block names an unknown file");
        return None;
    }

    let search = block.search_text();
    let (path, original) = originals
        .iter()
        .find(|(_, content)| find_block(content, &search).is_some() || content.contains(&search))?;
    let path = path.clone();
    block.locate(original).map(|edit| edit.with_file_name(path))
}

fn path_hint(line: &str) -> Option<String> {
    let candidate = line
        .trim()
        .trim_start_matches(['#', '*', '>'])
        .trim()
        .trim_start_matches("File:")
        .trim_start_matches("file:")
        .trim()
        .trim_matches(['`', '*', ':'])
        .trim();
    let looks_like_path = !candidate.is_empty()
        && !candidate.contains(char::is_whitespace)
        && (candidate.contains('.') || candidate.contains('/'))
        && !candidate.starts_with("```");
    looks_like_path.then(|| candidate.to_owned())
}

fn parse_search_replace(response: &str) -> Result<Vec<SearchReplaceBlock>, DecodeError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum State {
        Outside,
        Search,
        Replace,
    }

    let mut state = State::Outside;
    let mut blocks = Vec::new();
    let mut current = SearchReplaceBlock::default();
    let mut last_text_line: Option<&str> = None;
    let mut saw_marker = false;

    for line in response.lines() {
        let trimmed = line.trim();
        match state {
            State::Outside => {
                if trimmed.starts_with(SEARCH_MARKER) && trimmed.contains("SEARCH") {
                    saw_marker = true;
                    state = State::Search;
                    current = SearchReplaceBlock {
                        file_name: last_text_line.and_then(path_hint),
                        ..SearchReplaceBlock::default()
                    };
                } else if !trimmed.is_empty() && !trimmed.starts_with("```") {
                    last_text_line = Some(trimmed);
                }
            }
            State::Search => {
                if trimmed.starts_with(DIVIDER_MARKER) && trimmed.trim_matches('=').is_empty() {
                    state = State::Replace;
                } else {
                    current.search.push(line.to_owned());
                }
            }
            State::Replace => {
                if trimmed.starts_with(REPLACE_MARKER) {
                    blocks.push(std::mem::take(&mut current));
                    state = State::Outside;
                    last_text_line = None;
                } else {
                    current.replace.push(line.to_owned());
                }
            }
        }
    }

    if state != State::Outside {
        tracing::debug!("unterminated search/replace block dropped");
    }
    if saw_marker {
        Ok(blocks)
    } else {
        Err(DecodeError::NotPresent {
            encoding: EditEncoding::SearchReplace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_accepts_both_item_shapes() {
        let response = r#"Here you go:
```json
{
  "summary": "rename",
  "edits": [
    { "startLine": 2, "endLine": 2, "oldText": "b", "newText": "B" },
    { "fileName": "src/a.ts", "description": "add", "oldStart": 3, "oldLines": 0,
      "newStart": 4, "newLines": 1, "oldCode": "", "newCode": "d" },
    { "newText": "no range" },
    "garbage"
  ]
}
```"#;
        let decoded = decode_as(EditEncoding::Structured, response, "").expect("decode");
        assert_eq!(decoded.summary.as_deref(), Some("rename"));
        assert_eq!(decoded.edits.len(), 2);

        let first = &decoded.edits[0];
        assert_eq!(first.id.as_deref(), Some("edit-1"));
        assert_eq!((first.start_line, first.end_line), (2, 2));
        assert_eq!(first.old_text.as_deref(), Some("b"));

        let second = &decoded.edits[1];
        assert!(second.is_insertion());
        assert_eq!(second.start_line, 4);
        assert_eq!(second.new_text, "d\n");
        assert_eq!(second.old_text, None);
        assert_eq!(second.file_name.as_deref(), Some("src/a.ts"));
    }

    #[test]
    fn structured_without_edits_list_is_an_error() {
        let err = decode_as(EditEncoding::Structured, r#"{"changes": []}"#, "").expect_err("missing");
        assert_eq!(err, DecodeError::MissingEdits);
        let err = decode_as(EditEncoding::Structured, "{ edits: [", "").expect_err("malformed");
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn diff_hunk_context_narrows_the_range() {
        let response = "\
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,4 +1,4 @@
 fn main() {
-    old();
+    new();
 }
";
        let decoded = decode_as(EditEncoding::UnifiedDiff, response, "").expect("decode");
        let edit = &decoded.edits[0];
        assert_eq!((edit.start_line, edit.end_line), (2, 2));
        assert_eq!(edit.old_text.as_deref(), Some("    old();"));
        assert_eq!(edit.new_text, "    new();");
        assert_eq!(edit.file_name.as_deref(), Some("src/lib.rs"));
    }

    #[test]
    fn diff_without_context_spans_the_header_range() {
        let response = "@@ -3,2 +3,1 @@\n-c\n-d\n+cd\n@@ -7,0 +7,1 @@\n+tail\n";
        let decoded = decode_as(EditEncoding::UnifiedDiff, response, "").expect("decode");
        assert_eq!(decoded.edits.len(), 2);
        assert_eq!(decoded.edits[0].line_range(), (3, 4));
        assert_eq!(decoded.edits[0].old_text.as_deref(), Some("c\nd"));
        assert!(decoded.edits[1].is_insertion());
        assert_eq!(decoded.edits[1].start_line, 8);
        assert_eq!(decoded.edits[1].new_text, "tail\n");
    }

    #[test]
    fn out_of_range_line_numbers_are_skipped() {
        let structured = r#"{"edits":[
            {"oldStart":4294967295,"oldLines":2,"newCode":"x"},
            {"oldStart":4294967295,"oldLines":0,"newCode":"y"},
            {"oldStart":1,"oldLines":1,"newCode":"z"}
        ]}"#;
        let decoded = decode_as(EditEncoding::Structured, structured, "a\n").expect("decode");
        assert_eq!(decoded.edits.len(), 1);
        assert_eq!(decoded.edits[0].line_range(), (1, 1));

        let diff = "@@ -4294967295,2 +1,1 @@\n-a\n-b\n+x\n@@ -4294967295,0 +1,1 @@\n+y\n";
        let decoded = decode_as(EditEncoding::UnifiedDiff, diff, "a\n").expect("decode");
        assert!(decoded.edits.is_empty());
    }

    #[test]
    fn search_replace_missing_text_yields_no_edits() {
        let response = "<<<<<<< SEARCH\nfoo()\n=======\nbar()\n>>>>>>> REPLACE\n";
        let decoded = decode_as(EditEncoding::SearchReplace, response, "a\nb\n").expect("decode");
        assert!(decoded.edits.is_empty());
    }

    #[test]
    fn search_replace_matches_trimmed_lines_and_reads_path() {
        let original = "fn a() {\n    call(1);\n}\n";
        let response = "src/a.rs\n```rust\n<<<<<<< SEARCH\ncall(1);\n=======\n    call(2);\n>>>>>>> REPLACE\n```\n";
        let decoded = decode_as(EditEncoding::SearchReplace, response, original).expect("decode");
        let edit = &decoded.edits[0];
        assert_eq!(edit.line_range(), (2, 2));
        assert_eq!(edit.new_text, "    call(2);");
        assert_eq!(edit.file_name.as_deref(), Some("src/a.rs"));
    }

    #[test]
    fn search_replace_falls_back_to_literal_span() {
        let decoded = decode_as(
            EditEncoding::SearchReplace,
            "<<<<<<< SEARCH\nfoo\n=======\nbar\n>>>>>>> REPLACE",
            "let foo = 1;\n",
        )
        .expect("decode");
        let edit = &decoded.edits[0];
        assert_eq!((edit.start_column, edit.end_column), (Some(5), Some(8)));
    }

    #[test]
    fn automatic_decoding_reports_unrecognized_text() {
        let err = decode("I could not find anything to change.", "a\n").expect_err("prose");
        assert_eq!(
            err,
            DecodeError::Unrecognized {
                response: "I could not find anything to change.".to_owned()
            }
        );
        let decoded = decode("@@ -1 +1 @@\n-a\n+A\n", "a\n").expect("diff");
        assert_eq!(decoded.encoding, EditEncoding::UnifiedDiff);
    }

    #[test]
    fn change_set_routes_edits_by_file() {
        let mut originals = BTreeMap::new();
        originals.insert("src/a.ts".to_owned(), "export const a = 1;\n".to_owned());
        originals.insert("src/b.ts".to_owned(), "import { a } from './a';\n".to_owned());
        let response = "\
a.ts
<<<<<<< SEARCH
export const a = 1;
=======
export const a = 2;
>>>>>>> REPLACE
<<<<<<< SEARCH
import { a } from './a';
=======
import { a as alpha } from './a';
>>>>>>> REPLACE
";
        let set = decode_change_set(response, &originals, &EditEncoding::ALL).expect("decode");
        assert_eq!(set.paths().collect::<Vec<_>>(), ["src/a.ts", "src/b.ts"]);
        assert_eq!(set.edit_count(), 2);
        assert_eq!(set.files[1].original_content, "import { a } from './a';\n");
    }
}
