//! Agent prompt construction.

use std::fmt::Write as _;

use splice_agent_api::AgentRequest;
use splice_api::{EditEncoding, FileContext};

use crate::extract::render_outline;

const SYSTEM_PROMPT: &str = "You edit source files. Reply only with edits in the requested format. \
Line numbers refer to the numbered source you are given.";

/// Everything an agent needs to propose edits to one file.
#[derive(Debug, Clone)]
pub struct EditPrompt<'a> {
    path: &'a str,
    source: &'a str,
    context: &'a FileContext,
    instruction: &'a str,
    encoding: EditEncoding,
}

impl<'a> EditPrompt<'a> {
    /// Prompt for `instruction` against `source`, answered in `encoding`.
    #[must_use]
    pub const fn new(
        path: &'a str,
        source: &'a str,
        context: &'a FileContext,
        instruction: &'a str,
        encoding: EditEncoding,
    ) -> Self {
        Self {
            path,
            source,
            context,
            instruction,
            encoding,
        }
    }

    /// Prompt text: outline, numbered source, instruction, response format.
    #[must_use]
    pub fn render(&self) -> String {
        let sections = [
            format!("File outline:\n{}", render_outline(self.path, self.context).trim_end()),
            format!(
                "Source of {path}:\n```{language}\n{body}```",
                path = self.path,
                language = self.context.language,
                body = numbered(self.source)
            ),
            format!("Instruction:\n{}", self.instruction.trim()),
            format!("Response format:\n{}", format_instructions(self.encoding, self.path)),
        ];
        sections.join("\n\n")
    }

    /// Gateway request carrying the rendered prompt.
    #[must_use]
    pub fn to_request(&self) -> AgentRequest {
        AgentRequest::new(self.render())
            .with_system(SYSTEM_PROMPT)
            .with_file_path(self.path)
    }
}

fn numbered(source: &str) -> String {
    let width = source.lines().count().max(1).to_string().len();
    let mut out = String::with_capacity(source.len() + source.len() / 4);
    for (index, line) in source.lines().enumerate() {
        let _ = writeln!(out, "{:>width$} | {line}", index + 1);
    }
    out
}

fn format_instructions(encoding: EditEncoding, path: &str) -> String {
    match encoding {
        EditEncoding::Structured => format!(
            "Reply with one fenced json block:\n```json\n{{\n  \"summary\": \"what changed\",\n  \
             \"edits\": [\n    {{ \"fileName\": \"{path}\", \"startLine\": 3, \"endLine\": 4, \
             \"oldText\": \"current text of lines 3-4\", \"newText\": \"replacement\", \
             \"description\": \"why\" }}\n  ]\n}}\n```\n\
             Ranges are inclusive line numbers of the original file. \
             To insert without replacing, use \"oldStart\": <line before>, \"oldLines\": 0 and \"newCode\"."
        ),
        EditEncoding::UnifiedDiff => format!(
            "Reply with a unified diff against the original file:\n```diff\n--- a/{path}\n+++ b/{path}\n\
             @@ -3,2 +3,2 @@\n context line\n-removed line\n+added line\n```\n\
             Hunk headers must use original line numbers."
        ),
        EditEncoding::SearchReplace => format!(
            "Reply with one or more search/replace blocks, each preceded by the file path:\n{path}\n{}\
             The search text must match the file exactly, one or more whole lines.",
            encode_search_replace(None, "current lines", "replacement lines")
        ),
    }
}

/// Render one search/replace block, optionally preceded by a path line.
///
/// A single trailing newline on either text is dropped so the block does not
/// carry an extra blank line.
#[must_use]
pub fn encode_search_replace(path: Option<&str>, search: &str, replace: &str) -> String {
    let mut out = String::new();
    if let Some(path) = path {
        out.push_str(path);
        out.push('\n');
    }
    out.push_str("<<<<<<< SEARCH\n");
    push_block(&mut out, search);
    out.push_str("=======\n");
    push_block(&mut out, replace);
    out.push_str(">>>>>>> REPLACE\n");
    out
}

fn push_block(out: &mut String, text: &str) {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if !text.is_empty() {
        out.push_str(text);
        out.push('\n');
    }
}
