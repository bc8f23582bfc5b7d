//! One file's editing session: buffer, context, pending edits, and persistence.

use splice_agent_api::AgentGateway;
use splice_api::{EditEncoding, EditHighlight, EditOperation, FileContext, Language, PendingEdit};

use crate::apply::ApplyReport;
use crate::config::Config;
use crate::decode::{decode_in_order, Decoded};
use crate::extract::extract_with;
use crate::preview::unified_patch;
use crate::prompt::EditPrompt;
use crate::registry::PendingEdits;
use crate::source::{SourceError, SourceProvider};
use crate::Result;

/// Editing session for the file currently open.
///
/// The session owns the in-memory buffer and its pending edits. Accepted
/// edits change the buffer only; [`EditSession::save`] writes it back.
#[derive(Debug)]
pub struct EditSession<S> {
    source: S,
    config: Config,
    saved: String,
    context: FileContext,
    registry: PendingEdits,
}

impl<S: SourceProvider> EditSession<S> {
    /// Open `path` from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Source`] if the file cannot be read.
    pub fn open(source: S, path: &str, config: Config) -> Result<Self> {
        let text = source.read(path)?;
        let mut session = Self {
            source,
            registry: PendingEdits::new(path, text.clone()).with_options(config.apply_options()),
            config,
            saved: text,
            context: FileContext::default(),
        };
        session.refresh_context();
        Ok(session)
    }

    /// Close the current file and open `path` instead, dropping pending edits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Source`] if the file cannot be read; the
    /// current file stays open in that case.
    pub fn switch_file(&mut self, path: &str) -> Result<()> {
        let text = self.source.read(path)?;
        self.registry.switch_file(path, text.clone());
        self.saved = text;
        self.refresh_context();
        Ok(())
    }

    /// Path of the open file.
    #[must_use]
    pub fn path(&self) -> &str {
        self.registry.file_path().unwrap_or_default()
    }

    /// Current buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        self.registry.buffer()
    }

    /// Symbols and imports of the current buffer.
    #[must_use]
    pub const fn context(&self) -> &FileContext {
        &self.context
    }

    /// Source provider backing the session.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Whether the buffer differs from what was last read or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.registry.buffer() != self.saved
    }

    /// Edits awaiting a decision.
    #[must_use]
    pub fn pending(&self) -> &[PendingEdit] {
        self.registry.pending()
    }

    /// Ranges for the UI to highlight.
    #[must_use]
    pub fn highlights(&self) -> Vec<EditHighlight> {
        self.registry.highlights()
    }

    /// Prompt asking for `instruction` in `encoding`.
    #[must_use]
    pub fn prompt<'a>(&'a self, instruction: &'a str, encoding: EditEncoding) -> EditPrompt<'a> {
        EditPrompt::new(self.path(), self.buffer(), &self.context, instruction, encoding)
    }

    /// Ask `gateway` for edits and stage them. Returns the staged ids.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gateway`] if the agent fails and
    /// [`crate::Error::Decode`] if its response cannot be understood.
    pub fn request(&mut self, gateway: &dyn AgentGateway, instruction: &str) -> Result<Vec<String>> {
        let encoding = gateway.capabilities().preferred_encoding;
        let request = self.prompt(instruction, encoding).to_request();
        tracing::debug!(
            gateway = gateway.id(),
            path = self.path(),
            encoding = encoding.as_str(),
            "requesting edits"
        );
        let response = gateway
            .complete(&request)
            .inspect_err(|err| tracing::warn!(gateway = gateway.id(), %err, "agent request failed"))?;
        self.stage_response(&response.text)
    }

    /// Decode `response` against the buffer and stage its edits for this file.
    ///
    /// Edits already pending are discarded first. Edits naming another file
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Decode`] if no encoding applies; nothing is
    /// staged or discarded in that case.
    pub fn stage_response(&mut self, response: &str) -> Result<Vec<String>> {
        let Decoded { edits, .. } =
            decode_in_order(response, self.registry.buffer(), &self.config.decode.order)?;

        let path = self.path().to_owned();
        let edits: Vec<EditOperation> = edits
            .into_iter()
            .filter(|edit| match edit.file_name.as_deref() {
                Some(name) if !same_file(name, &path) => {
                    tracing::warn!(file = name, open = %path, "edit for another file dropped");
                    false
                }
                _ => true,
            })
            .collect();

        self.registry.reject_all();
        Ok(self.registry.stage(edits))
    }

    /// Stage already decoded edits, keeping those already pending.
    pub fn stage(&mut self, edits: impl IntoIterator<Item = EditOperation>) -> Vec<String> {
        self.registry.stage(edits)
    }

    /// Apply one pending edit to the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] for unknown ids or edits that no
    /// longer fit the buffer.
    pub fn accept_one(&mut self, id: &str) -> Result<()> {
        self.registry.accept_one(id)?;
        self.refresh_context();
        Ok(())
    }

    /// Discard one pending edit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Registry`] for unknown ids.
    pub fn reject_one(&mut self, id: &str) -> Result<()> {
        self.registry.reject_one(id)?;
        Ok(())
    }

    /// Apply every pending edit as one batch.
    pub fn accept_all(&mut self) -> ApplyReport {
        let report = self.registry.accept_all();
        self.refresh_context();
        report
    }

    /// Discard every pending edit.
    pub fn reject_all(&mut self) -> usize {
        self.registry.reject_all()
    }

    /// Unified diff of unsaved changes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Preview`] if the diff cannot be rendered.
    pub fn diff(&self) -> Result<String> {
        unified_patch(self.path(), &self.saved, self.registry.buffer())
    }

    /// Write the buffer back if it changed. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Stale`] (wrapped) when the file changed on the
    /// provider since it was read, and any write failure.
    pub fn save(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }

        let path = self.path().to_owned();
        let on_disk = self.source.read(&path)?;
        if on_disk != self.saved {
            return Err(SourceError::Stale { path }.into());
        }

        let buffer = self.registry.buffer().to_owned();
        self.source.write(&path, &buffer)?;
        self.saved = buffer;
        tracing::debug!(%path, "session saved");
        Ok(true)
    }

    fn refresh_context(&mut self) {
        let language = Language::from_path(self.path());
        self.context = extract_with(self.registry.buffer(), language, self.config.extract_options());
    }
}

fn same_file(name: &str, path: &str) -> bool {
    let name = name.strip_prefix("./").unwrap_or(name);
    let path = path.strip_prefix("./").unwrap_or(path);
    name == path
        || path.strip_suffix(name).is_some_and(|prefix| prefix.ends_with('/'))
        || name.strip_suffix(path).is_some_and(|prefix| prefix.ends_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_accepts_path_suffixes() {
        assert!(same_file("./src/a.ts", "src/a.ts"));
        assert!(same_file("a.ts", "src/a.ts"));
        assert!(same_file("repo/src/a.ts", "src/a.ts"));
        assert!(!same_file("b.ts", "src/a.ts"));
        assert!(!same_file("xa.ts", "src/a.ts"));
    }
}
