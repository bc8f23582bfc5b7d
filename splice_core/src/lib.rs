//! Core library for splice's agent edit protocol.
//!
//! The crate is layered around the life of an agent-proposed change:
//! - symbol extraction and dependency inference to build agent context
//! - decoding agent responses into canonical [`EditOperation`]s
//! - locating, validating, and applying edits to text buffers
//! - staging edits for review in a per-file session

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Batch edit application.
pub mod apply;
/// Multi-file change-set application and dry runs.
pub mod changeset;
/// Layered configuration.
pub mod config;
/// Agent response decoding for the three edit encodings.
pub mod decode;
/// File-to-file dependency inference.
pub mod deps;
/// Heuristic per-language symbol extraction.
pub mod extract;
/// Subscriber installation for binaries.
pub mod logging;
/// Edit location and old-text verification.
pub mod locate;
/// Unified diff previews.
pub mod preview;
/// Agent prompt construction.
pub mod prompt;
/// Pending edit registry for one file.
pub mod registry;
/// Per-file editing session.
pub mod session;
/// Source provider collaborators.
pub mod source;
/// Change-set conflict validation.
pub mod validate;

pub use apply::{apply_batch, apply_batch_with, ApplyOptions, ApplyReport, FailedEdit};
pub use changeset::{annotate_dependencies, apply_change_set, dry_run, ChangeSetOutcome, FilePreview};
pub use config::{Config, ConfigError, EnvOverrides};
pub use decode::{decode, decode_as, decode_change_set, decode_in_order, DecodeError, Decoded};
pub use deps::{build_dependency_graph, find_affected_files, touched_edges, DependencyGraph};
pub use extract::{extract, extract_with, render_outline, ExtractOptions};
pub use locate::LocateError;
pub use preview::unified_patch;
pub use prompt::{encode_search_replace, EditPrompt};
pub use registry::{PendingEdits, RegistryError};
pub use session::EditSession;
pub use source::{MemorySource, SourceError, SourceProvider, WorkspaceSource};
pub use validate::{ensure_valid, validate, Conflict, ConflictError, ValidationReport};

pub use splice_agent_api::{AgentGateway, GatewayError};
pub use splice_api::*;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The agent response could not be decoded.
    #[error(transparent)]
    Decode {
        /// Decoder failure.
        #[from]
        source: DecodeError,
    },
    /// A single edit could not be located or verified.
    #[error(transparent)]
    Locate {
        /// Locator failure.
        #[from]
        source: LocateError,
    },
    /// A change set contains overlapping edits or a shared path.
    #[error(transparent)]
    Conflict {
        /// Validator failure.
        #[from]
        source: ConflictError,
    },
    /// Reading or writing a source failed.
    #[error(transparent)]
    Source {
        /// Source provider failure.
        #[from]
        source: SourceError,
    },
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config {
        /// Configuration failure.
        #[from]
        source: ConfigError,
    },
    /// The agent gateway failed.
    #[error("agent gateway failed: {source}")]
    Gateway {
        /// Gateway failure.
        #[from]
        source: GatewayError,
    },
    /// A registry operation referenced an unknown or resolved edit.
    #[error(transparent)]
    Registry {
        /// Registry failure.
        #[from]
        source: RegistryError,
    },
    /// Diff construction failed.
    #[error("failed to build diff for {path}: {source}")]
    Preview {
        /// File the diff was built for.
        path: String,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },
}
