//! Shared splice data models consumed by the core engine, agent gateways, and
//! UI collaborators.
//!
//! The structures in this crate are designed to be:
//! - serializable via `serde` for transport to and from UI surfaces
//! - plain values, produced fresh by each extraction or decoding pass

/// Symbols, languages, and per-file extraction results.
pub mod context;
/// Canonical edit operations and their pending (staged) projection.
pub mod edit;
/// Per-file batches and multi-file change sets.
pub mod changeset;

pub use changeset::*;
pub use context::*;
pub use edit::*;
