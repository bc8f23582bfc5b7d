//! Unified diff previews of buffer changes.

use std::path::Path;

use git2::Patch;

use crate::{Error, Result};

/// Render the unified diff turning `before` into `after` for `path`.
///
/// Identical inputs produce an empty string.
///
/// # Errors
///
/// Returns [`Error::Preview`] when libgit2 fails to build the patch.
pub fn unified_patch(path: &str, before: &str, after: &str) -> Result<String> {
    if before == after {
        return Ok(String::new());
    }

    build_patch(path, before, after).map_err(|source| Error::Preview {
        path: path.to_owned(),
        source,
    })
}

fn build_patch(path: &str, before: &str, after: &str) -> std::result::Result<String, git2::Error> {
    let path_ref = Path::new(path);
    let mut patch = Patch::from_buffers(
        before.as_bytes(),
        Some(path_ref),
        after.as_bytes(),
        Some(path_ref),
        None,
    )?;

    let buffer = patch.to_buf()?;
    Ok(String::from_utf8_lossy(buffer.as_ref()).into_owned())
}
