//! Collision-free target paths.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::OutputError;

/// Default largest numeric suffix probed before giving up.
pub const DEFAULT_MAX_SUFFIX: u32 = 10_000;

/// Returns `base` if nothing exists there, otherwise the first free
/// `stem_N.ext` for N = 2, 3, ... up to `max_suffix`.
///
/// The check and the later write are separate filesystem observations;
/// another process can still claim the returned path in between.
///
/// # Errors
///
/// Returns [`OutputError::PathExhausted`] when every candidate up to
/// `max_suffix` exists.
#[instrument(skip(base), fields(base = %base.display()))]
pub fn unique_path(base: &Path, max_suffix: u32) -> Result<PathBuf, OutputError> {
    if !base.exists() {
        return Ok(base.to_path_buf());
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for index in 2..=max_suffix {
        let candidate = base.with_file_name(format!("{stem}_{index}{extension}"));
        if !candidate.exists() {
            debug!(candidate = %candidate.display(), "resolved collision");
            return Ok(candidate);
        }
    }

    Err(OutputError::PathExhausted {
        base: base.to_path_buf(),
        max_suffix,
    })
}
