//! Write-to-temp-then-rename persistence.
//!
//! The temp file lives in the target's directory so the final rename never
//! crosses filesystems. Readers of the target see either the previous file or
//! the complete new content. A failed write or rename leaves the temp file
//! behind; it is not cleaned up.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::OutputError;

/// Temp file name for `target`: `.{basename}.tmp-{millis}` in the same directory.
#[must_use]
pub fn temp_path_for(target: &Path, millis: i64) -> PathBuf {
    let basename = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{basename}.tmp-{millis}"))
}

/// Content written and synced to a temp file, not yet visible at the target.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Renames the temp file onto the target.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Io`] if the rename fails.
    pub async fn commit(self) -> Result<PathBuf, OutputError> {
        fs::rename(&self.temp, &self.target)
            .await
            .map_err(|e| OutputError::io(&self.target, e))?;
        debug!(path = %self.target.display(), "committed");
        Ok(self.target)
    }
}

/// Writes `content` to a synced temp file next to `target`.
///
/// The target's parent directory is created if missing.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if the directory, the file, the write or the
/// sync fails.
pub async fn stage(target: &Path, content: &[u8]) -> Result<StagedWrite, OutputError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| OutputError::io(parent, e))?;
    }

    let temp = temp_path_for(target, Utc::now().timestamp_millis());
    let mut file = fs::File::create(&temp)
        .await
        .map_err(|e| OutputError::io(&temp, e))?;
    file.write_all(content)
        .await
        .map_err(|e| OutputError::io(&temp, e))?;
    file.sync_all()
        .await
        .map_err(|e| OutputError::io(&temp, e))?;
    drop(file);

    debug!(temp = %temp.display(), bytes = content.len(), "staged");
    Ok(StagedWrite {
        temp,
        target: target.to_path_buf(),
    })
}

/// Atomically replaces `target` with `content`.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if staging or the rename fails.
#[instrument(skip(target, content), fields(path = %target.display()))]
pub async fn write_atomic(target: &Path, content: impl AsRef<[u8]>) -> Result<PathBuf, OutputError> {
    stage(target, content.as_ref()).await?.commit().await
}
