//! Error types for the output module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while choosing a target path or persisting a file.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Writing the temp file, syncing it or renaming it onto the target failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Every numeric suffix up to the bound is taken.
    #[error("no free file name for {base} (tried suffixes up to _{max_suffix})")]
    PathExhausted {
        /// The path that was requested.
        base: PathBuf,
        /// Largest suffix tried.
        max_suffix: u32,
    },
}

impl OutputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
