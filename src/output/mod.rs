//! Output naming and persistence.
//!
//! - [`slugify`] turns a conversation title into a safe file stem.
//! - [`unique_path`] finds a free `stem_N.ext` variant of a target path.
//! - [`write_atomic`] persists content with temp-file-then-rename.

pub mod atomic;
mod error;
pub mod slug;
mod unique;

pub use atomic::{StagedWrite, stage, write_atomic};
pub use error::OutputError;
pub use slug::{SlugOptions, is_reserved_basename, slugify};
pub use unique::{DEFAULT_MAX_SUFFIX, unique_path};
