//! csctm core library
//!
//! Turns a publicly shared ChatGPT conversation into a clean Markdown file
//! and an optional standalone HTML twin.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`driver`] - Page loading and message extraction behind the [`PageDriver`] trait
//! - [`retry`] - Bounded retry with linear backoff
//! - [`convert`] - Fragment sanitizing and the rule-driven HTML to Markdown converter
//! - [`document`] - Conversation model, Markdown assembly and the HTML twin
//! - [`output`] - Slugs, collision-free paths and atomic writes
//! - [`export`] - The end-to-end pipeline tying the above together
//! - [`updates`] - Latest-release lookup
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use csctm_core::{ExportConfig, ExportRequest, Exporter, StaticPageDriver};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = StaticPageDriver::new()?;
//! let exporter = Exporter::new(Arc::new(driver), ExportConfig::default());
//! let request = ExportRequest::new("https://chatgpt.com/share/abc", ".");
//! let outcome = exporter.run(&request, &mut |step| eprintln!("{step}")).await?;
//! println!("{}", outcome.markdown_path.display());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod document;
pub mod driver;
pub mod export;
pub mod output;
pub mod retry;
pub mod updates;
mod user_agent;

// Re-export commonly used types
pub use config::{DEFAULT_MESSAGE_SELECTOR, DEFAULT_TIMEOUT, ExportConfig};
pub use convert::{ConvertOptions, MarkdownConverter, sanitize};
pub use document::{
    AssembleError, Conversation, Document, Message, Role, assemble, render_html_document,
};
pub use driver::{DriverError, PageDriver, StaticPageDriver};
pub use export::{ExportError, ExportOutcome, ExportRequest, ExportStep, Exporter};
pub use output::{OutputError, slugify, unique_path, write_atomic};
pub use retry::{RetryError, RetryPolicy};
