//! Page driver capability.
//!
//! The export pipeline never fetches or parses whole pages itself; it asks a
//! [`PageDriver`] to load the share URL, wait for the conversation to render
//! and hand back the per-message HTML and the page title.
//!
//! [`StaticPageDriver`] implements the capability over a plain HTTP fetch (or
//! a saved copy of the page) and CSS selector matching. A scripted browser
//! can implement the same trait.

mod error;
mod static_page;

use std::time::Duration;

use async_trait::async_trait;

use crate::document::Message;

pub use error::DriverError;
pub use static_page::StaticPageDriver;

/// Access to a loaded conversation page.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the exporter can hold an
/// `Arc<dyn PageDriver>` chosen at runtime.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url`, giving up after `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for_content(&self, selector: &str, timeout: Duration)
    -> Result<(), DriverError>;

    /// Every element matching `selector`, in document order.
    async fn extract_messages(&self, selector: &str) -> Result<Vec<Message>, DriverError>;

    /// The page title, or an empty string when the page has none.
    async fn title(&self) -> Result<String, DriverError>;
}
