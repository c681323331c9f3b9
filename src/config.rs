//! Named configuration values injected into the export pipeline.

use std::time::Duration;

use crate::convert::ConvertOptions;
use crate::output::{DEFAULT_MAX_SUFFIX, SlugOptions};
use crate::retry::RetryPolicy;

/// Default page navigation and content wait timeout (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Selector matching one node per conversation turn.
pub const DEFAULT_MESSAGE_SELECTOR: &str = "article [data-message-author-role]";

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Timeout handed to each driver navigation and content wait.
    pub timeout: Duration,
    /// Retry policy for the network-dependent driver steps.
    pub retry: RetryPolicy,
    pub slug: SlugOptions,
    /// Largest `_N` suffix probed when the target path is taken.
    pub max_suffix: u32,
    pub message_selector: String,
    pub convert: ConvertOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            slug: SlugOptions::default(),
            max_suffix: DEFAULT_MAX_SUFFIX,
            message_selector: DEFAULT_MESSAGE_SELECTOR.to_string(),
            convert: ConvertOptions::default(),
        }
    }
}

impl ExportConfig {
    /// Returns a copy with a different driver timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a copy with a different retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
