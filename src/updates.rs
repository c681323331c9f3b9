//! Latest-release lookup against the GitHub releases API.
//!
//! The CLI treats every failure here as "no information"; callers decide
//! whether to surface [`UpdateError`].

use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::user_agent::tool_user_agent;

/// GitHub endpoint describing the newest published release.
pub const LATEST_RELEASE_URL: &str = "https://api.github.com/repos/Dicklesworthstone/chatgpt_shared_conversation_to_markdown_file/releases/latest";

/// Errors from the release lookup.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("release lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("release lookup returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
}

/// Fetches the tag of the latest release from `url`.
///
/// Returns `Ok(None)` when the release has no tag.
///
/// # Errors
///
/// Returns [`UpdateError`] on network failure, a non-success status or an
/// unparseable body.
#[instrument(skip(client))]
pub async fn latest_release_tag(client: &Client, url: &str) -> Result<Option<String>, UpdateError> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/vnd.github+json")
        .header(USER_AGENT, tool_user_agent())
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpdateError::Status(status.as_u16()));
    }
    let release: LatestRelease = response.json().await?;
    debug!(tag = ?release.tag_name, "latest release");
    Ok(release.tag_name.filter(|tag| !tag.is_empty()))
}
