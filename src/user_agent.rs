//! User-Agent strings for outgoing requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str =
    "https://github.com/Dicklesworthstone/chatgpt_shared_conversation_to_markdown_file";

/// Desktop browser User-Agent used when fetching share pages.
///
/// Share pages serve the conversation markup to browser clients only.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

/// User-Agent identifying the tool, for API requests.
#[must_use]
pub(crate) fn tool_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("csctm/{version} (+{PROJECT_UA_URL})")
}
