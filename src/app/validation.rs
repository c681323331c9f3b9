use anyhow::{Result, bail};
use url::Url;

/// Accepts absolute `http`/`https` URLs with a host.
pub(crate) fn validate_share_url(raw: &str) -> Result<Url> {
    let Ok(url) = Url::parse(raw.trim()) else {
        bail!("Invalid URL: '{raw}'.\n  Pass a share link such as https://chatgpt.com/share/<id>");
    };
    if !matches!(url.scheme(), "http" | "https") {
        bail!(
            "Unsupported URL scheme '{}' in '{raw}'.\n  Only http and https share links are supported",
            url.scheme()
        );
    }
    if url.host_str().is_none_or(str::is_empty) {
        bail!("URL '{raw}' has no host");
    }
    Ok(url)
}
