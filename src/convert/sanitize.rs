//! Removal of known noise markup from scraped message fragments.
//!
//! The fragments come from a single, narrow page layout, so stripping is done
//! with patterns instead of a full HTML parse. Removed:
//! - `<span>` and `<a>` citation-pill widgets, content included
//! - editor position attributes `data-start="N"` and `data-end="N"`

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

#[allow(clippy::expect_used)]
static CITATION_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span[^>]*data-testid="webpage-citation-pill"[^>]*>.*?</span>"#)
        .expect("citation span regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static CITATION_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]*data-testid="webpage-citation-pill"[^>]*>.*?</a>"#)
        .expect("citation link regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static POSITION_ATTRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sdata-(?:start|end)="\d+""#).expect("position attr regex is valid")
});

/// Strips citation pills and position attributes from `html`.
///
/// Total and pure; input without either kind of noise is returned unchanged.
#[must_use]
pub fn sanitize(html: &str) -> String {
    let without_spans = CITATION_SPAN.replace_all(html, "");
    let without_links = CITATION_LINK.replace_all(&without_spans, "");
    let cleaned = POSITION_ATTRS.replace_all(&without_links, "");
    trace!(
        before = html.len(),
        after = cleaned.len(),
        "sanitized fragment"
    );
    cleaned.into_owned()
}
