//! Page driver over a plain HTTP fetch.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{DriverError, PageDriver};
use crate::document::{Message, Role};
use crate::user_agent::BROWSER_USER_AGENT;

const ROLE_ATTRIBUTE: &str = "data-message-author-role";

/// Serves share pages that embed the conversation markup in the HTML
/// response, or a page saved to disk.
///
/// The loaded page is static, so [`PageDriver::wait_for_content`] checks the
/// selector once instead of polling.
#[derive(Debug)]
pub struct StaticPageDriver {
    client: Option<Client>,
    page: RwLock<Option<String>>,
}

impl StaticPageDriver {
    /// Creates a driver that fetches pages with a desktop browser User-Agent.
    ///
    /// # Errors
    ///
    /// Returns the client build error if TLS initialisation fails.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .gzip(true)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Creates a driver that fetches pages with `client`.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client: Some(client),
            page: RwLock::new(None),
        }
    }

    /// Creates a driver over an already downloaded page.
    ///
    /// [`PageDriver::navigate`] keeps the preloaded page and does no I/O.
    #[must_use]
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            client: None,
            page: RwLock::new(Some(html.into())),
        }
    }

    fn store(&self, body: String) {
        *self.page.write().unwrap_or_else(PoisonError::into_inner) = Some(body);
    }

    fn with_page<T>(
        &self,
        query: impl FnOnce(&str) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let guard = self.page.read().unwrap_or_else(PoisonError::into_inner);
        let page = guard.as_deref().ok_or(DriverError::NoPage)?;
        query(page)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn count_matches(page: &str, selector: &str) -> Result<usize, DriverError> {
    let selector = parse_selector(selector)?;
    Ok(Html::parse_document(page).select(&selector).count())
}

fn messages_in(page: &str, selector: &str) -> Result<Vec<Message>, DriverError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(page);
    Ok(document
        .select(&selector)
        .map(|node| {
            let role = node
                .value()
                .attr(ROLE_ATTRIBUTE)
                .map_or(Role::Unknown, Role::from_attribute);
            Message::new(role, node.inner_html())
        })
        .collect())
}

fn title_of(page: &str) -> Result<String, DriverError> {
    let selector = parse_selector("title")?;
    Ok(Html::parse_document(page)
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default())
}

fn map_request_error(url: &str, timeout: Duration, error: reqwest::Error) -> DriverError {
    if error.is_timeout() {
        DriverError::timeout(format!("loading {url}"), timeout)
    } else {
        DriverError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl PageDriver for StaticPageDriver {
    #[instrument(skip(self), fields(timeout_ms = timeout.as_millis()))]
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let Some(client) = &self.client else {
            debug!("using preloaded page");
            return Ok(());
        };

        let parsed = Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| DriverError::InvalidUrl {
                url: url.to_string(),
            })?;

        let fetch = async {
            let response = client
                .get(parsed)
                .send()
                .await
                .map_err(|e| map_request_error(url, timeout, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(DriverError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            response
                .text()
                .await
                .map_err(|e| map_request_error(url, timeout, e))
        };

        let body = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| DriverError::timeout(format!("loading {url}"), timeout))??;
        info!(bytes = body.len(), "page loaded");
        self.store(body);
        Ok(())
    }

    async fn wait_for_content(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let matches = self.with_page(|page| count_matches(page, selector))?;
        debug!(selector, matches, timeout_ms = timeout.as_millis(), "checked for content");
        if matches == 0 {
            return Err(DriverError::ContentNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn extract_messages(&self, selector: &str) -> Result<Vec<Message>, DriverError> {
        self.with_page(|page| messages_in(page, selector))
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.with_page(title_of)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
<head><title>ChatGPT - Lifetimes explained</title></head>
<body>
  <main>
    <article><div data-message-author-role="user"><p>What is a lifetime?</p></div></article>
    <article><div data-message-author-role="assistant"><p>A <strong>scope</strong>.</p></div></article>
    <article><div data-message-author-role="tool"><p>noise</p></div></article>
  </main>
  <div data-message-author-role="user">outside any article</div>
</body>
</html>"#;

    const SELECTOR: &str = "article [data-message-author-role]";

    #[tokio::test]
    async fn test_preloaded_page_extracts_messages_in_order() {
        let driver = StaticPageDriver::from_html(PAGE);
        driver.navigate("https://chatgpt.com/share/x", Duration::from_secs(1)).await.unwrap();

        let messages = driver.extract_messages(SELECTOR).await.unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].html, "<p>What is a lifetime?</p>");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].html, "<p>A <strong>scope</strong>.</p>");
        assert_eq!(messages[2].role, Role::Unknown);
    }

    #[tokio::test]
    async fn test_title_is_trimmed_text() {
        let driver = StaticPageDriver::from_html(PAGE);
        assert_eq!(driver.title().await.unwrap(), "ChatGPT - Lifetimes explained");
    }

    #[tokio::test]
    async fn test_title_missing_is_empty() {
        let driver = StaticPageDriver::from_html("<html><body></body></html>");
        assert_eq!(driver.title().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_wait_for_content_present() {
        let driver = StaticPageDriver::from_html(PAGE);
        driver.wait_for_content(SELECTOR, Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_content_missing() {
        let driver = StaticPageDriver::from_html("<html><body><p>private link</p></body></html>");
        let err = driver.wait_for_content(SELECTOR, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, DriverError::ContentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_selector_is_reported() {
        let driver = StaticPageDriver::from_html(PAGE);
        let err = driver.extract_messages("article [[").await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn test_queries_before_navigation_fail() {
        let driver = StaticPageDriver::with_client(Client::new());
        assert!(matches!(driver.title().await.unwrap_err(), DriverError::NoPage));
        assert!(matches!(
            driver.extract_messages(SELECTOR).await.unwrap_err(),
            DriverError::NoPage
        ));
    }

    #[tokio::test]
    async fn test_navigate_rejects_non_http_url() {
        let driver = StaticPageDriver::with_client(Client::new());
        let err = driver.navigate("ftp://example.com/x", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidUrl { .. }));
        let err = driver.navigate("not a url", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidUrl { .. }));
    }
}
