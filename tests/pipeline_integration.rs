//! Integration tests for the export pipeline through the public API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use csctm_core::output::SlugOptions;
use csctm_core::output::slug::RESERVED_BASENAMES;
use csctm_core::{
    AssembleError, Conversation, ExportConfig, ExportError, ExportRequest, Exporter,
    MarkdownConverter, Message, RetryPolicy, Role, StaticPageDriver, assemble, sanitize, slugify,
    unique_path,
};
use tempfile::TempDir;

const SHARE_PAGE: &str = r#"<!doctype html>
<html>
<head><title>ChatGPT - Sorting in Python</title></head>
<body>
  <article>
    <div data-message-author-role="user"><p>How do I sort a list?</p></div>
  </article>
  <article>
    <div data-message-author-role="assistant">
      <p>Use <code>sorted</code><span class="ms-1" data-testid="webpage-citation-pill"><a href="https://docs.python.org">docs</a></span>:</p>
      <pre><code class="language-python">numbers = [3, 1, 2]
print(sorted(numbers))</code></pre>
    </div>
  </article>
</body>
</html>"#;

fn conversation(messages: Vec<Message>) -> Conversation {
    Conversation {
        title: "ChatGPT - Test".to_string(),
        messages,
        source_url: "https://chatgpt.com/share/test".to_string(),
        retrieved_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    }
}

fn fast_config() -> ExportConfig {
    ExportConfig::default()
        .with_timeout(Duration::from_secs(1))
        .with_retry(RetryPolicy::new(1, Duration::ZERO))
}

// ==================== Slug Tests ====================

#[test]
fn test_slugify_examples() {
    assert_eq!(slugify(""), "chatgpt_conversation");
    assert_eq!(slugify("!!!"), "chatgpt_conversation");
    assert_eq!(slugify("Hello World!"), "hello_world");
    assert_eq!(slugify("CON"), "con_chatgpt");
    assert_eq!(slugify(&"a".repeat(200)).len(), 120);
}

#[test]
fn test_slugify_never_returns_reserved_basename() {
    for name in RESERVED_BASENAMES {
        let slug = slugify(&name.to_uppercase());
        assert!(!RESERVED_BASENAMES.contains(&slug.as_str()), "{slug}");
        assert!(slug.len() <= SlugOptions::default().max_len);
    }
}

// ==================== Unique Path Tests ====================

#[test]
fn test_unique_path_suffixes_increase_as_files_appear() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("chat.md");
    assert_eq!(unique_path(&base, 100).unwrap(), base);

    std::fs::write(&base, "1").unwrap();
    let second = unique_path(&base, 100).unwrap();
    assert_eq!(second, dir.path().join("chat_2.md"));

    std::fs::write(&second, "2").unwrap();
    assert_eq!(unique_path(&base, 100).unwrap(), dir.path().join("chat_3.md"));
}

// ==================== Conversion Tests ====================

#[test]
fn test_code_block_keeps_language_fence() {
    let markdown = MarkdownConverter::new()
        .convert(r#"<pre><code class="language-python">x = 1</code></pre>"#);
    assert!(markdown.contains("```python\nx = 1\n```"), "{markdown}");
}

#[test]
fn test_sanitize_is_noop_without_citations_or_offsets() {
    let html = "<p>Plain <em>text</em> with <a href=\"https://x.dev\">a link</a>.</p>";
    assert_eq!(sanitize(html), html);
}

// ==================== Assembly Tests ====================

#[test]
fn test_assemble_empty_conversation_fails() {
    let err = assemble(&conversation(Vec::new()), &MarkdownConverter::new()).unwrap_err();
    assert!(matches!(err, AssembleError::EmptyConversation));
}

#[test]
fn test_assemble_keeps_message_order() {
    let document = assemble(
        &conversation(vec![
            Message::new(Role::Assistant, "<p>first answer</p>"),
            Message::new(Role::User, "<p>then a question</p>"),
        ]),
        &MarkdownConverter::new(),
    )
    .unwrap();
    let text = document.as_str();

    let assistant = text.find("## Assistant").unwrap();
    let user = text.find("## User").unwrap();
    assert!(assistant < user);
    assert!(text.contains("first answer"));
    assert!(text.contains("then a question"));
    assert!(text.contains("Retrieved: 2024-01-02T03:04:05.000Z"));
}

// ==================== Export Tests ====================

#[tokio::test]
async fn test_export_saved_page_writes_markdown_and_html() {
    let dir = TempDir::new().unwrap();
    let exporter = Exporter::new(Arc::new(StaticPageDriver::from_html(SHARE_PAGE)), fast_config());
    let request = ExportRequest::new("https://chatgpt.com/share/sorting", dir.path());

    let outcome = exporter.run(&request, &mut |_| {}).await.unwrap();

    assert_eq!(outcome.markdown_path, dir.path().join("sorting_in_python.md"));
    assert_eq!(outcome.html_path, Some(dir.path().join("sorting_in_python.html")));
    assert_eq!(outcome.message_count, 2);

    let markdown = std::fs::read_to_string(&outcome.markdown_path).unwrap();
    assert!(markdown.starts_with("# ChatGPT Conversation: Sorting in Python\n"));
    assert!(markdown.contains("Source: https://chatgpt.com/share/sorting"));
    assert!(markdown.contains("```python\nnumbers = [3, 1, 2]\nprint(sorted(numbers))\n```"));
    assert!(!markdown.contains("docs.python.org"), "citation pill leaked: {markdown}");
    assert!(markdown.find("## User").unwrap() < markdown.find("## Assistant").unwrap());

    let html = std::fs::read_to_string(outcome.html_path.unwrap()).unwrap();
    assert!(html.contains("<title>Sorting in Python</title>"));
    assert!(html.contains(r#"class="hljs language-python""#));
}

#[tokio::test]
async fn test_export_twice_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let exporter = Exporter::new(Arc::new(StaticPageDriver::from_html(SHARE_PAGE)), fast_config());
    let mut request = ExportRequest::new("https://chatgpt.com/share/sorting", dir.path());
    request.generate_html = false;

    let first = exporter.run(&request, &mut |_| {}).await.unwrap();
    let second = exporter.run(&request, &mut |_| {}).await.unwrap();

    assert_eq!(first.markdown_path, dir.path().join("sorting_in_python.md"));
    assert_eq!(second.markdown_path, dir.path().join("sorting_in_python_2.md"));
    assert!(second.html_path.is_none());
    assert!(!dir.path().join("sorting_in_python.html").exists());
}

#[tokio::test]
async fn test_export_page_without_messages_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let page = "<html><head><title>ChatGPT</title></head><body><p>This link is private</p></body></html>";
    let exporter = Exporter::new(Arc::new(StaticPageDriver::from_html(page)), fast_config());
    let request = ExportRequest::new("https://chatgpt.com/share/private", dir.path());

    let err = exporter.run(&request, &mut |_| {}).await.unwrap_err();

    assert!(matches!(err, ExportError::Retry(_)));
    assert!(err.to_string().contains("waiting for conversation content"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
