//! Standalone HTML rendering of an assembled Markdown document.
//!
//! Raw HTML inside the Markdown is escaped, never passed through. Code blocks
//! are emitted as `<pre class="code-block"><code class="hljs language-X">`
//! with token spans for languages syntect knows. Bare URLs outside code and
//! links become anchors.

use std::sync::LazyLock;

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

use super::strip_title_prefix;

const INLINE_STYLE: &str = r#":root {
  color-scheme: light;
}
* {
  box-sizing: border-box;
}
body {
  margin: 0 auto;
  padding: 32px 20px 48px;
  max-width: 900px;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
  line-height: 1.6;
  color: #0f172a;
  background: #f8fafc;
}
h1, h2, h3, h4, h5, h6 {
  color: #0f172a;
  line-height: 1.25;
  margin: 1.2em 0 0.4em;
}
p {
  margin: 0 0 1em;
}
a {
  color: #2563eb;
  text-decoration: none;
}
a:hover { text-decoration: underline; }
code, pre {
  font-family: SFMono-Regular, Menlo, Monaco, Consolas, "Liberation Mono", "Courier New", monospace;
}
code {
  background: #e2e8f0;
  color: #0f172a;
  padding: 0.15em 0.35em;
  border-radius: 6px;
  font-size: 0.95em;
}
pre {
  background: #0b1221;
  color: #e2e8f0;
  padding: 16px;
  overflow: auto;
  border-radius: 10px;
  border: 1px solid #1f2937;
}
pre code {
  background: none;
  padding: 0;
  color: inherit;
}
blockquote {
  margin: 1em 0;
  padding: 0.6em 1em;
  border-left: 4px solid #cbd5e1;
  background: #f1f5f9;
  border-radius: 6px;
}
table {
  border-collapse: collapse;
  margin: 1em 0;
  width: 100%;
}
th, td {
  padding: 8px 10px;
  border: 1px solid #e2e8f0;
}
th {
  background: #f8fafc;
  text-align: left;
}
ul, ol {
  padding-left: 1.4em;
}
hr {
  border: 0;
  border-top: 1px solid #e2e8f0;
  margin: 2em 0;
}
.article {
  background: white;
  padding: 28px;
  border-radius: 14px;
  border: 1px solid #e2e8f0;
  box-shadow: 0 12px 30px rgba(15, 23, 42, 0.06);
}
.meta {
  color: #475569;
  font-size: 0.95em;
  margin-bottom: 1em;
}
.hljs {
  color: #e2e8f0;
}
.hljs-comment {
  color: #94a3b8;
  font-style: italic;
}
.hljs-keyword, .hljs-storage {
  color: #c084fc;
}
.hljs-string {
  color: #86efac;
}
.hljs-constant {
  color: #fca5a5;
}
.hljs-entity {
  color: #93c5fd;
}
.hljs-support {
  color: #fcd34d;
}
.hljs-variable {
  color: #fdba74;
}"#;

const TOKEN_CLASS_PREFIX: &str = "hljs-";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Escapes `&`, `<`, `>`, `"` and `'`.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Highlights `code` as `language` into classed spans, or `None` when the
/// language is unknown.
fn highlight(language: &str, code: &str) -> Option<String> {
    let syntax = SYNTAXES.find_syntax_by_token(language)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAXES,
        ClassStyle::SpacedPrefixed {
            prefix: TOKEN_CLASS_PREFIX,
        },
    );
    for line in LinesWithEndings::from(code) {
        if let Err(error) = generator.parse_html_for_line_which_includes_newline(line) {
            debug!(language, %error, "highlighting failed, using plain code");
            return None;
        }
    }
    Some(generator.finalize())
}

fn code_block_html(language: &str, code: &str) -> String {
    let (class, body) = if language.is_empty() {
        ("hljs".to_string(), escape_html(code))
    } else {
        (
            format!("hljs language-{}", escape_html(language)),
            highlight(language, code).unwrap_or_else(|| escape_html(code)),
        )
    };
    format!("<pre class=\"code-block\"><code class=\"{class}\">{body}</code></pre>\n")
}

/// Escapes `text` and wraps each bare URL in an anchor. `None` when the text
/// holds no URL.
fn linkify_text(text: &str) -> Option<String> {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder.links(text).next()?;

    let mut linked = String::with_capacity(text.len() * 2);
    for span in finder.spans(text) {
        let escaped = escape_html(span.as_str());
        if span.kind().is_some() {
            linked.push_str("<a href=\"");
            linked.push_str(&escaped);
            linked.push_str("\">");
            linked.push_str(&escaped);
            linked.push_str("</a>");
        } else {
            linked.push_str(&escaped);
        }
    }
    Some(linked)
}

/// Renders Markdown to an HTML body fragment.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(String, String)> = None;
    let mut link_depth = 0usize;

    for event in TextMergeStream::new(Parser::new_ext(markdown, markdown_options())) {
        if let Some((language, code)) = code_block.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    events.push(Event::Html(CowStr::from(code_block_html(language, code))));
                    code_block = None;
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((language, String::new()));
            }
            Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. })) => {
                link_depth += 1;
                events.push(Event::Start(tag));
            }
            Event::End(end @ (TagEnd::Link | TagEnd::Image)) => {
                link_depth = link_depth.saturating_sub(1);
                events.push(Event::End(end));
            }
            Event::Text(text) if link_depth == 0 => match linkify_text(&text) {
                Some(linked) => events.push(Event::InlineHtml(CowStr::from(linked))),
                None => events.push(Event::Text(text)),
            },
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, events.into_iter());
    body
}

/// Renders a complete HTML page for an assembled Markdown document.
///
/// `title` may carry the `ChatGPT -` prefix; it is stripped and escaped for
/// both `<title>` and the page heading.
#[must_use]
pub fn render_html_document(markdown: &str, title: &str, source: &str, retrieved: &str) -> String {
    let body = render_markdown(markdown);
    let safe_title = escape_html(strip_title_prefix(title));
    let safe_source = escape_html(source);
    let safe_retrieved = escape_html(retrieved);
    debug!(body_bytes = body.len(), "rendered html body");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{safe_title}</title>
  <style>{INLINE_STYLE}</style>
</head>
<body>
  <article class="article">
    <h1>{safe_title}</h1>
    <div class="meta">Source: <a href="{safe_source}" rel="noreferrer noopener">{safe_source}</a><br/>Retrieved: {safe_retrieved}</div>
    {body}
  </article>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
        assert_eq!(escape_html("it's"), "it&#39;s");
    }

    #[test]
    fn test_fenced_code_keeps_language_class() {
        let html = render_markdown("```rust\nfn main() { a < b }\n```\n");
        assert!(
            html.starts_with("<pre class=\"code-block\"><code class=\"hljs language-rust\">"),
            "{html}"
        );
        assert!(html.ends_with("</code></pre>\n"), "{html}");
        assert!(html.contains("&lt;"), "{html}");
        assert!(!html.contains("a < b"), "{html}");
    }

    #[test]
    fn test_known_language_gets_token_spans() {
        let html = render_markdown("```rust\n// note\nfn main() { let s = \"hi\"; }\n```\n");
        assert!(html.contains("<span class=\"hljs-"), "{html}");
        assert!(html.contains("hljs-comment"), "{html}");
        assert!(html.contains("hljs-string"), "{html}");
        assert!(html.contains("main"), "{html}");
    }

    #[test]
    fn test_unknown_language_is_escaped_without_spans() {
        let html = render_markdown("```nosuchlang\n<b>x</b>\n```\n");
        assert_eq!(
            html,
            "<pre class=\"code-block\"><code class=\"hljs language-nosuchlang\">&lt;b&gt;x&lt;/b&gt;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_page_styles_token_classes() {
        let page = render_html_document("x\n", "t", "https://a.dev", "r");
        assert!(page.contains(".hljs-comment"));
        assert!(page.contains(".hljs-string"));
    }

    #[test]
    fn test_code_without_language_has_plain_hljs_class() {
        let html = render_markdown("```\nplain\n```\n");
        assert!(html.contains("<code class=\"hljs\">plain\n</code>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("Hello <script>alert(1)</script>\n");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_bare_url_becomes_anchor() {
        let html = render_markdown("See https://example.com/docs?a=1&b=2 for more.\n");
        assert_eq!(
            html,
            "<p>See <a href=\"https://example.com/docs?a=1&amp;b=2\">https://example.com/docs?a=1&amp;b=2</a> for more.</p>\n"
        );
    }

    #[test]
    fn test_url_in_link_or_code_is_not_linked_again() {
        let html = render_markdown("[https://a.dev](https://a.dev) and `https://b.dev`\n");
        assert_eq!(html.matches("<a ").count(), 1, "{html}");
        assert!(html.contains("<code>https://b.dev</code>"), "{html}");

        let block = render_markdown("```\nhttps://c.dev\n```\n");
        assert!(!block.contains("<a "), "{block}");
    }

    #[test]
    fn test_tables_and_strikethrough_enabled() {
        let html = render_markdown("| a | b |\n| --- | --- |\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_task_list_renders_checkbox() {
        let html = render_markdown("- [x] done\n- [ ] todo\n");
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_document_escapes_title_and_source() {
        let page = render_html_document(
            "# Heading\n",
            "ChatGPT - <Tips & Tricks>",
            "https://chatgpt.com/share/a?b=\"c\"",
            "2025-01-02T03:04:05.000Z",
        );
        assert!(page.starts_with("<!doctype html>"));
        assert!(page.contains("<title>&lt;Tips &amp; Tricks&gt;</title>"));
        assert!(page.contains("<h1>&lt;Tips &amp; Tricks&gt;</h1>"));
        assert!(page.contains("href=\"https://chatgpt.com/share/a?b=&quot;c&quot;\""));
        assert!(page.contains("Retrieved: 2025-01-02T03:04:05.000Z"));
        assert!(page.contains("<h1>Heading</h1>"));
    }
}
