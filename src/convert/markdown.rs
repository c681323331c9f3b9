//! HTML fragment to Markdown conversion.
//!
//! [`MarkdownConverter`] walks a parsed fragment and hands every element to
//! the first matching [`Rule`](super::rules::Rule) of its [`RuleSet`]. Text
//! nodes are emitted with whitespace collapsed and Markdown-significant
//! characters escaped. Elements no rule matches pass their content through,
//! block elements separated by blank lines.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, instrument};

use super::rules::{
    CODE_BLOCK_RULE, RuleSet, fenced_code_with_language, has_name, is_block, is_removed,
};
use super::sanitize::sanitize;

#[allow(clippy::expect_used)]
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line regex is valid"));

#[allow(clippy::expect_used)]
static HTML_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n\x0C]+").expect("whitespace regex is valid"));

#[allow(clippy::expect_used)]
static LEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-|\+ |=+|#{1,6} |~~~|>)").expect("leading marker regex is valid")
});

#[allow(clippy::expect_used)]
static LEADING_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\. ").expect("leading ordinal regex is valid"));

/// Heading syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// Underlined with `=` or `-` for levels 1 and 2; deeper levels use ATX.
    Setext,
}

/// Syntax for generic `<pre>` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeBlockStyle {
    /// Triple-backtick fences.
    #[default]
    Fenced,
    /// Four-space indentation.
    Indented,
}

/// Converter options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    pub bullet_marker: char,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_marker: '-',
        }
    }
}

/// Rule-driven HTML to Markdown converter.
///
/// # Example
///
/// ```
/// use csctm_core::convert::MarkdownConverter;
///
/// let converter = MarkdownConverter::new();
/// let markdown = converter.convert_message(
///     r#"<pre><code class="language-python">x = 1</code></pre>"#,
/// );
/// assert_eq!(markdown, "```python\nx = 1\n```");
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: ConvertOptions,
    rules: RuleSet,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter {
    /// Converter with default options and the language-preserving code rule.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ConvertOptions::default())
    }

    /// Converter with custom options and the language-preserving code rule.
    #[must_use]
    pub fn with_options(options: ConvertOptions) -> Self {
        let mut rules = RuleSet::builtin();
        rules.insert_before(CODE_BLOCK_RULE, fenced_code_with_language());
        Self { options, rules }
    }

    /// Converter with an explicit rule set.
    #[must_use]
    pub fn with_rules(options: ConvertOptions, rules: RuleSet) -> Self {
        Self { options, rules }
    }

    #[must_use]
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Converts an HTML fragment to raw Markdown.
    ///
    /// The result is not normalised: it may start or end with newlines and
    /// contain runs of blank lines. See [`MarkdownConverter::convert_message`].
    #[must_use]
    pub fn convert(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        self.convert_children(fragment.root_element())
    }

    /// Sanitizes, converts and normalises one message fragment.
    #[instrument(skip(self, html), fields(html_len = html.len()))]
    #[must_use]
    pub fn convert_message(&self, html: &str) -> String {
        let markdown = self.convert(&sanitize(html));
        let markdown = collapse_blank_lines(&markdown).trim().to_string();
        debug!(markdown_len = markdown.len(), "converted message");
        markdown
    }

    /// Converts every child node of `element` and concatenates the results.
    #[must_use]
    pub fn convert_children(&self, element: ElementRef<'_>) -> String {
        let parent_is_block = is_block(element.value().name());
        element
            .children()
            .map(|child| match child.value() {
                Node::Text(text) => {
                    let prev = child.prev_sibling();
                    let next = child.next_sibling();
                    let touches_block = [prev, next]
                        .into_iter()
                        .flatten()
                        .filter_map(ElementRef::wrap)
                        .any(|sibling| is_block(sibling.value().name()));
                    let at_edge = prev.is_none() || next.is_none();
                    let starts_line = begins_line(
                        child
                            .prev_siblings()
                            .map(|node| line_effect(node.value(), ElementRef::wrap(node))),
                        element,
                    );
                    convert_text(
                        text,
                        touches_block || (parent_is_block && at_edge),
                        starts_line,
                    )
                }
                Node::Element(_) => ElementRef::wrap(child)
                    .map(|child| self.convert_element(child))
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .collect()
    }

    fn convert_element(&self, element: ElementRef<'_>) -> String {
        match self.rules.find(element) {
            Some(rule) => rule.apply(self, element),
            None => self.pass_through(element),
        }
    }

    fn pass_through(&self, element: ElementRef<'_>) -> String {
        let content = self.convert_children(element);
        if is_block(element.value().name()) {
            format!("\n\n{}\n\n", content.trim())
        } else {
            content
        }
    }
}

/// Replaces every run of three or more newlines with exactly two.
#[must_use]
pub fn collapse_blank_lines(markdown: &str) -> String {
    BLANK_LINE_RUN.replace_all(markdown, "\n\n").into_owned()
}

/// Escapes characters that would otherwise be read as Markdown syntax,
/// including block markers at the start of `text`.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let escaped = escape_inline(text);
    if LEADING_MARKER.is_match(&escaped) {
        return format!("\\{escaped}");
    }
    LEADING_ORDINAL.replace(&escaped, r"$1\. ").into_owned()
}

fn escape_inline(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '`' | '[' | ']' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Whitespace-only text next to a block, or at the edge of a block parent,
/// carries no meaning and is dropped when `droppable`. Block markers are only
/// escaped when the text `starts_line`.
fn convert_text(text: &str, droppable: bool, starts_line: bool) -> String {
    if text.trim_matches(is_html_whitespace).is_empty() {
        return if droppable { String::new() } else { " ".to_string() };
    }
    let collapsed = HTML_WHITESPACE.replace_all(text, " ");
    if starts_line {
        escape_markdown(&collapsed)
    } else {
        escape_inline(&collapsed)
    }
}

/// How a preceding node affects whether following text begins a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEffect {
    /// Renders nothing.
    Transparent,
    /// Ends the line.
    Breaks,
    /// Leaves inline content on the line.
    Continues,
}

fn line_effect(node: &Node, element: Option<ElementRef<'_>>) -> LineEffect {
    match (node, element) {
        (Node::Text(text), _) if text.trim_matches(is_html_whitespace).is_empty() => {
            LineEffect::Transparent
        }
        (Node::Text(_), _) => LineEffect::Continues,
        (_, Some(element)) if is_removed(element) => LineEffect::Transparent,
        (_, Some(element)) if is_block(element.value().name()) || has_name(element, &["br"]) => {
            LineEffect::Breaks
        }
        (_, Some(_)) => LineEffect::Continues,
        _ => LineEffect::Transparent,
    }
}

/// First non-transparent effect among `effects`, as "begins a line".
fn leading_effect(mut effects: impl Iterator<Item = LineEffect>) -> Option<bool> {
    effects
        .find(|effect| *effect != LineEffect::Transparent)
        .map(|effect| effect == LineEffect::Breaks)
}

/// Whether text after `preceding` (nearest sibling first) inside `parent`
/// begins a Markdown line. Inline ancestors are climbed until a block.
fn begins_line(preceding: impl Iterator<Item = LineEffect>, parent: ElementRef<'_>) -> bool {
    if let Some(begins) = leading_effect(preceding) {
        return begins;
    }
    let mut current = parent;
    loop {
        if is_block(current.value().name()) {
            return true;
        }
        let siblings = current
            .prev_siblings()
            .map(|node| line_effect(node.value(), ElementRef::wrap(node)));
        if let Some(begins) = leading_effect(siblings) {
            return begins;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(ancestor) => current = ancestor,
            None => return true,
        }
    }
}

fn is_html_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\x0C')
}
