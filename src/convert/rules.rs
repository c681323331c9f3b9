//! Ordered conversion rules for the HTML to Markdown walker.
//!
//! A [`RuleSet`] is evaluated first-match-wins: the first rule whose filter
//! accepts an element produces its Markdown. Priority is therefore the rule's
//! position in the list, and [`RuleSet::insert_before`] is how a rule is given
//! precedence over a built-in one.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};

use super::markdown::{CodeBlockStyle, HeadingStyle, MarkdownConverter, collapse_blank_lines};

/// Name of the built-in generic `<pre>` rule.
pub const CODE_BLOCK_RULE: &str = "code_block";

/// Name of the language-preserving fenced code rule.
pub const FENCED_CODE_LANGUAGE_RULE: &str = "fenced_code_language";

#[allow(clippy::expect_used)]
static LANGUAGE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"language-([\w-]+)").expect("language class regex is valid")
});

/// Predicate deciding whether a rule applies to an element.
pub type RuleFilter = fn(ElementRef<'_>) -> bool;

/// Produces Markdown for a matched element.
///
/// The converter is passed in so a rule can convert the element's children
/// only when it needs them.
pub type RuleReplacement = fn(&MarkdownConverter, ElementRef<'_>) -> String;

/// A single named conversion rule.
#[derive(Clone, Copy)]
pub struct Rule {
    name: &'static str,
    filter: RuleFilter,
    replacement: RuleReplacement,
}

impl Rule {
    /// Creates a rule.
    #[must_use]
    pub const fn new(name: &'static str, filter: RuleFilter, replacement: RuleReplacement) -> Self {
        Self {
            name,
            filter,
            replacement,
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true when the rule applies to `element`.
    #[must_use]
    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        (self.filter)(element)
    }

    /// Produces the Markdown for `element`.
    #[must_use]
    pub fn apply(&self, converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
        (self.replacement)(converter, element)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Priority-ordered list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in rules, without the language-preserving code rule.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                Rule::new("remove", is_removed, |_, _| String::new()),
                Rule::new("paragraph", |el| has_name(el, &["p"]), paragraph),
                Rule::new("line_break", |el| has_name(el, &["br"]), |_, _| "  \n".to_string()),
                Rule::new("heading", |el| heading_level(el).is_some(), heading),
                Rule::new("blockquote", |el| has_name(el, &["blockquote"]), blockquote),
                Rule::new("list", |el| has_name(el, &["ul", "ol"]), list),
                Rule::new("list_item", |el| has_name(el, &["li"]), list_item),
                Rule::new("horizontal_rule", |el| has_name(el, &["hr"]), |_, _| {
                    "\n\n---\n\n".to_string()
                }),
                Rule::new(CODE_BLOCK_RULE, |el| has_name(el, &["pre"]), code_block),
                Rule::new("inline_code", |el| has_name(el, &["code"]), inline_code),
                Rule::new("strikethrough", |el| has_name(el, &["del", "s", "strike"]), |c, el| {
                    wrap_inline(&c.convert_children(el), "~~")
                }),
                Rule::new("strong", |el| has_name(el, &["strong", "b"]), |c, el| {
                    wrap_inline(&c.convert_children(el), "**")
                }),
                Rule::new("emphasis", |el| has_name(el, &["em", "i"]), |c, el| {
                    wrap_inline(&c.convert_children(el), "_")
                }),
                Rule::new("link", |el| has_name(el, &["a"]), link),
                Rule::new("image", |el| has_name(el, &["img"]), image),
                Rule::new("table", |el| has_name(el, &["table"]), table),
            ],
        }
    }

    /// Appends a rule with the lowest priority.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Inserts `rule` immediately before the rule named `anchor`.
    ///
    /// When no rule has that name the new rule is placed first. Returns
    /// whether the anchor was found.
    pub fn insert_before(&mut self, anchor: &str, rule: Rule) -> bool {
        if let Some(index) = self.position(anchor) {
            self.rules.insert(index, rule);
            true
        } else {
            self.rules.insert(0, rule);
            false
        }
    }

    /// Returns the index of the rule named `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    /// Returns the first rule matching `element`.
    #[must_use]
    pub fn find(&self, element: ElementRef<'_>) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(element))
    }

    /// Rule names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(Rule::name)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// `<pre>` whose first element child is `<code>`, emitted as a fenced block
/// tagged with the `language-<tag>` class of the inner `<code>`.
#[must_use]
pub fn fenced_code_with_language() -> Rule {
    Rule::new(
        FENCED_CODE_LANGUAGE_RULE,
        |el| has_name(el, &["pre"]) && first_element_child(el).is_some_and(|c| has_name(c, &["code"])),
        |_, el| {
            let Some(code) = first_element_child(el) else {
                return String::new();
            };
            let language = code_language(code.value().attr("class").unwrap_or(""));
            let text = code.text().collect::<String>().replace('\u{a0}', " ");
            format!("\n\n```{language}\n{text}\n```\n\n")
        },
    )
}

/// Extracts the `language-<tag>` token of a class attribute, or "".
#[must_use]
pub fn code_language(class: &str) -> &str {
    LANGUAGE_CLASS
        .captures(class)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Elements rendered as blocks separated by blank lines.
#[must_use]
pub fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "body"
            | "center"
            | "dd"
            | "details"
            | "dialog"
            | "dir"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "frameset"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "html"
            | "li"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "summary"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

pub(crate) fn has_name(element: ElementRef<'_>, names: &[&str]) -> bool {
    let name = element.value().name();
    names.iter().any(|candidate| name.eq_ignore_ascii_case(candidate))
}

pub(crate) fn first_element_child(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.children().find_map(ElementRef::wrap)
}

pub(crate) fn is_removed(element: ElementRef<'_>) -> bool {
    has_name(
        element,
        &["script", "style", "button", "svg", "noscript", "template", "head"],
    )
}

fn heading_level(element: ElementRef<'_>) -> Option<usize> {
    match element.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn paragraph(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    format!("\n\n{}\n\n", converter.convert_children(element).trim())
}

fn heading(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let level = heading_level(element).unwrap_or(1);
    let content = converter.convert_children(element);
    let content = content.trim().replace('\n', " ");
    if converter.options().heading_style == HeadingStyle::Setext && level <= 2 {
        let underline = if level == 1 { '=' } else { '-' };
        let width = content.chars().count().max(3);
        format!("\n\n{content}\n{}\n\n", underline.to_string().repeat(width))
    } else {
        format!("\n\n{} {content}\n\n", "#".repeat(level))
    }
}

fn blockquote(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let content = collapse_blank_lines(&converter.convert_children(element));
    let quoted = content
        .trim()
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n{quoted}\n\n")
}

fn list(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let content = converter.convert_children(element);
    let inside_item = element
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| has_name(parent, &["li"]));
    if inside_item {
        format!("\n{}\n", content.trim_end())
    } else {
        format!("\n\n{}\n\n", content.trim_end())
    }
}

fn list_item(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let parent = element.parent().and_then(ElementRef::wrap);
    let prefix = match parent {
        Some(list) if has_name(list, &["ol"]) => {
            let start = list
                .value()
                .attr("start")
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(1);
            let preceding = element
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|sibling| has_name(*sibling, &["li"]))
                .count();
            let number = start.saturating_add(i64::try_from(preceding).unwrap_or(i64::MAX));
            format!("{number}. ")
        }
        _ => format!("{} ", converter.options().bullet_marker),
    };

    let content = converter.convert_children(element);
    let indent = " ".repeat(prefix.len());
    let body = content
        .trim()
        .lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{prefix}{body}\n")
}

fn code_block(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let mut text = String::new();
    push_preformatted_text(element, &mut text);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    match converter.options().code_block_style {
        CodeBlockStyle::Fenced => format!("\n\n```\n{text}\n```\n\n"),
        CodeBlockStyle::Indented => {
            let indented = text
                .lines()
                .map(|line| format!("    {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n\n{indented}\n\n")
        }
    }
}

/// Appends the text of `element`, skipping removed elements and ending each
/// block child on its own line.
fn push_preformatted_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_removed(child) {
                    continue;
                }
                if has_name(child, &["br"]) {
                    out.push('\n');
                    continue;
                }
                push_preformatted_text(child, out);
                if is_block(child.value().name()) && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn inline_code(_: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let text = element.text().collect::<String>();
    if text.is_empty() {
        return String::new();
    }
    let longest_run = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let delimiter = "`".repeat(longest_run + 1);
    let padding = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{delimiter}{padding}{text}{padding}{delimiter}")
}

/// Wraps inline content in `delimiter`, keeping flanking whitespace outside.
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let leading = if content.starts_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    let trailing = if content.ends_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    format!("{leading}{delimiter}{trimmed}{delimiter}{trailing}")
}

fn link(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let content = converter.convert_children(element);
    let Some(href) = element.value().attr("href").filter(|h| !h.trim().is_empty()) else {
        return content;
    };
    let href = href.trim().replace('(', "%28").replace(')', "%29");
    let title = element
        .value()
        .attr("title")
        .filter(|t| !t.is_empty())
        .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
        .unwrap_or_default();
    let text = content.trim();
    let text = if text.is_empty() { href.as_str() } else { text };
    format!("[{text}]({href}{title})")
}

fn image(_: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let Some(src) = element.value().attr("src").filter(|s| !s.trim().is_empty()) else {
        return String::new();
    };
    let alt = element.value().attr("alt").unwrap_or("");
    format!("![{alt}]({})", src.trim())
}

fn table(converter: &MarkdownConverter, element: ElementRef<'_>) -> String {
    let rows: Vec<Vec<String>> = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|row| has_name(*row, &["tr"]))
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| has_name(*cell, &["td", "th"]))
                .map(|cell| table_cell(converter, cell))
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return format!("\n\n{}\n\n", converter.convert_children(element).trim());
    }

    let render_row = |cells: &[String]| {
        let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
        padded.resize(columns, "");
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(rows[0].as_slice()));
    lines.push(format!("| {} |", vec!["---"; columns].join(" | ")));
    lines.extend(rows[1..].iter().map(|row| render_row(row.as_slice())));
    format!("\n\n{}\n\n", lines.join("\n"))
}

fn table_cell(converter: &MarkdownConverter, cell: ElementRef<'_>) -> String {
    converter
        .convert_children(cell)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}
