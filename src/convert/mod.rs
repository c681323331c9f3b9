//! Message fragment to Markdown conversion.
//!
//! A fragment goes through two stages:
//!
//! 1. [`sanitize`] strips citation pills and editor position attributes.
//! 2. [`MarkdownConverter`] converts the clean fragment with an ordered rule
//!    table in which the language-preserving code rule precedes the generic
//!    `<pre>` rule.
//!
//! [`MarkdownConverter::convert_message`] runs both stages and normalises the
//! result (blank-line runs collapsed, outer whitespace trimmed).
//!
//! # Example
//!
//! ```
//! use csctm_core::convert::{MarkdownConverter, sanitize};
//!
//! let html = r#"<p data-start="0" data-end="5">Hello</p>"#;
//! assert_eq!(sanitize(html), "<p>Hello</p>");
//! assert_eq!(MarkdownConverter::new().convert_message(html), "Hello");
//! ```

mod markdown;
pub mod rules;
mod sanitize;

pub use markdown::{
    CodeBlockStyle, ConvertOptions, HeadingStyle, MarkdownConverter, collapse_blank_lines,
    escape_markdown,
};
pub use rules::{Rule, RuleSet};
pub use sanitize::sanitize;
