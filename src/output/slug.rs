//! Filesystem-safe base names derived from conversation titles.

/// Default maximum slug length.
pub const MAX_SLUG_LEN: usize = 120;

/// Slug used when a title has no usable characters.
pub const FALLBACK_SLUG: &str = "chatgpt_conversation";

/// Appended to slugs that collide with a reserved device name.
pub const RESERVED_SUFFIX: &str = "_chatgpt";

/// Legacy device names that cannot be used as a bare file stem on Windows.
pub const RESERVED_BASENAMES: [&str; 22] = [
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Slug generation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugOptions {
    /// Maximum length in characters, at least 1.
    pub max_len: usize,
    /// Substituted when the title reduces to nothing.
    pub fallback: String,
    /// Appended to a slug equal to a reserved basename.
    pub reserved_suffix: String,
}

impl Default for SlugOptions {
    fn default() -> Self {
        Self {
            max_len: MAX_SLUG_LEN,
            fallback: FALLBACK_SLUG.to_string(),
            reserved_suffix: RESERVED_SUFFIX.to_string(),
        }
    }
}

impl SlugOptions {
    /// Derives a slug from `title`.
    ///
    /// Steps, in order: lowercase; replace each run of characters outside
    /// `[a-z0-9]` with `_`; trim `_`; substitute the fallback if empty;
    /// truncate to `max_len` and trim trailing `_`; append the reserved suffix
    /// when the result is a device name.
    #[must_use]
    pub fn slugify(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let mut slug = String::with_capacity(lowered.len());
        let mut in_separator = false;
        for ch in lowered.chars() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                slug.push(ch);
                in_separator = false;
            } else if !in_separator {
                slug.push('_');
                in_separator = true;
            }
        }

        let mut slug = slug.trim_matches('_').to_string();
        if slug.is_empty() {
            slug.clone_from(&self.fallback);
        }

        let max_len = self.max_len.max(1);
        if slug.chars().count() > max_len {
            slug = slug.chars().take(max_len).collect();
            slug.truncate(slug.trim_end_matches('_').len());
        }

        if is_reserved_basename(&slug) {
            slug.push_str(&self.reserved_suffix);
        }
        slug
    }
}

/// Derives a slug with the default limits.
///
/// ```
/// use csctm_core::output::slugify;
///
/// assert_eq!(slugify("Hello World!"), "hello_world");
/// assert_eq!(slugify("!!!"), "chatgpt_conversation");
/// assert_eq!(slugify("CON"), "con_chatgpt");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    SlugOptions::default().slugify(title)
}

/// Returns true for a bare legacy device name, ignoring case.
#[must_use]
pub fn is_reserved_basename(name: &str) -> bool {
    RESERVED_BASENAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}
