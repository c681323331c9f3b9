//! Config file loading for CLI defaults.
//!
//! The file holds `key = value` lines with `#` comments. Strings are double
//! quoted. Command-line flags override anything set here.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Upper bound shared with `--timeout-ms`.
pub(crate) const MAX_TIMEOUT_MS: u64 = 600_000;

/// Defaults read from the config file. Unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Directory for title-named output files.
    pub(crate) output_dir: Option<PathBuf>,
    /// Page load and content wait timeout in milliseconds.
    pub(crate) timeout_ms: Option<u64>,
    /// Write the HTML companion file.
    pub(crate) generate_html: Option<bool>,
    /// Look up the latest release on every run.
    pub(crate) check_updates: Option<bool>,
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    fn validate(&self) -> Result<()> {
        if let Some(timeout_ms) = self.timeout_ms
            && !(1..=MAX_TIMEOUT_MS).contains(&timeout_ms)
        {
            bail!(
                "Invalid config value for `timeout_ms`: {timeout_ms}. Expected range: 1..={MAX_TIMEOUT_MS}"
            );
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Where the config came from, if anywhere.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoadedConfig {
    pub(crate) path: Option<PathBuf>,
    pub(crate) config: FileConfig,
    pub(crate) loaded_from_file: bool,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/csctm/config.toml`
/// 2. `$HOME/.config/csctm/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("csctm").join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("csctm")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` if given, otherwise the default path when it exists.
///
/// A missing default file is not an error; a missing explicit file is.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            ..LoadedConfig::default()
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `output_dir` value on line {line_number}")
                })?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "timeout_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `timeout_ms` value on line {line_number}")
                })?;
                cfg.timeout_ms = Some(parsed);
            }
            "generate_html" => {
                let parsed = parse_boolean(value).with_context(|| {
                    format!("Invalid `generate_html` value on line {line_number}")
                })?;
                cfg.generate_html = Some(parsed);
            }
            "check_updates" => {
                let parsed = parse_boolean(value).with_context(|| {
                    format!("Invalid `check_updates` value on line {line_number}")
                })?;
                cfg.check_updates = Some(parsed);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `verbosity` value on line {line_number}")
                })?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn error_chain(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/tmp/exports"
timeout_ms = 30000
generate_html = false
check_updates = true
verbosity = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/exports")));
        assert_eq!(cfg.timeout_ms, Some(30_000));
        assert_eq!(cfg.generate_html, Some(false));
        assert_eq!(cfg.check_updates, Some(true));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_empty_leaves_everything_unset() {
        assert_eq!(parse_config_str("\n# only a comment\n").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
timeout_ms = 5000 # slow network
output_dir = "exports # not a comment"
"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_ms, Some(5000));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("exports # not a comment")));
    }

    #[test]
    fn test_parse_config_error_names_key_and_line() {
        let err = parse_config_str("generate_html = true\ntimeout_ms = soon").unwrap_err();
        let message = error_chain(&err);
        assert!(message.contains("timeout_ms"), "{message}");
        assert!(message.contains("line 2"), "{message}");
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("\n\noutput_dir").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("output_dir = exports").unwrap_err();
        assert!(error_chain(&err).contains("double-quoted"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("check_updates = yes").unwrap_err();
        assert!(err.to_string().contains("check_updates"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_verbosity() {
        let err = parse_config_str(r#"verbosity = "loud""#).unwrap_err();
        assert!(err.to_string().contains("'loud'"));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_timeout() {
        let err = parse_config_str("timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
        let err = parse_config_str("timeout_ms = 600001").unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
        let err = parse_config_str("timeout_ms = -5").unwrap_err();
        assert!(error_chain(&err).contains("non-negative"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("concurrency = 4").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_verbosity_as_str() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Verbose.as_str(), "verbose");
        assert_eq!(VerbositySetting::Quiet.as_str(), "quiet");
        assert_eq!(VerbositySetting::Debug.as_str(), "debug");
    }

    // ==================== Loading Tests ====================

    #[test]
    fn test_load_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "generate_html = false\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();

        assert!(loaded.loaded_from_file);
        assert_eq!(loaded.path, Some(path));
        assert_eq!(loaded.config.generate_html, Some(false));
    }

    #[test]
    fn test_load_config_explicit_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");

        let err = load_config(Some(&path)).unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_default_location_from_xdg() {
        let temp = TempDir::new().unwrap();
        let prev = env::var_os("XDG_CONFIG_HOME");
        // SAFETY: test isolates env change and restores on drop.
        unsafe { env::set_var("XDG_CONFIG_HOME", temp.path()) };
        let _restore = RestoreEnv::new("XDG_CONFIG_HOME", prev);

        let loaded = load_config(None).unwrap();
        assert!(!loaded.loaded_from_file);
        assert_eq!(
            loaded.path,
            Some(temp.path().join("csctm").join("config.toml"))
        );

        fs::create_dir_all(temp.path().join("csctm")).unwrap();
        fs::write(
            temp.path().join("csctm").join("config.toml"),
            "timeout_ms = 1234\n",
        )
        .unwrap();

        let loaded = load_config(None).unwrap();
        assert!(loaded.loaded_from_file);
        assert_eq!(loaded.config.timeout_ms, Some(1234));
    }

    /// Restores an env var to its previous value (or removes it) when dropped.
    struct RestoreEnv {
        key: &'static str,
        value: Option<std::ffi::OsString>,
    }

    impl RestoreEnv {
        fn new(key: &'static str, value: Option<std::ffi::OsString>) -> Self {
            Self { key, value }
        }
    }

    impl Drop for RestoreEnv {
        fn drop(&mut self) {
            // SAFETY: test restores env to prior state.
            match &self.value {
                Some(v) => unsafe { env::set_var(self.key, v) },
                None => unsafe { env::remove_var(self.key) },
            }
        }
    }
}
