use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use csctm_core::updates::{LATEST_RELEASE_URL, latest_release_tag};
use csctm_core::{
    DEFAULT_TIMEOUT, ExportConfig, ExportOutcome, ExportRequest, ExportStep, Exporter,
    StaticPageDriver,
};
use reqwest::Client;
use tracing::{debug, info};

use crate::ProcessExit;
use crate::app::config::{FileConfig, VerbositySetting, load_config};
use crate::app::progress::StepReporter;
use crate::app::{terminal, validation};
use crate::cli::Args;

const UPDATE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Effective run settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub(crate) timeout: Duration,
    pub(crate) output_dir: PathBuf,
    pub(crate) generate_html: bool,
    pub(crate) check_updates: bool,
}

impl RunSettings {
    pub(crate) fn resolve(args: &Args, file: &FileConfig) -> Self {
        let timeout = args
            .timeout_ms
            .or(file.timeout_ms)
            .map_or(DEFAULT_TIMEOUT, Duration::from_millis);
        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let generate_html = !args.no_html && file.generate_html.unwrap_or(true);
        let check_updates = args.check_updates || file.check_updates.unwrap_or(false);
        Self {
            timeout,
            output_dir,
            generate_html,
            check_updates,
        }
    }

    /// Steps printed by one run: the export steps, the optional update
    /// check, and the final summary.
    pub(crate) fn step_count(&self) -> usize {
        ExportStep::count(self.generate_html) + usize::from(self.check_updates) + 1
    }
}

pub(crate) async fn run_export() -> Result<ProcessExit> {
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;

    let no_color = terminal::is_no_color_requested(args.no_color);
    let level = terminal::default_log_level(args.quiet, args.verbose, loaded.config.verbosity);
    terminal::init_tracing(level, no_color);
    debug!(
        path = ?loaded.path,
        from_file = loaded.loaded_from_file,
        verbosity = loaded.config.verbosity.map(VerbositySetting::as_str),
        "configuration resolved"
    );

    let url = validation::validate_share_url(&args.url)?;
    let settings = RunSettings::resolve(&args, &loaded.config);
    debug!(?settings, "run settings");

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let mut reporter = StepReporter::new(settings.step_count(), args.quiet, use_spinner);

    if settings.check_updates {
        reporter.step(&"Checking for updates");
        if let Some(tag) = check_latest_release().await
            && !args.quiet
        {
            eprintln!(
                "  Latest release: {tag} (running v{})",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    let driver = match &args.html_file {
        Some(path) => load_saved_page(path).await?,
        None => StaticPageDriver::new().context("Failed to build HTTP client")?,
    };
    let exporter = Exporter::new(
        Arc::new(driver),
        ExportConfig::default().with_timeout(settings.timeout),
    );

    let mut request = ExportRequest::new(args.url.trim(), settings.output_dir.clone());
    request.outfile.clone_from(&args.outfile);
    request.generate_html = settings.generate_html;
    info!(url = %url, "exporting conversation");

    let outcome = exporter
        .run(&request, &mut |step| reporter.export_step(step))
        .await;
    reporter.clear_spinner();
    let outcome = outcome?;

    reporter.step(&"All done");
    print_saved_paths(&outcome);
    Ok(ProcessExit::Success)
}

async fn load_saved_page(path: &Path) -> Result<StaticPageDriver> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read saved page '{}'", path.display()))?;
    debug!(path = %path.display(), bytes = html.len(), "loaded saved page");
    Ok(StaticPageDriver::from_html(html))
}

/// Returns the latest release tag, or `None` on any failure.
async fn check_latest_release() -> Option<String> {
    let client = Client::builder()
        .timeout(UPDATE_CHECK_TIMEOUT)
        .build()
        .ok()?;
    match latest_release_tag(&client, LATEST_RELEASE_URL).await {
        Ok(tag) => tag,
        Err(error) => {
            debug!(%error, "update check failed");
            None
        }
    }
}

fn print_saved_paths(outcome: &ExportOutcome) {
    println!("Saved Markdown: {}", outcome.markdown_path.display());
    if let Some(html_path) = &outcome.html_path {
        println!("Saved HTML: {}", html_path.display());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "https://chatgpt.com/share/abc";

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["csctm", URL];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_run_settings_defaults() {
        let settings = RunSettings::resolve(&args(&[]), &FileConfig::default());
        assert_eq!(settings.timeout, Duration::from_millis(60_000));
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert!(settings.generate_html);
        assert!(!settings.check_updates);
        assert_eq!(settings.step_count(), 6);
    }

    #[test]
    fn test_run_settings_file_values_apply() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("exports")),
            timeout_ms: Some(2_500),
            generate_html: Some(false),
            check_updates: Some(true),
            verbosity: None,
        };
        let settings = RunSettings::resolve(&args(&[]), &file);
        assert_eq!(settings.timeout, Duration::from_millis(2_500));
        assert_eq!(settings.output_dir, PathBuf::from("exports"));
        assert!(!settings.generate_html);
        assert!(settings.check_updates);
        assert_eq!(settings.step_count(), 6);
    }

    #[test]
    fn test_run_settings_flags_override_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("exports")),
            timeout_ms: Some(2_500),
            generate_html: Some(true),
            ..FileConfig::default()
        };
        let settings = RunSettings::resolve(
            &args(&["--timeout-ms", "900", "-d", "elsewhere", "--no-html"]),
            &file,
        );
        assert_eq!(settings.timeout, Duration::from_millis(900));
        assert_eq!(settings.output_dir, PathBuf::from("elsewhere"));
        assert!(!settings.generate_html);
        assert_eq!(settings.step_count(), 5);
    }

    #[tokio::test]
    async fn test_load_saved_page_missing_file_names_path() {
        let err = load_saved_page(Path::new("/definitely/not/here.html"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.html"));
    }
}
