//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Convert a shared ChatGPT conversation into Markdown and HTML files.
///
/// The Markdown file is named after the conversation title and written to the
/// current directory unless `--outfile` or `--output-dir` says otherwise.
/// Existing files are never overwritten; a numeric suffix is added instead.
#[derive(Parser, Debug)]
#[command(name = "csctm")]
#[command(author, version, about)]
pub struct Args {
    /// Public share URL, e.g. https://chatgpt.com/share/<id>
    pub url: String,

    /// Page load and content wait timeout in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub timeout_ms: Option<u64>,

    /// Markdown output path (suffixed if it already exists)
    #[arg(short, long, value_name = "PATH")]
    pub outfile: Option<PathBuf>,

    /// Directory for the title-named output files
    #[arg(short = 'd', long, value_name = "DIR", conflicts_with = "outfile")]
    pub output_dir: Option<PathBuf>,

    /// Read the share page from a saved HTML file instead of fetching it
    #[arg(long, value_name = "PATH")]
    pub html_file: Option<PathBuf>,

    /// Skip the HTML companion file
    #[arg(long)]
    pub no_html: bool,

    /// Look up the latest published release before exporting
    #[arg(long)]
    pub check_updates: bool,

    /// Suppress step output and non-error logs
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
