//! CLI entry point for csctm.

use std::process::ExitCode;

mod app;
mod cli;

/// Process outcome mapped to the exit status.
///
/// Usage errors exit with 2 from clap before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(value: ProcessExit) -> Self {
        match value {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_export().await {
        Ok(outcome) => outcome.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}
