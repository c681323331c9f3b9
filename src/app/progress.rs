//! Step lines and the page-load spinner.

use std::fmt::Display;
use std::time::Duration;

use csctm_core::ExportStep;
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) fn format_step(current: usize, total: usize, message: &dyn Display) -> String {
    format!("[{}/{total}] {message}", current.min(total))
}

/// Prints numbered steps on stderr and spins while the page loads.
///
/// In quiet mode steps are counted but nothing is printed.
#[derive(Debug)]
pub(crate) struct StepReporter {
    total: usize,
    current: usize,
    quiet: bool,
    use_spinner: bool,
    spinner: Option<ProgressBar>,
}

impl StepReporter {
    pub(crate) fn new(total: usize, quiet: bool, use_spinner: bool) -> Self {
        Self {
            total,
            current: 0,
            quiet,
            use_spinner,
            spinner: None,
        }
    }

    /// Advances to the next step and prints it.
    pub(crate) fn step(&mut self, message: &dyn Display) {
        self.clear_spinner();
        self.current += 1;
        if !self.quiet {
            eprintln!("{}", format_step(self.current, self.total, message));
        }
    }

    /// Reports a library pipeline step; loading steps keep a spinner running.
    pub(crate) fn export_step(&mut self, step: ExportStep) {
        self.step(&step);
        if matches!(step, ExportStep::OpeningPage | ExportStep::WaitingForContent) {
            self.start_spinner(&step);
        }
    }

    fn start_spinner(&mut self, message: &dyn Display) {
        if !self.use_spinner || self.quiet {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("{message}..."));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    pub(crate) fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for StepReporter {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}
