//! End-to-end export of one shared conversation.
//!
//! [`Exporter::run`] sequences the pipeline:
//!
//! 1. navigate to the share URL (retried)
//! 2. wait for message nodes (retried)
//! 3. extract messages and title, assemble the Markdown document
//! 4. pick a collision-free target path and write it atomically
//! 5. optionally render and write the HTML companion
//!
//! Progress is reported through a caller-supplied callback so the CLI can
//! print steps and drive a spinner without the library knowing about
//! terminals.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::ExportConfig;
use crate::convert::MarkdownConverter;
use crate::document::{
    AssembleError, Conversation, assemble, format_timestamp, render_html_document,
    strip_title_prefix,
};
use crate::driver::{DriverError, PageDriver};
use crate::output::{OutputError, unique_path, write_atomic};
use crate::retry::RetryError;

/// Retry label for page navigation.
pub const NAVIGATE_LABEL: &str =
    "loading the share URL (check that the link is public and reachable)";

/// Retry label for the content wait.
pub const WAIT_LABEL: &str =
    "waiting for conversation content (page layout may have changed or the link may be private)";

/// Errors that end an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// What to export and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub url: String,
    /// Explicit Markdown path. Still suffixed if it already exists.
    pub outfile: Option<PathBuf>,
    /// Directory for the slug-named file when `outfile` is absent.
    pub output_dir: PathBuf,
    pub generate_html: bool,
}

impl ExportRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            outfile: None,
            output_dir: output_dir.into(),
            generate_html: true,
        }
    }
}

/// Pipeline stage, reported as the run enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStep {
    OpeningPage,
    WaitingForContent,
    Converting,
    WritingMarkdown,
    RenderingHtml,
}

impl ExportStep {
    /// Number of steps a run reports.
    #[must_use]
    pub fn count(generate_html: bool) -> usize {
        if generate_html { 5 } else { 4 }
    }
}

impl fmt::Display for ExportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::OpeningPage => "Opening share link",
            Self::WaitingForContent => "Waiting for conversation content",
            Self::Converting => "Converting to Markdown",
            Self::WritingMarkdown => "Writing Markdown",
            Self::RenderingHtml => "Rendering HTML",
        };
        f.write_str(message)
    }
}

/// Files written by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub markdown_path: PathBuf,
    pub html_path: Option<PathBuf>,
    /// Title with the `ChatGPT -` prefix removed.
    pub title: String,
    pub message_count: usize,
}

/// Runs exports with one driver and configuration.
pub struct Exporter {
    driver: Arc<dyn PageDriver>,
    config: ExportConfig,
    converter: MarkdownConverter,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, config: ExportConfig) -> Self {
        let converter = MarkdownConverter::with_options(config.convert.clone());
        Self {
            driver,
            config,
            converter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Loads the page and extracts the conversation, without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Retry`] when navigation or the content wait
    /// fails on every attempt, or [`ExportError::Driver`] if extraction fails.
    pub async fn fetch(
        &self,
        url: &str,
        on_step: &mut (dyn FnMut(ExportStep) + Send),
    ) -> Result<Conversation, ExportError> {
        let driver = self.driver.as_ref();
        let timeout = self.config.timeout;
        let selector = self.config.message_selector.as_str();

        on_step(ExportStep::OpeningPage);
        self.config
            .retry
            .execute(NAVIGATE_LABEL, move || driver.navigate(url, timeout))
            .await?;

        on_step(ExportStep::WaitingForContent);
        self.config
            .retry
            .execute(WAIT_LABEL, move || driver.wait_for_content(selector, timeout))
            .await?;

        let title = driver.title().await?;
        let messages = driver.extract_messages(selector).await?;
        info!(messages = messages.len(), "extracted conversation");

        Ok(Conversation {
            title,
            messages,
            source_url: url.to_string(),
            retrieved_at: Utc::now(),
        })
    }

    /// Runs the full export for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] from the first failing step; nothing is
    /// written at a final target path before the document is complete.
    #[instrument(skip(self, request, on_step), fields(url = %request.url))]
    pub async fn run(
        &self,
        request: &ExportRequest,
        on_step: &mut (dyn FnMut(ExportStep) + Send),
    ) -> Result<ExportOutcome, ExportError> {
        let conversation = self.fetch(&request.url, on_step).await?;

        on_step(ExportStep::Converting);
        let document = assemble(&conversation, &self.converter)?;
        let title = strip_title_prefix(&conversation.title).to_string();

        let requested = match &request.outfile {
            Some(path) => path.clone(),
            None => request
                .output_dir
                .join(format!("{}.md", self.config.slug.slugify(&title))),
        };
        let markdown_target = unique_path(&requested, self.config.max_suffix)?;

        on_step(ExportStep::WritingMarkdown);
        let markdown_path = write_atomic(&markdown_target, document.as_str()).await?;
        info!(path = %markdown_path.display(), "wrote markdown");

        let html_path = if request.generate_html {
            on_step(ExportStep::RenderingHtml);
            let html_target = unique_path(
                &markdown_path.with_extension("html"),
                self.config.max_suffix,
            )?;
            let page = render_html_document(
                document.as_str(),
                &conversation.title,
                &conversation.source_url,
                &format_timestamp(&conversation.retrieved_at),
            );
            let written = write_atomic(&html_target, page).await?;
            info!(path = %written.display(), "wrote html");
            Some(written)
        } else {
            None
        };

        Ok(ExportOutcome {
            markdown_path,
            html_path,
            title,
            message_count: conversation.messages.len(),
        })
    }
}
