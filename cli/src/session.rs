//! Interactive keyword loop.

use jobtrawl_pipeline::{write_report, Orchestrator, PassReport};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The quit token was entered
    Quit,
    /// Input reached end of file
    EndOfInput,
    /// Termination was requested
    Cancelled,
}

/// Prompts for keywords and runs one pass per keyword.
pub struct Session<'a> {
    orchestrator: &'a Orchestrator,
    quit_token: String,
    report_dir: Option<PathBuf>,
    cancel: CancellationToken,
}

impl<'a> Session<'a> {
    /// Create a session; entering `quit_token` ends it.
    #[must_use]
    pub fn new(
        orchestrator: &'a Orchestrator,
        quit_token: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            quit_token: quit_token.into(),
            report_dir: None,
            cancel,
        }
    }

    /// Write a keyword report into `dir` after each pass.
    #[must_use]
    pub fn with_report_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.report_dir = dir;
        self
    }

    /// Read keywords from `input` until the quit token, end of input, or cancellation.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            let prompt = format!("Keyword ('{}' to quit): ", self.quit_token);
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            };
            let Some(line) = line else {
                return Ok(SessionEnd::EndOfInput);
            };

            let keyword = line.trim();
            if keyword.eq_ignore_ascii_case(&self.quit_token) {
                info!("quit requested");
                return Ok(SessionEnd::Quit);
            }
            if keyword.is_empty() {
                continue;
            }

            self.run_keyword(keyword, &mut output).await?;
            if self.cancel.is_cancelled() {
                return Ok(SessionEnd::Cancelled);
            }
        }
    }

    /// Run one pass and print its summary. Pass failures are reported, not returned.
    pub async fn run_keyword<W>(&self, keyword: &str, output: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self.orchestrator.run_pass(keyword).await {
            Ok(report) => {
                output.write_all(format!("{report}\n").as_bytes()).await?;
                self.write_report(&report).await;
            }
            Err(e) => {
                error!(keyword, "pass failed: {e}");
                output
                    .write_all(format!("pass for '{keyword}' failed: {e}\n").as_bytes())
                    .await?;
            }
        }
        output.flush().await
    }

    async fn write_report(&self, report: &PassReport) {
        let Some(dir) = &self.report_dir else {
            return;
        };
        match self
            .orchestrator
            .gateway()
            .fetch_by_keyword(&report.keyword)
            .await
        {
            Ok(records) => {
                if let Err(e) = write_report(dir, &report.keyword, &records) {
                    warn!(dir = %dir.display(), "failed to write report: {e}");
                }
            }
            Err(e) => warn!("failed to read records for report: {e}"),
        }
    }
}
