//! Command-line arguments.

use clap::Parser;
use jobtrawl_core::AppConfig;
use std::path::PathBuf;

/// Crawl job listings by keyword, enrich them with an LLM, and store them.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "jobtrawl", version, about)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a text report per keyword into this directory
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Override the maximum number of search pages per keyword
    #[arg(long, value_name = "N")]
    pub max_pages: Option<u32>,

    /// Override the fetch concurrency ceiling
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Run a single pass for this keyword instead of prompting
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Show the browser window when using the browser fetch backend
    #[arg(long)]
    pub show_browser: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub write_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
    }
}
