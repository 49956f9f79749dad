//! Jobtrawl application shell.
//!
//! Thin process boundary: parses arguments, loads configuration, installs
//! logging, wires the collaborators, and runs the keyword loop. Pipeline
//! logic lives in the `crates/` directory.

pub mod args;
pub mod interrupt;
pub mod logging;
pub mod session;
pub mod state;

pub use args::Cli;
pub use session::{Session, SessionEnd};
pub use state::AppState;

use anyhow::Context;
use jobtrawl_core::AppConfig;
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Load configuration: file, then `.env`/environment, then command line.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    layer_overrides(cli, config)
}

fn layer_overrides(cli: &Cli, mut config: AppConfig) -> anyhow::Result<AppConfig> {
    config
        .apply_env_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Save the effective configuration to `--config`, or the platform config
/// path when none was given. Only a configuration that validates is written.
pub fn write_config(cli: &Cli) -> anyhow::Result<PathBuf> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path().context("locating config directory")?,
    };
    let base = if path.exists() {
        AppConfig::load(Some(&path)).context("loading configuration")?
    } else {
        AppConfig::default()
    };
    let config = layer_overrides(cli, base)?;
    config
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Run the application until quit, end of input, or Ctrl-C.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("reading .env");
        }
    }

    if cli.write_config {
        let path = write_config(&cli)?;
        println!("configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli)?;
    if let Some(path) = logging::init_tracing(&config.logging)? {
        eprintln!("logging to {}", path.display());
    }
    info!("Starting jobtrawl v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let ctrl_c = interrupt::spawn(cancel.clone());

    let state = AppState::build(config, cancel.clone(), !cli.show_browser).await?;
    let session = Session::new(
        &state.orchestrator,
        state.config.crawl.quit_token.clone(),
        cancel.clone(),
    )
    .with_report_dir(cli.report_dir.clone());

    let mut stdout = tokio::io::stdout();
    if let Some(keyword) = &cli.keyword {
        session.run_keyword(keyword, &mut stdout).await?;
    } else {
        let end = session
            .run(BufReader::new(tokio::io::stdin()), &mut stdout)
            .await?;
        info!(?end, "session ended");
    }

    ctrl_c.abort();
    state.shutdown().await;
    Ok(())
}
