use clap::Parser;
use jobtrawl_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobtrawl_cli::run(Cli::parse()).await
}
