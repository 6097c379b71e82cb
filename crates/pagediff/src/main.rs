mod cli;
mod commands;
mod compare;
mod config;
mod error;
mod raster;
mod report;
mod session;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagediff=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Compare {
            a,
            b,
            scale,
            threshold,
            out_dir,
            no_images,
        } => {
            let options = config::resolve(config::CliOverrides { scale, threshold })?;
            let code = commands::compare(a, b, options, out_dir, no_images).await?;
            std::process::exit(code);
        }
    }
}
