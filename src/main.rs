use anyhow::{Context, Result};
use clap::Parser;
use gort::cli::{self, Args};
use gort::config::EngineSettings;
use gort::raw;
use std::io;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = run(args).await {
        cli::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => EngineSettings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::load().context("loading settings")?,
    };

    let builder = args.builder(&settings);
    let scan_type = builder.selected_scan_type();
    if scan_type.requires_privileges() && !raw::is_privileged() {
        cli::print_warning(&format!(
            "{scan_type} scan requires root/sudo privileges for raw socket access."
        ));
    }

    let outcome = builder
        .run()
        .await
        .with_context(|| format!("{scan_type} scan of {} failed", args.target))?;

    let stdout = io::stdout();
    cli::render(&mut stdout.lock(), &outcome, args.json).context("writing results")?;
    Ok(())
}
