use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ControllerOptions, FetchFailurePolicy, HttpRecordsBackend, ListController};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod session;

use config::{load_settings, CliOverrides};
use render::TerminalRenderer;

/// Browse and edit the records of a REST resource from the terminal.
#[derive(Parser, Debug)]
#[command(name = "grid", version)]
struct Args {
    /// Config file (defaults to ./grid.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base url; a path prefix such as `/app` is kept.
    #[arg(long)]
    server_url: Option<String>,
    /// Resource path joined below the server url.
    #[arg(long)]
    records_path: Option<String>,
    #[arg(long)]
    id_field: Option<String>,
    /// What the table does when a fetch fails: keep or clear.
    #[arg(long)]
    on_fetch_failure: Option<FetchFailurePolicy>,
    /// Log filter directive, e.g. `info` or `client_core=debug`.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            server_url: self.server_url.clone(),
            records_path: self.records_path.clone(),
            id_field: self.id_field.clone(),
            on_fetch_failure: self.on_fetch_failure,
            log_filter: self.log.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(args.config.as_deref(), &args.overrides())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let backend = HttpRecordsBackend::new(&settings.server_url, &settings.records_path)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    info!(
        endpoint = %backend.endpoint(),
        on_fetch_failure = %settings.on_fetch_failure,
        "grid: starting"
    );

    let renderer = Arc::new(TerminalRenderer::stdout());
    let controller = ListController::with_options(
        Arc::new(backend),
        renderer.clone(),
        ControllerOptions {
            id_field: settings.id_field.clone(),
            on_fetch_failure: settings.on_fetch_failure,
        },
    );

    // A failed first load is logged by the controller; the prompt still
    // opens so the user can retry.
    let _ = controller.refresh().await;
    renderer.write_line("type 'help' for commands");

    let mut input = io::BufReader::new(io::stdin());
    session::run(&controller, &renderer, &mut input).await?;

    info!("grid: bye");
    Ok(())
}
