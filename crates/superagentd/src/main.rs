//! superagentd - SuperAgent HTTP service
//!
//! Serves the build pipeline over HTTP and hosts generated projects for
//! preview under `/apps`.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

use superagent_core::{select_client, SuperAgentConfig};

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "superagentd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SuperAgent build service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SUPERAGENT_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Directory projects and checkpoints are written to
    #[arg(long, env = "SUPERAGENT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    superagent_core::init_tracing(args.log_json, level);

    let mut config = SuperAgentConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let client = select_client(&config.llm).context("No LLM provider configured")?;
    info!(
        provider = client.provider(),
        model = client.model(),
        output_dir = %config.output_dir.display(),
        "starting superagentd"
    );

    let state = AppState::from_config(&config, client).context("Failed to prepare build services")?;
    let app = routes::router(state);

    let listener = match tokio::net::TcpListener::bind(args.bind).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            error!(addr = %args.bind, "address already in use; is another superagentd running?");
            return Err(e).context("Failed to bind listener");
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to bind {}", args.bind)),
    };
    info!(addr = %args.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("superagentd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
