//! `postman-mcp`: serves the Postman API to MCP clients over stdin/stdout.
//!
//! stdout carries only protocol messages; all logging goes to stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use postman_mcp_server::cli::{Cli, LogFormat};
use postman_mcp_server::network::{serve, McpServer, ShutdownController};
use postman_mcp_server::service::Dispatcher;
use postman_mcp_server::upstream::HttpUpstream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let text = (format == LogFormat::Text)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let upstream_config = cli.upstream_config();
    tracing::info!(config = ?upstream_config, "starting postman-mcp");
    let upstream =
        HttpUpstream::new(&upstream_config).context("failed to configure the Postman API client")?;

    let config = cli.server_config();
    let grace = config.shutdown_grace();
    let dispatcher = Dispatcher::build(Arc::new(upstream), config)
        .context("failed to build the operation catalog")?;
    let server = McpServer::new(Arc::new(dispatcher));

    let shutdown = Arc::new(ShutdownController::new());
    let on_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.trigger_shutdown();
        }
    });

    serve(
        server,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown,
        grace,
    )
    .await
    .context("stdio transport failed")?;
    tracing::info!("postman-mcp stopped");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let result = runtime.block_on(run(cli));
    // a pending blocking stdin read must not hold the process open
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}
