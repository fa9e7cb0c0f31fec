//! Newline-delimited JSON-RPC over a byte stream (stdin/stdout in production).
//!
//! One task reads lines, one task per request runs the call, and a single
//! writer task serializes responses so concurrent calls never interleave
//! their output.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::jsonrpc::{Request, Response, RpcError};
use super::protocol::McpServer;
use super::shutdown::ShutdownController;

/// Serves requests from `reader` until EOF or shutdown, then drains.
///
/// In-flight calls get up to `grace` to finish and have their responses
/// written; calls still running after that are abandoned.
///
/// # Errors
///
/// Returns the first read or write failure on the stream.
pub async fn serve<R, W>(
    server: McpServer,
    reader: R,
    writer: W,
    shutdown: Arc<ShutdownController>,
    grace: Duration,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Response>();
    let writer_task = tokio::spawn(write_loop(writer, rx));

    let mut lines = BufReader::new(reader).lines();
    let mut shutdown_rx = shutdown.shutdown_receiver();
    let mut result = Ok(());
    shutdown.set_ready();
    tracing::info!("serving MCP over stdio");

    loop {
        if !shutdown.is_accepting() {
            tracing::info!("shutdown requested");
            break;
        }
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown_rx.changed() => continue,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("input closed");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to read input");
                result = Err(err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request = match parse_line(&line) {
            Ok(request) => request,
            Err(response) => {
                let _ = tx.send(response);
                continue;
            }
        };

        let guard = shutdown.in_flight_guard();
        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Some(response) = server.handle(request).await {
                let _ = tx.send(response);
            }
        });
    }

    shutdown.trigger_shutdown();
    drop(tx);
    if shutdown.wait_for_drain(grace).await {
        match writer_task.await {
            Ok(Err(err)) if result.is_ok() => result = Err(err),
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "response writer failed"),
        }
    } else {
        tracing::warn!(
            in_flight = shutdown.in_flight_count(),
            grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
            "abandoning in-flight calls after grace period"
        );
        writer_task.abort();
    }
    result
}

/// Parses one input line, or builds the error response it earns.
fn parse_line(line: &str) -> Result<Request, Response> {
    let value: Value = serde_json::from_str(line).map_err(|err| {
        tracing::warn!(error = %err, "unparseable input line");
        Response::failure(
            Value::Null,
            RpcError::parse_error(format!("Parse error: {err}")),
        )
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| {
        Response::failure(
            id,
            RpcError::invalid_request(format!("Invalid request: {err}")),
        )
    })
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Response>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response).map_err(io::Error::other)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
