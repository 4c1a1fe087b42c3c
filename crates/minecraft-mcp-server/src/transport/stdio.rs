//! stdio transport for MCP JSON-RPC
//!
//! One JSON message per line. Each request is handled on its own task so a
//! slow tool does not hold up the others; writes share one stdout mutex.

use crate::McpServer;
use crate::mcp::Response;
use minecraft_mcp_core::{McpError, Result, error_codes};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long requests still running at EOF get to answer
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run the MCP server on stdio
pub async fn run(server: Arc<McpServer>) -> Result<()> {
    info!("Minecraft MCP server starting on stdio");
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serve requests from `reader` until EOF, writing responses to `writer`
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = Arc::new(Mutex::new(writer));
    let mut lines = reader.lines();
    let mut in_flight = JoinSet::new();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => {
                line.map_err(|e| McpError::transport("Failed to read stdin", &e))?
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
        };

        let Some(line) = line else {
            // EOF - client disconnected
            info!("Client disconnected (EOF)");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!("Received: {}", trimmed);

        let request = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let response = Response::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                );
                write_message(&writer, &response).await?;
                continue;
            }
        };

        let server = server.clone();
        let writer = writer.clone();
        in_flight.spawn(async move {
            if let Some(response) = server.handle_request(request).await {
                if let Err(e) = write_message(&writer, &response).await {
                    error!("Failed to write response: {}", e);
                }
            }
        });
    }

    let drain = async { while in_flight.join_next().await.is_some() {} };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!(
            "Abandoning {} requests still running after EOF",
            in_flight.len()
        );
        in_flight.shutdown().await;
    }

    Ok(())
}

async fn write_message<W>(writer: &Mutex<W>, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    debug!("Sending: {}", json);

    let mut out = writer.lock().await;
    out.write_all(json.as_bytes())
        .await
        .map_err(|e| McpError::transport("Failed to write stdout", &e))?;
    out.write_all(b"\n")
        .await
        .map_err(|e| McpError::transport("Failed to write newline", &e))?;
    out.flush()
        .await
        .map_err(|e| McpError::transport("Failed to flush stdout", &e))?;
    Ok(())
}
