//! Minecraft MCP Server
//!
//! Serves MCP over stdio and drives a bot on a Minecraft server through RCON.
//! Logs go to stderr; stdout carries only protocol traffic.

use anyhow::Result;
use clap::Parser;
use minecraft_bridge::{
    MessageStore, RconConnector, register_prompts, register_resources, register_tools,
};
use minecraft_mcp_core::{SUPPORTED_MINECRAFT_VERSION, SessionConfig};
use minecraft_mcp_server::{Catalog, ConnectionManager, Dispatcher, McpServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "minecraft-mcp-server", version, about)]
struct Args {
    /// Minecraft server host
    #[arg(long, env = "MINECRAFT_HOST", default_value = "localhost")]
    host: String,

    /// RCON port
    #[arg(long, env = "MINECRAFT_PORT", default_value_t = 25575)]
    port: u16,

    /// Player name the bot acts as
    #[arg(long, env = "MINECRAFT_USERNAME", default_value = "LLMBot")]
    username: String,

    /// RCON password
    #[arg(long, env = "MCRCON_PASS", default_value = "minecraft", hide_env_values = true)]
    password: String,

    /// Delay before reconnecting after the session ends
    #[arg(long, default_value_t = 2000)]
    reconnect_delay_ms: u64,

    /// Server log to tail for chat, usually `logs/latest.log`
    #[arg(long, env = "MINECRAFT_SERVER_LOG")]
    server_log: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            server_log: self.server_log.clone(),
        }
    }
}

/// Copy chat from other players into the store `read-chat` serves
fn forward_chat(manager: &ConnectionManager<RconConnector>, messages: Arc<MessageStore>) {
    let mut chat = manager.subscribe_chat();
    tokio::spawn(async move {
        loop {
            match chat.recv().await {
                Ok(message) => messages.add_message(message.username, message.message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Chat store fell behind; {} messages dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.session_config();
    info!(
        "Minecraft MCP server starting (bot {} at {}, Minecraft {})",
        config.username,
        config.address(),
        SUPPORTED_MINECRAFT_VERSION
    );
    if config.server_log.is_none() {
        warn!("No server log configured; read-chat will stay empty");
    }

    let manager = ConnectionManager::new(RconConnector::default(), config);
    let messages = Arc::new(MessageStore::new());
    forward_chat(&manager, messages.clone());
    manager.connect();

    let mut dispatcher = Dispatcher::new(Arc::new(manager.clone()));
    register_tools(&mut dispatcher, Arc::new(manager.clone()), messages);

    let mut catalog = Catalog::new();
    register_resources(&mut catalog);
    register_prompts(&mut catalog);

    let server = Arc::new(McpServer::new(
        "minecraft-mcp-server",
        env!("CARGO_PKG_VERSION"),
        dispatcher,
        catalog,
    ));
    let served = server.run_stdio().await;

    info!("Client disconnected, shutting down");
    manager.cleanup().await;
    served?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_a_local_server() {
        let args = Args::try_parse_from(["minecraft-mcp-server"]).unwrap();
        let config = args.session_config();
        assert_eq!(config.address(), "localhost:25575");
        assert_eq!(config.username, "LLMBot");
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "minecraft-mcp-server",
            "--host",
            "mc.example.net",
            "--port",
            "25580",
            "--username",
            "Builder",
            "--server-log",
            "/srv/mc/logs/latest.log",
        ])
        .unwrap();
        let config = args.session_config();
        assert_eq!(config.address(), "mc.example.net:25580");
        assert_eq!(config.username, "Builder");
        assert_eq!(
            config.server_log,
            Some(PathBuf::from("/srv/mc/logs/latest.log"))
        );
    }
}
