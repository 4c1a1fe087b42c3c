//! Session configuration

use std::path::PathBuf;
use std::time::Duration;

/// Latest Minecraft release the bridge is tested against
pub const SUPPORTED_MINECRAFT_VERSION: &str = "1.21.8";

/// Fixed configuration for the session to the Minecraft server
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server host
    pub host: String,
    /// RCON port
    pub port: u16,
    /// In-game identity the bot acts as
    pub username: String,
    /// RCON password
    pub password: String,
    /// Delay before a scheduled reconnect fires
    pub reconnect_delay: Duration,
    /// Server log to tail for chat (`logs/latest.log`), if readable
    pub server_log: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25575,
            username: "LLMBot".to_string(),
            password: "minecraft".to_string(),
            reconnect_delay: Duration::from_millis(2000),
            server_log: None,
        }
    }
}

impl SessionConfig {
    /// `host:port` as used for connecting and in diagnostics
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
