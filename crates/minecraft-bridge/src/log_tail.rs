//! Chat from the server log
//!
//! RCON never sees chat, so player messages are read from the server's
//! `logs/latest.log` by polling it for appended lines.

use minecraft_mcp_core::{McpError, Result};
use minecraft_mcp_server::SessionEvent;
use regex_lite::Regex;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

/// `[12:00:00] [Server thread/INFO]: <Steve> hello`, optionally tagged
/// `[Not Secure]` when chat signing is off
static CHAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]: (?:\[Not Secure\] )?<([A-Za-z0-9_]{1,16})> (.*)$")
        .expect("CHAT_RE should compile")
});

/// Configuration for the log tailer
#[derive(Debug, Clone)]
pub struct LogTailConfig {
    /// Path of the server log
    pub path: PathBuf,
    /// Poll interval for file changes
    pub poll_interval: Duration,
}

impl LogTailConfig {
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Player name and message of a chat line
pub fn parse_chat_line(line: &str) -> Option<(String, String)> {
    let caps = CHAT_RE.captures(line.trim_end())?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

/// Follows a growing log file
pub struct LogTail {
    config: LogTailConfig,
    /// Bytes already consumed
    offset: u64,
    /// Trailing line not yet terminated by a newline
    partial: String,
}

impl LogTail {
    /// Start at the current end of the file; history is skipped
    pub async fn open_at_end(config: LogTailConfig) -> Self {
        let offset = match fs::metadata(&config.path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        Self {
            config,
            offset,
            partial: String::new(),
        }
    }

    /// Complete lines appended since the last read
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let len = match fs::metadata(&self.config.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(McpError::Game(format!("Failed to stat server log: {}", e)));
            }
        };

        if len < self.offset {
            // Rotated or truncated on restart
            debug!("Server log shrank, reading from the start");
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = fs::File::open(&self.config.path)
            .await
            .map_err(|e| McpError::Game(format!("Failed to open server log: {}", e)))?;
        file.seek(SeekFrom::Start(self.offset))
            .await
            .map_err(|e| McpError::Game(format!("Failed to seek server log: {}", e)))?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended)
            .await
            .map_err(|e| McpError::Game(format!("Failed to read server log: {}", e)))?;
        self.offset += appended.len() as u64;

        self.partial.push_str(&String::from_utf8_lossy(&appended));
        let mut lines: Vec<String> = self.partial.split('\n').map(str::to_string).collect();
        // Last piece is unterminated (empty when the chunk ended on a newline)
        self.partial = lines.pop().unwrap_or_default();
        Ok(lines
            .into_iter()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect())
    }

    /// Forward chat lines as session events until the receiver goes away
    pub async fn run(mut self, events: mpsc::UnboundedSender<SessionEvent>) {
        debug!("Tailing server log {}", self.config.path.display());
        loop {
            match self.read_new_lines().await {
                Ok(lines) => {
                    for (username, message) in lines.iter().filter_map(|l| parse_chat_line(l)) {
                        if events.send(SessionEvent::Chat { username, message }).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("{}", e),
            }
            sleep(self.config.poll_interval).await;
        }
    }
}
