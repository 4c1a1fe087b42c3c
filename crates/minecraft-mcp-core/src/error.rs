//! Error types for the Minecraft MCP server

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for Minecraft MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Best-effort classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Nothing is listening at the target address
    ConnectionRefused,
    /// The peer did not answer in time
    TimedOut,
    /// An established connection was reset, aborted or closed mid-stream
    ConnectionReset,
    /// Anything else; the peer may still recover on its own
    Other,
}

impl ErrorClass {
    /// Classify an I/O error
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused => ErrorClass::ConnectionRefused,
            ErrorKind::TimedOut => ErrorClass::TimedOut,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected => ErrorClass::ConnectionReset,
            _ => ErrorClass::Other,
        }
    }

    /// Whether this class means the transport itself is gone
    pub fn is_transport_lost(self) -> bool {
        matches!(
            self,
            ErrorClass::ConnectionRefused | ErrorClass::TimedOut | ErrorClass::ConnectionReset
        )
    }

    /// Short errno-style code for log lines
    pub fn code(self) -> &'static str {
        match self {
            ErrorClass::ConnectionRefused => "ECONNREFUSED",
            ErrorClass::TimedOut => "ETIMEDOUT",
            ErrorClass::ConnectionReset => "ECONNRESET",
            ErrorClass::Other => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Minecraft MCP error types
#[derive(Debug, Error)]
pub enum McpError {
    /// No live session to the Minecraft server
    #[error("Bot is not connected to the Minecraft server")]
    NotConnected,

    /// Transport-level failure talking to the server
    #[error("Transport error [{class}]: {message}")]
    Transport { class: ErrorClass, message: String },

    /// The server refused the session (bad RCON password, kick)
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// Malformed traffic on either the RCON or the JSON-RPC side
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Tool input did not match its schema
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The game refused or could not perform an action
    #[error("{0}")]
    Game(String),

    /// A bounded wait elapsed
    #[error("Timed out after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },
}

impl McpError {
    /// Build a transport error from an I/O failure
    pub fn transport(context: &str, err: &std::io::Error) -> Self {
        McpError::Transport {
            class: ErrorClass::from_io(err),
            message: format!("{}: {}", context, err),
        }
    }

    /// Transport class, if this is a transport error
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            McpError::Transport { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Shorthand for a game-side failure
    pub fn game(message: impl Into<String>) -> Self {
        McpError::Game(message.into())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Serialization(err.to_string())
    }
}

/// JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}
