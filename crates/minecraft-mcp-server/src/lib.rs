//! # minecraft-mcp-server
//!
//! MCP server plumbing for driving a Minecraft bot.
//!
//! This crate provides:
//! - `Connector` / `SessionHandle` contract for session adapters
//! - `ConnectionManager`, the connection lifecycle and readiness gate
//! - `BoundedWait`, a cancelable deadline around in-world operations
//! - `Dispatcher`, guarded tool invocation
//! - MCP JSON-RPC protocol handling over stdio

pub mod bounded;
pub mod catalog;
pub mod dispatch;
pub mod lifecycle;
pub mod mcp;
pub mod server;
pub mod session;
pub mod transport;

pub use bounded::{BoundedWait, WaitError};
pub use catalog::Catalog;
pub use dispatch::{Dispatcher, ToolDef};
pub use lifecycle::{ChatMessage, ConnectionManager, Readiness, ReadinessGate, best_effort};
pub use server::McpServer;
pub use session::{Connector, Session, SessionEvent, SessionHandle, SessionId, SessionStatus};

use minecraft_mcp_core::Result;
use std::sync::Arc;

impl McpServer {
    /// Run the server on stdio transport until the client closes stdin
    pub async fn run_stdio(self: Arc<Self>) -> Result<()> {
        transport::stdio::run(self).await
    }
}
