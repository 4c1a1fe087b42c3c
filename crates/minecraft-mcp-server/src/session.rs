//! Session handle contract
//!
//! The lifecycle manager never speaks a wire protocol itself. A [`Connector`]
//! builds a [`Session`]: an opaque handle plus the stream of events that handle
//! emits. Events from one handle arrive in the order it emits them.

use async_trait::async_trait;
use minecraft_mcp_core::{ErrorClass, Result, SessionConfig};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of one attached handle, assigned by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tri-state session status; only the lifecycle manager writes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Events a handle emits, at most once per physical event
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Authenticated with the server
    Login,
    /// The bot is in the world and can act
    Spawned,
    /// A player said something in chat
    Chat { username: String, message: String },
    /// The server rejected or kicked the bot
    Kicked { reason: String },
    /// Transport-level error
    Error { class: ErrorClass, message: String },
    /// The handle is closed for good
    Ended { reason: String },
}

/// A live connection attempt to the server
#[async_trait]
pub trait SessionHandle: Send + Sync + 'static {
    /// One-time setup once the handle reports `Spawned`
    async fn prepare(&self) -> Result<()>;

    /// Ask the handle to release its resources
    async fn terminate(&self, reason: &str) -> Result<()>;
}

/// A freshly built handle and its event stream
pub struct Session<H> {
    pub handle: Arc<H>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Builds session handles from the fixed configuration
pub trait Connector: Send + Sync + 'static {
    type Handle: SessionHandle;

    /// Start a connection attempt. Must not block; progress is reported
    /// through the returned event stream.
    fn connect(&self, config: &SessionConfig) -> Session<Self::Handle>;
}
