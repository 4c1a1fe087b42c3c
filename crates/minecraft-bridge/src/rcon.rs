//! Source RCON protocol client for Minecraft
//!
//! Implements the Valve Source RCON protocol as spoken by the vanilla
//! Minecraft server (`enable-rcon=true` in `server.properties`).
//! Protocol spec: https://developer.valvesoftware.com/wiki/Source_RCON_Protocol
//!
//! Minecraft splits replies longer than 4096 bytes over several packets and
//! never marks the last one. Every command is therefore followed by a marker
//! request of an unknown type; the server answers it only after the command's
//! reply, which delimits the fragments.

use minecraft_mcp_core::{ErrorClass, McpError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// RCON packet type constants
pub mod packet_type {
    /// Command response, and the type of an auth response
    pub const RESPONSE_VALUE: i32 = 0;
    /// Authentication response / Execute command (context-dependent)
    pub const EXEC_COMMAND: i32 = 2;
    /// Authenticate with password
    pub const AUTH: i32 = 3;
    /// Unknown to the server; used to delimit fragmented replies
    pub const MARKER: i32 = 100;
}

/// Largest packet the server sends: 4096 byte payload plus header
const MAX_PACKET_SIZE: usize = 4096 + 10;

/// How long one exchange may take before the link is considered dead
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// RCON packet types for creating packets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketType {
    /// Execute a command
    ExecCommand,
    /// Authenticate with password
    Auth,
    /// Fragment delimiter
    Marker,
}

impl PacketType {
    /// Get the wire protocol value
    pub fn as_i32(self) -> i32 {
        match self {
            PacketType::ExecCommand => packet_type::EXEC_COMMAND,
            PacketType::Auth => packet_type::AUTH,
            PacketType::Marker => packet_type::MARKER,
        }
    }
}

/// A single RCON packet
#[derive(Debug, Clone, PartialEq)]
pub struct RconPacket {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl RconPacket {
    /// Create a new packet
    pub fn new(id: i32, packet_type: PacketType, body: impl Into<String>) -> Self {
        Self {
            id,
            packet_type: packet_type.as_i32(),
            body: body.into(),
        }
    }

    /// Serialize packet to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let body_bytes = self.body.as_bytes();
        // Size = id(4) + type(4) + body + null(1) + null(1)
        let size = 4 + 4 + body_bytes.len() + 2;

        let mut buf = Vec::with_capacity(4 + size);
        buf.extend_from_slice(&(size as i32).to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.packet_type.to_le_bytes());
        buf.extend_from_slice(body_bytes);
        buf.push(0); // Body null terminator
        buf.push(0); // Packet null terminator

        buf
    }

    /// Parse packet from bytes (excluding size prefix)
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 10 {
            return Err(McpError::Protocol("RCON packet too short".to_string()));
        }

        let id = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let packet_type = i32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        // Body is everything after type until the first null
        let body_end = data[8..]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(data.len() - 8);
        let body = String::from_utf8_lossy(&data[8..8 + body_end]).to_string();

        Ok(Self {
            id,
            packet_type,
            body,
        })
    }
}

/// One authenticated-or-not RCON stream
pub struct RconConnection<S> {
    stream: S,
    next_id: i32,
}

impl<S: AsyncRead + AsyncWrite + Unpin> RconConnection<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, next_id: 1 }
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        // -1 is reserved for auth failure
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    /// Authenticate with the server's RCON password
    pub async fn authenticate(&mut self, password: &str) -> Result<()> {
        let auth_id = self.allocate_id();
        self.send(&RconPacket::new(auth_id, PacketType::Auth, password))
            .await?;

        let response = self.recv().await?;

        if response.id == -1 {
            return Err(McpError::Rejected(
                "RCON authentication failed: check the RCON password".to_string(),
            ));
        }

        if response.id != auth_id {
            warn!(
                "RCON auth response ID mismatch: expected {}, got {}",
                auth_id, response.id
            );
        }

        Ok(())
    }

    /// Execute a command and collect its full reply
    pub async fn exec(&mut self, command: &str) -> Result<String> {
        let cmd_id = self.allocate_id();
        let marker_id = self.allocate_id();

        debug!("RCON exec: {}", command);
        self.send(&RconPacket::new(cmd_id, PacketType::ExecCommand, command))
            .await?;
        self.send(&RconPacket::new(marker_id, PacketType::Marker, ""))
            .await?;

        let mut body = String::new();
        loop {
            let packet = self.recv().await?;
            if packet.id == marker_id {
                break;
            }
            if packet.id == cmd_id {
                body.push_str(&packet.body);
            } else {
                debug!(
                    "Response ID mismatch: expected {}, got {}",
                    cmd_id, packet.id
                );
            }
        }

        debug!("RCON response: {}", preview(&body));
        Ok(body)
    }

    /// Send a packet
    async fn send(&mut self, packet: &RconPacket) -> Result<()> {
        self.stream
            .write_all(&packet.to_bytes())
            .await
            .map_err(|e| McpError::transport("RCON send failed", &e))
    }

    /// Receive a packet
    async fn recv(&mut self) -> Result<RconPacket> {
        // Read size (4 bytes, little endian)
        let mut size_buf = [0u8; 4];
        self.stream
            .read_exact(&mut size_buf)
            .await
            .map_err(|e| McpError::transport("RCON recv size failed", &e))?;
        let size = i32::from_le_bytes(size_buf);

        if size < 10 || size as usize > MAX_PACKET_SIZE {
            return Err(McpError::Protocol(format!(
                "RCON packet size out of range: {} bytes",
                size
            )));
        }

        // Read packet body
        let mut data = vec![0u8; size as usize];
        self.stream
            .read_exact(&mut data)
            .await
            .map_err(|e| McpError::transport("RCON recv body failed", &e))?;

        RconPacket::from_bytes(&data)
    }

    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(100) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

fn timed_out(what: &str) -> McpError {
    McpError::Transport {
        class: ErrorClass::TimedOut,
        message: format!("{} timed out", what),
    }
}

/// RCON client for communicating with the Minecraft server
///
/// Commands are serialized: the connection lock is held for a whole
/// request/reply exchange.
pub struct RconClient {
    /// Server address (host:port)
    address: String,
    /// Authentication password
    password: String,
    /// Live connection, if any
    connection: Mutex<Option<RconConnection<TcpStream>>>,
    /// Whether authenticated
    authenticated: AtomicBool,
}

impl RconClient {
    /// Create a new RCON client
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            connection: Mutex::new(None),
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Connect and authenticate with the RCON server
    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to RCON at {}", self.address);

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.address))
            .await
            .map_err(|_| timed_out("RCON connect"))?
            .map_err(|e| McpError::transport("RCON connect failed", &e))?;

        let mut connection = RconConnection::new(stream);
        tokio::time::timeout(EXCHANGE_TIMEOUT, connection.authenticate(&self.password))
            .await
            .map_err(|_| timed_out("RCON authentication"))??;

        *self.connection.lock().await = Some(connection);
        self.authenticated.store(true, Ordering::SeqCst);
        info!("RCON authenticated successfully");

        Ok(())
    }

    /// Check if connected and authenticated
    pub fn is_connected(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Execute a command and return the response
    ///
    /// A transport failure drops the connection; reconnecting is up to the
    /// session lifecycle.
    pub async fn execute(&self, command: &str) -> Result<String> {
        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(McpError::NotConnected)?;

        let result = tokio::time::timeout(EXCHANGE_TIMEOUT, connection.exec(command))
            .await
            .unwrap_or_else(|_| Err(timed_out("RCON command")));

        if let Err(e) = &result {
            if e.class().is_some() || matches!(e, McpError::Protocol(_)) {
                warn!("RCON connection lost: {}", e);
                if let Some(mut connection) = guard.take() {
                    connection.shutdown().await;
                }
                self.authenticated.store(false, Ordering::SeqCst);
            }
        }

        result
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) {
        if let Some(mut connection) = self.connection.lock().await.take() {
            connection.shutdown().await;
            info!("RCON disconnected");
        }
        self.authenticated.store(false, Ordering::SeqCst);
    }
}
