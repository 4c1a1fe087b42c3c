//! # minecraft-mcp-core
//!
//! Core types shared by the Minecraft MCP server crates.
//!
//! This crate provides:
//! - Error taxonomy and JSON-RPC error codes
//! - The uniform tool response shape
//! - Session configuration
//! - Small geometry and game value types used by tools

pub mod config;
pub mod error;
pub mod geometry;
pub mod response;

pub use config::{SUPPORTED_MINECRAFT_VERSION, SessionConfig};
pub use error::{ErrorClass, McpError, Result, error_codes};
pub use geometry::{BlockPos, Direction, FaceDirection, GameMode, Vec3};
pub use response::{Content, ToolResponse};
