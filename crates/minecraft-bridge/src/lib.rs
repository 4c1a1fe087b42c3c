//! Minecraft bridge for the MCP server
//!
//! Drives an in-world bot through the server's RCON console:
//!
//! - **Session**: `RconConnector` authenticates, waits for the bot player to
//!   join and watches that it stays online
//! - **Actions**: `RconBot` maps each bot capability onto vanilla commands
//! - **Chat**: read by tailing the server log
//! - **Tools**: the MCP tool set, plus reference resources and prompts
//! - **Recipes**: a fixed crafting table for the recipe tools

mod bot;
mod chat;
mod log_tail;
mod player;
mod prompts;
mod rcon;
mod recipes;
mod reply;
mod resources;
mod session;
mod templates;
mod tools;

pub use bot::{
    Bot, BotProvider, EntityInfo, EquipDestination, FurnaceKind, FurnaceSlot, ItemStack,
};
pub use chat::{MAX_STORED_MESSAGES, MessageStore, StoredMessage};
pub use log_tail::{LogTail, LogTailConfig, parse_chat_line};
pub use prompts::register_prompts;
pub use rcon::RconClient;
pub use recipes::{Recipe, all_recipes, recipes_for};
pub use resources::{register_resources, template_uri};
pub use session::{Console, DriverTiming, GREETING, RconBot, RconConnector};
pub use templates::{
    Template, all_templates, export_commands, get_template, search_templates,
    template_categories, template_documentation, templates_by_category, validate_template,
};
pub use tools::{MOVE_TIMEOUT, register_tools};
