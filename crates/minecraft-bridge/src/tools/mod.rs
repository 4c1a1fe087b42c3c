//! MCP tools backed by the bot
//!
//! Every tool is registered through the [`Dispatcher`], so readiness is
//! checked and arguments are validated before a body runs.

mod block;
mod chat;
mod command;
mod crafting;
mod entity;
mod flight;
mod furnace;
mod gamestate;
mod inventory;
mod position;

#[cfg(test)]
pub(crate) mod mock;

use crate::bot::{Bot, BotProvider};
use crate::chat::MessageStore;
use minecraft_mcp_core::{McpError, Vec3};
use minecraft_mcp_server::{BoundedWait, Dispatcher, WaitError};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Longest a single pathing request may run
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocks within this distance are in reach
const REACH: f64 = 4.5;

/// Register every tool
pub fn register_tools(
    dispatcher: &mut Dispatcher,
    bots: Arc<dyn BotProvider>,
    messages: Arc<MessageStore>,
) {
    position::register(dispatcher, &bots);
    flight::register(dispatcher, &bots);
    chat::register(dispatcher, &bots, &messages);
    inventory::register(dispatcher, &bots);
    block::register(dispatcher, &bots);
    entity::register(dispatcher, &bots);
    gamestate::register(dispatcher, &bots);
    furnace::register(dispatcher, &bots);
    command::register(dispatcher, &bots);
    crafting::register(dispatcher, &bots);
}

/// `(x, y, z)` with coordinates as given
fn coords(x: f64, y: f64, z: f64) -> String {
    format!("({}, {}, {})", x, y, z)
}

/// Schema of an `x`, `y`, `z` object plus extra properties
fn coordinate_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = json!({
        "x": { "type": "number", "description": "X coordinate" },
        "y": { "type": "number", "description": "Y coordinate" },
        "z": { "type": "number", "description": "Z coordinate" }
    });
    if let (Some(base), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    let mut all_required = vec!["x", "y", "z"];
    all_required.extend_from_slice(required);
    json!({
        "type": "object",
        "properties": properties,
        "required": all_required
    })
}

/// Path to `target`, stopping the bot if it takes longer than [`MOVE_TIMEOUT`]
async fn move_near(
    bot: &Arc<dyn Bot>,
    target: Vec3,
    range: f64,
) -> Result<(), WaitError<McpError, Vec3>> {
    let (walker, stopper, locator) = (bot.clone(), bot.clone(), bot.clone());
    BoundedWait::new(MOVE_TIMEOUT)
        .on_timeout(move || async move { stopper.stop_moving().await })
        .snapshot(move || async move { locator.position().await.ok() })
        .run(async move { walker.goto(target, range).await })
        .await
}

/// Walk up to `target` unless it is already within reach
async fn approach(bot: &Arc<dyn Bot>, target: Vec3) -> minecraft_mcp_core::Result<()> {
    if bot.position().await?.distance_to(&target) > REACH {
        move_near(bot, target, 2.0).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_schema_merges_extras() {
        let schema = coordinate_schema(
            json!({ "range": { "type": "number" } }),
            &[],
        );
        assert_eq!(schema["properties"]["range"]["type"], "number");
        assert_eq!(schema["required"], json!(["x", "y", "z"]));
    }

    #[test]
    fn test_coords_keep_fractions() {
        assert_eq!(coords(10.0, 64.5, -3.0), "(10, 64.5, -3)");
    }
}
