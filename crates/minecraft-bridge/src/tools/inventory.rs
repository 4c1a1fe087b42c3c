use crate::bot::{BotProvider, EquipDestination, ItemStack};
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindItem {
    name_or_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EquipItem {
    item_name: String,
    #[serde(default = "default_destination")]
    destination: EquipDestination,
}

fn default_destination() -> EquipDestination {
    EquipDestination::Hand
}

/// First stack whose id contains `pattern`, ignoring case
pub(super) fn find_matching<'a>(items: &'a [ItemStack], pattern: &str) -> Option<&'a ItemStack> {
    let pattern = pattern.to_lowercase();
    items.iter().find(|item| item.name.contains(&pattern))
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "list-inventory",
        "List all items in the bot's inventory",
        json!({ "type": "object", "properties": {} }),
        move |_: serde_json::Value| {
            let provider = provider.clone();
            async move {
                let items = provider.bot()?.inventory().await?;
                if items.is_empty() {
                    return Ok(ToolResponse::text("Inventory is empty"));
                }

                let mut output = format!("Found {} items in inventory:\n\n", items.len());
                for item in &items {
                    let _ = writeln!(
                        output,
                        "- {} (x{}) in slot {}",
                        item.name, item.count, item.slot
                    );
                }
                Ok(ToolResponse::text(output))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "find-item",
        "Find a specific item in the bot's inventory",
        json!({
            "type": "object",
            "properties": {
                "nameOrType": { "type": "string", "description": "Name or type of item to find" }
            },
            "required": ["nameOrType"]
        }),
        move |p: FindItem| {
            let provider = provider.clone();
            async move {
                let items = provider.bot()?.inventory().await?;
                Ok(ToolResponse::text(match find_matching(&items, &p.name_or_type) {
                    Some(item) => format!(
                        "Found {} {} in inventory (slot {})",
                        item.count, item.name, item.slot
                    ),
                    None => format!(
                        "Couldn't find any item matching '{}' in inventory",
                        p.name_or_type
                    ),
                }))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "equip-item",
        "Equip a specific item",
        json!({
            "type": "object",
            "properties": {
                "itemName": { "type": "string", "description": "Name of the item to equip" },
                "destination": {
                    "type": "string",
                    "enum": ["hand", "off-hand", "head", "torso", "legs", "feet"],
                    "description": "Where to equip the item (default: 'hand')"
                }
            },
            "required": ["itemName"]
        }),
        move |p: EquipItem| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let items = bot.inventory().await?;
                let Some(item) = find_matching(&items, &p.item_name) else {
                    return Ok(ToolResponse::text(format!(
                        "Couldn't find any item matching '{}' in inventory",
                        p.item_name
                    )));
                };
                bot.equip(item.slot, p.destination).await?;
                Ok(ToolResponse::text(format!(
                    "Equipped {} to {}",
                    item.name, p.destination
                )))
            }
        },
    );
}
