use super::inventory::find_matching;
use super::{approach, coordinate_schema, coords};
use crate::bot::{BotProvider, FurnaceKind, FurnaceSlot, ItemStack};
use minecraft_mcp_core::{McpError, ToolResponse, Vec3};
use minecraft_mcp_server::{BoundedWait, Dispatcher, WaitError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How often the output slot is checked while smelting
const OUTPUT_POLL: Duration = Duration::from_millis(500);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmeltItem {
    x: f64,
    y: f64,
    z: f64,
    input_item: String,
    #[serde(default = "one")]
    input_count: i64,
    fuel_item: String,
    #[serde(default = "one")]
    fuel_count: i64,
    #[serde(default = "yes")]
    take_output: bool,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: i64,
}

fn one() -> i64 {
    1
}

fn yes() -> bool {
    true
}

fn default_timeout_ms() -> i64 {
    60_000
}

impl SmeltItem {
    /// Name of the first option that is not a positive integer
    fn non_positive(&self) -> Option<&'static str> {
        [
            ("inputCount", self.input_count),
            ("fuelCount", self.fuel_count),
            ("timeoutMs", self.timeout_ms),
        ]
        .into_iter()
        .find(|(_, value)| *value <= 0)
        .map(|(name, _)| name)
    }
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "smelt-item",
        "Smelt items using a furnace-like block",
        coordinate_schema(
            json!({
                "inputItem": { "type": "string", "description": "Name of item to smelt" },
                "inputCount": {
                    "type": "integer",
                    "description": "Amount of input to smelt (default: 1)"
                },
                "fuelItem": { "type": "string", "description": "Name of fuel item" },
                "fuelCount": {
                    "type": "integer",
                    "description": "Amount of fuel to use (default: 1)"
                },
                "takeOutput": {
                    "type": "boolean",
                    "description": "Whether to take output when ready (default: true)"
                },
                "timeoutMs": {
                    "type": "integer",
                    "description": "Timeout waiting for output in ms (default: 60000)"
                }
            }),
            &["inputItem", "fuelItem"],
        ),
        move |p: SmeltItem| {
            let provider = provider.clone();
            async move {
                if let Some(option) = p.non_positive() {
                    return Ok(ToolResponse::error(format!(
                        "{} must be a positive integer",
                        option
                    )));
                }

                let bot = provider.bot()?;
                let pos = Vec3::new(p.x, p.y, p.z).block();

                let mut kind = None;
                for candidate in FurnaceKind::ALL {
                    if bot.test_block(pos, candidate.block_id()).await? {
                        kind = Some(candidate);
                        break;
                    }
                }
                let Some(kind) = kind else {
                    return Ok(ToolResponse::text(format!(
                        "No furnace block found at {}",
                        coords(p.x, p.y, p.z)
                    )));
                };
                debug!("Smelting in {} at {}", kind.block_id(), pos);

                let items = bot.inventory().await?;
                let Some(input) = find_matching(&items, &p.input_item).cloned() else {
                    return Ok(ToolResponse::text(format!(
                        "Couldn't find any item matching '{}' in inventory",
                        p.input_item
                    )));
                };
                let Some(fuel) = find_matching(&items, &p.fuel_item).cloned() else {
                    return Ok(ToolResponse::text(format!(
                        "Couldn't find any fuel item matching '{}' in inventory",
                        p.fuel_item
                    )));
                };

                let input_count = clamp_count(p.input_count, &input);
                let fuel_count = clamp_count(p.fuel_count, &fuel);

                approach(&bot, pos.center()).await?;

                let contents = bot.furnace_contents(pos).await?;
                let occupant = |slot: FurnaceSlot, wanted: &str| {
                    contents
                        .iter()
                        .find(|i| i.slot == slot.index() && i.name != wanted)
                        .map(|i| i.name.clone())
                };
                if let Some(name) = occupant(FurnaceSlot::Input, &input.name) {
                    return Ok(ToolResponse::text(format!(
                        "Furnace input slot is occupied by {}",
                        name
                    )));
                }
                if let Some(name) = occupant(FurnaceSlot::Fuel, &fuel.name) {
                    return Ok(ToolResponse::text(format!(
                        "Furnace fuel slot is occupied by {}",
                        name
                    )));
                }

                bot.put_in_furnace(pos, FurnaceSlot::Fuel, fuel.slot, fuel_count)
                    .await?;
                bot.put_in_furnace(pos, FurnaceSlot::Input, input.slot, input_count)
                    .await?;

                if !p.take_output {
                    return Ok(ToolResponse::text(format!(
                        "Started smelting {} {} with {} {}",
                        input_count, input.name, fuel_count, fuel.name
                    )));
                }

                let watcher = bot.clone();
                let waited = BoundedWait::<()>::new(Duration::from_millis(p.timeout_ms as u64))
                    .run(async move {
                        loop {
                            let contents = watcher.furnace_contents(pos).await?;
                            if contents.iter().any(|i| i.slot == FurnaceSlot::Output.index()) {
                                return Ok::<_, McpError>(());
                            }
                            tokio::time::sleep(OUTPUT_POLL).await;
                        }
                    })
                    .await;

                match waited {
                    Ok(()) => {}
                    Err(WaitError::TimedOut { .. }) => {
                        return Ok(ToolResponse::text(format!(
                            "No output after {}ms",
                            p.timeout_ms
                        )));
                    }
                    Err(e) => return Err(e.into()),
                }

                Ok(ToolResponse::text(match bot.take_furnace_output(pos).await? {
                    Some(taken) => format!("Smelted {} {}", taken.count, taken.name),
                    None => format!("No output after {}ms", p.timeout_ms),
                }))
            }
        },
    );
}

/// Requested amount, limited to what the stack holds
fn clamp_count(requested: i64, stack: &ItemStack) -> u32 {
    u32::try_from(requested).unwrap_or(u32::MAX).min(stack.count)
}
