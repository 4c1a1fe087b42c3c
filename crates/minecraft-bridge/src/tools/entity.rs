use crate::bot::BotProvider;
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindEntity {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default = "default_max_distance")]
    max_distance: f64,
}

fn default_max_distance() -> f64 {
    16.0
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "find-entity",
        "Find the nearest entity of a specific type",
        json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "Type of entity to find (empty for any entity)"
                },
                "maxDistance": {
                    "type": "number",
                    "description": "Maximum search distance (default: 16)"
                }
            }
        }),
        move |p: FindEntity| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let found = bot.nearest_entity(&p.kind, p.max_distance).await?;
                Ok(ToolResponse::text(match found {
                    Some(entity) => format!(
                        "Found {} at position {}",
                        entity.name,
                        entity.position.block()
                    ),
                    None => format!(
                        "No {} found within {} blocks",
                        if p.kind.is_empty() { "entity" } else { p.kind.as_str() },
                        p.max_distance
                    ),
                }))
            }
        },
    );
}
