use super::{approach, coordinate_schema, coords};
use crate::bot::BotProvider;
use minecraft_mcp_core::{FaceDirection, ToolResponse, Vec3};
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceBlock {
    x: f64,
    y: f64,
    z: f64,
    #[serde(default = "default_face")]
    face_direction: FaceDirection,
}

fn default_face() -> FaceDirection {
    FaceDirection::Down
}

#[derive(Deserialize)]
struct DigBlock {
    x: f64,
    y: f64,
    z: f64,
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "place-block",
        "Place a block at the specified position",
        coordinate_schema(
            json!({
                "faceDirection": {
                    "type": "string",
                    "enum": ["up", "down", "north", "south", "east", "west"],
                    "description": "Direction to place against (default: 'down')"
                }
            }),
            &[],
        ),
        move |p: PlaceBlock| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let target = Vec3::new(p.x, p.y, p.z);
                let pos = target.block();
                let at = coords(p.x, p.y, p.z);

                if !bot.is_air(pos).await? {
                    return Ok(ToolResponse::text(format!(
                        "There's already a block at {}",
                        at
                    )));
                }

                for face in FaceDirection::search_order(p.face_direction) {
                    let reference = pos.offset(face);
                    if bot.is_air(reference).await? {
                        continue;
                    }

                    approach(&bot, reference.center()).await?;
                    bot.look_at(pos.center()).await?;

                    match bot.place_block(pos, face).await {
                        Ok(()) => {
                            return Ok(ToolResponse::text(format!(
                                "Placed block at {} using {} face",
                                at,
                                face.as_str()
                            )));
                        }
                        Err(e) => {
                            warn!("Failed to place using {} face: {}", face.as_str(), e);
                        }
                    }
                }

                Ok(ToolResponse::text(format!(
                    "Failed to place block at {}: No suitable reference block found",
                    at
                )))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "dig-block",
        "Dig a block at the specified position",
        coordinate_schema(json!({}), &[]),
        move |p: DigBlock| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let pos = Vec3::new(p.x, p.y, p.z).block();
                let at = coords(p.x, p.y, p.z);

                if bot.is_air(pos).await? {
                    return Ok(ToolResponse::text(format!(
                        "No block found at position {}",
                        at
                    )));
                }

                approach(&bot, pos.center()).await?;
                bot.dig_block(pos).await?;
                Ok(ToolResponse::text(format!("Dug block at {}", at)))
            }
        },
    );
}
