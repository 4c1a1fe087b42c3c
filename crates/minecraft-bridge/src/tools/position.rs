use super::{coordinate_schema, coords, move_near};
use crate::bot::BotProvider;
use minecraft_mcp_core::{Direction, ToolResponse, Vec3};
use minecraft_mcp_server::{Dispatcher, WaitError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct Point {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct MoveTo {
    x: f64,
    y: f64,
    z: f64,
    #[serde(default = "default_range")]
    range: f64,
}

fn default_range() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct MoveInDirection {
    direction: Direction,
    #[serde(default = "default_duration")]
    duration: f64,
}

fn default_duration() -> f64 {
    1000.0
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "get-position",
        "Get the current position of the bot",
        json!({ "type": "object", "properties": {} }),
        move |_: serde_json::Value| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let pos = bot.position().await?;
                Ok(ToolResponse::text(format!("Current position: {}", pos.block())))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "move-to-position",
        "Move the bot to a specific position",
        coordinate_schema(
            json!({
                "range": {
                    "type": "number",
                    "description": "How close to get to the target (default: 1)"
                }
            }),
            &[],
        ),
        move |p: MoveTo| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let target = Vec3::new(p.x, p.y, p.z);
                match move_near(&bot, target, p.range).await {
                    Ok(()) => Ok(ToolResponse::text(format!(
                        "Successfully moved to position near {}",
                        coords(p.x, p.y, p.z)
                    ))),
                    Err(WaitError::TimedOut { snapshot, .. }) => {
                        let current = match snapshot {
                            Some(pos) => pos.block().to_string(),
                            None => "unknown".to_string(),
                        };
                        Ok(ToolResponse::error(format!(
                            "Movement timed out after {} seconds. The destination may be unreachable. Current position: {}",
                            super::MOVE_TIMEOUT.as_secs(),
                            current
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "look-at",
        "Make the bot look at a specific position",
        coordinate_schema(json!({}), &[]),
        move |p: Point| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                bot.look_at(Vec3::new(p.x, p.y, p.z)).await?;
                Ok(ToolResponse::text(format!(
                    "Looking at position {}",
                    coords(p.x, p.y, p.z)
                )))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "jump",
        "Make the bot jump",
        json!({ "type": "object", "properties": {} }),
        move |_: serde_json::Value| {
            let provider = provider.clone();
            async move {
                provider.bot()?.jump().await?;
                Ok(ToolResponse::text("Successfully jumped"))
            }
        },
    );

    let provider = bots.clone();
    dispatcher.register_typed(
        "move-in-direction",
        "Move the bot in a specific direction for a duration",
        json!({
            "type": "object",
            "properties": {
                "direction": {
                    "type": "string",
                    "enum": ["forward", "back", "left", "right"],
                    "description": "Direction to move"
                },
                "duration": {
                    "type": "number",
                    "description": "Duration in milliseconds (default: 1000)"
                }
            },
            "required": ["direction"]
        }),
        move |p: MoveInDirection| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                let duration = Duration::from_millis(p.duration.max(0.0) as u64);
                bot.walk(p.direction, duration).await?;
                Ok(ToolResponse::text(format!(
                    "Moved {} for {}ms",
                    p.direction.as_str(),
                    p.duration
                )))
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::super::mock::{MockBot, call, dispatcher};
    use minecraft_mcp_core::Vec3;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_position_floors() {
        let bot = MockBot::new(|s| s.position = Vec3::new(10.7, 64.0, -3.2));
        let response = call(&dispatcher(bot), "get-position", json!({})).await;
        assert_eq!(response.text_content(), "Current position: (10, 64, -4)");
    }

    #[tokio::test]
    async fn test_move_to_position() {
        let bot = MockBot::new(|_| {});
        let response = call(
            &dispatcher(bot.clone()),
            "move-to-position",
            json!({ "x": 5, "y": "64", "z": 2.5, "range": 3 }),
        )
        .await;

        assert!(!response.is_error());
        assert_eq!(
            response.text_content(),
            "Successfully moved to position near (5, 64, 2.5)"
        );
        assert_eq!(bot.actions(), ["goto 5 64 2.5 3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_position_times_out() {
        let bot = MockBot::new(|s| {
            s.position = Vec3::new(3.2, 70.0, 1.9);
            s.hang_movement = true;
        });
        let response = call(
            &dispatcher(bot.clone()),
            "move-to-position",
            json!({ "x": 500, "y": 70, "z": 0 }),
        )
        .await;

        assert!(response.is_error());
        assert_eq!(
            response.text_content(),
            "Failed: Movement timed out after 60 seconds. The destination may be unreachable. Current position: (3, 70, 1)"
        );
        assert!(bot.actions().contains(&"stop moving".to_string()));
    }

    #[tokio::test]
    async fn test_move_in_direction_defaults() {
        let bot = MockBot::new(|_| {});
        let response = call(
            &dispatcher(bot.clone()),
            "move-in-direction",
            json!({ "direction": "left" }),
        )
        .await;
        assert_eq!(response.text_content(), "Moved left for 1000ms");
        assert_eq!(bot.actions(), ["walk left 1000"]);
    }

    #[tokio::test]
    async fn test_move_in_direction_rejects_unknown_direction() {
        let bot = MockBot::new(|_| {});
        let response = call(
            &dispatcher(bot.clone()),
            "move-in-direction",
            json!({ "direction": "up" }),
        )
        .await;
        assert!(response.is_error());
        assert!(response.text_content().starts_with("Failed: Invalid params: unknown variant `up`"));
        assert!(bot.actions().is_empty());
    }

    #[tokio::test]
    async fn test_look_at_and_jump() {
        let bot = MockBot::new(|_| {});
        let dispatcher = dispatcher(bot.clone());

        let response = call(&dispatcher, "look-at", json!({ "x": 1, "y": 65.5, "z": -2 })).await;
        assert_eq!(response.text_content(), "Looking at position (1, 65.5, -2)");

        let response = call(&dispatcher, "jump", json!({})).await;
        assert_eq!(response.text_content(), "Successfully jumped");
        assert_eq!(bot.actions(), ["look 1 65.5 -2", "jump"]);
    }
}
