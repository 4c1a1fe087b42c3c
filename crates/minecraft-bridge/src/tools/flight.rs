use super::{coordinate_schema, coords};
use crate::bot::BotProvider;
use minecraft_mcp_core::{ToolResponse, Vec3};
use minecraft_mcp_server::{BoundedWait, Dispatcher, WaitError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest a flight may take before the bot is stopped
pub const FLIGHT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Deserialize)]
struct FlyTo {
    x: f64,
    y: f64,
    z: f64,
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "fly-to",
        "Make the bot fly to a specific position",
        coordinate_schema(json!({}), &[]),
        move |p: FlyTo| {
            let provider = provider.clone();
            async move {
                let bot = provider.bot()?;
                if !bot.game_mode().await?.can_fly() {
                    return Ok(ToolResponse::text("Creative mode is not available. Cannot fly."));
                }

                let target = Vec3::new(p.x, p.y, p.z);
                let (flyer, stopper, locator) = (bot.clone(), bot.clone(), bot.clone());
                let outcome = BoundedWait::new(FLIGHT_TIMEOUT)
                    .on_timeout(move || async move { stopper.stop_flying().await })
                    .snapshot(move || async move { locator.position().await.ok() })
                    .run(async move { flyer.fly_to(target).await })
                    .await;

                // Leave the bot hovering whatever happened
                bot.stop_flying().await;

                match outcome {
                    Ok(()) => Ok(ToolResponse::text(format!(
                        "Successfully flew to position {}.",
                        coords(p.x, p.y, p.z)
                    ))),
                    Err(WaitError::TimedOut { snapshot, .. }) => {
                        let current = match snapshot {
                            Some(pos) => pos.block().to_string(),
                            None => "unknown".to_string(),
                        };
                        debug!("Flight to {} stalled at {}", coords(p.x, p.y, p.z), current);
                        Ok(ToolResponse::error(format!(
                            "Flight timed out after {} seconds. The destination may be unreachable. Current position: {}",
                            FLIGHT_TIMEOUT.as_secs(),
                            current
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        },
    );
}
