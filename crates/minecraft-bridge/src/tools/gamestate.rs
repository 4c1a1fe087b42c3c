use crate::bot::BotProvider;
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde_json::json;
use std::sync::Arc;

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "detect-gamemode",
        "Detect the gamemode on game",
        json!({ "type": "object", "properties": {} }),
        move |_: serde_json::Value| {
            let provider = provider.clone();
            async move {
                let mode = provider.bot()?.game_mode().await?;
                Ok(ToolResponse::text(format!("Bot gamemode: \"{}\"", mode)))
            }
        },
    );
}
