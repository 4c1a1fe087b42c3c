use crate::bot::BotProvider;
use crate::chat::MessageStore;
use chrono::SecondsFormat;
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Deserialize)]
struct SendChat {
    message: String,
}

#[derive(Deserialize)]
struct ReadChat {
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    10
}

pub(super) fn register(
    dispatcher: &mut Dispatcher,
    bots: &Arc<dyn BotProvider>,
    messages: &Arc<MessageStore>,
) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "send-chat",
        "Send a chat message in-game",
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "Message to send in chat" }
            },
            "required": ["message"]
        }),
        move |p: SendChat| {
            let provider = provider.clone();
            async move {
                provider.bot()?.chat(&p.message).await?;
                Ok(ToolResponse::text(format!("Sent message: \"{}\"", p.message)))
            }
        },
    );

    let store = messages.clone();
    dispatcher.register_typed(
        "read-chat",
        "Get recent chat messages from players",
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "Number of recent messages to retrieve (default: 10, max: 100)"
                }
            }
        }),
        move |p: ReadChat| {
            let store = store.clone();
            async move {
                let count = p.count.min(store.max_messages());
                let recent = store.recent(count);
                if recent.is_empty() {
                    return Ok(ToolResponse::text("No chat messages found"));
                }

                let mut output = format!("Found {} chat message(s):\n\n", recent.len());
                for (i, message) in recent.iter().enumerate() {
                    let _ = writeln!(
                        output,
                        "{}. {} - {}: {}",
                        i + 1,
                        message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                        message.username,
                        message.content
                    );
                }
                Ok(ToolResponse::text(output))
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::super::mock::{MockBot, call, dispatcher, dispatcher_with_messages};
    use crate::chat::MessageStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_send_chat() {
        let bot = MockBot::new(|_| {});
        let response = call(
            &dispatcher(bot.clone()),
            "send-chat",
            json!({ "message": "hello there" }),
        )
        .await;
        assert_eq!(response.text_content(), "Sent message: \"hello there\"");
        assert_eq!(bot.actions(), ["chat hello there"]);
    }

    #[tokio::test]
    async fn test_read_chat_empty() {
        let response = call(&dispatcher(MockBot::new(|_| {})), "read-chat", json!({})).await;
        assert_eq!(response.text_content(), "No chat messages found");
    }

    #[tokio::test]
    async fn test_read_chat_lists_latest_oldest_first() {
        let messages = Arc::new(MessageStore::new());
        for i in 0..5 {
            messages.add_message("Steve", format!("message {}", i));
        }
        let dispatcher = dispatcher_with_messages(MockBot::new(|_| {}), messages);

        let response = call(&dispatcher, "read-chat", json!({ "count": "2" })).await;
        let text = response.text_content();
        assert!(text.starts_with("Found 2 chat message(s):\n\n1. "));
        assert!(text.contains("Z - Steve: message 3\n2. "));
        assert!(text.ends_with("Z - Steve: message 4\n"));
    }
}
