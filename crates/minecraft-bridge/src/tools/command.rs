use crate::bot::{Bot, BotProvider};
use minecraft_mcp_core::ToolResponse;
use minecraft_mcp_server::Dispatcher;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
struct ExecuteCommand {
    command: String,
}

#[derive(Deserialize)]
struct CommandBatch {
    commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchMode {
    Sequential,
    Parallel,
}

impl BatchMode {
    fn label(self) -> &'static str {
        match self {
            BatchMode::Sequential => "Sequential",
            BatchMode::Parallel => "Parallel",
        }
    }
}

/// Outcome of a batch: (command, output) pairs that ran, and commands that failed
#[derive(Debug, Default)]
struct BatchReport {
    executed: Vec<(String, String)>,
    failed: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, command: &str, outcome: minecraft_mcp_core::Result<String>) {
        let command = normalize(command).to_string();
        match outcome {
            Ok(output) => self.executed.push((command, output)),
            Err(e) => {
                warn!("Batch command {} failed: {}", command, e);
                self.failed.push(command);
            }
        }
    }

    fn render(&self, mode: BatchMode) -> String {
        let mut message = format!("{} batch execution completed.\n", mode.label());
        let _ = writeln!(
            message,
            "Successfully executed {} commands:",
            self.executed.len()
        );
        for (command, output) in &self.executed {
            let _ = writeln!(message, "  - {}: {}", command, output);
        }
        if !self.failed.is_empty() {
            let _ = write!(
                message,
                "\nFailed to execute {} commands: [{}]",
                self.failed.len(),
                self.failed.join(", ")
            );
        }
        message
    }
}

fn normalize(command: &str) -> &str {
    command.strip_prefix('/').unwrap_or(command)
}

async fn run_batch(bot: Arc<dyn Bot>, commands: Vec<String>, mode: BatchMode) -> BatchReport {
    let mut report = BatchReport::default();
    match mode {
        BatchMode::Sequential => {
            for command in &commands {
                let outcome = bot.run_command(command).await;
                report.record(command, outcome);
            }
        }
        BatchMode::Parallel => {
            let handles: Vec<_> = commands
                .iter()
                .map(|command| {
                    let bot = bot.clone();
                    let command = command.clone();
                    tokio::spawn(async move { bot.run_command(&command).await })
                })
                .collect();
            for (command, handle) in commands.iter().zip(handles) {
                let outcome = handle.await.unwrap_or_else(|join| {
                    Err(minecraft_mcp_core::McpError::game(join.to_string()))
                });
                report.record(command, outcome);
            }
        }
    }
    report
}

fn register_batch(
    dispatcher: &mut Dispatcher,
    bots: &Arc<dyn BotProvider>,
    name: &str,
    description: &str,
    mode: BatchMode,
) {
    let provider = bots.clone();
    let order = match mode {
        BatchMode::Sequential => "in sequence",
        BatchMode::Parallel => "in parallel",
    };
    dispatcher.register_typed(
        name,
        description,
        json!({
            "type": "object",
            "properties": {
                "commands": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": format!("Array of Minecraft commands to execute {}", order)
                }
            },
            "required": ["commands"]
        }),
        move |p: CommandBatch| {
            let provider = provider.clone();
            async move {
                if p.commands.is_empty() {
                    return Ok(ToolResponse::text("No commands provided"));
                }
                let bot = provider.bot()?;
                let report = run_batch(bot, p.commands, mode).await;
                Ok(ToolResponse::text(report.render(mode)))
            }
        },
    );
}

pub(super) fn register(dispatcher: &mut Dispatcher, bots: &Arc<dyn BotProvider>) {
    let provider = bots.clone();
    dispatcher.register_typed(
        "execute-command",
        "Execute a Minecraft command",
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "The Minecraft command to execute" }
            },
            "required": ["command"]
        }),
        move |p: ExecuteCommand| {
            let provider = provider.clone();
            async move {
                let output = provider.bot()?.run_command(&p.command).await?;
                Ok(ToolResponse::text(format!(
                    "Executed command: \"{}\"\nResult: {}",
                    normalize(&p.command),
                    output
                )))
            }
        },
    );

    register_batch(
        dispatcher,
        bots,
        "execute-sequential-command-batch",
        "Execute multiple Minecraft commands sequentially (one after another)",
        BatchMode::Sequential,
    );
    register_batch(
        dispatcher,
        bots,
        "execute-parallel-command-batch",
        "Execute multiple Minecraft commands in parallel (simultaneously)",
        BatchMode::Parallel,
    );
}
