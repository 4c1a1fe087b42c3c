//! RCON-backed session handles
//!
//! The bot is an in-world player identity driven through server commands.
//! A session authenticates over RCON, waits until the player is online and
//! then keeps a heartbeat on the player list. Chat comes from the server log
//! when one is configured.

use crate::log_tail::{LogTail, LogTailConfig};
use crate::reply::{parse_player_list, strip_formatting};
use crate::rcon::RconClient;
use async_trait::async_trait;
use minecraft_mcp_core::{ErrorClass, McpError, Result, SessionConfig};
use minecraft_mcp_server::{Connector, Session, SessionEvent, SessionHandle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

pub const GREETING: &str = "LLM-powered bot ready to receive instructions!";

/// Something that runs server commands
#[async_trait]
pub trait Console: Send + Sync + 'static {
    async fn connect(&self) -> Result<()>;

    async fn execute(&self, command: &str) -> Result<String>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self);
}

#[async_trait]
impl Console for RconClient {
    async fn connect(&self) -> Result<()> {
        RconClient::connect(self).await
    }

    async fn execute(&self, command: &str) -> Result<String> {
        RconClient::execute(self, command).await
    }

    fn is_connected(&self) -> bool {
        RconClient::is_connected(self)
    }

    async fn disconnect(&self) {
        RconClient::disconnect(self).await
    }
}

/// Polling intervals of the session driver
#[derive(Debug, Clone, Copy)]
pub struct DriverTiming {
    /// Player list poll while waiting for the bot to join
    pub join_poll: Duration,
    /// Player list poll once in the world
    pub heartbeat: Duration,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            join_poll: Duration::from_secs(1),
            heartbeat: Duration::from_secs(5),
        }
    }
}

/// Builds [`RconBot`] sessions
#[derive(Debug, Clone, Default)]
pub struct RconConnector {
    timing: DriverTiming,
}

impl RconConnector {
    pub fn with_timing(timing: DriverTiming) -> Self {
        Self { timing }
    }
}

impl Connector for RconConnector {
    type Handle = RconBot;

    fn connect(&self, config: &SessionConfig) -> Session<RconBot> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let console = RconClient::new(config.address(), config.password.clone());
        let bot = Arc::new(RconBot::with_console(
            config.username.clone(),
            console,
            events_tx,
        ));
        bot.start(self.timing, config.server_log.clone());
        Session {
            handle: bot,
            events,
        }
    }
}

/// One session: a console plus the player it drives
pub struct RconBot<C: Console = RconClient> {
    pub(crate) username: String,
    pub(crate) console: C,
    events: mpsc::UnboundedSender<SessionEvent>,
    ended: AtomicBool,
    /// Bumped to stop walking and pathing
    pub(crate) motion: AtomicU64,
    /// Bumped to stop flight
    pub(crate) flight: AtomicU64,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Console> RconBot<C> {
    pub fn with_console(
        username: impl Into<String>,
        console: C,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            username: username.into(),
            console,
            events,
            ended: AtomicBool::new(false),
            motion: AtomicU64::new(0),
            flight: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the driver and, if configured, the chat tail
    pub fn start(self: &Arc<Self>, timing: DriverTiming, server_log: Option<PathBuf>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        tasks.push(tokio::spawn(self.clone().drive(timing)));

        if let Some(path) = server_log {
            let events = self.events.clone();
            tasks.push(tokio::spawn(async move {
                LogTail::open_at_end(LogTailConfig::with_path(path))
                    .await
                    .run(events)
                    .await;
            }));
        }
    }

    /// Emit an event; nothing follows `Ended`
    fn emit(&self, event: SessionEvent) {
        let ending = matches!(event, SessionEvent::Ended { .. });
        if ending {
            if self.ended.swap(true, Ordering::SeqCst) {
                return;
            }
        } else if self.ended.load(Ordering::SeqCst) {
            return;
        }
        // The observer may have moved on to a newer session
        let _ = self.events.send(event);
    }

    fn finish(&self, reason: impl Into<String>) {
        self.emit(SessionEvent::Ended {
            reason: reason.into(),
        });
    }

    /// Report a transport failure and end the session
    fn fail(&self, err: &McpError) {
        self.emit(SessionEvent::Error {
            class: err.class().unwrap_or(ErrorClass::Other),
            message: err.to_string(),
        });
        self.finish(format!("Connection lost: {}", err));
    }

    /// Stop movement in progress
    pub(crate) fn halt(&self) {
        self.motion.fetch_add(1, Ordering::SeqCst);
        self.flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Run a command, ending the session if the console went away
    pub(crate) async fn command(&self, command: &str) -> Result<String> {
        match self.console.execute(command).await {
            Ok(reply) => Ok(strip_formatting(&reply)),
            Err(e) => {
                if !self.console.is_connected() {
                    self.halt();
                    self.fail(&e);
                }
                Err(e)
            }
        }
    }

    async fn is_online(&self) -> Result<bool> {
        let reply = self.command("list").await?;
        Ok(parse_player_list(&reply).iter().any(|n| *n == self.username))
    }

    async fn drive(self: Arc<Self>, timing: DriverTiming) {
        if let Err(e) = self.console.connect().await {
            match e {
                McpError::Rejected(reason) => {
                    self.emit(SessionEvent::Kicked {
                        reason: reason.clone(),
                    });
                    self.finish(reason);
                }
                other => self.fail(&other),
            }
            return;
        }
        self.emit(SessionEvent::Login);

        let mut polls = 0u32;
        loop {
            match self.is_online().await {
                Ok(true) => break,
                Ok(false) => {
                    polls += 1;
                    if polls % 10 == 0 {
                        warn!(
                            "Waiting for player {} to join the server ({} checks)",
                            self.username, polls
                        );
                    }
                }
                Err(e) => {
                    debug!("Player list check failed: {}", e);
                    if self.ended.load(Ordering::SeqCst) {
                        return;
                    }
                }
            }
            sleep(timing.join_poll).await;
        }
        self.emit(SessionEvent::Spawned);

        loop {
            sleep(timing.heartbeat).await;
            match self.is_online().await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Player {} left the server", self.username);
                    self.halt();
                    self.finish(format!("{} left the game", self.username));
                    return;
                }
                Err(e) => {
                    debug!("Heartbeat failed: {}", e);
                    if self.ended.load(Ordering::SeqCst) {
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<C: Console> SessionHandle for RconBot<C> {
    async fn prepare(&self) -> Result<()> {
        self.halt();
        self.say(GREETING).await
    }

    async fn terminate(&self, reason: &str) -> Result<()> {
        self.halt();
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
        self.console.disconnect().await;
        self.finish(reason);
        Ok(())
    }
}
