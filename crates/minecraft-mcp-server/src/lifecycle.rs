//! Connection lifecycle manager
//!
//! Owns the current session handle, the tri-state [`SessionStatus`] and the
//! reconnect timer. It is the only writer of status. State lives behind a
//! `std::sync::Mutex` that is never held across an `.await`; status is also
//! published on a `watch` channel so readiness waiters wake on change.
//!
//! Invariants:
//! - `reconnecting` implies status is not `Connected`
//! - at most one reconnect timer is pending
//! - a handle is never dropped while status is still `Connected`
//! - events from a superseded handle are ignored

use async_trait::async_trait;
use minecraft_mcp_core::{Result, SUPPORTED_MINECRAFT_VERSION, SessionConfig};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::session::{Connector, Session, SessionEvent, SessionHandle, SessionId, SessionStatus};

/// Extra time a readiness check waits on top of the reconnect delay
pub const READINESS_GRACE: Duration = Duration::from_millis(5000);

const PROJECT_URL: &str = "https://github.com/yuniko-software/minecraft-mcp-server";

const CONNECTING_MESSAGE: &str =
    "Bot is connecting to the Minecraft server. Please wait a moment and try again.";

/// Outcome of a readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Not ready; carries the user-facing explanation
    NotReady(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Anything dispatch can ask "may operations run now?"
#[async_trait]
pub trait ReadinessGate: Send + Sync {
    async fn check_readiness(&self) -> Readiness;
}

/// A chat line forwarded from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub username: String,
    pub message: String,
}

/// Run a fallible cleanup step, logging instead of propagating failure
pub async fn best_effort<F>(action: &str, step: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = step.await {
        warn!("Error while {}: {}", action, e);
    }
}

struct Attached<H> {
    id: SessionId,
    handle: Arc<H>,
    observer: Option<JoinHandle<()>>,
}

struct Lifecycle<H> {
    status_tx: watch::Sender<SessionStatus>,
    current: Option<Attached<H>>,
    reconnecting: bool,
    reconnect_timer: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl<H> Lifecycle<H> {
    fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    fn set_status(&mut self, status: SessionStatus) {
        debug_assert!(
            !(self.reconnecting && status == SessionStatus::Connected),
            "reconnect in progress while connected"
        );
        debug_assert!(
            !(self.current.is_none() && status == SessionStatus::Connected),
            "connected without a handle"
        );
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!("Session status {:?} -> {:?}", previous, status);
        }
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.current.as_ref().is_some_and(|a| a.id == id)
    }

    /// Drop the current handle, stopping its observer
    fn detach(&mut self) -> Option<Arc<H>> {
        let attached = self.current.take()?;
        if let Some(observer) = attached.observer {
            observer.abort();
        }
        if self.status() == SessionStatus::Connected {
            self.set_status(SessionStatus::Disconnected);
        }
        Some(attached.handle)
    }
}

struct Shared<C: Connector> {
    connector: C,
    config: SessionConfig,
    state: Mutex<Lifecycle<C::Handle>>,
    chat_tx: broadcast::Sender<ChatMessage>,
    next_id: AtomicU64,
}

/// Maintains exactly one logical session to the server
pub struct ConnectionManager<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager in the `Disconnected` state with no handle
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Disconnected);
        let (chat_tx, _) = broadcast::channel(64);

        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                state: Mutex::new(Lifecycle {
                    status_tx,
                    current: None,
                    reconnecting: false,
                    reconnect_timer: None,
                    shut_down: false,
                }),
                chat_tx,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<C::Handle>> {
        // A panic while holding the lock cannot leave the state half-written
        // (every transition is a single assignment), so keep serving.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == SessionStatus::Connected
    }

    /// The current session handle, if any
    pub fn current(&self) -> Option<Arc<C::Handle>> {
        self.lock().current.as_ref().map(|a| a.handle.clone())
    }

    /// Subscribe to chat from other players
    pub fn subscribe_chat(&self) -> broadcast::Receiver<ChatMessage> {
        self.shared.chat_tx.subscribe()
    }

    /// Build a fresh handle and start observing it
    pub fn connect(&self) {
        let superseded = {
            let mut state = self.lock();
            if state.shut_down {
                debug!("Ignoring connect after cleanup");
                return;
            }

            let Session { handle, events } = self.shared.connector.connect(&self.shared.config);
            let id = SessionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));

            let superseded = state.detach();
            state.current = Some(Attached {
                id,
                handle,
                observer: None,
            });
            state.reconnecting = false;
            state.set_status(SessionStatus::Connecting);

            let observer = tokio::spawn(self.clone().observe(id, events));
            if let Some(attached) = state.current.as_mut() {
                attached.observer = Some(observer);
            }
            debug!("Attached session {}", id);
            superseded
        };

        if let Some(old) = superseded {
            tokio::spawn(async move {
                best_effort("cleaning up superseded bot", old.terminate("Superseded")).await;
            });
        }
    }

    async fn observe(self, id: SessionId, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle_event(id, event).await {
                break;
            }
        }
        debug!("Observer for session {} finished", id);
    }

    /// Apply one event; returns false once the handle is no longer observed
    async fn handle_event(&self, id: SessionId, event: SessionEvent) -> bool {
        let handle = {
            let state = self.lock();
            match state.current.as_ref() {
                Some(attached) if attached.id == id => attached.handle.clone(),
                _ => {
                    debug!("Ignoring {:?} from superseded session {}", event, id);
                    return false;
                }
            }
        };

        match event {
            SessionEvent::Login => {
                info!("Bot logged in successfully");
            }
            SessionEvent::Spawned => {
                {
                    let mut state = self.lock();
                    if !state.is_current(id) {
                        return false;
                    }
                    if state.reconnecting {
                        debug!("Session {} spawned during a pending reconnect", id);
                        return true;
                    }
                    state.set_status(SessionStatus::Connected);
                }
                info!("Bot spawned in world");
                best_effort("running post-connect setup", handle.prepare()).await;
                let config = &self.shared.config;
                info!(
                    "Bot connected successfully. Username: {}, Server: {}",
                    config.username,
                    config.address()
                );
            }
            SessionEvent::Chat { username, message } => {
                if username != self.shared.config.username {
                    // No subscribers is fine
                    let _ = self.shared.chat_tx.send(ChatMessage { username, message });
                }
            }
            SessionEvent::Kicked { reason } => {
                error!("Bot was kicked from server: {}", reason);
                {
                    let mut state = self.lock();
                    if state.is_current(id) {
                        state.set_status(SessionStatus::Disconnected);
                    }
                }
                best_effort("terminating kicked bot", handle.terminate("Kicked")).await;
            }
            SessionEvent::Error { class, message } => {
                error!("Bot error [{}]: {}", class, message);
                if class.is_transport_lost() {
                    let mut state = self.lock();
                    if state.is_current(id) {
                        state.set_status(SessionStatus::Disconnected);
                    }
                }
            }
            SessionEvent::Ended { reason } => {
                info!("Bot disconnected: {}", reason);
                let mut state = self.lock();
                if state.is_current(id) {
                    state.set_status(SessionStatus::Disconnected);
                    // Dropping our own JoinHandle detaches; aborting it would
                    // cancel this very task.
                    state.current = None;
                    info!("Bot instance cleaned up after disconnect");
                }
                return false;
            }
        }
        true
    }

    /// Schedule a reconnect after the configured delay
    ///
    /// No-op while a reconnect is pending or a handshake is in flight.
    pub fn attempt_reconnect(&self) {
        let mut state = self.lock();
        if state.shut_down || state.reconnecting || state.status() == SessionStatus::Connecting {
            return;
        }

        let delay = self.shared.config.reconnect_delay;
        state.reconnecting = true;
        state.set_status(SessionStatus::Connecting);
        info!(
            "Attempting to reconnect to Minecraft server in {}ms...",
            delay.as_millis()
        );

        if let Some(timer) = state.reconnect_timer.take() {
            timer.abort();
        }

        let this = self.clone();
        state.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.reconnect_now().await;
        }));
    }

    async fn reconnect_now(&self) {
        let old = {
            let mut state = self.lock();
            state.reconnect_timer = None;
            state.detach()
        };

        if let Some(old) = old {
            best_effort("cleaning up old bot", old.terminate("Reconnecting...")).await;
            info!("Old bot instance cleaned up");
        }

        info!("Creating new bot instance...");
        self.connect();
    }

    /// Ready now, or after a bounded wait for a reconnect to land
    pub async fn check_readiness(&self) -> Readiness {
        let (status, mut status_rx) = {
            let state = self.lock();
            (state.status(), state.status_tx.subscribe())
        };

        match status {
            SessionStatus::Connected => Readiness::Ready,
            SessionStatus::Connecting => Readiness::NotReady(CONNECTING_MESSAGE.to_string()),
            SessionStatus::Disconnected => {
                self.attempt_reconnect();

                let bound = self.shared.config.reconnect_delay + READINESS_GRACE;
                let connected =
                    tokio::time::timeout(bound, status_rx.wait_for(|s| *s == SessionStatus::Connected))
                        .await;

                match connected {
                    Ok(Ok(_)) => Readiness::Ready,
                    _ => Readiness::NotReady(self.unreachable_message()),
                }
            }
        }
    }

    fn unreachable_message(&self) -> String {
        let address = self.shared.config.address();
        format!(
            "Cannot connect to Minecraft server at {address}\n\n\
             Please ensure:\n\
             1. Minecraft server is running on {address}\n\
             2. Server is accessible from this machine\n\
             3. RCON is enabled (enable-rcon=true) and the password matches\n\
             4. Server version is compatible (latest supported: {SUPPORTED_MINECRAFT_VERSION})\n\n\
             For setup instructions, visit: {PROJECT_URL}"
        )
    }

    /// Cancel any pending reconnect and release the handle. Idempotent.
    pub async fn cleanup(&self) {
        let (timer, handle) = {
            let mut state = self.lock();
            state.shut_down = true;
            state.reconnecting = false;
            let timer = state.reconnect_timer.take();
            let handle = state.detach();
            state.set_status(SessionStatus::Disconnected);
            (timer, handle)
        };

        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(handle) = handle {
            best_effort("during cleanup", handle.terminate("Server shutting down")).await;
        }
    }
}

#[async_trait]
impl<C: Connector> ReadinessGate for ConnectionManager<C> {
    async fn check_readiness(&self) -> Readiness {
        ConnectionManager::check_readiness(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use minecraft_mcp_core::{ErrorClass, McpError, ToolResponse};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{Instant, sleep};

    #[derive(Default)]
    struct StubHandle {
        prepared: AtomicUsize,
        terminated: AtomicUsize,
        fail_terminate: bool,
    }

    #[async_trait]
    impl SessionHandle for StubHandle {
        async fn prepare(&self) -> Result<()> {
            self.prepared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn terminate(&self, _reason: &str) -> Result<()> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            if self.fail_terminate {
                return Err(McpError::game("socket already closed"));
            }
            Ok(())
        }
    }

    type Spawned = (Arc<StubHandle>, mpsc::UnboundedSender<SessionEvent>);

    #[derive(Clone, Default)]
    struct StubConnector {
        connects: Arc<AtomicUsize>,
        sessions: Arc<Mutex<Vec<Spawned>>>,
        fail_terminate: bool,
    }

    impl StubConnector {
        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn handle(&self, index: usize) -> Arc<StubHandle> {
            self.sessions.lock().unwrap()[index].0.clone()
        }

        fn emit(&self, index: usize, event: SessionEvent) {
            // The observer may already be gone; that is what some tests check
            let _ = self.sessions.lock().unwrap()[index].1.send(event);
        }
    }

    impl Connector for StubConnector {
        type Handle = StubHandle;

        fn connect(&self, _config: &SessionConfig) -> Session<StubHandle> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let handle = Arc::new(StubHandle {
                fail_terminate: self.fail_terminate,
                ..Default::default()
            });
            let (tx, events) = mpsc::unbounded_channel();
            self.sessions.lock().unwrap().push((handle.clone(), tx));
            Session { handle, events }
        }
    }

    fn config(delay_ms: u64) -> SessionConfig {
        SessionConfig {
            reconnect_delay: Duration::from_millis(delay_ms),
            ..Default::default()
        }
    }

    fn manager(delay_ms: u64) -> (ConnectionManager<StubConnector>, StubConnector) {
        let connector = StubConnector::default();
        (ConnectionManager::new(connector.clone(), config(delay_ms)), connector)
    }

    /// Let spawned tasks drain their queues (time is paused)
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_manager_is_disconnected() {
        let (manager, connector) = manager(100);
        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(manager.current().is_none());
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_connects_and_prepares_once() {
        let (manager, connector) = manager(100);
        manager.connect();
        assert_eq!(manager.status(), SessionStatus::Connecting);

        connector.emit(0, SessionEvent::Login);
        connector.emit(0, SessionEvent::Spawned);
        settle().await;

        assert_eq!(manager.status(), SessionStatus::Connected);
        assert_eq!(connector.handle(0).prepared.load(Ordering::SeqCst), 1);
        assert_eq!(manager.check_readiness().await, Readiness::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connecting_reports_wait_message_without_side_effects() {
        let (manager, connector) = manager(100);
        manager.connect();

        match manager.check_readiness().await {
            Readiness::NotReady(detail) => assert!(detail.contains("connecting")),
            Readiness::Ready => panic!("should not be ready while connecting"),
        }
        assert_eq!(connector.connects(), 1);
        assert_eq!(manager.status(), SessionStatus::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_readiness_starts_one_reconnect() {
        let (manager, connector) = manager(100);

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let m = manager.clone();
                tokio::spawn(async move { m.check_readiness().await })
            })
            .collect();

        sleep(Duration::from_millis(150)).await;
        assert_eq!(connector.connects(), 1);

        connector.emit(0, SessionEvent::Spawned);
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Readiness::Ready);
        }
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_server_times_out_with_diagnostic() {
        let (manager, connector) = manager(100);

        let start = Instant::now();
        let readiness = manager.check_readiness().await;
        let elapsed = start.elapsed();

        let Readiness::NotReady(detail) = readiness else {
            panic!("expected not ready");
        };
        assert!(detail.contains("Cannot connect"));
        assert!(detail.contains("localhost:25575"));
        assert!(detail.contains(SUPPORTED_MINECRAFT_VERSION));
        assert!(detail.contains("github.com"));
        assert_eq!(elapsed, Duration::from_millis(5100));
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_call_against_unreachable_server_fails_fast() {
        let (manager, connector) = manager(100);
        let runs = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new(Arc::new(manager.clone()));
        let counter = runs.clone();
        dispatcher.register("get-position", "Position", json!({}), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(ToolResponse::text("Current position: (0, 64, 0)")) }
        });

        let start = Instant::now();
        let response = dispatcher.call("get-position", json!({})).await.unwrap();
        let elapsed = start.elapsed();

        assert!(response.is_error());
        let text = response.text_content();
        assert!(text.contains("Cannot connect"));
        assert!(text.contains("localhost:25575"));
        assert!(elapsed <= Duration::from_millis(5100));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_end_does_not_clobber_new_handle() {
        let (manager, connector) = manager(100);
        manager.connect();
        connector.emit(0, SessionEvent::Spawned);
        settle().await;

        manager.attempt_reconnect();
        assert_eq!(manager.status(), SessionStatus::Connecting);
        sleep(Duration::from_millis(150)).await;

        assert_eq!(connector.connects(), 2);
        assert_eq!(connector.handle(0).terminated.load(Ordering::SeqCst), 1);

        // Through the (detached) channel and directly through the handler
        connector.emit(0, SessionEvent::Ended {
            reason: "socketClosed".into(),
        });
        settle().await;
        let observed = manager
            .handle_event(SessionId(1), SessionEvent::Ended {
                reason: "socketClosed".into(),
            })
            .await;
        assert!(!observed);

        assert_eq!(manager.status(), SessionStatus::Connecting);
        let current = manager.current().expect("new handle kept");
        assert!(Arc::ptr_eq(&current, &connector.handle(1)));

        connector.emit(1, SessionEvent::Spawned);
        settle().await;
        assert_eq!(manager.status(), SessionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kick_disconnects_and_terminates() {
        let (manager, connector) = manager(100);
        manager.connect();
        connector.emit(0, SessionEvent::Spawned);
        connector.emit(0, SessionEvent::Kicked {
            reason: "You are banned".into(),
        });
        settle().await;

        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert_eq!(connector.handle(0).terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_transport_loss_errors_disconnect() {
        let (manager, connector) = manager(100);
        manager.connect();
        connector.emit(0, SessionEvent::Spawned);
        connector.emit(0, SessionEvent::Error {
            class: ErrorClass::Other,
            message: "malformed packet".into(),
        });
        settle().await;
        assert_eq!(manager.status(), SessionStatus::Connected);

        connector.emit(0, SessionEvent::Error {
            class: ErrorClass::ConnectionRefused,
            message: "connection refused".into(),
        });
        settle().await;
        assert_eq!(manager.status(), SessionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_current_handle_releases_it() {
        let (manager, connector) = manager(100);
        manager.connect();
        connector.emit(0, SessionEvent::Spawned);
        connector.emit(0, SessionEvent::Ended {
            reason: "socketClosed".into(),
        });
        settle().await;

        assert_eq!(manager.status(), SessionStatus::Disconnected);
        assert!(manager.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_while_connecting_allows_new_attempt() {
        let (manager, connector) = manager(100);
        manager.connect();
        connector.emit(0, SessionEvent::Ended {
            reason: "handshake failed".into(),
        });
        settle().await;
        assert_eq!(manager.status(), SessionStatus::Disconnected);

        manager.attempt_reconnect();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_reconnect_is_idempotent() {
        let (manager, connector) = manager(100);
        manager.attempt_reconnect();
        manager.attempt_reconnect();
        manager.attempt_reconnect();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_is_idempotent_and_swallows_failures() {
        let connector = StubConnector {
            fail_terminate: true,
            ..Default::default()
        };
        let manager = ConnectionManager::new(connector.clone(), config(100));

        manager.cleanup().await;

        manager.connect();
        manager.attempt_reconnect();
        manager.cleanup().await;
        manager.cleanup().await;

        assert_eq!(connector.handle(0).terminated.load(Ordering::SeqCst), 1);
        assert!(manager.current().is_none());
        assert_eq!(manager.status(), SessionStatus::Disconnected);

        // The cancelled timer never fires a second connect
        sleep(Duration::from_millis(500)).await;
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_forwarding_skips_own_messages() {
        let (manager, connector) = manager(100);
        let mut chat = manager.subscribe_chat();
        manager.connect();

        connector.emit(0, SessionEvent::Chat {
            username: "LLMBot".into(),
            message: "echo".into(),
        });
        connector.emit(0, SessionEvent::Chat {
            username: "Steve".into(),
            message: "hello bot".into(),
        });
        settle().await;

        let received = chat.recv().await.unwrap();
        assert_eq!(received.username, "Steve");
        assert_eq!(received.message, "hello bot");
        assert!(chat.try_recv().is_err());
    }
}
