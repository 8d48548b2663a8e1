use crate::config::PinboardConfig;
use crate::controller::{ClickOutcome, PinboardController};
use crate::debounce::DebounceState;
use crate::reconciler::{DecorationReport, RouteChange, ToggleOutcome};
use crate::{Result, SyncError};
use log::{debug, info};
use pinboard_indexer::Document;
use pinboard_protocol::ConversationKey;
use pinboard_sidebar::{SidebarClick, SidebarSurface};
use pinboard_site::SiteRegistry;
use pinboard_store::{PinStore, StorageBackend};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

const MUTATION_REASON: &str = "mutation";
const INITIAL_REASON: &str = "initial";
const SETTLED_REASON: &str = "navigation_settled";

/// Something the event loop did, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PinboardUpdate {
    Navigated { change: RouteChange },
    Decorated { reason: String, report: DecorationReport },
    Toggled { index: usize, outcome: ToggleOutcome },
    Clicked { outcome: ClickOutcome },
    HighlightCleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeHealth {
    pub running: bool,
    /// Mutations recorded since the last rescan.
    pub pending_events: usize,
    pub rescans: u64,
    pub last_rescan_reason: Option<String>,
    pub current: Option<ConversationKey>,
    pub last_error: Option<String>,
}

impl RuntimeHealth {
    fn initial() -> Self {
        Self {
            running: true,
            pending_events: 0,
            rescans: 0,
            last_rescan_reason: None,
            current: None,
            last_error: None,
        }
    }
}

enum Command {
    Mutation { count: usize },
    Rescan { reason: String },
    Toggle { index: usize, reply: oneshot::Sender<ToggleOutcome> },
    Click { click: SidebarClick, reply: oneshot::Sender<ClickOutcome> },
    Shutdown,
}

/// Cloneable handle to a running pinboard session.
///
/// The host forwards DOM mutation notices and control clicks here. Dropping
/// the last clone stops the session, which is what a page unload does.
#[derive(Clone)]
pub struct PinboardHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    command_tx: mpsc::Sender<Command>,
    update_tx: broadcast::Sender<PinboardUpdate>,
    health_tx: watch::Sender<RuntimeHealth>,
}

impl PinboardHandle {
    /// Reports `count` structural mutations; bursts are coalesced.
    pub async fn notify_mutation(&self, count: usize) -> Result<()> {
        self.send(Command::Mutation { count }).await
    }

    /// Requests a rescan without waiting for the debounce window.
    pub async fn rescan(&self, reason: impl Into<String>) -> Result<()> {
        self.send(Command::Rescan {
            reason: reason.into(),
        })
        .await
    }

    /// Pin control clicked on the message at `index`.
    pub async fn toggle(&self, index: usize) -> Result<ToggleOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Toggle { index, reply }).await?;
        outcome
            .await
            .map_err(|err| SyncError::Stopped(format!("toggle dropped: {err}")))
    }

    pub async fn click(&self, click: SidebarClick) -> Result<ClickOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Click { click, reply }).await?;
        outcome
            .await
            .map_err(|err| SyncError::Stopped(format!("click dropped: {err}")))
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<PinboardUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health(&self) -> RuntimeHealth {
        self.inner.health_tx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<RuntimeHealth> {
        self.inner.health_tx.subscribe()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .await
            .map_err(|err| SyncError::Stopped(format!("failed to send command: {err}")))
    }
}

impl Drop for PinboardHandle {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(Command::Shutdown);
        }
    }
}

/// Entry point for hosts.
pub struct Pinboard;

impl Pinboard {
    /// Starts a session for `document` when its host has a site
    /// configuration. An unsupported host gets `Ok(None)` and nothing runs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<D, S>(
        document: Arc<D>,
        registry: &SiteRegistry,
        backend: Arc<dyn StorageBackend>,
        surface: S,
        config: PinboardConfig,
    ) -> Result<Option<PinboardHandle>>
    where
        D: Document + ?Sized + 'static,
        S: SidebarSurface + 'static,
    {
        config.validate()?;
        let host = document.location().host;
        let Some(site) = registry.for_host(&host) else {
            debug!("no site configuration for {host}; staying inert");
            return Ok(None);
        };
        info!("attaching pinboard to {host} using site '{}'", site.name);

        let controller = PinboardController::new(document, site, PinStore::new(backend), surface, &config);
        Ok(Some(PinboardRuntime::start(controller, &config)))
    }
}

/// Single consumer of every event source: host commands, the route poll,
/// the debounced rescan, the post-navigation settle, and highlight expiry.
pub struct PinboardRuntime;

impl PinboardRuntime {
    pub fn start<D, S>(controller: PinboardController<D, S>, config: &PinboardConfig) -> PinboardHandle
    where
        D: Document + ?Sized + 'static,
        S: SidebarSurface + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (update_tx, _) = broadcast::channel(64);
        let (health_tx, _) = watch::channel(RuntimeHealth::initial());

        spawn_loop(
            controller,
            config.clone(),
            command_rx,
            update_tx.clone(),
            health_tx.clone(),
        );

        PinboardHandle {
            inner: Arc::new(HandleInner {
                command_tx,
                update_tx,
                health_tx,
            }),
        }
    }
}

fn spawn_loop<D, S>(
    mut controller: PinboardController<D, S>,
    config: PinboardConfig,
    mut command_rx: mpsc::Receiver<Command>,
    update_tx: broadcast::Sender<PinboardUpdate>,
    health_tx: watch::Sender<RuntimeHealth>,
) where
    D: Document + ?Sized + 'static,
    S: SidebarSurface + 'static,
{
    tokio::spawn(async move {
        let mut debounce = DebounceState::new(config.debounce(), config.max_batch_wait());
        let mut health = RuntimeHealth::initial();

        if let Some(change) = controller.start().await {
            health.current = Some(change.to.clone());
            let _ = update_tx.send(PinboardUpdate::Navigated { change });
        }
        health.last_error = controller.state().last_error.clone();
        health_tx.send_replace(health.clone());

        let mut settle_at = Some(Instant::now() + config.initial_delay());
        let mut settle_reason = INITIAL_REASON;
        let mut route_poll = time::interval_at(Instant::now() + config.route_poll(), config.route_poll());
        route_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let rescan_at = debounce.next_deadline();
            let highlight_at = controller.highlight_deadline();

            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        None | Some(Command::Shutdown) => break,
                        Some(Command::Mutation { count }) => {
                            debounce.record_event(count, MUTATION_REASON);
                        }
                        Some(Command::Rescan { reason }) => debounce.force_run(reason),
                        Some(Command::Toggle { index, reply }) => {
                            let outcome = controller.toggle(index).await;
                            let _ = update_tx.send(PinboardUpdate::Toggled { index, outcome: outcome.clone() });
                            let _ = reply.send(outcome);
                        }
                        Some(Command::Click { click, reply }) => {
                            let outcome = controller.click(click).await;
                            let _ = update_tx.send(PinboardUpdate::Clicked { outcome: outcome.clone() });
                            let _ = reply.send(outcome);
                        }
                    }
                    health.pending_events = debounce.pending();

                    if let Some(change) = controller.take_route_change() {
                        settle_at = Some(Instant::now() + config.settle());
                        settle_reason = SETTLED_REASON;
                        health.current = Some(change.to.clone());
                        let _ = update_tx.send(PinboardUpdate::Navigated { change });
                    }
                }
                _ = route_poll.tick() => {
                    if let Some(change) = controller.poll_route().await {
                        settle_at = Some(Instant::now() + config.settle());
                        settle_reason = SETTLED_REASON;
                        health.current = Some(change.to.clone());
                        let _ = update_tx.send(PinboardUpdate::Navigated { change });
                    }
                }
                () = sleep_until_some(rescan_at), if debounce.should_run() => {
                    let reason = debounce
                        .take_reason()
                        .unwrap_or_else(|| MUTATION_REASON.to_string());
                    debounce.reset();
                    health.pending_events = 0;

                    // A burst can be the first sign of a navigation.
                    if let Some(change) = controller.poll_route().await {
                        settle_at = Some(Instant::now() + config.settle());
                        settle_reason = SETTLED_REASON;
                        health.current = Some(change.to.clone());
                        let _ = update_tx.send(PinboardUpdate::Navigated { change });
                    } else {
                        let report = controller.decorate();
                        controller.render();
                        record_rescan(&mut health, &reason);
                        let _ = update_tx.send(PinboardUpdate::Decorated { reason, report });
                    }
                }
                () = sleep_until_some(settle_at), if settle_at.is_some() => {
                    settle_at = None;
                    let report = controller.decorate();
                    controller.render();
                    record_rescan(&mut health, settle_reason);
                    let _ = update_tx.send(PinboardUpdate::Decorated {
                        reason: settle_reason.to_string(),
                        report,
                    });
                }
                () = sleep_until_some(highlight_at), if highlight_at.is_some() => {
                    if controller.clear_expired_highlight(Instant::now()) {
                        let _ = update_tx.send(PinboardUpdate::HighlightCleared);
                    }
                }
            }

            health.last_error = controller.state().last_error.clone();
            health_tx.send_if_modified(|published| {
                if *published == health {
                    false
                } else {
                    *published = health.clone();
                    true
                }
            });
        }

        controller.teardown();
        health.running = false;
        health.pending_events = 0;
        health_tx.send_replace(health);
        debug!("pinboard runtime stopped");
    });
}

fn record_rescan(health: &mut RuntimeHealth, reason: &str) {
    health.rescans += 1;
    health.last_rescan_reason = Some(reason.to_string());
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
