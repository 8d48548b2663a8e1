use crate::config::PinboardConfig;
use crate::reconciler::{DecorationReport, JumpOutcome, Reconciler, RouteChange, ToggleOutcome};
use crate::state::AppState;
use log::warn;
use pinboard_indexer::{Document, MessageIndexer};
use pinboard_protocol::{ConversationKey, PinId};
use pinboard_sidebar::{SidebarAction, SidebarClick, SidebarPresenter, SidebarSurface, SidebarView};
use pinboard_site::SiteConfig;
use pinboard_store::PinStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// What a sidebar click ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    SidebarOpened,
    SidebarClosed,
    FolderToggled { conversation: ConversationKey, expanded: bool },
    FolderDeleted { conversation: ConversationKey, pins: usize },
    PinDeleted { conversation: ConversationKey, pin: PinId, removed: bool },
    Jumped { jump: JumpOutcome },
    OpenedNewContext { url: String },
}

/// One attached pinboard session: the page, its app state, and the sidebar.
///
/// Every user action and every rescan goes through `&mut self`, so a
/// decoration pass never interleaves with a toggle.
pub struct PinboardController<D: Document + ?Sized, S: SidebarSurface> {
    document: Arc<D>,
    state: AppState,
    reconciler: Reconciler,
    presenter: SidebarPresenter,
    surface: S,
    unreported_change: Option<RouteChange>,
}

impl<D: Document + ?Sized, S: SidebarSurface> PinboardController<D, S> {
    pub fn new(
        document: Arc<D>,
        site: Arc<SiteConfig>,
        store: PinStore,
        surface: S,
        config: &PinboardConfig,
    ) -> Self {
        let indexer = MessageIndexer::new(site).with_limits(config.text_limits());
        Self {
            document,
            state: AppState::new(store),
            reconciler: Reconciler::new(indexer, config.highlight()),
            presenter: SidebarPresenter::new(),
            surface,
            unreported_change: None,
        }
    }

    /// Mounts the sidebar, adopts the page's conversation, and draws.
    pub async fn start(&mut self) -> Option<RouteChange> {
        self.surface.mount();
        let change = self.poll_route().await;
        if change.is_none() {
            self.render();
        }
        change
    }

    /// Route check; re-renders when the conversation changed.
    pub async fn poll_route(&mut self) -> Option<RouteChange> {
        let change = self
            .reconciler
            .check_route_change(&*self.document, &mut self.state)
            .await;
        if change.is_some() {
            self.render();
        }
        change
    }

    /// Navigation noticed by a user action rather than by `poll_route`.
    pub fn take_route_change(&mut self) -> Option<RouteChange> {
        self.unreported_change.take()
    }

    /// Adopts the live route before an action, so the action and the
    /// sidebar agree on which conversation is on screen.
    async fn follow_route(&mut self) {
        if let Some(change) = self.poll_route().await {
            self.unreported_change = Some(change);
        }
    }

    pub fn decorate(&mut self) -> DecorationReport {
        self.reconciler.decorate(&*self.document, &self.state)
    }

    pub async fn toggle(&mut self, index: usize) -> ToggleOutcome {
        self.follow_route().await;
        let outcome = self
            .reconciler
            .toggle(&*self.document, &mut self.state, index)
            .await;
        self.render();
        outcome
    }

    pub async fn jump(&mut self, pin: &PinId) -> JumpOutcome {
        self.follow_route().await;
        let outcome = self.reconciler.jump(&*self.document, &mut self.state, pin).await;
        if matches!(outcome, JumpOutcome::Orphaned { .. }) {
            self.reconciler.refresh_control_states(&*self.document, &self.state);
            self.render();
        }
        outcome
    }

    pub async fn click(&mut self, click: SidebarClick) -> ClickOutcome {
        self.follow_route().await;
        let action = self
            .presenter
            .interpret(click, self.state.current.as_ref(), self.state.sidebar_open);

        let outcome = match action {
            SidebarAction::Open => {
                self.state.sidebar_open = true;
                if let Some(current) = &self.state.current {
                    self.state.folders.expand(current);
                }
                ClickOutcome::SidebarOpened
            }
            SidebarAction::Close => {
                self.state.sidebar_open = false;
                ClickOutcome::SidebarClosed
            }
            SidebarAction::ToggleFolder(conversation) => {
                let expanded = self.state.folders.toggle(&conversation);
                ClickOutcome::FolderToggled {
                    conversation,
                    expanded,
                }
            }
            SidebarAction::DeleteFolder(conversation) => {
                let pins = self
                    .state
                    .store
                    .conversation(&conversation)
                    .map_or(0, |record| record.pin_count());
                if let Err(err) = self.state.store.remove_conversation(&conversation).await {
                    self.state.record_error(format!("deleting folder {conversation}: {err}"));
                }
                self.state.folders.forget(&conversation);
                self.reconciler.refresh_control_states(&*self.document, &self.state);
                ClickOutcome::FolderDeleted { conversation, pins }
            }
            SidebarAction::DeletePin { conversation, pin } => {
                if let Err(err) = self.state.store.remove_pin(&conversation, &pin).await {
                    self.state.record_error(format!("deleting pin {pin}: {err}"));
                }
                let removed = self.state.store.find_pin(&conversation, &pin).is_none();
                self.reconciler.refresh_control_states(&*self.document, &self.state);
                ClickOutcome::PinDeleted {
                    conversation,
                    pin,
                    removed,
                }
            }
            SidebarAction::Jump { pin, .. } => {
                let jump = self.reconciler.jump(&*self.document, &mut self.state, &pin).await;
                if matches!(jump, JumpOutcome::Orphaned { .. }) {
                    self.reconciler.refresh_control_states(&*self.document, &self.state);
                }
                ClickOutcome::Jumped { jump }
            }
            SidebarAction::OpenInNewContext { conversation } => {
                let url = conversation.url_on(&self.document.location().origin);
                if let Err(err) = self.document.open_in_new_context(&url) {
                    warn!("opening {url}: {err}");
                }
                ClickOutcome::OpenedNewContext { url }
            }
        };

        self.render();
        outcome
    }

    #[must_use]
    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.state.highlight.map(|highlight| highlight.until)
    }

    pub fn clear_expired_highlight(&mut self, now: Instant) -> bool {
        self.reconciler
            .clear_expired_highlight(&*self.document, &mut self.state, now)
    }

    /// Sidebar as it would be drawn right now.
    #[must_use]
    pub fn view(&self) -> SidebarView {
        self.presenter.render(
            self.state.store.conversations(),
            self.state.current.as_ref(),
            &self.state.folders,
            self.state.sidebar_open,
            unix_now_ms(),
        )
    }

    pub fn render(&mut self) {
        let view = self.view();
        self.surface.render(&view);
    }

    /// Host page is going away.
    pub fn teardown(&mut self) {
        self.reconciler.clear_highlight(&*self.document, &mut self.state);
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn document(&self) -> &Arc<D> {
        &self.document
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn presenter(&self) -> &SidebarPresenter {
        &self.presenter
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
