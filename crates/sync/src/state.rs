use pinboard_indexer::ElementHandle;
use pinboard_protocol::ConversationKey;
use pinboard_sidebar::FolderState;
use pinboard_store::PinStore;
use tokio::time::Instant;

/// A message element currently drawn highlighted, and when that ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub element: ElementHandle,
    pub until: Instant,
}

/// Everything one attached pinboard session knows.
///
/// Owned by a single controller and lent to the reconciler and presenter;
/// created on attach and dropped when the host page unloads.
pub struct AppState {
    pub store: PinStore,
    /// Conversation on screen, as of the last route check.
    pub current: Option<ConversationKey>,
    pub folders: FolderState,
    pub sidebar_open: bool,
    pub highlight: Option<Highlight>,
    /// Most recent failure that was logged and absorbed.
    pub last_error: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn new(store: PinStore) -> Self {
        Self {
            store,
            current: None,
            folders: FolderState::new(),
            sidebar_open: false,
            highlight: None,
            last_error: None,
        }
    }

    pub(crate) fn record_error(&mut self, message: String) {
        log::error!("{message}");
        self.last_error = Some(message);
    }
}
