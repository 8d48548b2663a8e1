use pinboard_protocol::{ConversationKey, PinId};
use serde::Serialize;

/// Everything the sidebar shows for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarView {
    pub open: bool,
    pub total_pins: usize,
    /// Count on the toggle tab; hidden when nothing is pinned.
    pub badge: Option<usize>,
    /// Current conversation first, then the rest by most recent pin.
    pub folders: Vec<FolderView>,
    /// Shown instead of the folder list when `folders` is empty.
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderView {
    pub key: ConversationKey,
    pub title: String,
    pub pin_count: usize,
    pub is_current: bool,
    pub expanded: bool,
    /// Ordered by message index.
    pub pins: Vec<PinCardView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinCardView {
    pub id: PinId,
    pub message_index: usize,
    pub snippet: String,
    pub age: String,
    /// Belongs to the conversation on screen; clicking jumps in place.
    pub is_active: bool,
}

impl SidebarView {
    #[must_use]
    pub fn folder(&self, key: &ConversationKey) -> Option<&FolderView> {
        self.folders.iter().find(|folder| &folder.key == key)
    }
}
