use crate::age::time_ago;
use crate::folders::FolderState;
use crate::view::{FolderView, PinCardView, SidebarView};
use pinboard_protocol::{ConversationKey, ConversationRecord, Conversations, PinId};
use std::cmp::Reverse;

/// A click on one of the sidebar's controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarClick {
    ToggleTab,
    Close,
    FolderHeader(ConversationKey),
    FolderDelete(ConversationKey),
    Pin { conversation: ConversationKey, pin: PinId },
    PinDelete { conversation: ConversationKey, pin: PinId },
}

/// What a click asks the rest of the system to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    Open,
    Close,
    ToggleFolder(ConversationKey),
    DeleteFolder(ConversationKey),
    DeletePin { conversation: ConversationKey, pin: PinId },
    /// Scroll to and highlight a pin of the conversation on screen.
    Jump { conversation: ConversationKey, pin: PinId },
    /// The pin's conversation is not loaded; open it elsewhere.
    OpenInNewContext { conversation: ConversationKey },
}

/// Strings the sidebar shows outside of user data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarLabels {
    pub heading: String,
    pub empty: String,
    pub opens_new_tab: String,
}

impl Default for SidebarLabels {
    fn default() -> Self {
        Self {
            heading: "Pinboard".to_string(),
            empty: "No pinned messages yet".to_string(),
            opens_new_tab: "opens new tab".to_string(),
        }
    }
}

/// Builds sidebar views from the pin store's conversations and interprets
/// clicks on them. Holds no conversation state of its own.
#[derive(Debug, Clone, Default)]
pub struct SidebarPresenter {
    labels: SidebarLabels,
}

impl SidebarPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn labels(&self) -> &SidebarLabels {
        &self.labels
    }

    pub fn render(
        &self,
        conversations: &Conversations,
        current: Option<&ConversationKey>,
        folder_state: &FolderState,
        open: bool,
        now_ms: u64,
    ) -> SidebarView {
        let mut ordered: Vec<(&ConversationKey, &ConversationRecord)> = conversations
            .iter()
            .filter(|(_, record)| !record.is_empty())
            .collect();
        ordered.sort_by_key(|(key, record)| {
            (
                Some(*key) != current,
                Reverse(record.latest_timestamp().unwrap_or(0)),
                (*key).clone(),
            )
        });

        let folders: Vec<FolderView> = ordered
            .into_iter()
            .map(|(key, record)| {
                let is_current = Some(key) == current;
                FolderView {
                    key: key.clone(),
                    title: record.title.clone(),
                    pin_count: record.pin_count(),
                    is_current,
                    expanded: folder_state.is_expanded(key),
                    pins: record
                        .pins_in_message_order()
                        .into_iter()
                        .map(|pin| PinCardView {
                            id: pin.id.clone(),
                            message_index: pin.message_index,
                            snippet: pin.snippet.clone(),
                            age: time_ago(now_ms, pin.timestamp),
                            is_active: is_current,
                        })
                        .collect(),
                }
            })
            .collect();

        let total_pins: usize = folders.iter().map(|folder| folder.pin_count).sum();
        SidebarView {
            open,
            total_pins,
            badge: (total_pins > 0).then_some(total_pins),
            empty_message: folders.is_empty().then(|| self.labels.empty.clone()),
            folders,
        }
    }

    /// Turns a click into an action. A pin of the conversation on screen
    /// jumps in place; any other pin opens its conversation elsewhere.
    pub fn interpret(
        &self,
        click: SidebarClick,
        current: Option<&ConversationKey>,
        open: bool,
    ) -> SidebarAction {
        match click {
            SidebarClick::ToggleTab if open => SidebarAction::Close,
            SidebarClick::ToggleTab => SidebarAction::Open,
            SidebarClick::Close => SidebarAction::Close,
            SidebarClick::FolderHeader(key) => SidebarAction::ToggleFolder(key),
            SidebarClick::FolderDelete(key) => SidebarAction::DeleteFolder(key),
            SidebarClick::PinDelete { conversation, pin } => {
                SidebarAction::DeletePin { conversation, pin }
            }
            SidebarClick::Pin { conversation, pin } => {
                if Some(&conversation) == current {
                    SidebarAction::Jump { conversation, pin }
                } else {
                    log::debug!("pin {pin} belongs to {conversation}, opening it in a new context");
                    SidebarAction::OpenInNewContext { conversation }
                }
            }
        }
    }
}
