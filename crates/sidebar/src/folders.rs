use pinboard_protocol::ConversationKey;
use std::collections::BTreeSet;

/// Which conversation folders are expanded. Lives for the UI session only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderState {
    expanded: BTreeSet<ConversationKey>,
}

impl FolderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self, key: &ConversationKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn expand(&mut self, key: &ConversationKey) {
        self.expanded.insert(key.clone());
    }

    /// Flips the folder and returns its new state.
    pub fn toggle(&mut self, key: &ConversationKey) -> bool {
        if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.clone());
            true
        }
    }

    /// Drops whatever was remembered about a deleted folder.
    pub fn forget(&mut self, key: &ConversationKey) {
        self.expanded.remove(key);
    }

    pub fn expanded(&self) -> impl Iterator<Item = &ConversationKey> {
        self.expanded.iter()
    }
}
