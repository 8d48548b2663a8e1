use crate::key::ConversationKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Whole persisted structure: one record per conversation.
pub type Conversations = BTreeMap<ConversationKey, ConversationRecord>;

/// Identifier of a pin, unique within its conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PinId(String);

impl PinId {
    /// Fresh random identifier. Two pins created within the same millisecond
    /// still get distinct ids.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("pin_{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for PinId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// A bookmark on one message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    /// Mirrors the map key; older stores omit it and it is re-derived on load.
    #[serde(default, skip_serializing_if = "PinId::is_empty")]
    pub id: PinId,
    /// Ordinal of the pinned message in the site's message list at pin time.
    pub message_index: usize,
    pub snippet: String,
    /// Creation time in unix milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pins: BTreeMap<PinId, Pin>,
}

impl ConversationRecord {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pins: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    #[must_use]
    pub fn find_by_index(&self, message_index: usize) -> Option<&Pin> {
        self.pins
            .values()
            .find(|pin| pin.message_index == message_index)
    }

    /// Pins ordered by message index, then creation time.
    #[must_use]
    pub fn pins_in_message_order(&self) -> Vec<&Pin> {
        let mut pins: Vec<&Pin> = self.pins.values().collect();
        pins.sort_by_key(|pin| (pin.message_index, pin.timestamp));
        pins
    }

    #[must_use]
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.pins.values().map(|pin| pin.timestamp).max()
    }

    /// Makes every pin's `id` agree with its map key.
    pub fn normalize_ids(&mut self) {
        for (id, pin) in &mut self.pins {
            if &pin.id != id {
                pin.id = id.clone();
            }
        }
    }
}
