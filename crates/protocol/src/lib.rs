//! # Pinboard Protocol
//!
//! Data model shared by every pinboard crate: conversation keys, pins and the
//! per-conversation records that the pin store persists.
//!
//! ```text
//! ConversationKey ──> ConversationRecord { title, pins }
//!                                            └─> PinId ──> Pin { messageIndex, snippet, timestamp }
//! ```

mod key;
mod pin;
pub mod text;

pub use key::ConversationKey;
pub use pin::{ConversationRecord, Conversations, Pin, PinId};

/// Persistence key holding the whole store.
pub const STORAGE_KEY: &str = "pinboard_all_dialogues";

/// Title used when neither the page nor the route yields a label.
pub const UNTITLED: &str = "Untitled";
