//! # Pinboard Store
//!
//! Durable map of conversation key to pinned messages.
//!
//! ## Layout
//!
//! ```text
//! PinStore (in-memory snapshot, write-through)
//!     │
//!     └──> StorageBackend::write("pinboard_all_dialogues", whole snapshot)
//!            ├─> JsonFileStorage   atomic tmp + rename on disk
//!            └─> MemoryStorage     tests and embedding
//! ```
//!
//! The persisted value is a JSON object keyed by conversation path:
//!
//! ```json
//! { "/chat/abc": { "title": "Rust lifetimes",
//!                  "pins": { "pin_…": { "id": "pin_…", "messageIndex": 3,
//!                                        "snippet": "A lifetime…", "timestamp": 1700000000000 } } } }
//! ```
//!
//! Conversations without pins are never written.

mod backend;
mod error;
mod store;

pub use backend::{JsonFileStorage, MemoryStorage, StorageBackend};
pub use error::{Result, StoreError};
pub use store::PinStore;
