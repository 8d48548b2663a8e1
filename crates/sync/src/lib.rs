//! # Pinboard Sync
//!
//! Keeps the host page, the pin store and the sidebar consistent while the
//! page re-renders underneath them.
//!
//! ## Event flow
//!
//! ```text
//! host mutations ─┐
//! route poll ─────┼──> PinboardRuntime (one consumer, debounced)
//! user clicks ────┘          │
//!                            └──> PinboardController (&mut AppState)
//!                                   ├─> Reconciler: decorate / toggle / jump / route check
//!                                   │      └─> MessageIndexer::scan + PinStore
//!                                   └─> SidebarPresenter::render ──> SidebarSurface
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pinboard_indexer::HtmlDocument;
//! use pinboard_sidebar::TextSurface;
//! use pinboard_site::SiteRegistry;
//! use pinboard_store::MemoryStorage;
//! use pinboard_sync::{Pinboard, PinboardConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> pinboard_sync::Result<()> {
//! let page = Arc::new(HtmlDocument::new("https://claude.ai/chat/1", "<main></main>")?);
//! let handle = Pinboard::attach(
//!     page,
//!     &SiteRegistry::builtin(),
//!     Arc::new(MemoryStorage::new()),
//!     TextSurface::new(),
//!     PinboardConfig::default(),
//! )?;
//! if let Some(handle) = handle {
//!     handle.notify_mutation(12).await?;
//!     handle.toggle(0).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod controller;
mod debounce;
mod error;
mod reconciler;
mod runtime;
mod state;

pub use config::{ConfigFile, PinboardConfig};
pub use controller::{ClickOutcome, PinboardController};
pub use error::{Result, SyncError};
pub use reconciler::{DecorationReport, JumpOutcome, Reconciler, RouteChange, ToggleOutcome, INDEX_MARKER};
pub use runtime::{Pinboard, PinboardHandle, PinboardRuntime, PinboardUpdate, RuntimeHealth};
pub use state::{AppState, Highlight};
