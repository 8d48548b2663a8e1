//! # Pinboard Sidebar
//!
//! Turns the pin store's conversations into a foldable tree and turns clicks
//! on that tree back into actions.
//!
//! ```text
//! Conversations + current key + FolderState
//!     │
//!     └──> SidebarPresenter::render() ──> SidebarView ──> SidebarSurface
//!
//! SidebarClick ──> SidebarPresenter::interpret() ──> SidebarAction
//! ```
//!
//! Expanded folders are session state ([`FolderState`]) and never persisted.

mod age;
mod folders;
mod presenter;
mod render;
mod surface;
mod view;

pub use age::time_ago;
pub use folders::FolderState;
pub use presenter::{SidebarAction, SidebarClick, SidebarLabels, SidebarPresenter};
pub use render::{render_text, render_text_with_ids};
pub use surface::{SidebarSurface, TextSurface};
pub use view::{FolderView, PinCardView, SidebarView};
