//! # Pinboard Site
//!
//! Declarative per-site configuration: which elements are pinnable messages,
//! how to extract their text, and where the conversation title lives.
//!
//! A host without a configuration is unsupported and the rest of pinboard
//! stays inert on it.
//!
//! ## Example
//!
//! ```
//! use pinboard_site::SiteRegistry;
//!
//! let registry = SiteRegistry::builtin();
//! let site = registry.for_host("claude.ai").expect("bundled");
//! assert_eq!(site.name, "claude");
//! assert!(registry.for_host("example.org").is_none());
//! ```

mod config;
mod error;
mod registry;

pub use config::{AnchorStrategy, SiteConfig};
pub use error::{Result, SiteError};
pub use registry::{parse_json_or_toml, SiteRegistry};
