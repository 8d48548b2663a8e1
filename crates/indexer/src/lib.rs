//! # Pinboard Indexer
//!
//! Maps a site's chat messages onto positional message indices.
//!
//! ## Pipeline
//!
//! ```text
//! Document (live page)
//!     │
//!     ├──> scan()            anchor selector, document order
//!     │      └─> [ElementHandle; n]   position == message index
//!     │
//!     └──> extract_content() private parse of the element markup
//!            ├─> drop excluded descendants
//!            ├─> narrow to content sub-selector
//!            └─> collapse whitespace
//! ```
//!
//! ## Example
//!
//! ```
//! use pinboard_indexer::{HtmlDocument, MessageIndexer};
//! use pinboard_site::SiteRegistry;
//!
//! let doc = HtmlDocument::new(
//!     "https://chatgpt.com/c/42",
//!     r#"<div data-message-author-role="assistant"><div class="markdown">Hello</div></div>"#,
//! )?;
//! let site = SiteRegistry::builtin().for_host("chatgpt.com").expect("bundled");
//! let indexer = MessageIndexer::new(site);
//! let messages = indexer.scan(&doc);
//! assert_eq!(indexer.extract_content(&doc, messages[0]), "Hello");
//! # Ok::<(), pinboard_indexer::IndexerError>(())
//! ```

mod document;
mod error;
mod extract;
mod html_document;
mod scanner;

pub use document::{Document, ElementHandle, PageLocation};
pub use error::{IndexerError, Result};
pub use extract::{extract_clean_text, ExtractionRule};
pub use html_document::HtmlDocument;
pub use scanner::{MessageIndexer, TextLimits};
