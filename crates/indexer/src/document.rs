use crate::{IndexerError, Result};
use pinboard_protocol::ConversationKey;
use url::Url;

/// Reference to an element of one rendering of the host document.
///
/// Handles carry the document generation they were taken from; once the host
/// re-renders, old handles resolve to [`IndexerError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle {
    generation: u64,
    ordinal: usize,
}

impl ElementHandle {
    #[must_use]
    pub const fn new(generation: u64, ordinal: usize) -> Self {
        Self {
            generation,
            ordinal,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Position among all elements of the document, in document order.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Where the host page currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Scheme, host and port, e.g. `https://claude.ai`.
    pub origin: String,
    pub host: String,
    pub path: String,
}

impl PageLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|err| IndexerError::InvalidUrl(format!("{raw}: {err}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| IndexerError::InvalidUrl(format!("{raw}: missing host")))?
            .to_string();
        Ok(Self {
            origin: url.origin().ascii_serialization(),
            host,
            path: url.path().to_string(),
        })
    }

    #[must_use]
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::from_path(&self.path)
    }
}

/// The live host page as seen by pinboard.
///
/// Reads are element queries and serialized markup; writes are limited to
/// marker attributes, pin controls, scrolling and transient highlighting.
pub trait Document: Send + Sync {
    fn location(&self) -> PageLocation;

    /// Elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Serialized markup of the element and its subtree.
    fn outer_html(&self, element: ElementHandle) -> Result<String>;

    fn attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>>;

    fn set_attribute(&self, element: ElementHandle, name: &str, value: &str) -> Result<()>;

    /// Inserts one interactive pin control into the element.
    fn attach_pin_control(&self, element: ElementHandle) -> Result<()>;

    fn set_pin_control_state(&self, element: ElementHandle, pinned: bool) -> Result<()>;

    /// Scrolls so the start of the element sits at the viewport's vertical center.
    fn scroll_to_center(&self, element: ElementHandle) -> Result<()>;

    fn set_highlight(&self, element: ElementHandle, on: bool) -> Result<()>;

    fn open_in_new_context(&self, url: &str) -> Result<()>;
}
