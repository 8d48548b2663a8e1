use crate::text::truncate_graphemes;
use crate::UNTITLED;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of one conversation, derived from the page route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Builds a key from a route path. Query strings and fragments are not part
    /// of the identity; an empty path maps to `/`.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default().trim();
        if path.is_empty() {
            return Self("/".to_string());
        }
        if path.starts_with('/') {
            Self(path.to_string())
        } else {
            Self(format!("/{path}"))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label derived from the route: the last non-empty segment, truncated.
    #[must_use]
    pub fn fallback_title(&self, max_chars: usize) -> String {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .last()
            .map(|segment| truncate_graphemes(segment, max_chars).to_string())
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Absolute URL of this conversation on the given origin.
    #[must_use]
    pub fn url_on(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationKey {
    fn from(path: &str) -> Self {
        Self::from_path(path)
    }
}
