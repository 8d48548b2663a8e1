use crate::{Result, SiteError};
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// What the user pins on a site, and where its preview text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStrategy {
    /// Assistant messages are pinnable and preview themselves.
    #[default]
    Assistant,
    /// User queries are pinnable; the preview is the answer that follows.
    UserWithAnswer,
}

/// Declarative description of one chat site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub name: String,
    /// Host names served by this config; subdomains match too.
    pub hosts: Vec<String>,
    #[serde(default)]
    pub anchor: AnchorStrategy,
    pub message_selector_assistant: String,
    #[serde(default)]
    pub message_selector_user: Option<String>,
    #[serde(default)]
    pub content_subselector: Option<String>,
    #[serde(default)]
    pub exclude_selectors: Vec<String>,
    pub title_selector: String,
}

impl SiteConfig {
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            !pattern.is_empty()
                && (host == pattern
                    || host
                        .strip_suffix(pattern.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
    }

    /// Selector whose matches, in document order, define message indices.
    #[must_use]
    pub fn anchor_selector(&self) -> &str {
        match self.anchor {
            AnchorStrategy::Assistant => &self.message_selector_assistant,
            AnchorStrategy::UserWithAnswer => self
                .message_selector_user
                .as_deref()
                .unwrap_or(&self.message_selector_assistant),
        }
    }

    /// Selector of the elements that carry preview text for an anchor, when
    /// that is not the anchor itself.
    #[must_use]
    pub fn answer_selector(&self) -> Option<&str> {
        match self.anchor {
            AnchorStrategy::Assistant => None,
            AnchorStrategy::UserWithAnswer => Some(&self.message_selector_assistant),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts.iter().all(|host| host.trim().is_empty()) {
            return Err(SiteError::NoHosts(self.name.clone()));
        }
        if self.anchor == AnchorStrategy::UserWithAnswer && self.message_selector_user.is_none() {
            return Err(SiteError::MissingUserSelector(self.name.clone()));
        }

        let mut selectors = vec![
            self.message_selector_assistant.as_str(),
            self.title_selector.as_str(),
        ];
        selectors.extend(self.message_selector_user.as_deref());
        selectors.extend(self.content_subselector.as_deref());
        selectors.extend(self.exclude_selectors.iter().map(String::as_str));

        for selector in selectors {
            Selector::parse(selector).map_err(|err| SiteError::InvalidSelector {
                site: self.name.clone(),
                selector: selector.to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }
}
