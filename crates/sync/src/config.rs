use crate::{Result, SyncError};
use pinboard_indexer::TextLimits;
use pinboard_site::{parse_json_or_toml, SiteConfig, SiteRegistry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and text limits of a pinboard session, in milliseconds and
/// grapheme clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinboardConfig {
    /// Quiet period that ends a mutation burst.
    pub debounce_ms: u64,
    /// Longest a sustained burst can postpone the rescan.
    pub max_batch_wait_ms: u64,
    pub route_poll_ms: u64,
    /// Wait after a navigation before decorating the new page.
    pub settle_ms: u64,
    /// Wait after attaching before the first decoration pass.
    pub initial_delay_ms: u64,
    pub highlight_ms: u64,
    pub snippet_max_chars: usize,
    pub title_max_chars: usize,
    pub route_title_max_chars: usize,
}

impl Default for PinboardConfig {
    fn default() -> Self {
        let limits = TextLimits::default();
        Self {
            debounce_ms: 300,
            max_batch_wait_ms: 2_000,
            route_poll_ms: 1_000,
            settle_ms: 500,
            initial_delay_ms: 800,
            highlight_ms: 2_500,
            snippet_max_chars: limits.snippet_max_chars,
            title_max_chars: limits.title_max_chars,
            route_title_max_chars: limits.route_title_max_chars,
        }
    }
}

impl PinboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.route_poll_ms == 0 {
            return Err(SyncError::Config("route_poll_ms must be greater than zero".to_string()));
        }
        if self.max_batch_wait_ms < self.debounce_ms {
            return Err(SyncError::Config(format!(
                "max_batch_wait_ms ({}) is shorter than debounce_ms ({})",
                self.max_batch_wait_ms, self.debounce_ms
            )));
        }
        if self.snippet_max_chars == 0 || self.title_max_chars == 0 {
            return Err(SyncError::Config("text limits must be greater than zero".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn max_batch_wait(&self) -> Duration {
        Duration::from_millis(self.max_batch_wait_ms)
    }

    #[must_use]
    pub const fn route_poll(&self) -> Duration {
        Duration::from_millis(self.route_poll_ms)
    }

    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub const fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    #[must_use]
    pub const fn text_limits(&self) -> TextLimits {
        TextLimits {
            snippet_max_chars: self.snippet_max_chars,
            title_max_chars: self.title_max_chars,
            route_title_max_chars: self.route_title_max_chars,
        }
    }
}

/// User configuration file: a `[timing]` table and extra `[[sites]]`.
///
/// ```toml
/// [timing]
/// debounce_ms = 150
///
/// [[sites]]
/// name = "claude"
/// hosts = ["claude.ai"]
/// message_selector_assistant = ".font-claude-response"
/// title_selector = "title"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub timing: PinboardConfig,
    pub sites: Vec<SiteConfig>,
}

impl ConfigFile {
    /// Parses TOML, or JSON with the same shape.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let file: Self = parse_json_or_toml(bytes)?;
        file.timing.validate()?;
        Ok(file)
    }

    /// Bundled sites with this file's sites layered on top by name.
    pub fn registry(&self) -> Result<SiteRegistry> {
        Ok(SiteRegistry::builtin().with_overrides(self.sites.clone())?)
    }
}
