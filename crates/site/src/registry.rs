use crate::{Result, SiteConfig, SiteError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

const BUILTIN_SITES: &str = include_str!("../sites/builtin.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteFile {
    #[serde(default)]
    sites: Vec<SiteConfig>,
}

/// Lookup table from page host to site configuration.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Arc<SiteConfig>>,
}

impl SiteRegistry {
    /// Registry with the bundled site table.
    #[must_use]
    pub fn builtin() -> Self {
        let file: SiteFile =
            parse_json_or_toml(BUILTIN_SITES.as_bytes()).expect("bundled site table must parse");
        Self {
            sites: file.sites.into_iter().map(Arc::new).collect(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a `[[sites]]` document (TOML or JSON).
    pub fn parse_sites(bytes: &[u8]) -> Result<Vec<SiteConfig>> {
        let file: SiteFile = parse_json_or_toml(bytes)?;
        Ok(file.sites)
    }

    /// Adds or replaces sites by name. Every override is validated first.
    pub fn with_overrides(mut self, overrides: Vec<SiteConfig>) -> Result<Self> {
        for site in overrides {
            site.validate()?;
            match self.sites.iter_mut().find(|known| known.name == site.name) {
                Some(slot) => {
                    log::debug!("overriding bundled site config '{}'", site.name);
                    *slot = Arc::new(site);
                }
                None => self.sites.push(Arc::new(site)),
            }
        }
        Ok(self)
    }

    /// Configuration for `host`, or `None` when the site is unsupported.
    #[must_use]
    pub fn for_host(&self, host: &str) -> Option<Arc<SiteConfig>> {
        self.sites
            .iter()
            .find(|site| site.matches_host(host))
            .cloned()
    }

    pub fn sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().map(Arc::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Decodes a configuration document that is either JSON or TOML.
pub fn parse_json_or_toml<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes)
                .map_err(|err| SiteError::Parse(format!("{json_err}; {err}")))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                SiteError::Parse(format!(
                    "not valid JSON ({json_err}) or TOML ({toml_err})"
                ))
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| SiteError::Parse(format!("TOML to JSON conversion: {err}")))?
        }
    };
    serde_json::from_value(value).map_err(|err| SiteError::Parse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnchorStrategy;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_is_valid() {
        let registry = SiteRegistry::builtin();
        assert!(registry.len() >= 3);
        for site in registry.sites() {
            site.validate().unwrap_or_else(|err| panic!("{err}"));
        }
    }

    #[test]
    fn builtin_covers_known_hosts() {
        let registry = SiteRegistry::builtin();
        assert_eq!(registry.for_host("claude.ai").expect("claude").name, "claude");
        assert_eq!(registry.for_host("chat.openai.com").expect("openai").name, "chatgpt");
        assert_eq!(registry.for_host("gemini.google.com").expect("gemini").name, "gemini");
        assert!(registry.for_host("example.org").is_none());
    }

    #[test]
    fn overrides_replace_by_name_and_append_new_sites() {
        let raw = br#"
            [[sites]]
            name = "claude"
            hosts = ["claude.ai"]
            anchor = "user_with_answer"
            message_selector_assistant = ".answer"
            message_selector_user = ".question"
            title_selector = "h1"

            [[sites]]
            name = "local"
            hosts = ["localhost"]
            message_selector_assistant = ".msg"
            title_selector = "title"
        "#;
        let overrides = SiteRegistry::parse_sites(raw).expect("parse");
        let registry = SiteRegistry::builtin()
            .with_overrides(overrides)
            .expect("valid overrides");

        let claude = registry.for_host("claude.ai").expect("claude");
        assert_eq!(claude.anchor, AnchorStrategy::UserWithAnswer);
        assert_eq!(claude.anchor_selector(), ".question");
        assert!(registry.for_host("localhost").is_some());
    }

    #[test]
    fn json_documents_are_accepted() {
        let raw = br#"{"sites":[{"name":"j","hosts":["j.dev"],"message_selector_assistant":"p","title_selector":"h1"}]}"#;
        let sites = SiteRegistry::parse_sites(raw).expect("json");
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].anchor, AnchorStrategy::Assistant);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = br#"
            [[sites]]
            name = "x"
            hosts = ["x.dev"]
            message_selector_assistant = "p"
            title_selector = "h1"
            colour = "red"
        "#;
        assert!(matches!(
            SiteRegistry::parse_sites(raw),
            Err(SiteError::Parse(_))
        ));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let broken = SiteConfig {
            name: "broken".to_string(),
            hosts: vec!["b.dev".to_string()],
            anchor: AnchorStrategy::Assistant,
            message_selector_assistant: ":::".to_string(),
            message_selector_user: None,
            content_subselector: None,
            exclude_selectors: Vec::new(),
            title_selector: "h1".to_string(),
        };
        assert!(SiteRegistry::empty().with_overrides(vec![broken]).is_err());
    }
}
