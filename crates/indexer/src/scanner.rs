use crate::extract::{extract_clean_text, ExtractionRule};
use crate::{Document, ElementHandle};
use pinboard_protocol::text::{snippet, truncate_graphemes};
use pinboard_protocol::ConversationKey;
use pinboard_site::SiteConfig;
use std::sync::Arc;

/// Length limits applied to extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub snippet_max_chars: usize,
    pub title_max_chars: usize,
    pub route_title_max_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            snippet_max_chars: 50,
            title_max_chars: 30,
            route_title_max_chars: 12,
        }
    }
}

/// Maps the site's message elements onto positional indices.
///
/// A message index is the position of the element among the anchor
/// selector's matches in the current rendering. Nothing is cached between
/// calls: every scan reflects the document as it is now.
#[derive(Debug, Clone)]
pub struct MessageIndexer {
    site: Arc<SiteConfig>,
    limits: TextLimits,
}

impl MessageIndexer {
    #[must_use]
    pub fn new(site: Arc<SiteConfig>) -> Self {
        Self {
            site,
            limits: TextLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: TextLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    #[must_use]
    pub fn limits(&self) -> TextLimits {
        self.limits
    }

    /// Pinnable message elements in document order. A selector that no longer
    /// matches, or no longer parses, yields an empty scan.
    pub fn scan<D: Document + ?Sized>(&self, document: &D) -> Vec<ElementHandle> {
        self.query(document, self.site.anchor_selector())
    }

    /// Clean text of one message element; empty when the element is gone.
    pub fn extract_content<D: Document + ?Sized>(&self, document: &D, element: ElementHandle) -> String {
        let rule = ExtractionRule {
            content_subselector: self.site.content_subselector.as_deref(),
            exclude_selectors: &self.site.exclude_selectors,
        };
        let extracted = document
            .outer_html(element)
            .and_then(|html| extract_clean_text(&html, &rule));
        match extracted {
            Ok(text) => text,
            Err(err) => {
                log::debug!("content extraction skipped for {element:?}: {err}");
                String::new()
            }
        }
    }

    /// Text shown for the anchor at `index` of `anchors`.
    ///
    /// For assistant anchors this is the message itself. For user anchors it
    /// is the first answer between this query and the next one, falling back
    /// to the query text while no answer has rendered yet.
    pub fn preview_text<D: Document + ?Sized>(
        &self,
        document: &D,
        anchors: &[ElementHandle],
        index: usize,
    ) -> Option<String> {
        let anchor = *anchors.get(index)?;
        let Some(answer_selector) = self.site.answer_selector() else {
            return Some(self.extract_content(document, anchor));
        };

        let next_anchor = anchors.get(index + 1).copied();
        let answer = self
            .query(document, answer_selector)
            .into_iter()
            .find(|answer| *answer > anchor && next_anchor.map_or(true, |next| *answer < next));

        let answer_text = answer
            .map(|answer| self.extract_content(document, answer))
            .filter(|text| !text.is_empty());
        Some(answer_text.unwrap_or_else(|| self.extract_content(document, anchor)))
    }

    /// Truncated preview for the anchor at `index`.
    pub fn snippet_for<D: Document + ?Sized>(
        &self,
        document: &D,
        anchors: &[ElementHandle],
        index: usize,
    ) -> Option<String> {
        self.preview_text(document, anchors, index)
            .map(|text| snippet(&text, self.limits.snippet_max_chars))
    }

    /// Best-effort human label for the conversation at `key`.
    pub fn conversation_title<D: Document + ?Sized>(&self, document: &D, key: &ConversationKey) -> String {
        let from_page = self
            .query(document, &self.site.title_selector)
            .into_iter()
            .next()
            .and_then(|element| document.outer_html(element).ok())
            .and_then(|html| extract_clean_text(&html, &ExtractionRule::default()).ok())
            .filter(|text| !text.is_empty());

        match from_page {
            Some(text) => truncate_graphemes(&text, self.limits.title_max_chars).to_string(),
            None => key.fallback_title(self.limits.route_title_max_chars),
        }
    }

    fn query<D: Document + ?Sized>(&self, document: &D, selector: &str) -> Vec<ElementHandle> {
        match document.query_all(selector) {
            Ok(found) => found,
            Err(err) => {
                log::warn!("site '{}': query `{selector}` failed: {err}", self.site.name);
                Vec::new()
            }
        }
    }
}
