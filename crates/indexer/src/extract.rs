use crate::error::parse_selector;
use crate::Result;
use pinboard_protocol::text::collapse_whitespace;
use scraper::{ElementRef, Html};

/// How to turn a message element into clean text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionRule<'a> {
    /// Narrow to the first descendant matching this selector, when present.
    pub content_subselector: Option<&'a str>,
    /// Descendants matching any of these are dropped before extraction.
    pub exclude_selectors: &'a [String],
}

/// Extracts whitespace-normalized text from serialized element markup.
///
/// Works on a private parse of `outer_html`, so the live document is never
/// touched. The element itself is never excluded or narrowed away; only its
/// descendants are.
pub fn extract_clean_text(outer_html: &str, rule: &ExtractionRule<'_>) -> Result<String> {
    let mut fragment = Html::parse_fragment(outer_html);

    let Some(top_id) = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
        .map(|element| element.id())
    else {
        let text: String = fragment.root_element().text().collect();
        return Ok(collapse_whitespace(&text));
    };

    let mut doomed = Vec::new();
    if let Some(top) = fragment.tree.get(top_id).and_then(ElementRef::wrap) {
        for raw in rule.exclude_selectors {
            let selector = parse_selector(raw)?;
            doomed.extend(
                top.select(&selector)
                    .map(|element| element.id())
                    .filter(|id| *id != top_id),
            );
        }
    }
    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    let Some(top) = fragment.tree.get(top_id).and_then(ElementRef::wrap) else {
        return Ok(String::new());
    };
    let scope = match rule.content_subselector {
        Some(raw) => {
            let selector = parse_selector(raw)?;
            top.select(&selector)
                .find(|element| element.id() != top_id)
                .unwrap_or(top)
        }
        None => top,
    };

    let text: String = scope.text().collect();
    Ok(collapse_whitespace(&text))
}
