//! Text normalization shared by snippet and title extraction.

use unicode_segmentation::UnicodeSegmentation;

/// Collapses every whitespace run into a single space and trims both ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prefix of `text` holding at most `max` grapheme clusters.
#[must_use]
pub fn truncate_graphemes(text: &str, max: usize) -> &str {
    match text.grapheme_indices(true).nth(max) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}

/// Preview text: at most `max` graphemes, with `...` appended when cut.
#[must_use]
pub fn snippet(text: &str, max: usize) -> String {
    let head = truncate_graphemes(text, max);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
