use crate::error::parse_selector;
use crate::{Document, ElementHandle, IndexerError, PageLocation, Result};
use scraper::{ElementRef, Html};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Headless [`Document`] backed by an HTML snapshot of the page body.
///
/// Writes made through the trait live next to the markup, keyed by element
/// position, the way a browser keeps listeners and inline styles on live
/// nodes. Re-rendering the body (`replace_body`, `navigate`) starts a new
/// generation: previous handles go stale and their decorations are gone.
/// Appending keeps the existing elements and their decorations.
pub struct HtmlDocument {
    inner: Mutex<Inner>,
}

struct Inner {
    location: PageLocation,
    body: String,
    generation: u64,
    decorations: HashMap<usize, Decoration>,
    scrolled_to: Option<ElementHandle>,
    opened: Vec<String>,
}

#[derive(Debug, Default)]
struct Decoration {
    attributes: BTreeMap<String, String>,
    controls: usize,
    pinned: bool,
    highlighted: bool,
}

impl HtmlDocument {
    pub fn new(url: &str, body: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Inner {
                location: PageLocation::parse(url)?,
                body: body.into(),
                generation: 0,
                decorations: HashMap::new(),
                scrolled_to: None,
                opened: Vec::new(),
            }),
        })
    }

    /// Moves to another page: new location, new body, new generation.
    pub fn navigate(&self, url: &str, body: impl Into<String>) -> Result<()> {
        let location = PageLocation::parse(url)?;
        let mut inner = self.lock();
        inner.location = location;
        inner.rerender(body.into());
        Ok(())
    }

    /// Re-renders the current page with new markup.
    pub fn replace_body(&self, body: impl Into<String>) {
        self.lock().rerender(body.into());
    }

    /// Appends markup at the end of the body, as streamed messages do.
    pub fn append_html(&self, html: &str) {
        self.lock().body.push_str(html);
    }

    #[must_use]
    pub fn body_html(&self) -> String {
        self.lock().body.clone()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Number of pin controls attached to the element.
    #[must_use]
    pub fn pin_controls(&self, element: ElementHandle) -> usize {
        self.decoration(element, |decoration| decoration.controls)
            .unwrap_or(0)
    }

    /// Pinned state shown by the element's control, if it has one.
    #[must_use]
    pub fn control_pinned(&self, element: ElementHandle) -> Option<bool> {
        self.decoration(element, |decoration| {
            (decoration.controls > 0).then_some(decoration.pinned)
        })
        .flatten()
    }

    #[must_use]
    pub fn is_highlighted(&self, element: ElementHandle) -> bool {
        self.decoration(element, |decoration| decoration.highlighted)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn scrolled_to(&self) -> Option<ElementHandle> {
        self.lock().scrolled_to
    }

    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decoration<T>(&self, element: ElementHandle, read: impl FnOnce(&Decoration) -> T) -> Option<T> {
        let inner = self.lock();
        if inner.generation != element.generation() {
            return None;
        }
        inner.decorations.get(&element.ordinal()).map(read)
    }

    /// Validates the handle, then applies `write` to its decoration slot.
    fn decorate(&self, element: ElementHandle, write: impl FnOnce(&mut Decoration)) -> Result<()> {
        let mut inner = self.lock();
        inner.resolve(element, |_| ())?;
        write(inner.decorations.entry(element.ordinal()).or_default());
        Ok(())
    }
}

impl Inner {
    fn rerender(&mut self, body: String) {
        self.body = body;
        self.generation += 1;
        self.decorations.clear();
        self.scrolled_to = None;
    }

    fn parse(&self) -> Html {
        Html::parse_document(&format!(
            "<!DOCTYPE html><html><head></head><body>{}</body></html>",
            self.body
        ))
    }

    /// Runs `read` on the live element behind `element`.
    fn resolve<T>(&self, element: ElementHandle, read: impl FnOnce(ElementRef<'_>) -> T) -> Result<T> {
        if element.generation() != self.generation {
            return Err(IndexerError::StaleElement);
        }
        let html = self.parse();
        let found = elements(&html).nth(element.ordinal());
        found.map(read).ok_or(IndexerError::StaleElement)
    }
}

fn elements(html: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    html.root_element().descendants().filter_map(ElementRef::wrap)
}

impl Document for HtmlDocument {
    fn location(&self) -> PageLocation {
        self.lock().location.clone()
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let selector = parse_selector(selector)?;
        let inner = self.lock();
        let html = inner.parse();
        let generation = inner.generation;
        Ok(elements(&html)
            .enumerate()
            .filter(|(_, element)| selector.matches(element))
            .map(|(ordinal, _)| ElementHandle::new(generation, ordinal))
            .collect())
    }

    fn outer_html(&self, element: ElementHandle) -> Result<String> {
        self.lock().resolve(element, |found| found.html())
    }

    fn attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        let inner = self.lock();
        let from_markup = inner.resolve(element, |found| found.value().attr(name).map(str::to_string))?;
        let written = inner
            .decorations
            .get(&element.ordinal())
            .and_then(|decoration| decoration.attributes.get(name).cloned());
        Ok(written.or(from_markup))
    }

    fn set_attribute(&self, element: ElementHandle, name: &str, value: &str) -> Result<()> {
        self.decorate(element, |decoration| {
            decoration
                .attributes
                .insert(name.to_string(), value.to_string());
        })
    }

    fn attach_pin_control(&self, element: ElementHandle) -> Result<()> {
        self.decorate(element, |decoration| decoration.controls += 1)
    }

    fn set_pin_control_state(&self, element: ElementHandle, pinned: bool) -> Result<()> {
        self.decorate(element, |decoration| decoration.pinned = pinned)
    }

    fn scroll_to_center(&self, element: ElementHandle) -> Result<()> {
        let mut inner = self.lock();
        inner.resolve(element, |_| ())?;
        inner.scrolled_to = Some(element);
        Ok(())
    }

    fn set_highlight(&self, element: ElementHandle, on: bool) -> Result<()> {
        self.decorate(element, |decoration| decoration.highlighted = on)
    }

    fn open_in_new_context(&self, url: &str) -> Result<()> {
        self.lock().opened.push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"
        <main>
            <div class="msg" data-role="user">q1</div>
            <div class="msg" data-role="assistant">a1</div>
            <div class="msg" data-role="assistant">a2</div>
        </main>"#;

    fn doc() -> HtmlDocument {
        HtmlDocument::new("https://chat.example.com/c/1", BODY).expect("doc")
    }

    #[test]
    fn query_returns_matches_in_document_order() {
        let doc = doc();
        let found = doc.query_all(r#"[data-role="assistant"]"#).expect("query");
        assert_eq!(found.len(), 2);
        assert!(found[0] < found[1]);
        assert_eq!(doc.outer_html(found[1]).expect("html"), r#"<div class="msg" data-role="assistant">a2</div>"#);
    }

    #[test]
    fn written_attributes_shadow_markup() {
        let doc = doc();
        let first = doc.query_all(".msg").expect("query")[0];
        assert_eq!(doc.attribute(first, "data-role").expect("attr").as_deref(), Some("user"));
        assert_eq!(doc.attribute(first, "data-pin").expect("attr"), None);
        doc.set_attribute(first, "data-pin", "0").expect("set");
        assert_eq!(doc.attribute(first, "data-pin").expect("attr").as_deref(), Some("0"));
    }

    #[test]
    fn rerender_invalidates_handles_and_decorations() {
        let doc = doc();
        let first = doc.query_all(".msg").expect("query")[0];
        doc.attach_pin_control(first).expect("attach");
        assert_eq!(doc.pin_controls(first), 1);

        doc.replace_body(BODY);
        assert!(matches!(doc.outer_html(first), Err(IndexerError::StaleElement)));
        assert!(matches!(doc.attach_pin_control(first), Err(IndexerError::StaleElement)));

        let fresh = doc.query_all(".msg").expect("query")[0];
        assert_eq!(doc.pin_controls(fresh), 0);
    }

    #[test]
    fn append_keeps_existing_decorations() {
        let doc = doc();
        let first = doc.query_all(".msg").expect("query")[0];
        doc.set_highlight(first, true).expect("highlight");
        doc.append_html(r#"<div class="msg" data-role="assistant">a3</div>"#);

        let all = doc.query_all(".msg").expect("query");
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], first);
        assert!(doc.is_highlighted(first));
    }

    #[test]
    fn navigate_changes_location() {
        let doc = doc();
        doc.navigate("https://chat.example.com/c/2", "<p>new</p>").expect("navigate");
        assert_eq!(doc.location().path, "/c/2");
        assert!(doc.query_all(".msg").expect("query").is_empty());
    }

    #[test]
    fn invalid_selector_surfaces_as_error() {
        assert!(matches!(doc().query_all("[x"), Err(IndexerError::Selector { .. })));
    }
}
