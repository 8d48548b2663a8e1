use crate::state::{AppState, Highlight};
use log::{debug, info};
use pinboard_indexer::{Document, ElementHandle, IndexerError, MessageIndexer};
use pinboard_protocol::{ConversationKey, Pin, PinId};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Attribute recording the message index a decorated element was given.
pub const INDEX_MARKER: &str = "data-pinboard-index";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecorationReport {
    pub scanned: usize,
    /// Elements that received their pin control in this pass.
    pub attached: usize,
    /// Already-decorated elements whose position changed.
    pub remarked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Pinned { pin: Pin },
    Unpinned,
    /// Nothing is rendered at that index, and nothing was pinned there.
    MissingTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JumpOutcome {
    Highlighted { message_index: usize },
    /// The pin pointed past the rendered messages and was removed.
    Orphaned { message_index: usize },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteChange {
    pub from: Option<ConversationKey>,
    pub to: ConversationKey,
}

/// Keeps the page's pin controls, the pin store and the highlight in step.
///
/// Every operation rescans the document; nothing about element positions is
/// remembered between calls except the index marker written on the elements
/// themselves.
pub struct Reconciler {
    indexer: MessageIndexer,
    highlight: Duration,
}

impl Reconciler {
    #[must_use]
    pub fn new(indexer: MessageIndexer, highlight: Duration) -> Self {
        Self { indexer, highlight }
    }

    #[must_use]
    pub fn indexer(&self) -> &MessageIndexer {
        &self.indexer
    }

    /// Conversation the document is showing right now.
    pub fn conversation_key<D: Document + ?Sized>(&self, document: &D) -> ConversationKey {
        document.location().conversation_key()
    }

    /// Gives every scanned message exactly one pin control and an up-to-date
    /// index marker, then syncs the controls' pinned state with the store.
    pub fn decorate<D: Document + ?Sized>(&self, document: &D, state: &AppState) -> DecorationReport {
        let key = self.conversation_key(document);
        let anchors = self.indexer.scan(document);
        let mut report = DecorationReport {
            scanned: anchors.len(),
            ..DecorationReport::default()
        };

        for (index, element) in anchors.iter().copied().enumerate() {
            let marker = index.to_string();
            let written = match document.attribute(element, INDEX_MARKER) {
                Ok(None) => document
                    .set_attribute(element, INDEX_MARKER, &marker)
                    .and_then(|()| document.attach_pin_control(element))
                    .map(|()| report.attached += 1),
                Ok(Some(existing)) if existing != marker => document
                    .set_attribute(element, INDEX_MARKER, &marker)
                    .map(|()| report.remarked += 1),
                Ok(Some(_)) => Ok(()),
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                debug!("skipping message {index}: {err}");
                continue;
            }
            let pinned = state.store.find_pin_by_index(&key, index).is_some();
            soft(document.set_pin_control_state(element, pinned), "pin control state");
        }

        debug!(
            "decorated {key}: {} scanned, {} attached, {} remarked",
            report.scanned, report.attached, report.remarked
        );
        report
    }

    /// Re-reads pinned state for every decorated message. Returns how many
    /// controls were updated.
    pub fn refresh_control_states<D: Document + ?Sized>(&self, document: &D, state: &AppState) -> usize {
        let key = self.conversation_key(document);
        let mut refreshed = 0;
        for (index, element) in self.indexer.scan(document).into_iter().enumerate() {
            if !matches!(document.attribute(element, INDEX_MARKER), Ok(Some(_))) {
                continue;
            }
            let pinned = state.store.find_pin_by_index(&key, index).is_some();
            if document.set_pin_control_state(element, pinned).is_ok() {
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Pins the message at `index`, or unpins it when already pinned.
    ///
    /// The outcome reflects the in-memory store even when persisting failed.
    pub async fn toggle<D: Document + ?Sized>(
        &self,
        document: &D,
        state: &mut AppState,
        index: usize,
    ) -> ToggleOutcome {
        let key = self.conversation_key(document);
        let anchors = self.indexer.scan(document);

        if state.store.find_pin_by_index(&key, index).is_some() {
            if let Err(err) = state.store.remove_pins_at_index(&key, index).await {
                state.record_error(format!("unpinning message {index} of {key}: {err}"));
            }
        } else {
            if index >= anchors.len() {
                debug!("toggle on {key}: no message at index {index}");
                return ToggleOutcome::MissingTarget;
            }
            let snippet = self
                .indexer
                .snippet_for(document, &anchors, index)
                .unwrap_or_default();
            let title = self.indexer.conversation_title(document, &key);
            if let Err(err) = state.store.add_pin(&key, index, snippet, &title).await {
                state.record_error(format!("pinning message {index} of {key}: {err}"));
            }
        }

        let pinned = state.store.find_pin_by_index(&key, index).cloned();
        if let Some(element) = anchors.get(index) {
            soft(
                document.set_pin_control_state(*element, pinned.is_some()),
                "pin control state",
            );
        }
        match pinned {
            Some(pin) => ToggleOutcome::Pinned { pin },
            None => ToggleOutcome::Unpinned,
        }
    }

    /// Scrolls to a pin of the conversation on screen and highlights it.
    ///
    /// A pin whose index is no longer rendered is an orphan: it is deleted
    /// instead.
    pub async fn jump<D: Document + ?Sized>(
        &self,
        document: &D,
        state: &mut AppState,
        pin_id: &PinId,
    ) -> JumpOutcome {
        let key = self.conversation_key(document);
        let Some(message_index) = state.store.find_pin(&key, pin_id).map(|pin| pin.message_index) else {
            return JumpOutcome::NotFound;
        };

        let anchors = self.indexer.scan(document);
        let Some(&element) = anchors.get(message_index) else {
            info!("pin {pin_id} of {key} points at missing message {message_index}; removing it");
            if let Err(err) = state.store.remove_pin(&key, pin_id).await {
                state.record_error(format!("removing orphaned pin {pin_id}: {err}"));
            }
            return JumpOutcome::Orphaned { message_index };
        };

        self.clear_highlight(document, state);
        if let Err(err) = document.scroll_to_center(element) {
            debug!("jump to {pin_id} lost its target: {err}");
            return JumpOutcome::NotFound;
        }
        soft(document.set_highlight(element, true), "highlight");
        state.highlight = Some(Highlight {
            element,
            until: Instant::now() + self.highlight,
        });
        JumpOutcome::Highlighted { message_index }
    }

    pub fn clear_highlight<D: Document + ?Sized>(&self, document: &D, state: &mut AppState) {
        if let Some(highlight) = state.highlight.take() {
            soft(document.set_highlight(highlight.element, false), "highlight");
        }
    }

    /// Clears the highlight once its time is up. Returns whether it did.
    pub fn clear_expired_highlight<D: Document + ?Sized>(
        &self,
        document: &D,
        state: &mut AppState,
        now: Instant,
    ) -> bool {
        match state.highlight {
            Some(highlight) if highlight.until <= now => {
                self.clear_highlight(document, state);
                true
            }
            _ => false,
        }
    }

    /// Compares the document's route with the last one seen. On a change the
    /// new conversation becomes current, its folder is expanded and the store
    /// is re-read.
    pub async fn check_route_change<D: Document + ?Sized>(
        &self,
        document: &D,
        state: &mut AppState,
    ) -> Option<RouteChange> {
        let key = self.conversation_key(document);
        if state.current.as_ref() == Some(&key) {
            return None;
        }

        let from = state.current.replace(key.clone());
        match &from {
            Some(previous) => info!("conversation changed: {previous} -> {key}"),
            None => info!("attached to conversation {key}"),
        }
        state.folders.expand(&key);
        self.clear_highlight(document, state);
        if let Err(err) = state.store.reload().await {
            state.record_error(format!("reloading pins, keeping in-memory copy: {err}"));
        }
        Some(RouteChange { from, to: key })
    }

    /// Element currently rendered for `index`, if any.
    pub fn element_at<D: Document + ?Sized>(&self, document: &D, index: usize) -> Option<ElementHandle> {
        self.indexer.scan(document).get(index).copied()
    }
}

/// Document writes that can lose their target to a re-render.
fn soft(result: pinboard_indexer::Result<()>, what: &str) {
    match result {
        Ok(()) => {}
        Err(IndexerError::StaleElement) => debug!("{what}: element re-rendered"),
        Err(err) => debug!("{what}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinboard_indexer::HtmlDocument;
    use pinboard_site::SiteConfig;
    use pinboard_store::{MemoryStorage, PinStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn reconciler() -> Reconciler {
        let site = Arc::new(SiteConfig {
            name: "test".to_string(),
            hosts: vec!["chat.example.com".to_string()],
            anchor: Default::default(),
            message_selector_assistant: ".bot".to_string(),
            message_selector_user: None,
            content_subselector: None,
            exclude_selectors: Vec::new(),
            title_selector: "h1".to_string(),
        });
        Reconciler::new(MessageIndexer::new(site), Duration::from_millis(2_500))
    }

    fn state() -> AppState {
        AppState::new(PinStore::new(Arc::new(MemoryStorage::new())))
    }

    fn doc(bots: usize) -> HtmlDocument {
        let body: String = (0..bots).map(|i| format!("<div class=\"bot\">answer {i}</div>")).collect();
        HtmlDocument::new("https://chat.example.com/c/1", format!("<h1>Chat</h1>{body}")).expect("doc")
    }

    #[test]
    fn decoration_is_idempotent() {
        let doc = doc(3);
        let reconciler = reconciler();
        let state = state();

        let first = reconciler.decorate(&doc, &state);
        let second = reconciler.decorate(&doc, &state);
        assert_eq!(first.attached, 3);
        assert_eq!(second.attached, 0);
        for element in reconciler.indexer().scan(&doc) {
            assert_eq!(doc.pin_controls(element), 1);
        }
    }

    #[test]
    fn shifted_elements_are_remarked_in_place() {
        let doc = doc(2);
        let reconciler = reconciler();
        let state = state();
        reconciler.decorate(&doc, &state);

        // As if the element had been marked at another position.
        let second = reconciler.element_at(&doc, 1).expect("element");
        doc.set_attribute(second, INDEX_MARKER, "7").expect("write");
        let report = reconciler.decorate(&doc, &state);
        assert_eq!(report.remarked, 1);
        assert_eq!(report.attached, 0);
        assert_eq!(doc.attribute(second, INDEX_MARKER).expect("read").as_deref(), Some("1"));
        assert_eq!(doc.pin_controls(second), 1);
    }

    #[tokio::test]
    async fn toggle_pins_then_unpins() {
        let doc = doc(3);
        let reconciler = reconciler();
        let mut state = state();
        reconciler.decorate(&doc, &state);

        let outcome = reconciler.toggle(&doc, &mut state, 1).await;
        let ToggleOutcome::Pinned { pin } = outcome else {
            panic!("expected a pin, got {outcome:?}");
        };
        assert_eq!(pin.snippet, "answer 1");
        let element = reconciler.element_at(&doc, 1).expect("element");
        assert_eq!(doc.control_pinned(element), Some(true));
        let key = ConversationKey::from_path("/c/1");
        assert_eq!(state.store.conversation(&key).expect("record").title, "Chat");

        assert_eq!(reconciler.toggle(&doc, &mut state, 1).await, ToggleOutcome::Unpinned);
        assert_eq!(doc.control_pinned(element), Some(false));
        assert!(state.store.conversation(&key).is_none());
    }

    #[tokio::test]
    async fn toggle_past_the_end_is_a_miss() {
        let doc = doc(1);
        let mut state = state();
        assert_eq!(reconciler().toggle(&doc, &mut state, 4).await, ToggleOutcome::MissingTarget);
        assert_eq!(state.store.total_pins(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn jump_highlights_and_expires() {
        let doc = doc(2);
        let reconciler = reconciler();
        let mut state = state();
        let ToggleOutcome::Pinned { pin } = reconciler.toggle(&doc, &mut state, 1).await else {
            panic!("not pinned");
        };

        let outcome = reconciler.jump(&doc, &mut state, &pin.id).await;
        assert_eq!(outcome, JumpOutcome::Highlighted { message_index: 1 });
        let element = reconciler.element_at(&doc, 1).expect("element");
        assert_eq!(doc.scrolled_to(), Some(element));
        assert!(doc.is_highlighted(element));

        assert!(!reconciler.clear_expired_highlight(&doc, &mut state, Instant::now()));
        tokio::time::advance(Duration::from_millis(2_500)).await;
        assert!(reconciler.clear_expired_highlight(&doc, &mut state, Instant::now()));
        assert!(!doc.is_highlighted(element));
    }

    #[tokio::test]
    async fn jump_to_orphan_removes_it() {
        let doc = doc(1);
        let reconciler = reconciler();
        let mut state = state();
        let ToggleOutcome::Pinned { pin } = reconciler.toggle(&doc, &mut state, 0).await else {
            panic!("not pinned");
        };

        doc.replace_body("<h1>Chat</h1>");
        let outcome = reconciler.jump(&doc, &mut state, &pin.id).await;
        assert_eq!(outcome, JumpOutcome::Orphaned { message_index: 0 });
        assert!(state.store.conversation(&ConversationKey::from_path("/c/1")).is_none());
        assert_eq!(reconciler.jump(&doc, &mut state, &pin.id).await, JumpOutcome::NotFound);
    }

    #[tokio::test]
    async fn route_change_expands_new_folder() {
        let doc = doc(1);
        let reconciler = reconciler();
        let mut state = state();

        let first = reconciler.check_route_change(&doc, &mut state).await.expect("attach");
        assert_eq!(first.from, None);
        assert!(reconciler.check_route_change(&doc, &mut state).await.is_none());

        doc.navigate("https://chat.example.com/c/2", "<div class=\"bot\">x</div>")
            .expect("navigate");
        let change = reconciler.check_route_change(&doc, &mut state).await.expect("change");
        assert_eq!(change.to, ConversationKey::from_path("/c/2"));
        assert!(state.folders.is_expanded(&change.to));
        assert_eq!(state.current.as_ref(), Some(&change.to));
    }
}
