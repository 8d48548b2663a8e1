use pinboard_indexer::HtmlDocument;
use pinboard_protocol::{ConversationKey, STORAGE_KEY};
use pinboard_sidebar::{SidebarClick, TextSurface};
use pinboard_site::SiteRegistry;
use pinboard_store::{MemoryStorage, PinStore};
use pinboard_sync::{
    ClickOutcome, JumpOutcome, PinboardConfig, PinboardController, ToggleOutcome,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn chatgpt_page(answers: usize) -> String {
    let mut body = String::from(r#"<nav><a class="item active">Borrow checker questions</a></nav><main>"#);
    for i in 0..answers {
        body.push_str(&format!(
            r#"<div data-message-author-role="user">question {i}</div>
               <div data-message-author-role="assistant"><div class="markdown">answer number {i}</div></div>"#
        ));
    }
    body.push_str("</main>");
    body
}

struct Session {
    page: Arc<HtmlDocument>,
    storage: Arc<MemoryStorage>,
    surface: TextSurface,
    controller: PinboardController<HtmlDocument, TextSurface>,
}

async fn session(url: &str, answers: usize) -> Session {
    let page = Arc::new(HtmlDocument::new(url, chatgpt_page(answers)).expect("page"));
    let storage = Arc::new(MemoryStorage::new());
    let surface = TextSurface::new();
    let site = SiteRegistry::builtin().for_host("chatgpt.com").expect("bundled site");
    let mut controller = PinboardController::new(
        page.clone(),
        site,
        PinStore::new(storage.clone()),
        surface.clone(),
        &PinboardConfig::default(),
    );
    controller.start().await;
    controller.decorate();
    Session {
        page,
        storage,
        surface,
        controller,
    }
}

#[tokio::test]
async fn pins_across_conversations_and_folder_delete() {
    let mut s = session("https://chatgpt.com/c/a", 3).await;
    let a = ConversationKey::from_path("/c/a");
    let b = ConversationKey::from_path("/c/b");

    let ToggleOutcome::Pinned { pin } = s.controller.toggle(1).await else {
        panic!("message 1 should pin");
    };
    assert_eq!(pin.message_index, 1);
    assert_eq!(pin.snippet, "answer number 1");
    let store = &s.controller.state().store;
    assert_eq!(store.conversations().len(), 1);
    assert_eq!(store.conversation(&a).expect("record a").pin_count(), 1);
    assert_eq!(store.conversation(&a).expect("record a").title, "Borrow checker questions");

    s.page
        .navigate("https://chatgpt.com/c/b", chatgpt_page(2))
        .expect("navigate");
    let change = s.controller.poll_route().await.expect("route change");
    assert_eq!(change.to, b);
    s.controller.decorate();
    assert!(matches!(s.controller.toggle(0).await, ToggleOutcome::Pinned { .. }));
    assert_eq!(s.controller.state().store.conversations().len(), 2);

    let outcome = s.controller.click(SidebarClick::FolderDelete(a.clone())).await;
    assert_eq!(
        outcome,
        ClickOutcome::FolderDeleted {
            conversation: a.clone(),
            pins: 1
        }
    );
    let keys: Vec<&ConversationKey> = s.controller.state().store.conversations().keys().collect();
    assert_eq!(keys, vec![&b]);

    let persisted = s.storage.value(STORAGE_KEY).expect("persisted");
    assert!(persisted.get("/c/a").is_none());
    assert!(persisted.get("/c/b").is_some());
}

#[tokio::test]
async fn rerender_orphans_the_only_pin() {
    let mut s = session("https://chatgpt.com/c/solo", 1).await;
    let key = ConversationKey::from_path("/c/solo");
    let ToggleOutcome::Pinned { pin } = s.controller.toggle(0).await else {
        panic!("message 0 should pin");
    };

    s.page.replace_body("<main></main>");
    let jump = s.controller.jump(&pin.id).await;
    assert_eq!(jump, JumpOutcome::Orphaned { message_index: 0 });
    assert!(s.controller.state().store.conversation(&key).is_none());
    assert_eq!(s.surface.last_view().expect("rendered").total_pins, 0);
}

#[tokio::test]
async fn pin_unpin_pin_gives_a_fresh_pin() {
    let mut s = session("https://chatgpt.com/c/t", 2).await;
    let key = ConversationKey::from_path("/c/t");

    let ToggleOutcome::Pinned { pin: first } = s.controller.toggle(1).await else {
        panic!("first toggle should pin");
    };
    assert_eq!(s.controller.toggle(1).await, ToggleOutcome::Unpinned);
    let ToggleOutcome::Pinned { pin: second } = s.controller.toggle(1).await else {
        panic!("third toggle should pin");
    };

    assert_ne!(first.id, second.id);
    assert!(second.timestamp > first.timestamp);
    let record = s.controller.state().store.conversation(&key).expect("record");
    assert_eq!(record.pin_count(), 1);
}

#[tokio::test]
async fn sidebar_clicks_route_by_conversation() {
    let mut s = session("https://chatgpt.com/c/here", 2).await;
    let ToggleOutcome::Pinned { pin } = s.controller.toggle(0).await else {
        panic!("should pin");
    };
    let here = ConversationKey::from_path("/c/here");

    assert_eq!(s.controller.click(SidebarClick::ToggleTab).await, ClickOutcome::SidebarOpened);
    let view = s.surface.last_view().expect("rendered");
    assert!(view.open);
    assert!(view.folder(&here).expect("folder").expanded);

    let outcome = s
        .controller
        .click(SidebarClick::Pin {
            conversation: here.clone(),
            pin: pin.id.clone(),
        })
        .await;
    assert_eq!(
        outcome,
        ClickOutcome::Jumped {
            jump: JumpOutcome::Highlighted { message_index: 0 }
        }
    );

    let elsewhere = ConversationKey::from_path("/c/elsewhere");
    let outcome = s
        .controller
        .click(SidebarClick::Pin {
            conversation: elsewhere,
            pin: pin.id.clone(),
        })
        .await;
    assert_eq!(
        outcome,
        ClickOutcome::OpenedNewContext {
            url: "https://chatgpt.com/c/elsewhere".to_string()
        }
    );
    assert_eq!(s.page.opened_urls(), vec!["https://chatgpt.com/c/elsewhere".to_string()]);

    let outcome = s
        .controller
        .click(SidebarClick::PinDelete {
            conversation: here.clone(),
            pin: pin.id.clone(),
        })
        .await;
    assert!(matches!(outcome, ClickOutcome::PinDeleted { removed: true, .. }));
    let element = s.controller.reconciler().element_at(&*s.page, 0).expect("element");
    assert_eq!(s.page.control_pinned(element), Some(false));
}

#[tokio::test]
async fn persistence_failure_keeps_memory_and_ui_consistent() {
    let mut s = session("https://chatgpt.com/c/flaky", 2).await;
    s.storage.set_fail_writes(true);

    let outcome = s.controller.toggle(1).await;
    assert!(matches!(outcome, ToggleOutcome::Pinned { .. }));
    let element = s.controller.reconciler().element_at(&*s.page, 1).expect("element");
    assert_eq!(s.page.control_pinned(element), Some(true));
    assert!(s.controller.state().last_error.is_some());
    assert_eq!(s.storage.value(STORAGE_KEY), None);
}

#[tokio::test]
async fn rehydrates_on_navigation() {
    let mut s = session("https://chatgpt.com/c/one", 1).await;
    s.controller.toggle(0).await;

    // Another tab writes to the same storage.
    let mut other = PinStore::open(s.storage.clone()).await.expect("open");
    other
        .add_pin(&ConversationKey::from_path("/c/two"), 0, "from elsewhere", "Two")
        .await
        .expect("add");

    s.page
        .navigate("https://chatgpt.com/c/two", chatgpt_page(1))
        .expect("navigate");
    s.controller.poll_route().await.expect("route change");
    assert_eq!(s.controller.state().store.total_pins(), 2);
}

#[tokio::test]
async fn actions_follow_navigation_before_the_next_poll() {
    let mut s = session("https://chatgpt.com/c/a", 2).await;
    let a = ConversationKey::from_path("/c/a");
    let b = ConversationKey::from_path("/c/b");
    let ToggleOutcome::Pinned { pin: on_a } = s.controller.toggle(0).await else {
        panic!("should pin on a");
    };

    // In-page navigation with no route poll in between.
    s.page
        .navigate("https://chatgpt.com/c/b", chatgpt_page(2))
        .expect("navigate");

    let ToggleOutcome::Pinned { pin: on_b } = s.controller.toggle(1).await else {
        panic!("should pin on b");
    };
    assert_eq!(s.controller.state().current.as_ref(), Some(&b));
    assert_eq!(
        s.controller.state().store.conversation(&b).expect("record b").pin_count(),
        1
    );
    let view = s.surface.last_view().expect("rendered");
    let current: Vec<&ConversationKey> = view
        .folders
        .iter()
        .filter(|folder| folder.is_current)
        .map(|folder| &folder.key)
        .collect();
    assert_eq!(current, vec![&b]);

    let change = s.controller.take_route_change().expect("navigation reported once");
    assert_eq!(change.from.as_ref(), Some(&a));
    assert_eq!(change.to, b);
    assert!(s.controller.take_route_change().is_none());

    let outcome = s
        .controller
        .click(SidebarClick::Pin {
            conversation: b.clone(),
            pin: on_b.id.clone(),
        })
        .await;
    assert_eq!(
        outcome,
        ClickOutcome::Jumped {
            jump: JumpOutcome::Highlighted { message_index: 1 }
        }
    );

    let outcome = s
        .controller
        .click(SidebarClick::Pin {
            conversation: a.clone(),
            pin: on_a.id.clone(),
        })
        .await;
    assert_eq!(
        outcome,
        ClickOutcome::OpenedNewContext {
            url: "https://chatgpt.com/c/a".to_string()
        }
    );
    assert_eq!(s.page.opened_urls(), vec!["https://chatgpt.com/c/a".to_string()]);
}
