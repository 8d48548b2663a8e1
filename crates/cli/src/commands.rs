use crate::output::Output;
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use pinboard_indexer::{Document, HtmlDocument, PageLocation};
use pinboard_protocol::{ConversationKey, PinId};
use pinboard_sidebar::{render_text_with_ids, FolderState, SidebarPresenter, TextSurface};
use pinboard_site::AnchorStrategy;
use pinboard_store::{JsonFileStorage, PinStore};
use pinboard_sync::{JumpOutcome, PinboardController, ToggleOutcome};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

type Controller = PinboardController<HtmlDocument, TextSurface>;

#[derive(Serialize)]
struct SiteRow<'a> {
    name: &'a str,
    anchor: AnchorStrategy,
    hosts: &'a [String],
}

pub fn sites(settings: &Settings, out: &Output) -> Result<()> {
    let rows: Vec<SiteRow<'_>> = settings
        .registry
        .sites()
        .map(|site| SiteRow {
            name: &site.name,
            anchor: site.anchor,
            hosts: &site.hosts,
        })
        .collect();
    out.emit(&rows, || {
        let mut text = String::new();
        for row in &rows {
            let anchor = match row.anchor {
                AnchorStrategy::Assistant => "assistant",
                AnchorStrategy::UserWithAnswer => "user_with_answer",
            };
            text.push_str(&format!("{:<10} {:<17} {}\n", row.name, anchor, row.hosts.join(", ")));
        }
        text
    })
}

#[derive(Serialize)]
struct MessageRow {
    index: usize,
    pin: Option<PinId>,
    snippet: String,
}

#[derive(Serialize)]
struct ScanReport {
    site: String,
    conversation: ConversationKey,
    title: String,
    messages: Vec<MessageRow>,
}

pub async fn scan(settings: &Settings, out: &Output, url: &str, html: &Path) -> Result<()> {
    let Some(controller) = open_controller(settings, url, html).await? else {
        return unsupported(out, url);
    };
    let page = controller.document().as_ref();
    let indexer = controller.reconciler().indexer();
    let store = &controller.state().store;

    let conversation = controller.reconciler().conversation_key(page);
    let anchors = indexer.scan(page);
    let messages = (0..anchors.len())
        .map(|index| MessageRow {
            index,
            pin: store
                .find_pin_by_index(&conversation, index)
                .map(|pin| pin.id.clone()),
            snippet: indexer.snippet_for(page, &anchors, index).unwrap_or_default(),
        })
        .collect();
    let report = ScanReport {
        site: indexer.site().name.clone(),
        title: indexer.conversation_title(page, &conversation),
        conversation,
        messages,
    };

    out.emit(&report, || {
        let mut text = format!(
            "{} {} [{}]: {} message(s)\n",
            report.title,
            report.conversation,
            report.site,
            report.messages.len()
        );
        for row in &report.messages {
            let mark = if row.pin.is_some() { "[x]" } else { "[ ]" };
            text.push_str(&format!("{mark} #{:<3} {}\n", row.index, row.snippet));
        }
        text
    })
}

pub async fn toggle(settings: &Settings, out: &Output, url: &str, html: &Path, index: usize) -> Result<()> {
    let Some(mut controller) = open_controller(settings, url, html).await? else {
        return unsupported(out, url);
    };
    let outcome = controller.toggle(index).await;

    out.emit(&outcome, || match &outcome {
        ToggleOutcome::Pinned { pin } => {
            format!("pinned message {} as {}: {}", pin.message_index, pin.id, pin.snippet)
        }
        ToggleOutcome::Unpinned => format!("unpinned message {index}"),
        ToggleOutcome::MissingTarget => format!("no message at index {index}"),
    })?;

    ensure_persisted(&controller)?;
    if outcome == ToggleOutcome::MissingTarget {
        bail!("nothing to toggle at index {index}");
    }
    Ok(())
}

pub async fn jump(settings: &Settings, out: &Output, url: &str, html: &Path, pin: &str) -> Result<()> {
    let Some(mut controller) = open_controller(settings, url, html).await? else {
        return unsupported(out, url);
    };
    let pin = PinId::from(pin);
    let outcome = controller.jump(&pin).await;

    out.emit(&outcome, || match &outcome {
        JumpOutcome::Highlighted { message_index } => {
            format!("pin {pin} is message {message_index}; scrolled into view and highlighted")
        }
        JumpOutcome::Orphaned { message_index } => {
            format!("pin {pin} pointed at message {message_index}, which is gone; removed it")
        }
        JumpOutcome::NotFound => format!("no pin {pin} in this conversation"),
    })?;

    ensure_persisted(&controller)?;
    if outcome == JumpOutcome::NotFound {
        bail!("unknown pin {pin}");
    }
    Ok(())
}

pub async fn list(settings: &Settings, out: &Output, url: Option<&str>) -> Result<()> {
    let store = open_store(settings).await?;
    let current = url
        .map(|url| PageLocation::parse(url).map(|location| location.conversation_key()))
        .transpose()
        .context("Invalid --url")?;

    let mut folders = FolderState::new();
    for key in store.conversations().keys() {
        folders.expand(key);
    }
    let presenter = SidebarPresenter::new();
    let view = presenter.render(
        store.conversations(),
        current.as_ref(),
        &folders,
        true,
        unix_now_ms(),
    );

    out.emit(&view, || render_text_with_ids(&view, presenter.labels()))
}

#[derive(Serialize)]
struct DeleteReport {
    conversation: ConversationKey,
    pin: Option<PinId>,
    removed_pins: usize,
}

pub async fn delete(settings: &Settings, out: &Output, conversation: &str, pin: Option<&str>) -> Result<()> {
    let mut store = open_store(settings).await?;
    let key = ConversationKey::from_path(conversation);

    let report = match pin {
        Some(pin) => {
            let pin = PinId::from(pin);
            let removed = store
                .remove_pin(&key, &pin)
                .await
                .context("Failed to delete pin")?;
            if removed.is_none() {
                bail!("no pin {pin} in {key}");
            }
            DeleteReport {
                conversation: key,
                pin: Some(pin),
                removed_pins: 1,
            }
        }
        None => {
            let removed = store
                .remove_conversation(&key)
                .await
                .context("Failed to delete conversation")?;
            let Some(record) = removed else {
                bail!("no conversation {key}");
            };
            DeleteReport {
                conversation: key,
                pin: None,
                removed_pins: record.pin_count(),
            }
        }
    };

    out.emit(&report, || match &report.pin {
        Some(pin) => format!("deleted pin {pin} from {}", report.conversation),
        None => format!(
            "deleted {} with {} pin(s)",
            report.conversation, report.removed_pins
        ),
    })
}

async fn open_store(settings: &Settings) -> Result<PinStore> {
    let backend = Arc::new(JsonFileStorage::new(&settings.store_path));
    PinStore::open(backend)
        .await
        .with_context(|| format!("Failed to load pin store {}", settings.store_path.display()))
}

async fn open_controller(settings: &Settings, url: &str, html: &Path) -> Result<Option<Controller>> {
    let body = fs::read_to_string(html)
        .with_context(|| format!("Failed to read page {}", html.display()))?;
    let page = HtmlDocument::new(url, body).with_context(|| format!("Invalid --url {url}"))?;
    let Some(site) = settings.registry.for_host(&page.location().host) else {
        return Ok(None);
    };
    log::debug!("page {url} uses site '{}'", site.name);

    let store = open_store(settings).await?;
    let mut controller = PinboardController::new(
        Arc::new(page),
        site,
        store,
        TextSurface::new(),
        &settings.timing,
    );
    controller.start().await;
    controller.decorate();
    Ok(Some(controller))
}

#[derive(Serialize)]
struct Unsupported<'a> {
    supported: bool,
    url: &'a str,
}

fn unsupported(out: &Output, url: &str) -> Result<()> {
    out.emit(
        &Unsupported {
            supported: false,
            url,
        },
        || format!("no site configuration for {url}; nothing to do"),
    )
}

fn ensure_persisted(controller: &Controller) -> Result<()> {
    match &controller.state().last_error {
        Some(err) => bail!("pin store was not saved: {err}"),
        None => Ok(()),
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
