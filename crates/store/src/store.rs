use crate::backend::StorageBackend;
use crate::{Result, StoreError};
use pinboard_protocol::{ConversationKey, ConversationRecord, Conversations, Pin, PinId, STORAGE_KEY};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Every conversation's pins, kept in memory and written through to storage.
///
/// Mutations change the in-memory snapshot first and then persist the whole
/// snapshot. When the write fails the change stays in memory and the error is
/// returned, so readers in this process keep seeing what the user did.
pub struct PinStore {
    backend: Arc<dyn StorageBackend>,
    conversations: Conversations,
    last_timestamp: u64,
    revision: watch::Sender<u64>,
}

impl PinStore {
    /// Empty store over `backend`; nothing is read until [`PinStore::reload`].
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            conversations: Conversations::new(),
            last_timestamp: 0,
            revision,
        }
    }

    /// Store rehydrated from `backend`. A first run reads as empty.
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let mut store = Self::new(backend);
        store.reload().await?;
        Ok(store)
    }

    /// Replaces the in-memory snapshot with the persisted one.
    pub async fn reload(&mut self) -> Result<()> {
        let raw = self
            .backend
            .read(STORAGE_KEY)
            .await
            .map_err(|err| StoreError::Load(Box::new(err)))?;
        let mut conversations = match raw {
            Some(value) => serde_json::from_value::<Conversations>(value)
                .map_err(|err| StoreError::Load(Box::new(err.into())))?,
            None => Conversations::new(),
        };
        conversations.retain(|_, record| !record.is_empty());
        for record in conversations.values_mut() {
            record.normalize_ids();
        }

        log::debug!(
            "loaded {} conversation(s) with {} pin(s)",
            conversations.len(),
            conversations.values().map(ConversationRecord::pin_count).sum::<usize>()
        );
        let newest = conversations
            .values()
            .flat_map(|record| record.pins.values())
            .map(|pin| pin.timestamp)
            .max()
            .unwrap_or(0);
        self.last_timestamp = self.last_timestamp.max(newest);
        self.conversations = conversations;
        self.bump();
        Ok(())
    }

    #[must_use]
    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    #[must_use]
    pub fn conversation(&self, key: &ConversationKey) -> Option<&ConversationRecord> {
        self.conversations.get(key)
    }

    #[must_use]
    pub fn total_pins(&self) -> usize {
        self.conversations
            .values()
            .map(ConversationRecord::pin_count)
            .sum()
    }

    /// The record for `key`, created with `title_fallback` when missing.
    ///
    /// A record created here holds no pins until one is added; empty records
    /// are never written and are dropped on the next persist.
    pub fn get_or_create_conversation(
        &mut self,
        key: &ConversationKey,
        title_fallback: &str,
    ) -> &mut ConversationRecord {
        self.conversations
            .entry(key.clone())
            .or_insert_with(|| ConversationRecord::new(title_fallback))
    }

    #[must_use]
    pub fn find_pin_by_index(&self, key: &ConversationKey, message_index: usize) -> Option<&Pin> {
        self.conversations.get(key)?.find_by_index(message_index)
    }

    #[must_use]
    pub fn find_pin(&self, key: &ConversationKey, pin_id: &PinId) -> Option<&Pin> {
        self.conversations.get(key)?.pins.get(pin_id)
    }

    /// Pins `message_index` of conversation `key`.
    ///
    /// Returns `Ok(None)` without touching anything when that index is already
    /// pinned. A non-empty `title` refreshes the conversation's label.
    pub async fn add_pin(
        &mut self,
        key: &ConversationKey,
        message_index: usize,
        snippet: impl Into<String>,
        title: &str,
    ) -> Result<Option<Pin>> {
        if self.find_pin_by_index(key, message_index).is_some() {
            return Ok(None);
        }

        let pin = Pin {
            id: PinId::generate(),
            message_index,
            snippet: snippet.into(),
            timestamp: self.next_timestamp(),
        };
        let record = self.get_or_create_conversation(key, title);
        if !title.is_empty() {
            record.title = title.to_string();
        }
        record.pins.insert(pin.id.clone(), pin.clone());
        self.bump();

        self.persist().await?;
        Ok(Some(pin))
    }

    /// Deletes one pin; the conversation goes with its last pin.
    pub async fn remove_pin(&mut self, key: &ConversationKey, pin_id: &PinId) -> Result<Option<Pin>> {
        let Some(record) = self.conversations.get_mut(key) else {
            return Ok(None);
        };
        let Some(removed) = record.pins.remove(pin_id) else {
            return Ok(None);
        };
        if record.is_empty() {
            self.conversations.remove(key);
        }
        self.bump();

        self.persist().await?;
        Ok(Some(removed))
    }

    /// Deletes every pin recorded at `message_index`.
    pub async fn remove_pins_at_index(
        &mut self,
        key: &ConversationKey,
        message_index: usize,
    ) -> Result<Vec<Pin>> {
        let Some(record) = self.conversations.get_mut(key) else {
            return Ok(Vec::new());
        };
        let doomed: Vec<PinId> = record
            .pins
            .values()
            .filter(|pin| pin.message_index == message_index)
            .map(|pin| pin.id.clone())
            .collect();
        if doomed.is_empty() {
            return Ok(Vec::new());
        }
        let removed: Vec<Pin> = doomed
            .iter()
            .filter_map(|id| record.pins.remove(id))
            .collect();
        if record.is_empty() {
            self.conversations.remove(key);
        }
        self.bump();

        self.persist().await?;
        Ok(removed)
    }

    /// Deletes the whole conversation record.
    pub async fn remove_conversation(&mut self, key: &ConversationKey) -> Result<Option<ConversationRecord>> {
        let removed = self.conversations.remove(key);
        if removed.is_some() {
            self.bump();
        }
        self.persist().await?;
        Ok(removed)
    }

    /// Notifies on every in-memory change with a new revision number.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    async fn persist(&mut self) -> Result<()> {
        self.conversations.retain(|_, record| !record.is_empty());
        let value = serde_json::to_value(&self.conversations)
            .map_err(|err| StoreError::Persist(Box::new(err.into())))?;
        self.backend
            .write(STORAGE_KEY, value)
            .await
            .map_err(|err| StoreError::Persist(Box::new(err)))?;
        log::debug!(
            "persisted {} conversation(s)",
            self.conversations.len()
        );
        Ok(())
    }

    fn next_timestamp(&mut self) -> u64 {
        let now = unix_now_ms();
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(path: &str) -> ConversationKey {
        ConversationKey::from_path(path)
    }

    async fn empty_store() -> (PinStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = PinStore::open(storage.clone()).await.expect("open");
        (store, storage)
    }

    #[tokio::test]
    async fn first_run_is_empty() {
        let (store, storage) = empty_store().await;
        assert!(store.conversations().is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn add_pin_persists_and_is_readable() {
        let (mut store, storage) = empty_store().await;
        let a = key("/chat/a");
        let pin = store
            .add_pin(&a, 1, "snippet", "Chat A")
            .await
            .expect("add")
            .expect("new pin");

        assert_eq!(store.find_pin_by_index(&a, 1), Some(&pin));
        assert_eq!(store.conversation(&a).expect("record").title, "Chat A");

        let persisted = storage.value(STORAGE_KEY).expect("written");
        assert_eq!(persisted["/chat/a"]["pins"][pin.id.as_str()]["messageIndex"], json!(1));
    }

    #[tokio::test]
    async fn new_pins_sort_after_loaded_ones_even_if_the_clock_is_behind() {
        let ahead = unix_now_ms() + 86_400_000;
        let storage = Arc::new(MemoryStorage::with_value(
            STORAGE_KEY,
            json!({
                "/chat/a": {
                    "title": "A",
                    "pins": { "old": { "snippet": "x", "timestamp": ahead, "messageIndex": 0 } }
                }
            }),
        ));
        let mut store = PinStore::open(storage).await.expect("open");

        let pin = store
            .add_pin(&key("/chat/b"), 0, "y", "B")
            .await
            .expect("add")
            .expect("new pin");
        assert!(pin.timestamp > ahead);
    }

    #[tokio::test]
    async fn duplicate_index_is_a_silent_noop() {
        let (mut store, storage) = empty_store().await;
        let a = key("/chat/a");
        store.add_pin(&a, 0, "one", "A").await.expect("add");
        let writes = storage.write_count();

        let second = store.add_pin(&a, 0, "two", "A").await.expect("add");
        assert_eq!(second, None);
        assert_eq!(store.conversation(&a).expect("record").pin_count(), 1);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn removing_last_pin_drops_conversation() {
        let (mut store, storage) = empty_store().await;
        let a = key("/chat/a");
        let pin = store.add_pin(&a, 2, "s", "A").await.expect("add").expect("pin");

        let removed = store.remove_pin(&a, &pin.id).await.expect("remove");
        assert_eq!(removed.map(|p| p.id), Some(pin.id));
        assert!(store.conversation(&a).is_none());
        assert_eq!(storage.value(STORAGE_KEY), Some(json!({})));
    }

    #[tokio::test]
    async fn recreated_conversation_takes_fresh_title() {
        let (mut store, _) = empty_store().await;
        let a = key("/chat/a");
        let pin = store.add_pin(&a, 0, "s", "Old").await.expect("add").expect("pin");
        store.remove_pin(&a, &pin.id).await.expect("remove");

        store.add_pin(&a, 0, "s", "New").await.expect("add");
        assert_eq!(store.conversation(&a).expect("record").title, "New");
    }

    #[tokio::test]
    async fn empty_conversations_are_never_written() {
        let (mut store, storage) = empty_store().await;
        let a = key("/chat/a");
        let b = key("/chat/b");
        store.get_or_create_conversation(&a, "A");
        store.add_pin(&b, 0, "s", "B").await.expect("add");

        let persisted = storage.value(STORAGE_KEY).expect("written");
        assert!(persisted.get("/chat/a").is_none());
        assert!(store.conversation(&a).is_none());
    }

    #[tokio::test]
    async fn failed_write_keeps_in_memory_change() {
        let (mut store, storage) = empty_store().await;
        storage.set_fail_writes(true);
        let a = key("/chat/a");

        let err = store.add_pin(&a, 3, "s", "A").await.expect_err("write rejected");
        assert!(matches!(err, StoreError::Persist(_)));
        assert!(store.find_pin_by_index(&a, 3).is_some());
        assert_eq!(storage.value(STORAGE_KEY), None);
    }

    #[tokio::test]
    async fn failed_reload_keeps_snapshot() {
        let (mut store, storage) = empty_store().await;
        let a = key("/chat/a");
        store.add_pin(&a, 0, "s", "A").await.expect("add");

        storage.set_fail_reads(true);
        assert!(matches!(store.reload().await, Err(StoreError::Load(_))));
        assert_eq!(store.total_pins(), 1);
    }

    #[tokio::test]
    async fn reload_drops_empty_records_and_restores_ids() {
        let storage = Arc::new(MemoryStorage::with_value(
            STORAGE_KEY,
            json!({
                "/chat/a": { "title": "A", "pins": {} },
                "/chat/b": { "title": "B", "pins": {
                    "pin_1": { "snippet": "x", "timestamp": 5, "messageIndex": 4 }
                }}
            }),
        ));
        let store = PinStore::open(storage).await.expect("open");
        assert!(store.conversation(&key("/chat/a")).is_none());
        let pin = store.find_pin_by_index(&key("/chat/b"), 4).expect("pin");
        assert_eq!(pin.id.as_str(), "pin_1");
    }

    #[tokio::test]
    async fn timestamps_strictly_increase() {
        let (mut store, _) = empty_store().await;
        let a = key("/chat/a");
        let first = store.add_pin(&a, 0, "s", "A").await.expect("add").expect("pin");
        let second = store.add_pin(&a, 1, "s", "A").await.expect("add").expect("pin");
        assert!(second.timestamp > first.timestamp);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn remove_pins_at_index_clears_orphans() {
        let (mut store, _) = empty_store().await;
        let a = key("/chat/a");
        store.add_pin(&a, 0, "s", "A").await.expect("add");
        store.add_pin(&a, 5, "s", "A").await.expect("add");

        let removed = store.remove_pins_at_index(&a, 5).await.expect("remove");
        assert_eq!(removed.len(), 1);
        assert_eq!(store.total_pins(), 1);
        assert!(store.remove_pins_at_index(&a, 9).await.expect("noop").is_empty());
    }

    #[tokio::test]
    async fn revisions_track_mutations() {
        let (mut store, _) = empty_store().await;
        let mut changes = store.subscribe();
        let before = store.revision();
        store.add_pin(&key("/c"), 0, "s", "C").await.expect("add");
        assert!(changes.has_changed().expect("sender alive"));
        assert!(store.revision() > before);
    }
}
