use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge coalescing of mutation bursts into one rescan.
///
/// Each event pushes the deadline out by `debounce`; the first event of a
/// burst caps it at `max_batch` so streamed output cannot postpone the
/// rescan forever. A forced run is due immediately.
#[derive(Debug)]
pub(crate) struct DebounceState {
    debounce: Duration,
    max_batch: Duration,
    dirty: bool,
    pending: usize,
    last_event: Option<Instant>,
    first_event: Option<Instant>,
    reason: Option<String>,
    force_immediate: bool,
}

impl DebounceState {
    pub(crate) fn new(debounce: Duration, max_batch: Duration) -> Self {
        Self {
            debounce,
            max_batch: max_batch.max(debounce),
            dirty: false,
            pending: 0,
            last_event: None,
            first_event: None,
            reason: None,
            force_immediate: false,
        }
    }

    pub(crate) fn record_event(&mut self, count: usize, reason: &str) {
        let now = Instant::now();
        self.pending += count.max(1);
        self.reason.get_or_insert_with(|| reason.to_string());
        self.last_event = Some(now);
        self.first_event.get_or_insert(now);
        self.dirty = true;
    }

    pub(crate) fn force_run(&mut self, reason: String) {
        self.pending += 1;
        self.reason = Some(reason);
        self.force_immediate = true;
        self.dirty = true;
    }

    pub(crate) const fn pending(&self) -> usize {
        self.pending
    }

    pub(crate) const fn should_run(&self) -> bool {
        self.dirty
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(Instant::now());
        }

        let trailing = self.last_event.map(|last| last + self.debounce);
        let capped = self.first_event.map(|first| first + self.max_batch);
        match (trailing, capped) {
            (Some(trailing), Some(capped)) => Some(trailing.min(capped)),
            (trailing, capped) => trailing.or(capped),
        }
    }

    pub(crate) fn take_reason(&mut self) -> Option<String> {
        self.reason.take()
    }

    pub(crate) fn reset(&mut self) {
        self.dirty = false;
        self.pending = 0;
        self.last_event = None;
        self.first_event = None;
        self.reason = None;
        self.force_immediate = false;
    }
}
