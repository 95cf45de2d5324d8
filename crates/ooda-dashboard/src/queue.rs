//! Bounded dashboard event queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use ooda_telemetry::Metrics;
use parking_lot::Mutex;
use tracing::warn;

use crate::events::DashboardEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1_000;

/// Bounded FIFO between the agent (producer) and the server (consumer).
///
/// `push` never blocks: when the queue is full the incoming event is
/// dropped and queued events are kept. A detached queue has no consumer and
/// discards every event without counting it as a drop.
#[derive(Debug)]
pub struct DashboardEventQueue {
    events: Mutex<VecDeque<DashboardEvent>>,
    capacity: usize,
    dropped: AtomicU64,
    attached: bool,
}

impl Default for DashboardEventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl DashboardEventQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            capacity,
            dropped: AtomicU64::new(0),
            attached: true,
        }
    }

    /// Queue for a process without a dashboard consumer.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: 0,
            dropped: AtomicU64::new(0),
            attached: false,
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Enqueue `event`. Returns false if it was dropped or discarded.
    pub fn push(&self, event: DashboardEvent) -> bool {
        if !self.attached {
            return false;
        }
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            drop(events);
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                event_type = event.event_type(),
                capacity = self.capacity,
                dropped,
                "Dashboard event queue full, dropping event"
            );
            Metrics::dashboard_event_dropped();
            return false;
        }
        events.push_back(event);
        true
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<DashboardEvent> {
        self.events.lock().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
