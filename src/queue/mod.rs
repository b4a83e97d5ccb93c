use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::debug;

/// FIFO of marker filenames waiting to be processed.
///
/// Any number of producers may push; the consumer suspends in [`IngestQueue::pop`]
/// until an entry is available. Entries are not deduplicated.
#[derive(Debug, Default)]
pub struct IngestQueue {
    entries: Mutex<VecDeque<String>>,
    available: Notify,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker filename and wake one waiting consumer.
    /// Callable from non-async contexts such as filesystem event callbacks.
    pub fn push(&self, marker_name: impl Into<String>) {
        let marker_name = marker_name.into();
        debug!("Queueing {:?}", marker_name);
        self.entries.lock().push_back(marker_name);
        self.available.notify_one();
    }

    /// Wait for and remove the oldest entry
    pub async fn pop(&self) -> String {
        loop {
            if let Some(marker_name) = self.try_pop() {
                return marker_name;
            }
            self.available.notified().await;
        }
    }

    pub fn try_pop(&self) -> Option<String> {
        self.entries.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
