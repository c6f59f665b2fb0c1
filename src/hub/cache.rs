//! Shared cache of server descriptors received over broadcasts.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use super::message::ServerDescriptor;

/// FIFO cache shared between the broadcast listener (producer) and the UI
/// poll (consumer).
///
/// Consumption deliberately stops at one remaining entry: with a concurrent
/// producer the cache is never drained to empty, so a poll loop always has a
/// baseline entry to diff against.
#[derive(Debug, Default)]
pub struct ServerCache {
    entries: Mutex<VecDeque<ServerDescriptor>>,
}

impl ServerCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append descriptors in broadcast order.
    pub async fn push_all(&self, servers: Vec<ServerDescriptor>) {
        let mut entries = self.entries.lock().await;
        entries.extend(servers);
    }

    /// Remove and return the oldest entry, only while more than one remains.
    pub async fn pop_oldest(&self) -> Option<ServerDescriptor> {
        let mut entries = self.entries.lock().await;
        if entries.len() > 1 {
            entries.pop_front()
        } else {
            None
        }
    }

    /// Number of cached descriptors.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Snapshot of the current entries, oldest first.
    pub async fn snapshot(&self) -> Vec<ServerDescriptor> {
        self.entries.lock().await.iter().cloned().collect()
    }
}
