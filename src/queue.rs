use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// In-memory dispatch queue for a running campaign.
///
/// Strictly FIFO, unbounded, multi-producer multi-consumer. Each enqueued
/// lead id is delivered to exactly one consumer. Nothing is persisted; a
/// restart drops whatever was still queued and the campaign has to be
/// started again.
pub struct CampaignQueue {
    tx: mpsc::UnboundedSender<Uuid>,
    rx: Mutex<mpsc::UnboundedReceiver<Uuid>>,
    depth: AtomicUsize,
}

impl CampaignQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Appends a lead id. Enqueueing the same id twice yields two dispatch
    /// attempts; deduplication is the caller's problem.
    pub fn enqueue(&self, lead_id: Uuid) {
        // The receiver lives as long as the queue, so the send cannot fail.
        if self.tx.send(lead_id).is_ok() {
            self.depth.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Waits until an item is available and removes it. Only one consumer
    /// waits on the channel at a time; the rest park on the mutex.
    pub async fn dequeue(&self) -> Uuid {
        let mut rx = self.rx.lock().await;
        let lead_id = rx.recv().await.expect("queue sender lives in self");
        self.depth.fetch_sub(1, Ordering::SeqCst);
        lead_id
    }

    /// Current depth, for health reporting only. Not usable for flow
    /// control: the value is stale the moment it is read.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Default for CampaignQueue {
    fn default() -> Self {
        Self::new()
    }
}
