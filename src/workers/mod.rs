use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{
    dispatch::{dispatch_lead, DispatchOutcome},
    state::AppState,
};

pub mod analysis;

/// Fixed-size pool of dispatch consumers. Started once at process init;
/// each loop runs for the process lifetime, draining the campaign queue.
pub struct DialerPool {
    handles: Vec<JoinHandle<()>>,
}

impl DialerPool {
    pub fn spawn(state: Arc<AppState>, concurrency: usize) -> Self {
        let handles = (0..concurrency.max(1))
            .map(|worker_id| {
                let state = state.clone();
                tokio::spawn(run_loop(state, worker_id))
            })
            .collect();
        Self { handles }
    }

    /// Stops the consumer loops. Queued-but-undispatched leads are dropped
    /// with the process; the queue makes no durability promise.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_loop(state: Arc<AppState>, worker_id: usize) {
    info!(worker_id, "dial worker started");
    loop {
        let lead_id = state.queue.dequeue().await;
        // One bad attempt must not take the worker down with it.
        match dispatch_lead(&state, lead_id).await {
            Ok(DispatchOutcome::Dispatched { .. }) => {}
            Ok(DispatchOutcome::LeadMissing) => {
                debug!(worker_id, %lead_id, "skipped missing lead");
            }
            Ok(DispatchOutcome::AlreadyInFlight) => {
                debug!(worker_id, %lead_id, "skipped lead with call in flight");
            }
            Ok(DispatchOutcome::Failed) => {
                debug!(worker_id, %lead_id, "dispatch attempt failed");
            }
            Err(err) => {
                error!(worker_id, %lead_id, error = %err, "dispatch attempt errored");
            }
        }
    }
}
