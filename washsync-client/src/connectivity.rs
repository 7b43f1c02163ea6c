use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use washsync_core::SyncResult;

use crate::events::EventDispatcher;
use crate::offline_queue::OfflineQueue;
use crate::sync::SyncCoordinator;

/// Edge detector over the host's reachability signal. Only the
/// offline-to-online transition triggers a queue drain, exactly once per
/// transition; repeated online reports while already online do nothing.
pub struct ConnectivityMonitor {
    is_online: Arc<AtomicBool>,
    queue: Arc<OfflineQueue>,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(queue: Arc<OfflineQueue>) -> Self {
        Self {
            is_online: Arc::new(AtomicBool::new(false)),
            queue,
            watch_task: Mutex::new(None),
        }
    }

    /// Latest reported reachability. Advisory only: the sync paths find out
    /// the truth by attempting the backend call.
    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::Relaxed)
    }

    /// Whether completions are waiting on a drain, for UI indication.
    pub async fn has_pending_work(&self) -> SyncResult<bool> {
        Ok(!self.queue.is_empty().await?)
    }

    /// Starts consuming the host signal. The spawned task exits when the
    /// sender side of the channel is dropped.
    pub async fn start(
        &self,
        mut rx: watch::Receiver<bool>,
        coordinator: Arc<SyncCoordinator>,
        events: Arc<EventDispatcher>,
    ) {
        let initial = *rx.borrow();
        self.is_online.store(initial, Ordering::Relaxed);

        let is_online = self.is_online.clone();
        let task = tokio::spawn(async move {
            let mut was_online = initial;
            tracing::info!("CONNECTIVITY: Monitor started (online={})", was_online);

            while rx.changed().await.is_ok() {
                let now_online = *rx.borrow();
                // The host may report the same state repeatedly; only real
                // transitions count.
                if now_online == was_online {
                    continue;
                }

                is_online.store(now_online, Ordering::Relaxed);
                events.emit_connectivity_changed(now_online);

                if now_online {
                    tracing::info!("CONNECTIVITY: 🔄 Back online, draining queued completions");
                    match coordinator.drain().await {
                        Ok(outcome) => {
                            tracing::debug!("CONNECTIVITY: Drain outcome: {:?}", outcome);
                        }
                        Err(e) => {
                            tracing::error!("CONNECTIVITY: Drain failed: {}", e);
                        }
                    }
                } else {
                    tracing::info!("CONNECTIVITY: 📴 Went offline");
                }

                was_online = now_online;
            }

            tracing::debug!("CONNECTIVITY: Host signal closed, monitor exiting");
        });

        *self.watch_task.lock().await = Some(task);
    }

    pub async fn shutdown(&self) {
        if let Some(task) = self.watch_task.lock().await.take() {
            task.abort();
        }
    }
}
