//! Background sweeper for expired blobs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::BlobStore;

/// Periodically calls [`BlobStore::sweep`] until shut down or dropped
#[derive(Debug)]
pub struct Janitor {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Spawn the sweep loop on the current tokio runtime
    pub fn start(store: Arc<dyn BlobStore>, sweep_interval: Duration) -> Self {
        let token = CancellationToken::new();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep();
                        if removed > 0 {
                            debug!("Blob janitor removed {} expired entries, {} remain", removed, store.len());
                        }
                    }
                    _ = loop_token.cancelled() => {
                        break;
                    }
                }
            }

            info!("Blob janitor stopped");
        });

        info!("Blob janitor started, sweeping every {}", humantime::format_duration(sweep_interval));

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Stop the loop and wait for it to finish
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Blob janitor task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{DEFAULT_TTL, ManualClock, MemoryBlobStore};
    use bytes::Bytes;
    use chrono::TimeDelta;

    fn store() -> (Arc<MemoryBlobStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryBlobStore::with_clock(DEFAULT_TTL, clock.clone()));
        (store, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_sweeps_expired_entries() {
        let (store, clock) = store();
        store.put(Bytes::from_static(b"abc"), "image/png", "a.png");
        store.put(Bytes::from_static(b"def"), "image/png", "b.png");

        let janitor = Janitor::start(store.clone(), Duration::from_secs(60));

        clock.advance(TimeDelta::minutes(6));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(store.len(), 0);
        janitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_keeps_live_entries() {
        let (store, clock) = store();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/png", "a.png");

        let janitor = Janitor::start(store.clone(), Duration::from_secs(60));

        clock.advance(TimeDelta::minutes(2));
        tokio::time::sleep(Duration::from_secs(125)).await;

        assert_eq!(store.len(), 1);
        assert!(store.get(&receipt.id, &receipt.token).is_ok());
        janitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_stops_on_drop() {
        let (store, _clock) = store();
        let janitor = Janitor::start(store, Duration::from_secs(60));
        let token = janitor.token.clone();
        assert!(janitor.is_running());

        drop(janitor);
        assert!(token.is_cancelled());
    }
}
