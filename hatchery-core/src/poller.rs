//! Background snapshot polling
//!
//! Dashboards refresh on a fixed interval. After a failed fetch the delay
//! doubles up to `max_backoff`, and drops back to the interval after the
//! next success. The last good snapshot stays published while fetches fail.

use hatchery_client::FarmBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::snapshot::FarmSnapshot;

/// Default refresh interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default cap on the failure backoff
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl PollerConfig {
    /// Delay before the next fetch after `failures` consecutive failures.
    pub fn next_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let factor = 2u32.saturating_pow(failures.min(16));
        self.interval
            .saturating_mul(factor)
            .min(self.max_backoff.max(self.interval))
    }
}

/// Latest published snapshot, `None` until the first successful fetch.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<FarmSnapshot>>>;

pub struct SnapshotPoller;

impl SnapshotPoller {
    /// Start polling. The first fetch happens immediately.
    pub fn spawn(
        backend: Arc<dyn FarmBackend>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> PollerHandle {
        let (tx, rx) = watch::channel(None);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        info!(
            backend = %backend.id(),
            interval_ms = config.interval.as_millis() as u64,
            "Starting snapshot poller"
        );

        let task = tokio::spawn(async move {
            let mut failures: u32 = 0;

            loop {
                match FarmSnapshot::fetch(backend.as_ref(), clock.now()).await {
                    Ok(snapshot) => {
                        if failures > 0 {
                            info!(failures = failures, "Snapshot fetch recovered");
                        }
                        failures = 0;
                        debug!(tanks = snapshot.tanks.len(), "Published snapshot");
                        if tx.send(Some(Arc::new(snapshot))).is_err() {
                            debug!("All snapshot subscribers gone, stopping poller");
                            break;
                        }
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        warn!(error = %e, failures = failures, "Snapshot fetch failed");
                    }
                }

                let delay = config.next_delay(failures);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = &mut shutdown_rx => {
                        info!("Snapshot poller stopped");
                        break;
                    }
                }
            }
        });

        PollerHandle {
            receiver: rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owner of a running poller.
pub struct PollerHandle {
    receiver: SnapshotReceiver,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.receiver.clone()
    }

    pub fn latest(&self) -> Option<Arc<FarmSnapshot>> {
        self.receiver.borrow().clone()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Snapshot poller task ended abnormally");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = PollerConfig {
            interval: Duration::from_secs(30),
            max_backoff: Duration::from_secs(300),
        };
        assert_eq!(config.next_delay(0), Duration::from_secs(30));
        assert_eq!(config.next_delay(1), Duration::from_secs(60));
        assert_eq!(config.next_delay(2), Duration::from_secs(120));
        assert_eq!(config.next_delay(3), Duration::from_secs(240));
        assert_eq!(config.next_delay(4), Duration::from_secs(300));
        assert_eq!(config.next_delay(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_cap_below_interval_keeps_interval() {
        let config = PollerConfig {
            interval: Duration::from_secs(30),
            max_backoff: Duration::from_secs(5),
        };
        assert_eq!(config.next_delay(3), Duration::from_secs(30));
    }
}
