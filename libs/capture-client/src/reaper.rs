use crate::pool::ConnectionPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background task that periodically reclaims pool connections.
///
/// One reaper exists per client, started at construction and stopped at
/// close. Each tick closes connections past their negotiated keep-alive
/// expiry, then connections idle beyond the configured threshold. It
/// holds nothing but the pool handle and the shutdown channel.
pub(crate) struct IdleReaper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl IdleReaper {
    pub(crate) fn spawn(
        pool: Arc<ConnectionPool>,
        interval: Duration,
        idle_threshold: Duration,
    ) -> Self {
        let (shutdown, mut signal) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        pool.close_expired();
                        pool.close_idle(idle_threshold);
                    }
                    changed = signal.changed() => {
                        // An explicit stop and a dropped sender both mean
                        // shutdown; never keep sweeping on a dead handle.
                        let _ = changed;
                        break;
                    }
                }
            }
            tracing::trace!("idle reaper stopped");
        });

        Self { shutdown, handle }
    }

    /// Signal the reaper to exit after at most one pending sweep. Idempotent.
    pub(crate) fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}
