// Sync Scheduler
// Periodic control loop that repeatedly runs a stateless sync pass

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::operations::{SyncEngine, SyncResult};

/// Runs [`SyncEngine::sync_once`] on a fixed interval.
///
/// The interval is measured from the end of one pass to the start of the
/// next; passes never overlap. Passes run on tokio's blocking pool.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
}

impl SyncScheduler {
    /// Create a scheduler for one source/replica pair
    pub fn new(
        engine: Arc<SyncEngine>,
        source: PathBuf,
        replica: PathBuf,
        interval: Duration,
    ) -> Self {
        info!(
            source = %source.display(),
            replica = %replica.display(),
            interval_secs = interval.as_secs(),
            "Creating sync scheduler"
        );

        Self {
            engine,
            source,
            replica,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single pass.
    ///
    /// Returns `None` when the pass was aborted or panicked; either way the
    /// next scheduled pass simply tries again.
    pub async fn run_pass(&self) -> Option<SyncResult> {
        let engine = Arc::clone(&self.engine);
        let source = self.source.clone();
        let replica = self.replica.clone();

        match tokio::task::spawn_blocking(move || engine.sync_once(&source, &replica)).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                warn!(error = %e, "Sync pass aborted, retrying next interval");
                None
            }
            Err(e) => {
                error!(error = %e, "Sync pass panicked, retrying next interval");
                None
            }
        }
    }

    /// Main loop: pass, sleep, repeat until `shutdown` resolves.
    ///
    /// A pass in flight is always allowed to finish. Returns the number of
    /// passes started.
    pub async fn run_until<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        info!("Sync scheduler starting");
        tokio::pin!(shutdown);
        let mut passes = 0;

        loop {
            self.run_pass().await;
            passes += 1;

            tokio::select! {
                _ = &mut shutdown => {
                    info!(passes, "Shutdown requested, scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        passes
    }
}

/// Start waiting on `signal` right away on the runtime.
///
/// The returned future resolves once `signal` has. Signal handlers such as
/// `tokio::signal::ctrl_c` only register when first polled, so the listener
/// must be running before the first pass starts.
pub fn shutdown_listener<F>(signal: F) -> impl Future<Output = ()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(signal);
    async move {
        if let Err(e) = handle.await {
            error!(error = %e, "Shutdown listener failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{MemorySink, SyncEvent};
    use crate::operations::SyncOptions;
    use std::fs;
    use tempfile::TempDir;

    fn scheduler(source: PathBuf, replica: PathBuf, sink: Arc<MemorySink>) -> SyncScheduler {
        let engine = SyncEngine::new(SyncOptions::default()).with_sink(sink);
        SyncScheduler::new(Arc::new(engine), source, replica, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_run_until_immediate_shutdown_runs_one_pass() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let replica = dir.path().join("replica");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();
        let sink = Arc::new(MemorySink::new());

        let passes = scheduler(source, replica.clone(), sink.clone())
            .run_until(std::future::ready(()))
            .await;

        assert_eq!(passes, 1);
        assert_eq!(fs::read_to_string(replica.join("a.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_aborted_pass_does_not_stop_scheduler() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(dir.path().join("missing"), dir.path().join("replica"), sink.clone());

        assert!(scheduler.run_pass().await.is_none());
        assert_eq!(scheduler.run_until(std::future::ready(())).await, 1);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, SyncEvent::PassAborted { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_listener_starts_before_it_is_awaited() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(&source).unwrap();
        let armed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&armed);
        let shutdown = shutdown_listener(async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;
        assert!(armed.load(Ordering::SeqCst));

        let scheduler = scheduler(source, dir.path().join("replica"), Arc::new(MemorySink::new()));
        assert_eq!(scheduler.run_until(shutdown).await, 1);
    }

    #[tokio::test]
    async fn test_run_pass_returns_result() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("empty")).unwrap();
        let scheduler = scheduler(source, dir.path().join("replica"), Arc::new(MemorySink::new()));

        let result = scheduler.run_pass().await.unwrap();
        assert_eq!(result.dirs_created, 2);
        assert_eq!(scheduler.interval(), Duration::from_secs(3600));
    }
}
