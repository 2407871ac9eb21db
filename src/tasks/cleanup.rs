//! Periodic Sweep Task
//!
//! Background task that periodically removes expired entries from a store or
//! stale records from a deduplicator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{ProductCache, TtlStore, UserCache};
use crate::dedup::RequestDeduplicator;

// == Sweep Trait ==
/// Something that can drop its expired contents in one pass.
pub trait Sweep: Send + Sync + 'static {
    /// Returns the number of entries removed.
    fn sweep(&mut self) -> usize;
}

impl<V: Clone + Send + Sync + 'static> Sweep for TtlStore<V> {
    fn sweep(&mut self) -> usize {
        self.cleanup()
    }
}

impl<V: Clone + Send + Sync + 'static> Sweep for ProductCache<V> {
    fn sweep(&mut self) -> usize {
        self.store_mut().cleanup()
    }
}

impl<V: Clone + Send + Sync + 'static> Sweep for UserCache<V> {
    fn sweep(&mut self) -> usize {
        self.store_mut().cleanup()
    }
}

impl Sweep for RequestDeduplicator {
    fn sweep(&mut self) -> usize {
        self.cleanup()
    }
}

// == Cleanup Handle ==
/// Owner of a running sweep task.
///
/// Dropping the handle aborts the task, so a forgotten handle never leaves a
/// timer running.
#[derive(Debug)]
pub struct CleanupHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl CleanupHandle {
    /// Stops the sweep task.
    pub fn cancel(&self) {
        self.handle.abort();
        info!("Cleanup task '{}' cancelled", self.name);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a background task that sweeps `target` every `interval`.
///
/// The task takes the same write lock as foreground operations for each
/// sweep. The first sweep happens one full interval after spawning.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(TtlStore::<String>::new(300_000)?));
/// let cleanup = spawn_cleanup_task(store.clone(), Duration::from_secs(60), "general");
/// // Later, during shutdown:
/// cleanup.cancel();
/// ```
pub fn spawn_cleanup_task<T: Sweep>(
    target: Arc<RwLock<T>>,
    interval: Duration,
    name: &'static str,
) -> CleanupHandle {
    let handle = tokio::spawn(async move {
        info!(
            "Starting cleanup task '{}' with interval of {} ms",
            name,
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            ticker.tick().await;

            let removed = {
                let mut guard = target.write().await;
                guard.sweep()
            };

            if removed > 0 {
                info!("Cache cleanup '{}': removed {} expired entries", name, removed);
            } else {
                debug!("Cache cleanup '{}': no expired entries found", name);
            }
        }
    });

    CleanupHandle { name, handle }
}
