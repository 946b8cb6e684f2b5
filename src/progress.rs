//! Progress UI (spinner) for Backup/Restore runs.
//!
//! Polls the shared work queue's counters and renders a single status line;
//! purely cosmetic; the engine itself never reads this module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::queue::WorkQueue;

/// Spawns the spinner when `enabled`. Returns `(None, stop)` with `stop`
/// already `true` when disabled, so callers can unconditionally check/store
/// on the returned handle without branching on `enabled` a second time.
pub fn spawn(enabled: bool, queue: Arc<WorkQueue>, label: &'static str) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !enabled {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_inner(queue, label, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_inner(queue: Arc<WorkQueue>, label: &'static str, stop: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            let remaining = queue.len();
            let failed = queue.failed_count();
            spinner.set_message(format!("{label}: {remaining} remaining, {failed} failed"));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_spinner_returns_no_handle_and_stop_already_true() {
        let queue = Arc::new(WorkQueue::new());
        let (handle, stop) = spawn(false, queue, "backup");

        assert!(handle.is_none());
        assert!(stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn enabled_spinner_stops_when_signalled() {
        let queue = Arc::new(WorkQueue::new());
        let (handle, stop) = spawn(true, queue, "backup");

        assert!(handle.is_some());
        assert!(!stop.load(Ordering::SeqCst));

        stop.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(2), handle.unwrap())
            .await
            .expect("spinner task should exit once stop is signalled")
            .expect("spinner task should not panic");
    }
}
