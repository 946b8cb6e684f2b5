//! The central dispatch loop shared by Backup and Restore.
//!
//! `Dispatcher::check` is the single-call contract from the design: scan
//! the queue once, start at most one new transfer. The cooperative ramp-up
//! ("schedule another dispatcher invocation via a 1 ms timer" / "a zero-delay
//! scheduling primitive after every completion") is realized as independent
//! `tokio` task chains: each chain picks a path, awaits its transfer, and
//! loops to pick the next one; the 1 ms timer spawns additional chains until
//! the simultaneous limit is reached.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Notify;
use tracing::instrument;

use crate::pause_barrier::PauseBarrier;
use crate::queue::WorkQueue;

/// A per-mode transfer: given a queued path, run it to completion (GET for
/// Backup, PUT for Restore) and record the outcome on the queue entry.
/// Never propagates an error - outcomes are folded into the queue by the
/// closure itself, per the "a transfer never throws out of itself" policy.
pub type TransferFn = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Dispatcher {
    queue: Arc<WorkQueue>,
    barrier: Arc<PauseBarrier>,
    simultaneous: usize,
    transfer: TransferFn,
    done: Notify,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<WorkQueue>,
        barrier: Arc<PauseBarrier>,
        simultaneous: usize,
        transfer: TransferFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            barrier,
            simultaneous,
            transfer,
            done: Notify::new(),
        })
    }

    /// Spawns the first dispatch chain. The 1 ms ramp-up timer takes care of
    /// bringing concurrency up to `simultaneous` from there.
    pub fn kickoff(self: &Arc<Self>) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.run_chain().await });
    }

    /// Resolves once the queue has become empty (or was already empty).
    /// Lifecycle code awaits this to know when to run completion reporting.
    pub async fn wait_until_done(&self) {
        if self.queue.is_empty() {
            return;
        }
        self.done.notified().await;
    }

    /// Performs exactly one "scan once, start at most one transfer" check,
    /// matching the design's single-call contract. Exposed separately from
    /// `run_chain` so tests can assert on one tick at a time without racing
    /// a background loop.
    ///
    /// Selection and in-flight marking happen in one `WorkQueue` call
    /// (`select_and_mark_in_flight`) rather than two: `#[tokio::main]`'s
    /// default multi-thread runtime can run several `run_chain` tasks on
    /// genuinely concurrent OS threads, so a separate read-then-write would
    /// let two chains both pick the same not-yet-marked path.
    #[instrument(skip(self))]
    pub async fn check(self: &Arc<Self>) -> Option<String> {
        self.barrier.wait().await;

        let (path, in_flight) = self.queue.select_and_mark_in_flight(self.simultaneous)?;

        if in_flight + 1 < self.simultaneous {
            let dispatcher = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                dispatcher.kickoff();
            });
        }

        Some(path)
    }

    async fn run_chain(self: Arc<Self>) {
        loop {
            let Some(path) = self.check().await else {
                self.signal_if_done();
                return;
            };

            (self.transfer)(path).await;

            if self.queue.is_empty() {
                self.signal_if_done();
                return;
            }
            // loop continues immediately: this is the zero-delay scheduling
            // primitive fired after every transfer completion.
        }
    }

    fn signal_if_done(&self) {
        if self.queue.is_empty() {
            self.done.notify_waiters();
        }
    }
}
