//! Startup timing, signal-driven graceful abandonment, and completion
//! reporting - shared by both binaries, parameterized by `Mode`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::queue::WorkQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Backup,
    Restore,
}

impl Mode {
    fn timer_label(self) -> &'static str {
        match self {
            Mode::Backup => "total download time",
            Mode::Restore => "total upload time",
        }
    }
}

/// Process exit codes per the external interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// 0: normal completion, even with some failed paths.
    Normal,
    /// 1: auth/discovery aborted before the run started.
    AuthAborted,
    /// 2: graceful abandonment completed before the queue drained.
    Abandoned,
    /// 3: the abandonment hard-exit timer fired (Backup only).
    HardExit,
}

impl ExitOutcome {
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Normal => 0,
            ExitOutcome::AuthAborted => 1,
            ExitOutcome::Abandoned => 2,
            ExitOutcome::HardExit => 3,
        }
    }
}

pub struct Lifecycle {
    queue: Arc<WorkQueue>,
    mode: Mode,
    started_at: Instant,
    hard_exit_armed: AtomicBool,
}

impl Lifecycle {
    pub fn new(queue: Arc<WorkQueue>, mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            queue,
            mode,
            started_at: Instant::now(),
            hard_exit_armed: AtomicBool::new(false),
        })
    }

    /// Installs handlers for SIGINT/SIGTERM/SIGQUIT/SIGHUP; each invokes
    /// `abandon_gracefully`.
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                lifecycle.abandon_gracefully("SIGINT");
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            for (kind, name) in [
                (SignalKind::terminate(), "SIGTERM"),
                (SignalKind::quit(), "SIGQUIT"),
                (SignalKind::hangup(), "SIGHUP"),
            ] {
                if let Ok(mut stream) = signal(kind) {
                    let lifecycle = Arc::clone(self);
                    tokio::spawn(async move {
                        if stream.recv().await.is_some() {
                            lifecycle.abandon_gracefully(name);
                        }
                    });
                }
            }
        }
    }

    /// Enters graceful abandonment: idempotent, so a signal arriving after an
    /// overlong `Retry-After` already triggered it (or vice versa) is a
    /// no-op. Arms the Backup-only 10 s hard-exit timer on first trigger.
    pub fn abandon_gracefully(self: &Arc<Self>, reason: &str) {
        if self.queue.is_abandoned() {
            return;
        }
        warn!(reason, "entering graceful abandonment");
        self.queue.abandon();

        if self.mode == Mode::Backup && !self.hard_exit_armed.swap(true, Ordering::SeqCst) {
            let queue = Arc::clone(&self.queue);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                let remaining = queue.queued_paths();
                warn!(?remaining, "hard-exit timer fired, remaining transfers abandoned in place");
                std::process::exit(ExitOutcome::HardExit.code());
            });
        }
    }

    /// Awaits dispatcher completion, then logs the elapsed timer and failed
    /// set, returning the outcome to map to a process exit code.
    pub async fn run_to_completion(&self, dispatcher: &Dispatcher) -> ExitOutcome {
        dispatcher.wait_until_done().await;

        let elapsed = self.started_at.elapsed();
        info!(label = self.mode.timer_label(), elapsed_ms = elapsed.as_millis() as u64, "run complete");

        let failed = self.queue.failed_paths();
        if !failed.is_empty() {
            warn!(count = failed.len(), paths = ?failed, "some paths did not complete");
        }

        if self.queue.is_abandoned() {
            ExitOutcome::Abandoned
        } else {
            ExitOutcome::Normal
        }
    }
}
