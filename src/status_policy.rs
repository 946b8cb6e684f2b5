//! Shared status-code classification for the non-success branches of both
//! Backup's GET and Restore's PUT. Success statuses (200/folder, 200/201
//! document, 412) are handled by each transfer individually since their
//! meaning differs by mode; everything else follows one table.

use crate::queue::WorkQueue;

/// A path that has failed this many times is dequeued as failed rather than
/// retried again.
pub const FAILURE_CAP: u32 = 3;

/// What should happen to a queue entry after a transfer response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    /// Permanent failure: dequeue and add to the failed set immediately.
    GiveUp,
    /// Rate-limited: install a pause barrier, move to end, no failure
    /// increment.
    PauseAndRetry,
    /// Transient, but the "504 is special" quirk from the upstream policy:
    /// move to end, no failure increment.
    RetryWithoutPenalty,
    /// Ordinary transient failure: move to end, failures += 1.
    RetryWithPenalty,
}

/// Classifies a non-success HTTP status per the shared policy table.
///
/// Status 504 deliberately does **not** increment the failure counter,
/// unlike every other 5xx. This mirrors the upstream service's own
/// inconsistent treatment and is preserved exactly rather than "fixed" -
/// see the design notes.
pub fn classify(status: u16) -> Fate {
    match status {
        401 | 403 | 404 | 410 => Fate::GiveUp,
        429 | 503 => Fate::PauseAndRetry,
        504 => Fate::RetryWithoutPenalty,
        _ => Fate::RetryWithPenalty,
    }
}

/// The universal post-handling rule applied after every transfer, win or
/// lose: if the entry is still queued (it wasn't already dequeued by a
/// success or a give-up branch) and it has now hit the failure cap, or the
/// run has been abandoned since the transfer started, dequeue it as failed.
/// In every case, clear its in-flight flag so the dispatcher can launch
/// something else.
///
/// Acting only on entries still present in the queue is what keeps this from
/// retroactively failing a path that a success or `GiveUp` branch already
/// removed cleanly.
pub fn finalize_entry(queue: &WorkQueue, path: &str) {
    if let Some(entry) = queue.entry_snapshot(path) {
        if entry.failures >= FAILURE_CAP || queue.is_abandoned() {
            queue.dequeue_as_failed(path);
        }
    }
    queue.set_in_flight(path, false);
}
