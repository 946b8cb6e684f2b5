//! The pause barrier: a resettable, never-shrinking deadline every
//! dispatcher iteration awaits before selecting work.
//!
//! A 429/503 response installs a new deadline. In-flight transfers that
//! already issued their network call are unaffected; only future transfer
//! *launches* wait on it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct PauseBarrier {
    deadline: Mutex<Instant>,
}

impl Default for PauseBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseBarrier {
    pub fn new() -> Self {
        Self {
            deadline: Mutex::new(Instant::now()),
        }
    }

    /// Installs a new pause of `delay_ms`, measured from now. Never moves
    /// the deadline earlier than whatever is already installed.
    #[allow(clippy::unwrap_used)]
    pub fn install(&self, delay_ms: u64) {
        let candidate = Instant::now() + Duration::from_millis(delay_ms);
        let mut guard = self.deadline.lock().unwrap();
        if candidate > *guard {
            *guard = candidate;
        }
    }

    /// Awaits the barrier, re-checking after each sleep in case the
    /// deadline was pushed further out while we were sleeping.
    pub async fn wait(&self) {
        loop {
            #[allow(clippy::unwrap_used)]
            let deadline = *self.deadline.lock().unwrap();
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            tokio::time::sleep(deadline - now).await;
        }
    }
}
