//! Per-console transition locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per console name.
///
/// A guard is held across one state transition, so two transitions for the
/// same console never interleave. Relay presses are not covered; they run on
/// the console's relay lane. Distinct consoles never contend. Waiters are
/// served in FIFO order.
#[derive(Default)]
pub struct ConsoleLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one console until dropped.
pub type ConsoleGuard = OwnedMutexGuard<()>;

impl ConsoleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `console`.
    ///
    /// Callers check that the console exists first; the map only ever holds
    /// roster names.
    pub async fn acquire(&self, console: &str) -> ConsoleGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(console.to_string()).or_default())
        };
        lock.lock_owned().await
    }

}
