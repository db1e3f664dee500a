//! Per-menu-code writer locks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of async mutexes, one per menu code.
///
/// A menu code's lifetime row and all of its monthly rows share one lock,
/// so only one recompute-and-replace runs per menu code at a time.
/// Entries live as long as the registry.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `menu_code`.
    pub async fn lock(&self, menu_code: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(menu_code)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Number of menu codes seen so far.
    pub async fn tracked_codes(&self) -> usize {
        self.locks.lock().await.len()
    }
}
