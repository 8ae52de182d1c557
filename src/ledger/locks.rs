//! Per-key locks with bounded waits

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::*;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Exclusive hold on one key of a [`LockTable`], released on drop
///
/// Dropping the last hold on a key with no waiters removes the key from the
/// table.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl LockGuard {
    /// The key this guard holds
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune(&self.locks, &self.key);
    }
}

/// Remove `key` once only the table itself refers to its mutex
///
/// Clones are only handed out under the map lock, so a count of one means no
/// holder and no waiter.
fn prune(locks: &Mutex<LockMap>, key: &str) {
    let Ok(mut locks) = locks.lock() else {
        return;
    };
    if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        locks.remove(key);
    }
}

/// One async mutex per key, created on first use
///
/// Unrelated keys never contend. Waits are bounded by the table's timeout and
/// surface as a retryable `Concurrency` error.
#[derive(Debug)]
pub struct LockTable {
    locks: Arc<Mutex<LockMap>>,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> BankResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| BankError::Storage("lock table poisoned".to_string()))?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Acquire the lock for `key`, waiting at most the table timeout
    pub async fn acquire(&self, key: &str) -> BankResult<LockGuard> {
        let lock = self.entry(key)?;
        let acquired = tokio::time::timeout(self.timeout, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(LockGuard {
                key: key.to_string(),
                guard: Some(guard),
                locks: Arc::clone(&self.locks),
            }),
            Err(_) => {
                prune(&self.locks, key);
                tracing::warn!(key, timeout_ms = self.timeout.as_millis() as u64, "lock wait timed out");
                Err(BankError::Concurrency(format!(
                    "timed out waiting for lock on {}",
                    key
                )))
            }
        }
    }

    /// Acquire two distinct keys in ascending key order
    ///
    /// The guards are returned in argument order, so callers can tell them
    /// apart regardless of which one was locked first.
    pub async fn acquire_pair(&self, first: &str, second: &str) -> BankResult<(LockGuard, LockGuard)> {
        if first == second {
            return Err(BankError::Validation(format!(
                "cannot lock {} twice",
                first
            )));
        }

        if first < second {
            let a = self.acquire(first).await?;
            let b = self.acquire(second).await?;
            Ok((a, b))
        } else {
            let b = self.acquire(second).await?;
            let a = self.acquire(first).await?;
            Ok((a, b))
        }
    }
}
