//! Per-key exclusive locks with a bounded wait.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::command_dispatcher::DispatchError;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

const BACKOFF_START: Duration = Duration::from_micros(50);
const BACKOFF_MAX: Duration = Duration::from_millis(5);

/// One mutex per key, created on first use and evicted once no holder or
/// waiter references it.
///
/// Callers are synchronous, so acquisition polls `try_lock_owned` with a
/// capped exponential backoff instead of awaiting.
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
    timeout: Duration,
}

/// Held for as long as the key must stay exclusive.
#[derive(Debug)]
pub struct KeyGuard<K>
where
    K: Eq + Hash,
{
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: Arc<DashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Drop for KeyGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left: nobody holds or waits on this key.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + core::fmt::Display,
{
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            timeout,
        }
    }

    pub fn acquire(&self, key: &K) -> Result<KeyGuard<K>, DispatchError> {
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let deadline = Instant::now() + self.timeout;
        let mut backoff = BACKOFF_START;
        loop {
            if let Ok(guard) = mutex.clone().try_lock_owned() {
                return Ok(KeyGuard {
                    guard: Some(guard),
                    key: key.clone(),
                    locks: self.locks.clone(),
                });
            }
            let now = Instant::now();
            if now >= deadline {
                drop(mutex);
                self.locks.remove_if(key, |_, m| Arc::strong_count(m) == 1);
                tracing::warn!(key = %key, timeout_ms = self.timeout.as_millis() as u64, "lock acquisition timed out");
                return Err(DispatchError::LockTimeout(format!(
                    "could not lock {key} within {}ms",
                    self.timeout.as_millis()
                )));
            }
            std::thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(BACKOFF_MAX);
        }
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + core::fmt::Display,
{
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_holder_times_out() {
        let locks = KeyedLocks::<String>::new(Duration::from_millis(20));
        let key = "sku-1".to_string();

        let _held = locks.acquire(&key).unwrap();
        let err = locks.acquire(&key).unwrap_err();
        assert!(matches!(err, DispatchError::LockTimeout(_)));

        // Other keys are unaffected.
        assert!(locks.acquire(&"sku-2".to_string()).is_ok());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let locks = KeyedLocks::<u32>::new(Duration::from_millis(20));
        drop(locks.acquire(&7).unwrap());
        assert!(locks.acquire(&7).is_ok());
    }

    #[test]
    fn idle_keys_are_evicted() {
        let locks = KeyedLocks::<u32>::new(Duration::from_millis(20));
        for key in 0..100 {
            drop(locks.acquire(&key).unwrap());
        }
        assert!(locks.locks.is_empty());

        let held = locks.acquire(&1).unwrap();
        assert!(locks.acquire(&1).is_err());
        assert_eq!(locks.locks.len(), 1);
        drop(held);
        assert!(locks.locks.is_empty());
    }

    #[test]
    fn critical_sections_do_not_overlap() {
        let locks = Arc::new(KeyedLocks::<u32>::new(Duration::from_secs(5)));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let _g = locks.acquire(&1).unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
