use crate::models::ProviderId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks: at most one holder per provider, independent providers
/// never contend. An entry lives while anyone holds or waits on it; a waiter
/// cancelled before it gets the lock gives up its share too.
#[derive(Debug, Default)]
pub struct ProviderLocks {
    inner: Mutex<HashMap<ProviderId, Entry>>,
}

#[derive(Debug)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

impl ProviderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, provider_id: ProviderId) -> ProviderLockGuard<'_> {
        let (registration, lock) = {
            let mut map = self.inner.lock();
            let entry = map.entry(provider_id).or_insert_with(|| Entry {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users += 1;
            (
                Registration {
                    locks: self,
                    provider_id,
                },
                entry.lock.clone(),
            )
        };

        // Dropping this future while waiting still releases the registration
        let guard = lock.lock_owned().await;

        ProviderLockGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of providers with a live lock entry
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Registration<'a> {
    locks: &'a ProviderLocks,
    provider_id: ProviderId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock();
        if let Some(entry) = map.get_mut(&self.provider_id) {
            entry.users -= 1;
            if entry.users == 0 {
                map.remove(&self.provider_id);
            }
        }
    }
}

/// Held lock; fields drop in order, so the lock is released before the entry
pub struct ProviderLockGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}
