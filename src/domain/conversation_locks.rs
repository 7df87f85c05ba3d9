//! Per-phone serialization of conversation turns.
//!
//! [`ConversationLocks`] keeps one async mutex per normalized phone number
//! in a `HashMap` behind a [`tokio::sync::RwLock`]. A webhook call holds the
//! phone's guard for the whole turn, so two messages from the same client
//! can never interleave their session reads and writes, while different
//! clients proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::Phone;

/// Number of tracked phones above which idle entries are pruned.
const PRUNE_THRESHOLD: usize = 1_024;

/// Keyed async mutexes, one per phone number.
///
/// # Concurrency
///
/// - Turns for the same phone are serialized in arrival order of `acquire`.
/// - Turns for different phones run concurrently.
/// - The outer map is only write-locked to insert or prune entries.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: RwLock<HashMap<Phone, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `phone`'s conversation.
    ///
    /// The guard releases the lock when dropped.
    pub async fn acquire(&self, phone: &Phone) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(phone).map(Arc::clone);
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut map = self.locks.write().await;
                if map.len() >= PRUNE_THRESHOLD {
                    map.retain(|_, lock| Arc::strong_count(lock) > 1);
                }
                Arc::clone(map.entry(phone.clone()).or_default())
            }
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn phone(raw: &str) -> Phone {
        let Some(p) = Phone::normalize(raw) else {
            panic!("valid phone");
        };
        p
    }

    #[tokio::test]
    async fn same_phone_is_serialized() {
        let locks = Arc::new(ConversationLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let p = phone("5511999999999");

        let guard = locks.acquire(&p).await;

        let task = {
            let locks = Arc::clone(&locks);
            let order = Arc::clone(&order);
            let p = p.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&p).await;
                order.lock().await.push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().await.push("first");
        drop(guard);

        let _ = task.await;
        assert_eq!(*order.lock().await, vec!["first", "second"]);
    }

    async fn tracked(locks: &ConversationLocks) -> usize {
        locks.locks.read().await.len()
    }

    #[tokio::test]
    async fn different_phones_do_not_block() {
        let locks = ConversationLocks::new();
        let _a = locks.acquire(&phone("5511")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&phone("5522"))).await;
        assert!(b.is_ok());
        assert_eq!(tracked(&locks).await, 2);
    }

    #[tokio::test]
    async fn idle_entries_are_pruned_once_the_table_is_full() {
        let locks = ConversationLocks::new();
        let held = locks.acquire(&phone("1")).await;
        for n in 2..=PRUNE_THRESHOLD {
            drop(locks.acquire(&phone(&n.to_string())).await);
        }
        assert_eq!(tracked(&locks).await, PRUNE_THRESHOLD);

        drop(locks.acquire(&phone("99999")).await);
        assert_eq!(tracked(&locks).await, 2);
        drop(held);
    }
}
