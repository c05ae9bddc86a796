use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::window::RateLimitEntry;

/// Storage backend for per-client rate-limit counters.
///
/// Implementations must make [`update`](RateLimitStore::update) atomic per key:
/// no other update or sweep may observe or modify the entry for `key` while
/// `apply` runs. Distinct keys must not block each other for longer than the
/// update itself.
pub trait RateLimitStore: Send + Sync {
    /// Run `apply` against the entry for `key`. Setting the slot to `None`
    /// removes the entry.
    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut Option<RateLimitEntry>));

    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Overwrite the entry for `key`.
    fn insert(&self, key: &str, entry: RateLimitEntry);

    /// Remove every entry whose window ended before `now_ms`. Returns the number
    /// of entries removed.
    fn sweep(&self, now_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store. Counters live as long as the process and are not shared
/// between server instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn update(&self, key: &str, apply: &mut dyn FnMut(&mut Option<RateLimitEntry>)) {
        // The entry guard holds the shard write lock until the end of the match.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                apply(&mut slot);
                match slot {
                    Some(entry) => *occupied.get_mut() = entry,
                    None => {
                        occupied.remove();
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                apply(&mut slot);
                if let Some(entry) = slot {
                    vacant.insert(entry);
                }
            }
        }
    }

    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    fn insert(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_key, entry| entry.reset_time >= now_ms);
        let removed = before.saturating_sub(self.entries.len());

        tracing::debug!(
            removed,
            remaining = self.entries.len(),
            "rate limit store sweep complete"
        );

        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_inserts_into_vacant_slot() {
        let store = MemoryStore::new();
        store.update("a", &mut |slot| {
            assert!(slot.is_none());
            *slot = Some(RateLimitEntry { count: 1, reset_time: 10 });
        });

        assert_eq!(store.get("a"), Some(RateLimitEntry { count: 1, reset_time: 10 }));
    }

    #[test]
    fn update_modifies_and_removes() {
        let store = MemoryStore::new();
        store.insert("a", RateLimitEntry { count: 1, reset_time: 10 });

        store.update("a", &mut |slot| {
            if let Some(entry) = slot {
                entry.count += 1;
            }
        });
        assert_eq!(store.get("a").map(|e| e.count), Some(2));

        store.update("a", &mut |slot| *slot = None);
        assert!(store.get("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn untouched_vacant_slot_stays_absent() {
        let store = MemoryStore::new();
        store.update("ghost", &mut |_slot| {});
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let store = MemoryStore::new();
        store.insert("expired", RateLimitEntry { count: 5, reset_time: 999 });
        store.insert("boundary", RateLimitEntry { count: 5, reset_time: 1_000 });
        store.insert("live", RateLimitEntry { count: 5, reset_time: 5_000 });

        assert_eq!(store.sweep(1_000), 1);
        assert!(store.get("expired").is_none());
        assert!(store.get("boundary").is_some());
        assert!(store.get("live").is_some());
    }
}
