//! Shared Low-Latency Store Abstraction
//!
//! Atomic TTL-based key-value primitives backing the security state that is
//! shared across concurrent requests and service instances (failure counters,
//! lock entries, refresh-token records, one-time-code claims).
//!
//! Every mutation is a single atomic call; plain read-then-write sequences
//! are not part of this interface. Backends map their transport failures to
//! [`StoreError::Unavailable`], which callers must treat as fail-closed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Store access errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backend unreachable or timed out; callers fail closed
    #[error("shared store unavailable: {0}")]
    Unavailable(String),

    /// Backend returned data this layer cannot interpret
    #[error("shared store returned malformed data for key {key}")]
    Corrupt { key: String },
}

/// Shorthand for `Result<T, StoreError>`
pub type StoreResult<T> = Result<T, StoreError>;

/// Atomic TTL key-value store
///
/// The compare-and-* operations are the concurrency seams: threshold
/// detection rides on `incr_with_ttl`, exactly-once locking and one-time-code
/// claims on `set_if_absent`, refresh rotation on `compare_and_swap`, and
/// single-use token consumption on `compare_and_delete`.
#[trait_variant::make(TtlStore: Send)]
pub trait LocalTtlStore {
    /// Atomically increment a counter, setting `ttl` only when the key is
    /// created by this call. Returns the post-increment value.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64>;

    /// Set a value with a TTL, overwriting any existing entry
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Set a value with a TTL only if the key is absent.
    /// Returns `true` when this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Get the current value, `None` if absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete an entry (idempotent)
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Delete the entry only if its value equals `expected`.
    /// Returns `true` when this call deleted the entry.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool>;

    /// Replace the entry (with a fresh TTL) only if its value equals
    /// `expected`. Returns `true` when the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> StoreResult<bool>;
}

// ============================================================================
// In-memory implementation (tests / single-process development)
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process [`TtlStore`] backed by a mutex-guarded map
///
/// All operations run under one lock, giving the same atomicity the
/// production backend provides per command. Expiry is lazy: entries are
/// dropped when touched after their deadline.
#[derive(Default)]
pub struct MemoryTtlStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTtlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of an entry, for tests and diagnostics
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        entries
            .get(key)
            .and_then(|e| e.expires_at.checked_duration_since(Instant::now()))
    }

    fn with_live_entry<T>(
        map: &mut HashMap<String, Entry>,
        key: &str,
        f: impl FnOnce(Option<&Entry>) -> T,
    ) -> T {
        let expired = map
            .get(key)
            .is_some_and(|e| e.expires_at <= Instant::now());
        if expired {
            map.remove(key);
        }
        f(map.get(key))
    }
}

impl TtlStore for MemoryTtlStore {
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let current = Self::with_live_entry(&mut entries, key, |e| {
            e.map(|e| e.value.parse::<i64>()).transpose()
        })
        .map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
        })?;

        match current {
            Some(n) => {
                let next = n + 1;
                // Preserve the original window: TTL is set only on creation
                let entry = entries.get_mut(key).expect("live entry vanished");
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let absent = Self::with_live_entry(&mut entries, key, |e| e.is_none());
        if absent {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        Ok(absent)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        Ok(Self::with_live_entry(&mut entries, key, |e| {
            e.map(|e| e.value.clone())
        }))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let matches = Self::with_live_entry(&mut entries, key, |e| {
            e.is_some_and(|e| e.value == expected)
        });
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let matches = Self::with_live_entry(&mut entries, key, |e| {
            e.is_some_and(|e| e.value == expected)
        });
        if matches {
            entries.insert(
                key.to_string(),
                Entry {
                    value: new.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        Ok(matches)
    }
}
