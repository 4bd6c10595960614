//! Index allocator - next unused account index, persisted per mnemonic fingerprint.
//!
//! `next_index` is read → check → persist(n + 1) → return n under one mutex. The counter
//! is re-read from the store on every call, so nothing in memory can run ahead of disk.

use crate::error::{VaultError, VaultResult};
use crate::slip10::HARDENED_OFFSET;
use crate::store::SecretStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Store key of the counter for `fingerprint`.
pub fn index_key(fingerprint: &str) -> String {
    format!("index-{fingerprint}.json")
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    fingerprint: String,
    next: u32,
    updated_at: String,
}

pub struct IndexAllocator {
    store: Arc<dyn SecretStore>,
    fingerprint: String,
    key: String,
    lock: Mutex<()>,
}

impl IndexAllocator {
    pub fn new(store: Arc<dyn SecretStore>, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        let key = index_key(&fingerprint);
        Self { store, fingerprint, key, lock: Mutex::new(()) }
    }

    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    /// Next index to be handed out, without consuming it.
    pub fn current(&self) -> VaultResult<u32> {
        let _guard = self.guard()?;
        self.read()
    }

    /// Hand out the current index and durably advance the counter.
    pub fn next_index(&self) -> VaultResult<u32> {
        let _guard = self.guard()?;

        let current = self.read()?;
        if current >= HARDENED_OFFSET {
            tracing::warn!(
                fingerprint = %self.fingerprint,
                current,
                "account index space exhausted"
            );
            return Err(VaultError::IndexExhausted(current));
        }

        self.write(current + 1)?;
        tracing::debug!(fingerprint = %self.fingerprint, index = current, "allocated index");
        Ok(current)
    }

    fn guard(&self) -> VaultResult<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| VaultError::Persistence("allocator lock".into()))
    }

    fn read(&self) -> VaultResult<u32> {
        let Some(raw) = self.store.load(&self.key)? else {
            return Ok(0);
        };
        let record: IndexRecord = serde_json::from_slice(&raw)
            .map_err(|e| VaultError::Persistence(format!("index record: {e}")))?;
        if record.fingerprint != self.fingerprint {
            return Err(VaultError::Persistence(format!(
                "index record belongs to {}, expected {}",
                record.fingerprint, self.fingerprint
            )));
        }
        Ok(record.next)
    }

    fn write(&self, next: u32) -> VaultResult<()> {
        let record = IndexRecord {
            fingerprint: self.fingerprint.clone(),
            next,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| VaultError::Persistence(format!("index json: {e}")))?;
        self.store.save(&self.key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    const FP: &str = "00112233aabbccdd";

    /// Wraps a store and fails writes while `fail` is set.
    struct FlakyStore {
        inner: MemoryStore,
        fail: AtomicBool,
    }

    impl SecretStore for FlakyStore {
        fn load(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
            self.inner.load(key)
        }

        fn save(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(VaultError::Persistence("disk full".into()));
            }
            self.inner.save(key, bytes)
        }
    }

    fn seed_counter(store: &dyn SecretStore, next: u32) {
        let record = serde_json::json!({
            "fingerprint": FP,
            "next": next,
            "updated_at": "2024-01-01T00:00:00Z",
        });
        store.save(&index_key(FP), record.to_string().as_bytes()).unwrap();
    }

    #[test]
    fn test_sequential_contiguous() {
        let allocator = IndexAllocator::new(Arc::new(MemoryStore::new()), FP);
        assert_eq!(allocator.current().unwrap(), 0);
        let got: Vec<u32> = (0..50).map(|_| allocator.next_index().unwrap()).collect();
        assert_eq!(got, (0..50).collect::<Vec<_>>());
        assert_eq!(allocator.current().unwrap(), 50);
    }

    #[test]
    fn test_concurrent_calls_never_share_an_index() {
        let allocator = Arc::new(IndexAllocator::new(Arc::new(MemoryStore::new()), FP));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                std::thread::spawn(move || {
                    (0..25).map(|_| allocator.next_index().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for index in handle.join().unwrap() {
                assert!(seen.insert(index), "index {index} handed out twice");
            }
        }
        assert_eq!(seen, (0..200).collect::<HashSet<_>>());
    }

    #[test]
    fn test_survives_new_instance() {
        let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        let first = IndexAllocator::new(store.clone(), FP);
        first.next_index().unwrap();
        first.next_index().unwrap();
        let second = IndexAllocator::new(store, FP);
        assert_eq!(second.next_index().unwrap(), 2);
    }

    #[test]
    fn test_failed_write_does_not_advance() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail: AtomicBool::new(false),
        });
        let allocator = IndexAllocator::new(store.clone(), FP);
        assert_eq!(allocator.next_index().unwrap(), 0);

        store.fail.store(true, Ordering::SeqCst);
        let err = allocator.next_index().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(allocator.current().unwrap(), 1);

        store.fail.store(false, Ordering::SeqCst);
        assert_eq!(allocator.next_index().unwrap(), 1);
    }

    #[test]
    fn test_exhaustion_is_an_error_not_a_wrap() {
        let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        seed_counter(store.as_ref(), HARDENED_OFFSET - 1);
        let allocator = IndexAllocator::new(store, FP);

        assert_eq!(allocator.next_index().unwrap(), HARDENED_OFFSET - 1);
        assert!(matches!(
            allocator.next_index(),
            Err(VaultError::IndexExhausted(n)) if n == HARDENED_OFFSET
        ));
        assert!(matches!(allocator.next_index(), Err(VaultError::IndexExhausted(_))));
        assert_eq!(allocator.current().unwrap(), HARDENED_OFFSET);
    }

    #[test]
    fn test_counter_scoped_by_fingerprint() {
        let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        let a = IndexAllocator::new(store.clone(), FP);
        let b = IndexAllocator::new(store, "ffeeddccbbaa9988");
        a.next_index().unwrap();
        a.next_index().unwrap();
        assert_eq!(b.next_index().unwrap(), 0);
    }

    #[test]
    fn test_foreign_record_rejected() {
        let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        let record =
            serde_json::json!({"fingerprint": "deadbeefdeadbeef", "next": 9, "updated_at": ""});
        store.save(&index_key(FP), record.to_string().as_bytes()).unwrap();
        let allocator = IndexAllocator::new(store, FP);
        assert!(matches!(allocator.next_index(), Err(VaultError::Persistence(_))));
    }
}
