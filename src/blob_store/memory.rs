use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::credentials::{random_hex, tokens_match};
use super::{BlobData, BlobStore, Clock, DEFAULT_TTL, PutReceipt, StoredBlob, SystemClock};
use crate::errors::{BlobStoreError, BlobStoreResult};

/// In-process blob store: one map behind one lock
///
/// The lock is only held for a single map operation. Encoding work happens
/// before `put` is called, never under the lock.
#[derive(Debug)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, StoredBlob>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MemoryBlobStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    fn ttl_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX)
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // a poisoned lock is still safe to use.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredBlob>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, data: Bytes, mime: &str, filename: &str) -> PutReceipt {
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.ttl_delta())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let token = random_hex();

        let mut entries = self.entries();

        // Redraw on a collision with a live id
        let id = loop {
            let id = random_hex();
            match entries.get(&id) {
                Some(existing) if !existing.is_expired_at(created_at) => continue,
                _ => break id,
            }
        };

        entries.insert(
            id.clone(),
            StoredBlob {
                token: token.clone(),
                data,
                mime: mime.to_string(),
                filename: filename.to_string(),
                created_at,
                expires_at,
            },
        );

        PutReceipt {
            id,
            token,
            expires_at,
        }
    }

    fn get(&self, id: &str, token: &str) -> BlobStoreResult<BlobData> {
        let now = self.clock.now();
        let entries = self.entries();

        let blob = entries
            .get(id)
            .filter(|blob| !blob.is_expired_at(now))
            .ok_or(BlobStoreError::NotFound)?;

        if !tokens_match(token, &blob.token) {
            return Err(BlobStoreError::Forbidden);
        }

        Ok(BlobData {
            data: blob.data.clone(),
            mime: blob.mime.clone(),
            filename: blob.filename.clone(),
        })
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();

        let before = entries.len();
        entries.retain(|_, blob| !blob.is_expired_at(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::ManualClock;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn store_with_clock() -> (MemoryBlobStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
        let store = MemoryBlobStore::with_clock(DEFAULT_TTL, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_put_then_get_returns_same_bytes() {
        let (store, _clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");

        assert_eq!(receipt.id.len(), 32);
        assert_eq!(receipt.token.len(), 32);
        assert_ne!(receipt.id, receipt.token);

        let blob = store.get(&receipt.id, &receipt.token).unwrap();
        assert_eq!(blob.data, Bytes::from_static(b"abc"));
        assert_eq!(blob.mime, "image/jpeg");
        assert_eq!(blob.filename, "x.jpg");

        // Retrieval is not destructive
        let again = store.get(&receipt.id, &receipt.token).unwrap();
        assert_eq!(again, blob);
    }

    #[test]
    fn test_expires_at_is_five_minutes_out() {
        let (store, clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");
        assert_eq!(receipt.expires_at, clock.now() + TimeDelta::minutes(5));
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        let (store, _clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");

        assert_eq!(store.get(&receipt.id, "wrong-token"), Err(BlobStoreError::Forbidden));
        assert_eq!(store.get(&receipt.id, ""), Err(BlobStoreError::Forbidden));

        let blob = store.get(&receipt.id, &receipt.token).unwrap();
        assert_eq!(&blob.data[..], b"abc");
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (store, _clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");

        assert_eq!(store.get("missing", &receipt.token), Err(BlobStoreError::NotFound));
    }

    #[test]
    fn test_expired_entry_is_not_found_before_sweep() {
        let (store, clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");

        clock.advance(TimeDelta::minutes(6));

        assert_eq!(store.get(&receipt.id, &receipt.token), Err(BlobStoreError::NotFound));
        // Still physically present until a sweep runs
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let (store, clock) = store_with_clock();
        let receipt = store.put(Bytes::from_static(b"abc"), "image/jpeg", "x.jpg");

        clock.advance(TimeDelta::minutes(5) - TimeDelta::milliseconds(1));
        assert!(store.get(&receipt.id, &receipt.token).is_ok());

        clock.advance(TimeDelta::milliseconds(1));
        assert_eq!(store.get(&receipt.id, &receipt.token), Err(BlobStoreError::NotFound));
        // An expired entry with the wrong token is still just gone
        assert_eq!(store.get(&receipt.id, "wrong"), Err(BlobStoreError::NotFound));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (store, clock) = store_with_clock();
        let old = store.put(Bytes::from_static(b"old"), "image/png", "old.png");

        clock.advance(TimeDelta::minutes(3));
        let fresh = store.put(Bytes::from_static(b"fresh"), "image/png", "fresh.png");

        clock.advance(TimeDelta::minutes(3));
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);

        assert_eq!(store.get(&old.id, &old.token), Err(BlobStoreError::NotFound));
        assert!(store.get(&fresh.id, &fresh.token).is_ok());

        // Nothing left to do
        assert_eq!(store.sweep(), 0);
    }

    #[test]
    fn test_concurrent_puts_get_distinct_ids() {
        let store = Arc::new(MemoryBlobStore::default());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|j| store.put(Bytes::from(format!("{i}-{j}")), "image/png", "x.png").id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 16 * 50);
        assert_eq!(store.len(), 16 * 50);
    }
}
