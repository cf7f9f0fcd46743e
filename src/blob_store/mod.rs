//! Ephemeral, token-gated storage for compression results
//!
//! A finished encoding is published with [`BlobStore::put`], which returns a
//! random id and an independent random token. [`BlobStore::get`] hands the
//! bytes back only to callers presenting both, and only until the entry's
//! TTL runs out. Expired entries are treated as absent on read immediately;
//! the [`Janitor`] frees their memory on its next sweep.

pub mod clock;
pub mod credentials;
pub mod janitor;
pub mod memory;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::errors::BlobStoreResult;

pub use clock::{Clock, ManualClock, SystemClock};
pub use janitor::Janitor;
pub use memory::MemoryBlobStore;

/// Lifetime of a stored blob
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// How often the janitor sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// An entry as held by the store
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub token: String,
    pub data: Bytes,
    pub mime: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredBlob {
    /// Expired entries are gone as far as readers are concerned
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Credentials returned by a successful `put`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutReceipt {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// What a successful `get` hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobData {
    pub data: Bytes,
    pub mime: String,
    pub filename: String,
}

/// Keyed, expiring blob storage
pub trait BlobStore: Send + Sync {
    /// Store `data` under a fresh id and token. Never fails.
    fn put(&self, data: Bytes, mime: &str, filename: &str) -> PutReceipt;

    /// Fetch a live entry. Unknown or expired ids are `NotFound`, a wrong
    /// token for a live id is `Forbidden`. Reading does not consume the entry.
    fn get(&self, id: &str, token: &str) -> BlobStoreResult<BlobData>;

    /// Physically remove expired entries, returning how many were dropped
    fn sweep(&self) -> usize;

    /// Entries currently held, including expired ones not yet swept
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifetime given to new entries
    fn ttl(&self) -> Duration;
}
