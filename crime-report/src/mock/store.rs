//! In-memory content store and gateway.

use async_trait::async_trait;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::storage::{ContentGateway, ContentStore, PinKind, StorageError};
use crate::types::ContentHash;

/// Gateway base used for devnet URLs.
pub const MOCK_GATEWAY_URL: &str = "https://gateway.devnet.local";

/// Content-addressed store for tests and the devnet.
///
/// Hashes are CIDv1 (raw codec, sha2-256), so pinning the same bytes twice
/// yields the same hash.
pub struct MockStore {
    base_url: String,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing_pins: AtomicU32,
    pin_attempts: AtomicU32,
    fetches: Mutex<Vec<ContentHash>>,
    unreachable: Mutex<HashSet<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            base_url: MOCK_GATEWAY_URL.to_string(),
            blobs: Mutex::new(HashMap::new()),
            failing_pins: AtomicU32::new(0),
            pin_attempts: AtomicU32::new(0),
            fetches: Mutex::new(Vec::new()),
            unreachable: Mutex::new(HashSet::new()),
        }
    }

    /// Fail the next `n` pin attempts.
    pub fn failing_next(self, n: u32) -> Self {
        self.fail_next_pins(n);
        self
    }

    pub fn fail_next_pins(&self, n: u32) {
        self.failing_pins.store(n, Ordering::SeqCst);
    }

    /// Make `hash` unfetchable while keeping it pinned.
    pub fn fail_fetch(&self, hash: &ContentHash) {
        lock(&self.unreachable).insert(hash.as_str().to_string());
    }

    /// Number of pin calls, failed ones included.
    pub fn pin_attempts(&self) -> u32 {
        self.pin_attempts.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs held.
    pub fn pinned_count(&self) -> usize {
        lock(&self.blobs).len()
    }

    /// Every hash fetched so far, in order.
    pub fn fetch_log(&self) -> Vec<ContentHash> {
        lock(&self.fetches).clone()
    }

    pub fn fetch_count(&self) -> usize {
        lock(&self.fetches).len()
    }

    /// Bytes stored under `hash`, bypassing the fetch log.
    pub fn get(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        lock(&self.blobs).get(hash.as_str()).cloned()
    }

    /// Content hash `pin` would return for `data`.
    pub fn hash_of(data: &[u8]) -> ContentHash {
        let digest = Code::Sha2_256.digest(data);
        ContentHash::new(Cid::new_v1(0x55, digest).to_string())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ContentStore for MockStore {
    async fn pin(&self, data: &[u8], _kind: PinKind) -> Result<ContentHash, StorageError> {
        self.pin_attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_pins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Unavailable("injected pin failure".to_string()));
        }

        let hash = Self::hash_of(data);
        lock(&self.blobs).insert(hash.as_str().to_string(), data.to_vec());
        Ok(hash)
    }
}

#[async_trait]
impl ContentGateway for MockStore {
    fn url(&self, hash: &ContentHash) -> String {
        format!("{}/ipfs/{}", self.base_url, hash)
    }

    async fn fetch(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        lock(&self.fetches).push(hash.clone());

        if lock(&self.unreachable).contains(hash.as_str()) {
            return Err(StorageError::Unavailable(format!("{} unreachable", hash)));
        }
        lock(&self.blobs)
            .get(hash.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hash.to_string()))
    }
}
