//! Usage store: per-(endpoint, human) usage counters, an optional nonce
//! replay guard, and the pending-discount map bridging the request hook and
//! the verify-failure hook.
//!
//! The in-memory reference implementation follows `x402-chain-eip155`'s
//! `PendingNonceManager` shape (`src/chain/eip155/pending_nonce_manager.rs`):
//! an `Arc<DashMap<K, Arc<Mutex<V>>>>`, cloning the per-key lock out of the
//! map before awaiting it so the map itself is never held across an await
//! point.

use agentkit_types::HumanId;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How long a pending-discount record may sit unconsumed before it's swept.
pub const PENDING_DISCOUNT_TTL: Duration = Duration::from_secs(300);

/// Errors a remote [`UsageStore`] implementation may raise. The in-memory
/// reference implementation never fails.
#[derive(Debug, thiserror::Error)]
pub enum UsageStoreError {
    #[error("usage store backend error: {0}")]
    Backend(String),
}

/// Key identifying a usage counter or pending-discount record: an endpoint
/// path paired with either a human identifier (usage counters, shared across
/// every wallet that resolves to the same human) or a wallet address
/// (pending-discount records, created before the human identifier is known
/// to the verify-failure hook).
pub type EndpointKey<T> = (String, T);

/// A record created by the request hook when it grants a discount-mode
/// request provisional access, and consumed at most once by the
/// verify-failure hook.
#[derive(Debug, Clone)]
pub struct PendingDiscount {
    pub human_id: HumanId,
    pub wallet_address: String,
    pub created_at: Instant,
}

/// Storage backend for usage counters, nonce replay tracking, and
/// pending-discount records.
///
/// Increments must be linearizable per key: two concurrent
/// read-then-increment calls for the same `(endpoint, human)` must never
/// both observe a count below the cap and both succeed, or a free-trial/
/// discount mode grants one more use than it should.
#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    /// Current usage count for `(endpoint_path, human_id)`. Never negative.
    async fn get_usage_count(&self, endpoint_path: &str, human_id: &HumanId) -> Result<u32, UsageStoreError>;

    /// Atomically increments the usage count for `(endpoint_path, human_id)`.
    async fn increment_usage(&self, endpoint_path: &str, human_id: &HumanId) -> Result<(), UsageStoreError>;

    /// Check-and-increment under one lock acquisition: increments and returns
    /// `true` only if the current count is below `cap`, otherwise leaves the
    /// count untouched and returns `false`. This is the primitive
    /// free-trial/discount exhaustion checks must use instead of a separate
    /// [`UsageStore::get_usage_count`]/[`UsageStore::increment_usage`] pair,
    /// which would let two concurrent requests both observe a count below
    /// the cap and both succeed.
    async fn try_increment_if_below(
        &self,
        endpoint_path: &str,
        human_id: &HumanId,
        cap: u32,
    ) -> Result<bool, UsageStoreError>;

    /// `true` if `nonce` has already been recorded. A store with no replay
    /// guard configured returns `false` unconditionally; callers treat that
    /// the same as "never used" since the nonce set is optional.
    async fn has_used_nonce(&self, _nonce: &str) -> Result<bool, UsageStoreError> {
        Ok(false)
    }

    /// Records `nonce` as used. A store with no replay guard is a no-op.
    async fn record_nonce(&self, _nonce: &str) -> Result<(), UsageStoreError> {
        Ok(())
    }

    /// Creates a pending-discount record keyed by `(endpoint_path,
    /// wallet_address)`, sweeping expired entries first.
    async fn put_pending_discount(
        &self,
        endpoint_path: &str,
        wallet_address: &str,
        record: PendingDiscount,
    ) -> Result<(), UsageStoreError>;

    /// Removes and returns the pending-discount record for
    /// `(endpoint_path, wallet_address)`, if any and not expired. Single-use:
    /// a second call for the same key returns `None`.
    async fn take_pending_discount(
        &self,
        endpoint_path: &str,
        wallet_address: &str,
    ) -> Result<Option<PendingDiscount>, UsageStoreError>;
}

/// Reference in-memory [`UsageStore`]. Nonces and pending-discount records
/// live for the process lifetime (nonces) or until swept (pending-discount
/// records); a remote-backed store would need equivalent atomicity but is
/// free to expire nonces after `maxAge`.
pub struct InMemoryUsageStore {
    counters: Arc<DashMap<EndpointKey<String>, Arc<Mutex<u32>>>>,
    nonces: Arc<DashMap<String, ()>>,
    pending_discounts: Arc<DashMap<EndpointKey<String>, PendingDiscount>>,
}

impl Default for InMemoryUsageStore {
    fn default() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            nonces: Arc::new(DashMap::new()),
            pending_discounts: Arc::new(DashMap::new()),
        }
    }
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_pending_discounts(&self) {
        self.pending_discounts
            .retain(|_, record| record.created_at.elapsed() < PENDING_DISCOUNT_TTL);
    }
}

#[async_trait::async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn get_usage_count(&self, endpoint_path: &str, human_id: &HumanId) -> Result<u32, UsageStoreError> {
        let key = (endpoint_path.to_string(), human_id.as_str().to_string());
        match self.counters.get(&key) {
            Some(counter) => Ok(*counter.value().lock().await),
            None => Ok(0),
        }
    }

    async fn increment_usage(&self, endpoint_path: &str, human_id: &HumanId) -> Result<(), UsageStoreError> {
        let key = (endpoint_path.to_string(), human_id.as_str().to_string());
        let counter = {
            let entry = self.counters.entry(key).or_insert_with(|| Arc::new(Mutex::new(0)));
            Arc::clone(entry.value())
        };
        let mut count = counter.lock().await;
        *count += 1;
        Ok(())
    }

    async fn try_increment_if_below(
        &self,
        endpoint_path: &str,
        human_id: &HumanId,
        cap: u32,
    ) -> Result<bool, UsageStoreError> {
        let key = (endpoint_path.to_string(), human_id.as_str().to_string());
        let counter = {
            let entry = self.counters.entry(key).or_insert_with(|| Arc::new(Mutex::new(0)));
            Arc::clone(entry.value())
        };
        let mut count = counter.lock().await;
        if *count < cap {
            *count += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn has_used_nonce(&self, nonce: &str) -> Result<bool, UsageStoreError> {
        Ok(self.nonces.contains_key(nonce))
    }

    async fn record_nonce(&self, nonce: &str) -> Result<(), UsageStoreError> {
        self.nonces.insert(nonce.to_string(), ());
        Ok(())
    }

    async fn put_pending_discount(
        &self,
        endpoint_path: &str,
        wallet_address: &str,
        record: PendingDiscount,
    ) -> Result<(), UsageStoreError> {
        self.sweep_pending_discounts();
        let key = (endpoint_path.to_string(), wallet_address.to_string());
        self.pending_discounts.insert(key, record);
        Ok(())
    }

    async fn take_pending_discount(
        &self,
        endpoint_path: &str,
        wallet_address: &str,
    ) -> Result<Option<PendingDiscount>, UsageStoreError> {
        let key = (endpoint_path.to_string(), wallet_address.to_string());
        match self.pending_discounts.remove(&key) {
            Some((_, record)) if record.created_at.elapsed() < PENDING_DISCOUNT_TTL => Ok(Some(record)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human(id: &str) -> HumanId {
        HumanId(id.to_string())
    }

    #[tokio::test]
    async fn increments_are_linearizable_under_concurrency() {
        let store = Arc::new(InMemoryUsageStore::new());
        let human_id = human("0x1");
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            let human_id = human_id.clone();
            handles.push(tokio::spawn(async move {
                store.increment_usage("/data", &human_id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_usage_count("/data", &human_id).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn try_increment_if_below_never_exceeds_cap_under_concurrency() {
        let store = Arc::new(InMemoryUsageStore::new());
        let human_id = human("0x1");
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            let human_id = human_id.clone();
            handles.push(tokio::spawn(async move {
                store.try_increment_if_below("/data", &human_id, 10).await.unwrap()
            }));
        }
        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        assert_eq!(store.get_usage_count("/data", &human_id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn usage_is_scoped_per_endpoint_and_human() {
        let store = InMemoryUsageStore::new();
        store.increment_usage("/a", &human("0x1")).await.unwrap();
        store.increment_usage("/a", &human("0x1")).await.unwrap();
        store.increment_usage("/b", &human("0x1")).await.unwrap();
        store.increment_usage("/a", &human("0x2")).await.unwrap();

        assert_eq!(store.get_usage_count("/a", &human("0x1")).await.unwrap(), 2);
        assert_eq!(store.get_usage_count("/b", &human("0x1")).await.unwrap(), 1);
        assert_eq!(store.get_usage_count("/a", &human("0x2")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nonce_replay_guard_reports_previously_recorded_nonces() {
        let store = InMemoryUsageStore::new();
        assert!(!store.has_used_nonce("deadbeef").await.unwrap());
        store.record_nonce("deadbeef").await.unwrap();
        assert!(store.has_used_nonce("deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn pending_discount_is_single_use() {
        let store = InMemoryUsageStore::new();
        let record = PendingDiscount {
            human_id: human("0x1"),
            wallet_address: "0xA".into(),
            created_at: Instant::now(),
        };
        store.put_pending_discount("/data", "0xA", record).await.unwrap();

        let taken = store.take_pending_discount("/data", "0xA").await.unwrap();
        assert!(taken.is_some());

        let taken_again = store.take_pending_discount("/data", "0xA").await.unwrap();
        assert!(taken_again.is_none());
    }

    #[tokio::test]
    async fn pending_discount_is_swept_once_stale() {
        let store = InMemoryUsageStore::new();
        let record = PendingDiscount {
            human_id: human("0x1"),
            wallet_address: "0xA".into(),
            created_at: Instant::now() - Duration::from_secs(301),
        };
        store.put_pending_discount("/data", "0xA", record).await.unwrap();

        let taken = store.take_pending_discount("/data", "0xA").await.unwrap();
        assert!(taken.is_none());
    }
}
