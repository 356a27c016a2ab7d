//! In-flight request registry.
//!
//! Maps a request signature to the shared pending result of the one network
//! call serving it. Entries are joinable for the dedup window after they are
//! registered and are released a short grace delay after the call settles.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use http::Method;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::gateway::transport::QueryParams;

/// Default dedup window in milliseconds.
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 1000;

/// Default delay between a call settling and its entry being removed.
pub const DEFAULT_RELEASE_GRACE_MS: u64 = 100;

/// Deterministic identity of a read: method, path and sorted query params.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature(String);

impl RequestSignature {
    pub fn new(method: &Method, path: &str, params: &QueryParams) -> Self {
        Self(format!("{}_{}_{}", method, path, params.canonical_json()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct PendingEntry<F> {
    id: u64,
    pending: F,
    created_at: Instant,
}

/// Outcome of [`InFlightRegistry::lookup_or_register`].
pub enum Lookup<F> {
    /// A live entry already existed; the caller joins it.
    Joined(F),
    /// The caller's pending value was registered under `id`.
    Registered { pending: F, id: u64 },
}

/// Time-bounded signature → pending-result map.
///
/// Cloning yields another handle to the same map.
pub struct InFlightRegistry<F> {
    window: Duration,
    grace: Duration,
    entries: Arc<Mutex<HashMap<RequestSignature, PendingEntry<F>>>>,
    next_id: Arc<AtomicU64>,
}

impl<F> Clone for InFlightRegistry<F> {
    fn clone(&self) -> Self {
        Self {
            window: self.window,
            grace: self.grace,
            entries: self.entries.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<F> Default for InFlightRegistry<F>
where
    F: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS),
            Duration::from_millis(DEFAULT_RELEASE_GRACE_MS),
        )
    }
}

impl<F> InFlightRegistry<F>
where
    F: Clone + Send + 'static,
{
    pub fn new(window: Duration, grace: Duration) -> Self {
        Self {
            window,
            grace,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    fn sweep(&self, entries: &mut HashMap<RequestSignature, PendingEntry<F>>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created_at) < self.window);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Evicted {} expired in-flight entries", evicted);
        }
    }

    /// Return the live entry for `signature`, evicting expired entries first.
    pub async fn lookup(&self, signature: &RequestSignature) -> Option<F> {
        let mut entries = self.entries.lock().await;
        self.sweep(&mut entries, Instant::now());
        entries.get(signature).map(|entry| entry.pending.clone())
    }

    /// Store `pending` under `signature`, replacing any previous entry.
    /// Returns the entry id to pass to [`release`](Self::release).
    pub async fn register(&self, signature: RequestSignature, pending: F) -> u64 {
        let mut entries = self.entries.lock().await;
        self.insert(&mut entries, signature, pending)
    }

    fn insert(
        &self,
        entries: &mut HashMap<RequestSignature, PendingEntry<F>>,
        signature: RequestSignature,
        pending: F,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            signature,
            PendingEntry {
                id,
                pending,
                created_at: Instant::now(),
            },
        );
        id
    }

    /// Join a live entry or register a new one, under a single lock so at
    /// most one entry per signature is ever live.
    ///
    /// `make` is only invoked on a miss.
    pub async fn lookup_or_register(
        &self,
        signature: RequestSignature,
        make: impl FnOnce() -> F,
    ) -> Lookup<F> {
        let mut entries = self.entries.lock().await;
        self.sweep(&mut entries, Instant::now());

        if let Some(entry) = entries.get(&signature) {
            return Lookup::Joined(entry.pending.clone());
        }

        let pending = make();
        let id = self.insert(&mut entries, signature, pending.clone());
        Lookup::Registered { pending, id }
    }

    /// Remove the entry registered as `id` after the grace delay.
    ///
    /// A newer entry under the same signature is left untouched.
    pub fn release(&self, signature: RequestSignature, id: u64) {
        let entries = self.entries.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut entries = entries.lock().await;
            if entries.get(&signature).is_some_and(|entry| entry.id == id) {
                entries.remove(&signature);
                debug!("Released in-flight entry {}", signature);
            }
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(path: &str) -> RequestSignature {
        RequestSignature::new(&Method::GET, path, &QueryParams::new())
    }

    fn registry() -> InFlightRegistry<&'static str> {
        InFlightRegistry::default()
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = QueryParams::new().with("status", "Pending").with("page", 1);
        let b = QueryParams::new().with("page", 1).with("status", "Pending");
        assert_eq!(
            RequestSignature::new(&Method::GET, "/approval/pending", &a),
            RequestSignature::new(&Method::GET, "/approval/pending", &b)
        );
    }

    #[test]
    fn test_signature_distinguishes_inputs() {
        let params = QueryParams::new().with("role", "Manager");
        let base = RequestSignature::new(&Method::GET, "/user/all", &params);

        assert_ne!(base, RequestSignature::new(&Method::POST, "/user/all", &params));
        assert_ne!(base, RequestSignature::new(&Method::GET, "/user", &params));
        assert_ne!(
            base,
            RequestSignature::new(&Method::GET, "/user/all", &QueryParams::new().with("role", "Agent"))
        );
        assert_eq!(base.as_str(), r#"GET_/user/all_{"role":"Manager"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_within_window() {
        let registry = registry();
        registry.register(sig("/fund"), "first").await;

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(registry.lookup(&sig("/fund")).await, Some("first"));
        assert_eq!(registry.lookup(&sig("/policy")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_sweeps_expired_entries() {
        let registry = registry();
        registry.register(sig("/fund"), "fund").await;
        registry.register(sig("/user/profile"), "profile").await;

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(registry.lookup(&sig("/policy")).await, None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_overwrites_stale_entry() {
        let registry = registry();
        registry.register(sig("/fund"), "old").await;
        tokio::time::advance(Duration::from_millis(1500)).await;

        match registry.lookup_or_register(sig("/fund"), || "new").await {
            Lookup::Registered { pending, .. } => assert_eq!(pending, "new"),
            Lookup::Joined(_) => panic!("stale entry must not be joined"),
        }
        assert_eq!(registry.lookup(&sig("/fund")).await, Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_or_register_joins_live_entry() {
        let registry = registry();
        let first = registry.lookup_or_register(sig("/fund"), || "a").await;
        assert!(matches!(first, Lookup::Registered { pending: "a", .. }));

        let mut called = false;
        let second = registry
            .lookup_or_register(sig("/fund"), || {
                called = true;
                "b"
            })
            .await;
        assert!(matches!(second, Lookup::Joined("a")));
        assert!(!called);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_waits_for_grace() {
        let registry = registry();
        let id = registry.register(sig("/fund"), "fund").await;

        registry.release(sig("/fund"), id);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.lookup(&sig("/fund")).await, Some("fund"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.lookup(&sig("/fund")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_spares_newer_entry() {
        let registry = registry();
        let old = registry.register(sig("/fund"), "old").await;
        registry.register(sig("/fund"), "new").await;

        registry.release(sig("/fund"), old);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(registry.lookup(&sig("/fund")).await, Some("new"));
    }
}
