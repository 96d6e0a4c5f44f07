//! Pending-future cache keyed by operation name.
//!
//! The first caller for a key starts the operation; everyone who asks for the
//! same key while it is running gets a handle to the same future and the same
//! result. Triggers are coalesced, never queued.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::utils::error_handling::safe_lock;

pub type Flight<T> = Shared<BoxFuture<'static, T>>;

type Registry<T> = Arc<Mutex<HashMap<&'static str, (u64, Flight<T>)>>>;

pub struct SingleFlight<T: Clone> {
    inflight: Registry<T>,
    next_id: AtomicU64,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the running flight for `key`, or start one with `make`.
    ///
    /// `make` is only called when no flight is running. The returned future
    /// must be awaited (or spawned) for the operation to make progress.
    pub fn run<F, Fut>(&self, key: &'static str, make: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut map = safe_lock(&self.inflight, "SingleFlight");
        if let Some((_, flight)) = map.get(key) {
            log::debug!("[SingleFlight] Joining in-flight '{}'", key);
            return flight.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.inflight);
        let operation = make();
        let flight = async move {
            let output = operation.await;
            let mut map = safe_lock(&registry, "SingleFlight");
            if map.get(key).map(|(current, _)| *current) == Some(id) {
                map.remove(key);
            }
            output
        }
        .boxed()
        .shared();

        map.insert(key, (id, flight.clone()));
        flight
    }

    /// Detach the running flight for `key`. Holders of the old handle still
    /// get its result; the next `run` starts a fresh flight.
    pub fn forget(&self, key: &str) {
        if safe_lock(&self.inflight, "SingleFlight").remove(key).is_some() {
            log::debug!("[SingleFlight] Detached in-flight '{}'", key);
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        safe_lock(&self.inflight, "SingleFlight").contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flights: SingleFlight<u32> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                7
            }
        };

        let a = flights.run("fetch", make(Arc::clone(&calls)));
        let b = flights.run("fetch", make(Arc::clone(&calls)));
        assert!(flights.is_pending("fetch"));

        let (x, y) = tokio::join!(a, b);
        assert_eq!((x, y), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flights.is_pending("fetch"));
    }

    #[tokio::test]
    async fn finished_flight_allows_a_new_one() {
        let flights: SingleFlight<usize> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            flights
                .run("refresh", move || async move { calls.fetch_add(1, Ordering::SeqCst) })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forgotten_flight_does_not_evict_its_successor() {
        let flights: SingleFlight<&'static str> = SingleFlight::new();

        let old = flights.run("fetch", || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "old"
        });
        flights.forget("fetch");
        assert!(!flights.is_pending("fetch"));

        let new = flights.run("fetch", || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            "new"
        });
        assert_eq!(old.await, "old");
        assert!(flights.is_pending("fetch"));
        assert_eq!(new.await, "new");
        assert!(!flights.is_pending("fetch"));
    }

    #[tokio::test]
    async fn different_keys_run_independently() {
        let flights: SingleFlight<&'static str> = SingleFlight::new();
        let a = flights.run("a", || async { "a" });
        let b = flights.run("b", || async { "b" });
        assert_eq!(tokio::join!(a, b), ("a", "b"));
    }
}
