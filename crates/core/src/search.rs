//! Search-as-you-type coordination.
//!
//! Three rules govern autocomplete lookups:
//!
//! - a fixed debounce delay before any lookup is issued; re-triggering
//!   within the window supersedes the pending query, which never runs
//! - last-write-wins by issuance order: a result arriving for a superseded
//!   query is discarded, so a slow early response cannot overwrite a fresh
//!   one
//! - a liveness flag checked before applying results; after teardown no
//!   result is applied (the in-flight future is not truly cancelled)

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::records::Patient;
use crate::store::DataStore;
use crate::StoreResult;

/// Default debounce window for text inputs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coordinates debounced, generation-stamped lookups for one input.
///
/// One coordinator per search box; share it behind an `Arc` between the
/// producer (keystrokes) and whatever applies results.
#[derive(Debug)]
pub struct SearchCoordinator {
    delay: Duration,
    generation: AtomicU64,
    alive: AtomicBool,
}

impl SearchCoordinator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
            alive: AtomicBool::new(true),
        }
    }

    /// Marks the coordinator torn down. In-flight lookups complete but
    /// their results are dropped.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Runs one debounced lookup.
    ///
    /// Returns `Some(output)` only when this call is still the newest at
    /// both checkpoints: after the debounce sleep (otherwise the lookup is
    /// never issued) and after the lookup resolves (otherwise the stale
    /// result is discarded). Returns `None` in every superseded or
    /// torn-down case.
    pub async fn run<F, Fut, T>(&self, lookup: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != issued || !self.is_alive() {
            return None;
        }

        let output = lookup().await;

        if self.generation.load(Ordering::SeqCst) != issued || !self.is_alive() {
            return None;
        }
        Some(output)
    }
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Debounced patient search.
///
/// An empty or whitespace query clears the suggestion list immediately and
/// never issues a lookup. `Ok(None)` means the query was superseded or the
/// coordinator torn down; `Err` carries a backend failure from a lookup
/// that did run and was still current.
pub async fn patient_search<S: DataStore>(
    coordinator: &SearchCoordinator,
    store: &S,
    query: &str,
) -> StoreResult<Option<Vec<Patient>>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Some(Vec::new()));
    }

    match coordinator.run(|| store.search_patients(query)).await {
        Some(result) => result.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewPatient};
    use std::sync::Arc;

    fn quick() -> SearchCoordinator {
        SearchCoordinator::new(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_single_query_runs_after_the_delay() {
        let coordinator = quick();
        let out = coordinator.run(|| async { 7 }).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_superseded_query_never_issues_its_lookup() {
        let coordinator = Arc::new(quick());
        let issued = Arc::new(AtomicU64::new(0));

        let first = {
            let coordinator = coordinator.clone();
            let issued = issued.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| {
                        issued.fetch_add(1, Ordering::SeqCst);
                        async { "first" }
                    })
                    .await
            })
        };

        // Re-trigger within the debounce window.
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = coordinator.run(|| async { "second" }).await;

        assert_eq!(second, Some("second"));
        assert_eq!(
            first.await.expect("task should not panic"),
            None,
            "superseded query must be dropped"
        );
        assert_eq!(
            issued.load(Ordering::SeqCst),
            0,
            "superseded lookup must never be issued"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_result_is_discarded_after_the_lookup() {
        let coordinator = Arc::new(quick());

        // A slow lookup that survives the debounce, then gets superseded
        // while it is still running.
        let slow = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run(|| async {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        "slow"
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        let fresh = coordinator.run(|| async { "fresh" }).await;

        assert_eq!(fresh, Some("fresh"));
        assert_eq!(
            slow.await.expect("task should not panic"),
            None,
            "issuance order wins, not completion order"
        );
    }

    #[tokio::test]
    async fn test_no_result_applies_after_shutdown() {
        let coordinator = quick();
        let fut = coordinator.run(|| async { 1 });
        coordinator.shutdown();
        assert_eq!(fut.await, None);
    }

    #[tokio::test]
    async fn test_empty_query_clears_without_lookup() {
        let coordinator = quick();
        let store = MemoryStore::new();
        let out = patient_search(&coordinator, &store, "   ")
            .await
            .expect("search should succeed");
        assert_eq!(out, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_patient_search_matches_name_then_document() {
        let coordinator = quick();
        let store = MemoryStore::new();
        store
            .create_patient(NewPatient {
                profile_id: None,
                name: "Carla Mendez".into(),
                document: "55667788".into(),
                phone: None,
                birth_date: None,
            })
            .await
            .expect("create patient should succeed");

        let by_name = patient_search(&coordinator, &store, "carla")
            .await
            .expect("search should succeed")
            .expect("query should be current");
        assert_eq!(by_name.len(), 1);

        let by_document = patient_search(&coordinator, &store, "5566")
            .await
            .expect("search should succeed")
            .expect("query should be current");
        assert_eq!(by_document.len(), 1);
    }
}
