//! Route registry.
//!
//! Owns the current immutable route list as a replaceable `Arc` snapshot.
//! Readers clone the `Arc` and match against it lock-free; reloads build a
//! complete new list and swap the reference, so in-flight requests finish
//! against the list they started with.

use crate::error::Result;
use crate::loader::RouteSource;
use crate::route::MockRoute;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub struct RouteRegistry {
    source: Arc<dyn RouteSource>,
    /// Routes registered through code; these precede directory routes
    /// in the snapshot
    programmatic: RwLock<Vec<MockRoute>>,
    snapshot: RwLock<Arc<Vec<MockRoute>>>,
    reloads: AtomicU64,
}

impl RouteRegistry {
    /// Create a registry over a route source. The initial snapshot is
    /// empty until the first [`reload`](Self::reload).
    pub fn new(source: Arc<dyn RouteSource>) -> Self {
        Self {
            source,
            programmatic: RwLock::new(Vec::new()),
            snapshot: RwLock::new(Arc::new(Vec::new())),
            reloads: AtomicU64::new(0),
        }
    }

    /// Current snapshot; cheap to clone, safe to hold across awaits.
    pub async fn snapshot(&self) -> Arc<Vec<MockRoute>> {
        self.snapshot.read().await.clone()
    }

    /// Register a programmatic route (typically handler-backed) and
    /// publish a new snapshot including it.
    pub async fn register(&self, route: MockRoute) -> Result<()> {
        self.programmatic.write().await.push(route);
        self.rebuild(self.source.load()?).await;
        Ok(())
    }

    /// Re-load the source and swap in a fresh snapshot.
    ///
    /// Returns the number of routes in the new snapshot. Concurrent
    /// reloads may race; each publishes a self-consistent list and the
    /// last swap wins.
    pub async fn reload(&self) -> Result<usize> {
        let loaded = self.source.load()?;
        let count = self.rebuild(loaded).await;
        self.reloads.fetch_add(1, Ordering::Relaxed);
        debug!(routes = count, "Route snapshot swapped");
        Ok(count)
    }

    async fn rebuild(&self, loaded: Vec<MockRoute>) -> usize {
        let mut combined = self.programmatic.read().await.clone();
        combined.extend(loaded);
        let count = combined.len();
        *self.snapshot.write().await = Arc::new(combined);
        count
    }

    /// Number of completed reloads.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MockError;
    use crate::loader::StaticSource;
    use crate::route::RouteDef;

    struct FailingSource;

    impl RouteSource for FailingSource {
        fn load(&self) -> Result<Vec<MockRoute>> {
            Err(MockError::Load {
                path: "broken".into(),
                reason: "always fails".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_initial_snapshot_empty() {
        let registry = RouteRegistry::new(Arc::new(StaticSource::new(vec![])));
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_reload_publishes_routes() {
        let registry = RouteRegistry::new(Arc::new(StaticSource::new(vec![
            RouteDef::new("/api/a"),
            RouteDef::new("/api/b"),
        ])));
        assert_eq!(registry.reload().await.unwrap(), 2);
        assert_eq!(registry.snapshot().await.len(), 2);
        assert_eq!(registry.reload_count(), 1);
    }

    #[tokio::test]
    async fn test_old_snapshot_survives_reload() {
        let registry = RouteRegistry::new(Arc::new(StaticSource::new(vec![RouteDef::new(
            "/api/a",
        )])));
        registry.reload().await.unwrap();

        let before = registry.snapshot().await;
        registry.reload().await.unwrap();
        let after = registry.snapshot().await;

        // The earlier Arc still points at a complete, unchanged list
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].def().url, "/api/a");
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_programmatic_routes_precede_loaded() {
        let registry = RouteRegistry::new(Arc::new(StaticSource::new(vec![RouteDef::new(
            "/api/loaded",
        )])));
        registry
            .register(MockRoute::new(RouteDef::new("/api/code")).unwrap())
            .await
            .unwrap();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot[0].def().url, "/api/code");
        assert_eq!(snapshot[1].def().url, "/api/loaded");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let registry = RouteRegistry::new(Arc::new(FailingSource));
        assert!(registry.reload().await.is_err());
        assert!(registry.snapshot().await.is_empty());
        assert_eq!(registry.reload_count(), 0);
    }
}
