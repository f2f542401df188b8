//! Type -> category lookup cache.
//!
//! Holds a snapshot of every `m_category` row grouped by its parent type.
//! The snapshot is rebuilt wholesale once it is older than the TTL and
//! swapped in atomically; readers always see a complete map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use super::value_to_id;
use crate::db::Database;

/// Default snapshot lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

const REBUILD_SQL: &str =
    "SELECT master_id AS type_id, id AS category_id FROM m_category WHERE id IS NOT NULL";

#[derive(Debug, Default)]
struct Snapshot {
    categories: HashMap<String, Vec<String>>,
    /// `None` until the first successful rebuild.
    refreshed_at: Option<Instant>,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at
            .is_some_and(|refreshed_at| refreshed_at.elapsed() < ttl)
    }
}

/// Cache mapping fertilizer type ids to their category ids.
pub struct TypeCategoryCache {
    db: Arc<dyn Database>,
    ttl: Duration,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl TypeCategoryCache {
    /// Create an empty cache; the first lookup triggers a rebuild.
    pub fn new(db: Arc<dyn Database>, ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            db,
            ttl,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        })
    }

    /// Category ids belonging to `type_id`. Unknown types resolve to nothing.
    pub async fn resolve(&self, type_id: &str) -> Vec<String> {
        let mut snapshot = self.current();
        if !snapshot.is_fresh(self.ttl) {
            self.refresh().await;
            snapshot = self.current();
        }

        let categories = snapshot
            .categories
            .get(type_id)
            .cloned()
            .unwrap_or_default();

        tracing::debug!(type_id, count = categories.len(), "resolved type categories");
        categories
    }

    /// Rebuild the snapshot from the database.
    ///
    /// Returns whether the rebuild succeeded. On failure the previous
    /// snapshot stays in place and the error is only logged.
    pub async fn refresh(&self) -> bool {
        let rows = match self.db.all(REBUILD_SQL, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "failed to rebuild type category cache");
                return false;
            }
        };

        let mut categories: HashMap<String, Vec<String>> = HashMap::new();
        for row in &rows {
            let (Some(type_id), Some(category_id)) = (
                row.get("type_id").and_then(value_to_id),
                row.get("category_id").and_then(value_to_id),
            ) else {
                continue;
            };
            categories.entry(type_id).or_default().push(category_id);
        }

        let types = categories.len();
        *self.snapshot.write() = Arc::new(Snapshot {
            categories,
            refreshed_at: Some(Instant::now()),
        });

        tracing::info!(types, categories = rows.len(), "type category cache rebuilt");
        true
    }

    /// Populate the cache ahead of the first request.
    pub async fn prewarm(&self) {
        if !self.refresh().await {
            tracing::warn!("type category cache not prewarmed; will retry on first lookup");
        }
    }

    /// Mark the snapshot stale so the next lookup rebuilds it.
    pub fn invalidate(&self) {
        let mut guard = self.snapshot.write();
        let categories = guard.categories.clone();
        *guard = Arc::new(Snapshot {
            categories,
            refreshed_at: None,
        });
    }

    /// Number of types in the current snapshot.
    pub fn type_count(&self) -> usize {
        self.current().categories.len()
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }
}
