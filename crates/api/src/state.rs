//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{self, Database, SqliteDatabase};
use crate::fertilizer::FertilizerService;
use crate::lookup::{LookupService, TypeCategoryCache};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// SQLite connection pool.
    pool: SqlitePool,

    /// Type -> category lookup cache.
    type_cache: Arc<TypeCategoryCache>,

    /// Fertilizer search service.
    fertilizers: Arc<FertilizerService>,

    /// Type, category and company lookups.
    lookups: Arc<LookupService>,
}

impl AppState {
    /// Connect to the database, apply migrations and wire the services.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;

        Ok(Self::from_pool(pool, config.type_cache_ttl))
    }

    /// Wire the services over an existing, migrated pool.
    pub fn from_pool(pool: SqlitePool, type_cache_ttl: Duration) -> Self {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::new(pool.clone()));
        let type_cache = TypeCategoryCache::new(db.clone(), type_cache_ttl);
        let fertilizers = FertilizerService::new(db.clone(), type_cache.clone());
        let lookups = LookupService::new(db);

        Self {
            inner: Arc::new(AppStateInner {
                pool,
                type_cache,
                fertilizers,
                lookups,
            }),
        }
    }

    /// Get the SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn type_cache(&self) -> &Arc<TypeCategoryCache> {
        &self.inner.type_cache
    }

    pub fn fertilizers(&self) -> &Arc<FertilizerService> {
        &self.inner.fertilizers
    }

    pub fn lookups(&self) -> &Arc<LookupService> {
        &self.inner.lookups
    }

    /// Check if the database is reachable.
    pub async fn database_healthy(&self) -> bool {
        db::check_health(&self.inner.pool).await
    }
}
