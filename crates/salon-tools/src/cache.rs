//! Stylist-context cache (§5, SPEC_FULL.md §11): a process-local, 10-minute
//! TTL cache of the active stylist roster per category. `list_stylists` and
//! the availability tools both hit the database constantly in a tight
//! booking conversation; DashMap lets concurrent readers proceed while one
//! task refreshes an expired entry instead of serializing everyone behind a
//! single mutex.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use salon_core::config::STYLIST_CACHE_TTL_SECS;
use salon_core::domain::{ServiceCategory, Stylist};
use sqlx::SqlitePool;

struct CacheEntry {
    stylists: Vec<Stylist>,
    fetched_at: Instant,
}

pub struct StylistCache {
    entries: DashMap<ServiceCategory, CacheEntry>,
    ttl: Duration,
}

impl Default for StylistCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StylistCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(STYLIST_CACHE_TTL_SECS),
        }
    }

    /// Active stylists for `category`, refreshing from the database when
    /// the cached entry is missing or stale.
    pub async fn get_or_refresh(
        &self,
        pool: &SqlitePool,
        category: ServiceCategory,
    ) -> salon_core::Result<Vec<Stylist>> {
        if let Some(entry) = self.entries.get(&category) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.stylists.clone());
            }
        }

        let stylists = salon_db::stylists::list_active_by_category(pool, category).await?;
        self.entries.insert(
            category,
            CacheEntry {
                stylists: stylists.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(stylists)
    }

    pub fn invalidate(&self, category: ServiceCategory) {
        self.entries.remove(&category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_keyed_per_category() {
        let cache = StylistCache::new();
        assert!(cache.entries.is_empty());
    }
}
