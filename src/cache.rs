//! TTL cache mapping repository names to their upstream locations.
//!
//! One `LocationCache` holds one *generation*: a complete mapping built by a
//! single refresh cycle. The refresh service assembles the next generation in
//! a private instance and publishes it with [`LocationCache::swap`], a single
//! pointer store, so readers always observe one whole snapshot and never a
//! mix of two.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

struct CacheEntry {
    location: String,
    inserted_at: Instant,
}

pub struct LocationCache {
    items: ArcSwap<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LocationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: ArcSwap::from_pointee(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached location for `name` if the entry is younger than the
    /// TTL.
    ///
    /// An entry observed past its TTL is removed on the spot, so later lookups
    /// are plain misses rather than depending on which caller saw it expire.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let items = self.items.load();
        let location = match items.get(name) {
            Some(entry) if !self.expired(entry.value()) => Some(entry.location.clone()),
            Some(_) => None,
            None => return None,
        };
        if location.is_none() {
            // Re-check expiry inside the removal: a concurrent add() may have
            // refreshed the entry since the read above.
            items.remove_if(name, |_, entry| self.expired(entry));
            debug!(repo = name, "dropped expired cache entry");
        }
        location
    }

    /// Insert or overwrite the entry for `name`; either way the expiry clock
    /// for that key restarts now.
    pub fn add(&self, name: &str, location: &str) {
        self.items.load().insert(
            name.to_owned(),
            CacheEntry {
                location: location.to_owned(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Publish `other`'s dataset as the live one.
    ///
    /// A single pointer store: concurrent readers see the old map or the new
    /// map in full. Entries the old generation held are discarded with it.
    pub fn swap(&self, other: &LocationCache) {
        let fresh = other.items.load_full();
        info!(
            old_len = self.items.load().len(),
            new_len = fresh.len(),
            "cache generations swapped"
        );
        self.items.store(fresh);
    }

    pub fn len(&self) -> usize {
        self.items.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const TTL: Duration = Duration::from_secs(60);

    fn cache() -> LocationCache {
        LocationCache::new(TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_misses_on_an_empty_cache() {
        assert!(cache().lookup("something").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn add_then_lookup_returns_the_location() {
        let cache = cache();
        cache.add("repo-name", "cached-location");
        assert_eq!(cache.lookup("repo-name").as_deref(), Some("cached-location"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_the_ttl_and_stay_gone() {
        let cache = cache();
        cache.add("repo-name", "cached-location");
        advance(TTL + Duration::from_secs(1)).await;

        assert!(cache.lookup("repo-name").is_none());
        // The expired entry is purged outright, not merely hidden.
        assert!(cache.is_empty());
        assert!(cache.lookup("repo-name").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_at_exactly_the_ttl_still_serve() {
        let cache = cache();
        cache.add("repo-name", "cached-location");
        advance(TTL).await;
        assert_eq!(cache.lookup("repo-name").as_deref(), Some("cached-location"));
    }

    #[tokio::test(start_paused = true)]
    async fn re_adding_resets_the_expiry_clock() {
        let cache = cache();
        cache.add("repo-name", "old-location");
        advance(TTL - Duration::from_secs(1)).await;

        cache.add("repo-name", "new-location");
        // Past the original deadline, but within the new one.
        advance(Duration::from_secs(2)).await;

        assert_eq!(cache.lookup("repo-name").as_deref(), Some("new-location"));
    }

    #[tokio::test(start_paused = true)]
    async fn swap_replaces_the_whole_dataset() {
        let cache = cache();
        cache.add("before-repo-name", "cached-location");

        let fresh = LocationCache::new(TTL);
        fresh.add("new-repo-name", "new-cached-location");
        cache.swap(&fresh);

        assert!(cache.lookup("before-repo-name").is_none());
        assert_eq!(
            cache.lookup("new-repo-name").as_deref(),
            Some("new-cached-location")
        );
    }
}
