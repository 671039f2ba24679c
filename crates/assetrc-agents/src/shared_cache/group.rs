// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::SharedCacheFacade;
use assetrc_core::CacheConfig;
use assetrc_data::{RefCountedCache, TypeHandlerRegistry};
use assetrc_telemetry::MetricsRegistry;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};

/// The long-lived owner of the handler registry and of the caches its facades share.
///
/// Construct one at startup and hand out facades from it. The group holds its caches
/// weakly: a cache lives as long as at least one facade over it does, and is torn
/// down (running `unload_all`) when the last one drops.
pub struct CacheGroup {
    handlers: Arc<TypeHandlerRegistry>,
    metrics: Option<MetricsRegistry>,
    caches: Mutex<HashMap<CacheConfig, Weak<RefCountedCache>>>,
}

impl CacheGroup {
    /// Creates a group dispatching every cache through `handlers`.
    pub fn new(handlers: Arc<TypeHandlerRegistry>) -> Self {
        Self {
            handlers,
            metrics: None,
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// Caches created by this group record their activity into `registry`.
    pub fn with_metrics(mut self, registry: MetricsRegistry) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// The handler registry shared by every cache of this group.
    pub fn handlers(&self) -> &Arc<TypeHandlerRegistry> {
        &self.handlers
    }

    /// Returns a facade over the cache for `config`, creating the cache if no live
    /// facade uses it yet.
    ///
    /// Facades with equal configs share one cache. A config that differs in root or
    /// provider gets an independent cache; this is not reported as an error.
    pub fn facade(&self, config: CacheConfig) -> SharedCacheFacade {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.retain(|_, cache| cache.strong_count() > 0);

        if let Some(cache) = caches.get(&config).and_then(Weak::upgrade) {
            log::trace!("Joining shared cache {config}");
            return SharedCacheFacade::new(cache);
        }

        if caches.is_empty() {
            log::debug!("Creating cache {config}");
        } else {
            log::debug!(
                "Creating cache {config}, independent of {} other live cache(s)",
                caches.len()
            );
        }

        let mut cache = RefCountedCache::new(config.clone(), self.handlers.clone());
        if let Some(registry) = &self.metrics {
            cache = cache.with_metrics(registry);
        }
        let cache = Arc::new(cache);
        caches.insert(config, Arc::downgrade(&cache));
        SharedCacheFacade::new(cache)
    }

    /// Number of caches that still have at least one facade.
    pub fn live_caches(&self) -> usize {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cache| cache.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheGroup")
            .field("handlers", &self.handlers)
            .field("live_caches", &self.live_caches())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assetrc_core::asset::{Asset, AssetIdentity};
    use assetrc_core::ProviderId;
    use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

    #[derive(Debug)]
    struct Mesh;
    impl Asset for Mesh {}

    fn group_with_counter() -> (CacheGroup, Arc<AtomicUsize>) {
        let handlers = Arc::new(TypeHandlerRegistry::new());
        handlers.register_load(
            |_cache: &RefCountedCache, _identity: &AssetIdentity| -> Result<Mesh> { Ok(Mesh) },
        );
        let unloads = Arc::new(AtomicUsize::new(0));
        let counter = unloads.clone();
        handlers.register_unload(
            move |_cache: &RefCountedCache, _mesh: &Mesh, _identity: &AssetIdentity| -> Result<()> {
                counter.fetch_add(1, SeqCst);
                Ok(())
            },
        );
        (CacheGroup::new(handlers), unloads)
    }

    fn config(root: &str, provider: &str) -> CacheConfig {
        CacheConfig::new(root, ProviderId::new(provider)).unwrap()
    }

    #[test]
    fn test_equal_configs_share_a_cache() {
        let (group, _) = group_with_counter();
        let a = group.facade(config("Content", "pak"));
        let b = group.facade(config(r"Content\", "pak"));

        assert!(a.shares_cache_with(&b));
        assert_eq!(group.live_caches(), 1);
    }

    #[test]
    fn test_mismatched_configs_are_silently_independent() {
        let (group, _) = group_with_counter();
        let a = group.facade(config("Content", "pak"));
        let b = group.facade(config("Content", "loose"));
        let c = group.facade(config("Mods", "pak"));

        assert!(!a.shares_cache_with(&b));
        assert!(!a.shares_cache_with(&c));
        assert_eq!(group.live_caches(), 3);

        a.load::<Mesh>("crate").unwrap();
        assert!(!b.cache().contains("crate"));
    }

    #[test]
    fn test_separate_groups_do_not_share() {
        let (first, _) = group_with_counter();
        let (second, _) = group_with_counter();
        let a = first.facade(config("Content", "pak"));
        let b = second.facade(config("Content", "pak"));
        assert!(!a.shares_cache_with(&b));
    }

    #[test]
    fn test_cache_is_torn_down_with_its_last_facade() {
        let (group, unloads) = group_with_counter();
        let a = group.facade(config("Content", "pak"));
        let b = group.facade(config("Content", "pak"));

        a.load::<Mesh>("crate").unwrap();
        b.cache().load::<Mesh>("barrel").unwrap();

        drop(a);
        assert_eq!(group.live_caches(), 1);
        assert!(b.cache().contains("barrel"));

        drop(b);
        assert_eq!(group.live_caches(), 0);
        assert_eq!(unloads.load(SeqCst), 2);

        let fresh = group.facade(config("Content", "pak"));
        assert_eq!(fresh.cache().count(), 0);
    }

    #[test]
    fn test_group_metrics_are_attached_to_new_caches() {
        let (group, _) = group_with_counter();
        let registry = MetricsRegistry::new();
        let group = group.with_metrics(registry.clone());

        let facade = group.facade(config("Content", "pak"));
        facade.load::<Mesh>("crate").unwrap();

        let metrics = facade.cache().metrics().unwrap();
        assert_eq!(metrics.loaded_total.get().unwrap(), 1);
        assert!(registry.metric_count() > 0);
    }

    #[test]
    fn test_recreated_cache_keeps_accumulating_metrics() {
        let (group, _) = group_with_counter();
        let registry = MetricsRegistry::new();
        let group = group.with_metrics(registry.clone());

        let facade = group.facade(config("Content", "pak"));
        facade.load::<Mesh>("crate").unwrap();
        facade.load::<Mesh>("barrel").unwrap();
        drop(facade);
        assert_eq!(group.live_caches(), 0);

        let facade = group.facade(config("Content", "pak"));
        let metrics = facade.cache().metrics().unwrap();
        assert_eq!(metrics.loaded_total.get().unwrap(), 2);
        assert_eq!(metrics.released_total.get().unwrap(), 2);
        assert_eq!(metrics.live_entries.get().unwrap(), 0.0);

        facade.load::<Mesh>("crate").unwrap();
        assert_eq!(metrics.loaded_total.get().unwrap(), 3);
        assert_eq!(metrics.live_entries.get().unwrap(), 1.0);
    }

    #[test]
    fn test_groups_sharing_a_registry_aggregate_metrics() {
        let registry = MetricsRegistry::new();
        let (first, _) = group_with_counter();
        let (second, _) = group_with_counter();
        let first = first.with_metrics(registry.clone());
        let second = second.with_metrics(registry.clone());

        let a = first.facade(config("Content", "pak"));
        a.load::<Mesh>("crate").unwrap();
        let b = second.facade(config("Content", "pak"));
        b.load::<Mesh>("crate").unwrap();

        let metrics = a.cache().metrics().unwrap();
        assert_eq!(metrics.loaded_total.get().unwrap(), 2);
        assert_eq!(metrics.live_entries.get().unwrap(), 2.0);

        drop(b);
        assert_eq!(metrics.live_entries.get().unwrap(), 1.0);
        assert_eq!(metrics.loaded_total.get().unwrap(), 2);
        assert_eq!(registry.get_namespace_metrics("assets").len(), 5);
    }
}
