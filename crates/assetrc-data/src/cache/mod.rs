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

//! The reference-counted asset store.
//!
//! Every identity moves through `Absent → Loading → Present(n ≥ 1) → Releasing →
//! Absent`. `Loading` and `Releasing` are transient: they exist while a load or
//! unload function runs outside the bookkeeping lock, so that slow I/O for one
//! identity never blocks another, while callers racing on the *same* identity wait
//! on the condition variable instead of constructing a second instance.
//!
//! Each `Absent → Present` transition stamps the entry with a fresh generation.
//! Owners that hold references across a possible `unload_all` (facades) give them
//! back with [`RefCountedCache::unload_generation`], which ignores a later
//! incarnation of the same identity.

use crate::handlers::{ErasedAsset, TypeHandlerRegistry};
use crate::metrics::CacheMetrics;
use assetrc_core::asset::{Asset, AssetHandle, AssetIdentity, AssetTypeTag};
use assetrc_core::{CacheConfig, CacheError, CacheResult};
use assetrc_telemetry::{MetricsRegistry, ScopedMetricTimer};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, ThreadId},
};

struct AssetEntry {
    type_tag: AssetTypeTag,
    asset: ErasedAsset,
    ref_count: usize,
    generation: u64,
}

enum Slot {
    /// A load function is constructing the asset on thread `owner`.
    Loading {
        type_tag: AssetTypeTag,
        owner: ThreadId,
    },
    Present(AssetEntry),
    /// The unload function is running on thread `owner`.
    Releasing { owner: ThreadId },
}

/// Thread-safe store mapping identities to shared assets and their refcounts.
///
/// - [`load`](Self::load) returns the cached instance and increments its refcount,
///   or constructs it through the registered load function (refcount 1).
/// - [`unload`](Self::unload) decrements; at zero the registered unload function
///   runs and the entry is evicted.
/// - [`unload_all`](Self::unload_all) evicts everything regardless of refcounts.
///   Dropping the cache does the same.
///
/// Individual operations are linearizable per identity. Sequences of operations
/// (check `ref_count`, then `unload`) are not atomic; callers needing that must
/// serialize externally.
pub struct RefCountedCache {
    config: CacheConfig,
    handlers: Arc<TypeHandlerRegistry>,
    entries: Mutex<HashMap<AssetIdentity, Slot>>,
    settled: Condvar,
    next_generation: AtomicU64,
    metrics: Option<CacheMetrics>,
}

impl RefCountedCache {
    /// Creates an empty cache dispatching through `handlers`.
    pub fn new(config: CacheConfig, handlers: Arc<TypeHandlerRegistry>) -> Self {
        log::debug!("Created asset cache for {config}");
        Self {
            config,
            handlers,
            entries: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
            next_generation: AtomicU64::new(1),
            metrics: None,
        }
    }

    /// Records this cache's activity into `registry`.
    ///
    /// If the metrics cannot be registered the cache keeps working without them.
    pub fn with_metrics(mut self, registry: &MetricsRegistry) -> Self {
        match CacheMetrics::register(registry, &self.config) {
            Ok(metrics) => self.metrics = Some(metrics),
            Err(e) => log::warn!("Asset cache {} runs without metrics: {e}", self.config),
        }
        self
    }

    /// The root/provider configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The handler registry this cache dispatches through.
    pub fn handlers(&self) -> &Arc<TypeHandlerRegistry> {
        &self.handlers
    }

    /// The metric handles, if metrics were enabled.
    pub fn metrics(&self) -> Option<&CacheMetrics> {
        self.metrics.as_ref()
    }

    /// Acquires one reference to the asset `name` as type `A`.
    ///
    /// If the identity is cached its refcount is incremented and the same instance is
    /// returned. If another thread is constructing it, this call waits for that load
    /// and then shares its result (or, if it failed, tries again itself). Otherwise
    /// the load function registered for `A` runs without the cache lock held; it may
    /// load other identities through this cache.
    ///
    /// # Errors
    /// - [`CacheError::InvalidArgument`] for an empty name.
    /// - [`CacheError::TypeMismatch`] if the identity is cached as another type.
    /// - [`CacheError::NoHandlerRegistered`] if `A` has no load function.
    /// - [`CacheError::RecursiveLoad`] if this thread is already constructing `name`.
    /// - [`CacheError::LoaderFailure`] (or the nested `CacheError`) if the load
    ///   function fails. The cache is left unchanged.
    pub fn load<A: Asset>(&self, name: &str) -> CacheResult<AssetHandle<A>> {
        self.load_with_generation(name).map(|(handle, _)| handle)
    }

    /// Like [`load`](Self::load), also returning the generation of the entry the
    /// reference was taken on. Pass it to
    /// [`unload_generation`](Self::unload_generation) to give the reference back.
    pub fn load_with_generation<A: Asset>(
        &self,
        name: &str,
    ) -> CacheResult<(AssetHandle<A>, u64)> {
        let identity = AssetIdentity::new(name)?;
        let requested = AssetTypeTag::of::<A>();
        let me = thread::current().id();

        let mut entries = self.lock_entries();
        loop {
            match entries.get_mut(&identity) {
                Some(Slot::Present(entry)) => {
                    if entry.type_tag != requested {
                        return Err(CacheError::type_mismatch(
                            identity.as_str(),
                            entry.type_tag,
                            requested,
                        ));
                    }
                    entry.ref_count += 1;
                    log::trace!("Cache hit for '{identity}' (refcount {})", entry.ref_count);
                    let (type_tag, asset) = (entry.type_tag, entry.asset.clone());
                    let generation = entry.generation;
                    drop(entries);

                    if let Some(metrics) = &self.metrics {
                        metrics.record_hit();
                    }
                    return downcast(&identity, type_tag, asset).map(|h| (h, generation));
                }
                Some(Slot::Loading { type_tag, owner }) => {
                    if *type_tag != requested {
                        return Err(CacheError::type_mismatch(
                            identity.as_str(),
                            *type_tag,
                            requested,
                        ));
                    }
                    if *owner == me {
                        return Err(CacheError::RecursiveLoad {
                            identity: identity.to_string(),
                        });
                    }
                    log::trace!("Waiting for in-flight load of '{identity}'");
                    entries = self.wait(entries);
                }
                Some(Slot::Releasing { owner }) => {
                    if *owner == me {
                        return Err(CacheError::RecursiveLoad {
                            identity: identity.to_string(),
                        });
                    }
                    log::trace!("Waiting for '{identity}' to finish releasing");
                    entries = self.wait(entries);
                }
                None => break,
            }
        }

        let loader = self
            .handlers
            .find_load_for(requested)
            .ok_or(CacheError::NoHandlerRegistered {
                type_name: requested.name(),
            })?;

        entries.insert(
            identity.clone(),
            Slot::Loading {
                type_tag: requested,
                owner: me,
            },
        );
        drop(entries);
        let slot = TransientSlot::new(self, identity);

        log::debug!("Loading '{}' as {requested}", slot.identity);
        let result = {
            let _timer = ScopedMetricTimer::maybe(self.metrics.as_ref().map(|m| &m.load_time));
            loader.invoke(self, &slot.identity)
        };

        match result {
            Ok(asset) => {
                let handle = downcast(&slot.identity, requested, asset.clone())?;
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                slot.fill(AssetEntry {
                    type_tag: requested,
                    asset,
                    ref_count: 1,
                    generation,
                });
                if let Some(metrics) = &self.metrics {
                    metrics.record_load();
                }
                Ok((handle, generation))
            }
            Err(e) => {
                let error = CacheError::from_loader(slot.identity.as_str(), e);
                log::debug!("Load of '{}' failed: {error}", slot.identity);
                Err(error)
            }
        }
    }

    /// Gives back one reference to `name`.
    ///
    /// Absent identities are ignored. When the refcount reaches zero the registered
    /// unload function (if any) runs, then the entry is evicted.
    ///
    /// # Errors
    /// - [`CacheError::InvalidArgument`] for an empty name.
    /// - [`CacheError::UnloaderFailure`] if the unload function failed. The entry has
    ///   been evicted anyway.
    pub fn unload(&self, name: &str) -> CacheResult<()> {
        self.unload_matching(name, None).map(|_| ())
    }

    /// Gives back one reference to `name` only if the present entry is still the
    /// one `generation` was handed out for by
    /// [`load_with_generation`](Self::load_with_generation).
    ///
    /// Returns `Ok(false)` without touching the cache if the identity is absent or
    /// has been evicted and loaded again since.
    ///
    /// # Errors
    /// Same as [`unload`](Self::unload).
    pub fn unload_generation(&self, name: &str, generation: u64) -> CacheResult<bool> {
        self.unload_matching(name, Some(generation))
    }

    fn unload_matching(&self, name: &str, generation: Option<u64>) -> CacheResult<bool> {
        let identity = AssetIdentity::new(name)?;

        let mut entries = self.lock_entries();
        let Some(slot) = entries.get_mut(&identity) else {
            log::trace!("Unload of absent '{identity}' ignored");
            return Ok(false);
        };

        match slot {
            Slot::Present(entry) if generation.is_some_and(|g| g != entry.generation) => {
                log::debug!(
                    "Unload of '{identity}' ignored: generation {} is gone (now {})",
                    generation.unwrap_or_default(),
                    entry.generation
                );
                return Ok(false);
            }
            Slot::Present(entry) if entry.ref_count > 1 => {
                entry.ref_count -= 1;
                log::trace!("Released '{identity}' (refcount {})", entry.ref_count);
                return Ok(true);
            }
            Slot::Present(_) => {}
            Slot::Loading { .. } | Slot::Releasing { .. } => {
                log::debug!("Unload of '{identity}' ignored while it is loading or releasing");
                return Ok(false);
            }
        }

        let releasing = Slot::Releasing {
            owner: thread::current().id(),
        };
        let Slot::Present(entry) = std::mem::replace(slot, releasing) else {
            return Ok(false);
        };
        drop(entries);

        self.release(TransientSlot::new(self, identity), entry)
            .map(|()| true)
    }

    /// Evicts every entry regardless of its refcount, running each unload function
    /// exactly once.
    ///
    /// Entries still being constructed are left to their loaders.
    ///
    /// # Errors
    /// Returns the first unload failure after every entry has been evicted.
    pub fn unload_all(&self) -> CacheResult<()> {
        let me = thread::current().id();
        let released: Vec<(AssetIdentity, AssetEntry)> = {
            let mut entries = self.lock_entries();
            let present: Vec<AssetIdentity> = entries
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Present(_)))
                .map(|(identity, _)| identity.clone())
                .collect();

            present
                .into_iter()
                .filter_map(|identity| {
                    match entries.insert(identity.clone(), Slot::Releasing { owner: me }) {
                        Some(Slot::Present(entry)) => Some((identity, entry)),
                        _ => None,
                    }
                })
                .collect()
        };

        if released.is_empty() {
            return Ok(());
        }
        log::info!("Unloading all {} assets from {}", released.len(), self.config);

        let pending: Vec<_> = released
            .into_iter()
            .map(|(identity, entry)| (TransientSlot::new(self, identity), entry))
            .collect();

        let mut first_error = None;
        for (slot, entry) in pending {
            if let Err(e) = self.release(slot, entry) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of present entries.
    pub fn count(&self) -> usize {
        self.lock_entries()
            .values()
            .filter(|slot| matches!(slot, Slot::Present(_)))
            .count()
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.ref_count(name).is_some()
    }

    /// The refcount of `name`, or `None` if it is not present.
    pub fn ref_count(&self, name: &str) -> Option<usize> {
        let identity = AssetIdentity::new(name).ok()?;
        match self.lock_entries().get(&identity) {
            Some(Slot::Present(entry)) => Some(entry.ref_count),
            _ => None,
        }
    }

    /// The generation of the present entry for `name`, or `None` if it is not present.
    pub fn generation(&self, name: &str) -> Option<u64> {
        let identity = AssetIdentity::new(name).ok()?;
        match self.lock_entries().get(&identity) {
            Some(Slot::Present(entry)) => Some(entry.generation),
            _ => None,
        }
    }

    /// Snapshot of the present identities.
    pub fn identities(&self) -> Vec<AssetIdentity> {
        self.lock_entries()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Present(_)))
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    /// Runs the unload function for a slot already marked `Releasing`, then evicts it.
    fn release(&self, slot: TransientSlot<'_>, entry: AssetEntry) -> CacheResult<()> {
        let outcome = match self.handlers.find_unload_for(entry.type_tag) {
            Some(unloader) => unloader
                .invoke(self, &entry.asset, &slot.identity)
                .map_err(|e| CacheError::from_unloader(slot.identity.as_str(), e)),
            None => Ok(()),
        };

        if let Err(e) = &outcome {
            log::warn!("Unload of '{}' failed, evicting anyway: {e}", slot.identity);
        } else {
            log::debug!("Evicted '{}'", slot.identity);
        }

        drop(slot);
        if let Some(metrics) = &self.metrics {
            metrics.record_release();
        }
        outcome
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<AssetIdentity, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        entries: MutexGuard<'a, HashMap<AssetIdentity, Slot>>,
    ) -> MutexGuard<'a, HashMap<AssetIdentity, Slot>> {
        self.settled
            .wait(entries)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefCountedCache {
    fn drop(&mut self) {
        if let Err(e) = self.unload_all() {
            log::error!("Error while tearing down asset cache {}: {e}", self.config);
        }
    }
}

impl fmt::Debug for RefCountedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCountedCache")
            .field("config", &self.config)
            .field("count", &self.count())
            .finish()
    }
}

/// Owns a `Loading` or `Releasing` slot.
///
/// Dropping it removes the slot and wakes waiters, so a load or unload function
/// that fails or panics never leaves its identity stuck. [`fill`](Self::fill)
/// instead turns a `Loading` slot into a present entry.
struct TransientSlot<'a> {
    cache: &'a RefCountedCache,
    identity: AssetIdentity,
    armed: bool,
}

impl<'a> TransientSlot<'a> {
    fn new(cache: &'a RefCountedCache, identity: AssetIdentity) -> Self {
        Self {
            cache,
            identity,
            armed: true,
        }
    }

    fn fill(mut self, entry: AssetEntry) {
        let mut entries = self.cache.lock_entries();
        entries.insert(self.identity.clone(), Slot::Present(entry));
        self.armed = false;
        drop(entries);
        self.cache.settled.notify_all();
    }
}

impl Drop for TransientSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut entries = self.cache.lock_entries();
        if matches!(
            entries.get(&self.identity),
            Some(Slot::Loading { .. } | Slot::Releasing { .. })
        ) {
            entries.remove(&self.identity);
        }
        drop(entries);
        self.cache.settled.notify_all();
    }
}

fn downcast<A: Asset>(
    identity: &AssetIdentity,
    stored: AssetTypeTag,
    asset: ErasedAsset,
) -> CacheResult<AssetHandle<A>> {
    asset
        .downcast::<A>()
        .map(AssetHandle::from_arc)
        .map_err(|_| CacheError::type_mismatch(identity.as_str(), stored, AssetTypeTag::of::<A>()))
}
