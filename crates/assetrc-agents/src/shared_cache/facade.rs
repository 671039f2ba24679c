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

use assetrc_core::asset::{Asset, AssetHandle, AssetIdentity};
use assetrc_core::{CacheConfig, CacheResult};
use assetrc_data::RefCountedCache;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// References a facade holds on one incarnation of an identity.
#[derive(Debug, Clone, Copy)]
struct Held {
    generation: u64,
    count: usize,
}

/// A load/unload surface over a cache that may be shared with other facades.
///
/// `load`, `unload` and `unload_all` delegate straight to the shared cache. On top of
/// that the facade keeps a tally of the references it acquired, so that
/// [`release`](Self::release) (and dropping the facade) gives back exactly those and
/// never another facade's.
///
/// The tally remembers which generation of each entry its references were taken
/// on. If the entry has been evicted in the meantime (by `unload_all`, or by an
/// `unload` through another owner) and loaded again, the stale references are
/// skipped instead of released from the new entry.
pub struct SharedCacheFacade {
    cache: Arc<RefCountedCache>,
    owned: Mutex<HashMap<AssetIdentity, Held>>,
}

impl SharedCacheFacade {
    pub(crate) fn new(cache: Arc<RefCountedCache>) -> Self {
        Self {
            cache,
            owned: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires one reference to `name` as type `A`. See [`RefCountedCache::load`].
    pub fn load<A: Asset>(&self, name: &str) -> CacheResult<AssetHandle<A>> {
        let (handle, generation) = self.cache.load_with_generation::<A>(name)?;
        let identity = AssetIdentity::new(name)?;

        let mut owned = self.lock_owned();
        match owned.get_mut(&identity) {
            Some(held) if held.generation == generation => held.count += 1,
            Some(held) => {
                log::debug!(
                    "'{identity}' was reloaded since this facade took it; dropping the stale tally"
                );
                *held = Held {
                    generation,
                    count: 1,
                };
            }
            None => {
                owned.insert(
                    identity,
                    Held {
                        generation,
                        count: 1,
                    },
                );
            }
        }
        Ok(handle)
    }

    /// Gives back one reference to `name`. See [`RefCountedCache::unload`].
    ///
    /// A reference from this facade's tally is only given back to the entry it was
    /// taken on. Names this facade never loaded are forwarded to the cache as a plain
    /// unload; that reference then belongs to whichever owner loaded it.
    pub fn unload(&self, name: &str) -> CacheResult<()> {
        let identity = AssetIdentity::new(name)?;
        let generation = {
            let mut owned = self.lock_owned();
            match owned.get_mut(&identity) {
                Some(held) => {
                    let generation = held.generation;
                    if held.count > 1 {
                        held.count -= 1;
                    } else {
                        owned.remove(&identity);
                    }
                    Some(generation)
                }
                None => None,
            }
        };

        match generation {
            Some(generation) => self.cache.unload_generation(name, generation).map(|_| ()),
            None => {
                log::debug!("Unloading '{identity}', which this facade did not load");
                self.cache.unload(name)
            }
        }
    }

    /// Evicts every entry of the shared cache, including those other facades hold.
    ///
    /// Other facades' tallies then refer to evicted generations, and their later
    /// releases of those references are skipped.
    pub fn unload_all(&self) -> CacheResult<()> {
        self.lock_owned().clear();
        self.cache.unload_all()
    }

    /// Gives back every reference this facade acquired and has not unloaded.
    ///
    /// # Errors
    /// Returns the first unload failure; every reference is given back regardless.
    pub fn release(&self) -> CacheResult<()> {
        let owned = std::mem::take(&mut *self.lock_owned());
        if owned.is_empty() {
            return Ok(());
        }
        log::info!(
            "Releasing {} asset(s) held by a facade over {}",
            owned.len(),
            self.cache.config()
        );

        let mut first_error = None;
        for (identity, held) in owned {
            for _ in 0..held.count {
                match self.cache.unload_generation(identity.as_str(), held.generation) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::debug!("Skipping stale references to '{identity}'");
                        break;
                    }
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Snapshot of the identities this facade holds and how many references each.
    pub fn owned(&self) -> Vec<(AssetIdentity, usize)> {
        self.lock_owned()
            .iter()
            .map(|(identity, held)| (identity.clone(), held.count))
            .collect()
    }

    /// Returns `true` if both facades deduplicate through the same cache.
    pub fn shares_cache_with(&self, other: &SharedCacheFacade) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }

    /// The underlying shared cache.
    pub fn cache(&self) -> &RefCountedCache {
        &self.cache
    }

    /// The configuration of the underlying cache.
    pub fn config(&self) -> &CacheConfig {
        self.cache.config()
    }

    fn lock_owned(&self) -> MutexGuard<'_, HashMap<AssetIdentity, Held>> {
        self.owned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SharedCacheFacade {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("Error while releasing facade over {}: {e}", self.cache.config());
        }
    }
}

impl fmt::Debug for SharedCacheFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCacheFacade")
            .field("config", self.cache.config())
            .field("owned", &self.lock_owned().len())
            .finish()
    }
}
