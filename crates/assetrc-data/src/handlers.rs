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

//! A registry of load/unload functions keyed by asset type.
//!
//! The cache never knows how to decode anything. For every asset type it asks this
//! registry for a [`LoadHandler`] (turn an identity into an instance) and, when the
//! last owner lets go, an optional [`UnloadHandler`] (cascade-release whatever the
//! load function pulled in). Typed loaders are wrapped into type-erased handlers at
//! registration time, so lookups are a single map access by [`AssetTypeTag`].

use crate::cache::RefCountedCache;
use anyhow::{anyhow, Result};
use assetrc_core::asset::{Asset, AssetIdentity, AssetTypeTag};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::{Arc, PoisonError, RwLock},
};

/// A cached asset with its concrete type erased.
pub type ErasedAsset = Arc<dyn Any + Send + Sync>;

/// Produces an asset of type `A` for an identity.
///
/// Implementations may perform I/O and may call back into `cache` to load the
/// sub-assets they depend on. Those sub-assets should be released again by the
/// matching [`AssetUnloader`].
///
/// Any `Fn(&RefCountedCache, &AssetIdentity) -> anyhow::Result<A>` closure is a loader.
pub trait AssetLoader<A: Asset>: Send + Sync + 'static {
    /// Builds the asset.
    fn load(&self, cache: &RefCountedCache, identity: &AssetIdentity) -> Result<A>;
}

impl<A, F> AssetLoader<A> for F
where
    A: Asset,
    F: Fn(&RefCountedCache, &AssetIdentity) -> Result<A> + Send + Sync + 'static,
{
    fn load(&self, cache: &RefCountedCache, identity: &AssetIdentity) -> Result<A> {
        self(cache, identity)
    }
}

/// Releases what a loader acquired, called once when an entry's refcount hits zero.
pub trait AssetUnloader<A: Asset>: Send + Sync + 'static {
    /// Cleans up after `asset`.
    fn unload(&self, cache: &RefCountedCache, asset: &A, identity: &AssetIdentity) -> Result<()>;
}

impl<A, F> AssetUnloader<A> for F
where
    A: Asset,
    F: Fn(&RefCountedCache, &A, &AssetIdentity) -> Result<()> + Send + Sync + 'static,
{
    fn unload(&self, cache: &RefCountedCache, asset: &A, identity: &AssetIdentity) -> Result<()> {
        self(cache, asset, identity)
    }
}

/// Internal trait for loading any asset type.
trait AnyLoader: Send + Sync {
    fn load_any(&self, cache: &RefCountedCache, identity: &AssetIdentity) -> Result<ErasedAsset>;
}

/// Internal trait for unloading any asset type.
trait AnyUnloader: Send + Sync {
    fn unload_any(
        &self,
        cache: &RefCountedCache,
        asset: &ErasedAsset,
        identity: &AssetIdentity,
    ) -> Result<()>;
}

/// Adapts a typed [`AssetLoader`] to [`AnyLoader`].
struct LoaderWrapper<A, L>(L, PhantomData<fn() -> A>);

impl<A: Asset, L: AssetLoader<A>> AnyLoader for LoaderWrapper<A, L> {
    fn load_any(&self, cache: &RefCountedCache, identity: &AssetIdentity) -> Result<ErasedAsset> {
        let asset: A = self.0.load(cache, identity)?;
        Ok(Arc::new(asset))
    }
}

/// Adapts a typed [`AssetUnloader`] to [`AnyUnloader`].
struct UnloaderWrapper<A, U>(U, PhantomData<fn() -> A>);

impl<A: Asset, U: AssetUnloader<A>> AnyUnloader for UnloaderWrapper<A, U> {
    fn unload_any(
        &self,
        cache: &RefCountedCache,
        asset: &ErasedAsset,
        identity: &AssetIdentity,
    ) -> Result<()> {
        let asset = asset.downcast_ref::<A>().ok_or_else(|| {
            anyhow!(
                "unloader for '{}' was handed a different asset type",
                std::any::type_name::<A>()
            )
        })?;
        self.0.unload(cache, asset, identity)
    }
}

/// A registered, type-erased load function.
///
/// Cloning is cheap; two clones of the same registration are [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct LoadHandler {
    type_tag: AssetTypeTag,
    inner: Arc<dyn AnyLoader>,
}

impl LoadHandler {
    /// The asset type this handler produces.
    pub fn type_tag(&self) -> AssetTypeTag {
        self.type_tag
    }

    /// Runs the load function.
    pub fn invoke(&self, cache: &RefCountedCache, identity: &AssetIdentity) -> Result<ErasedAsset> {
        self.inner.load_any(cache, identity)
    }

    /// Returns `true` if both values come from the same registration.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LoadHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadHandler({})", self.type_tag)
    }
}

/// A registered, type-erased unload function.
#[derive(Clone)]
pub struct UnloadHandler {
    type_tag: AssetTypeTag,
    inner: Arc<dyn AnyUnloader>,
}

impl UnloadHandler {
    /// The asset type this handler releases.
    pub fn type_tag(&self) -> AssetTypeTag {
        self.type_tag
    }

    /// Runs the unload function.
    pub fn invoke(
        &self,
        cache: &RefCountedCache,
        asset: &ErasedAsset,
        identity: &AssetIdentity,
    ) -> Result<()> {
        self.inner.unload_any(cache, asset, identity)
    }

    /// Returns `true` if both values come from the same registration.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for UnloadHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnloadHandler({})", self.type_tag)
    }
}

/// Maps asset types to their load and unload functions.
///
/// Construct one at startup, wrap it in an `Arc` and hand it to every cache that
/// should share the same behavior. Load and unload registrations are independent of
/// each other; registering either again for the same type replaces the previous one.
///
/// All methods take `&self` and may be called from any thread. A `find` racing a
/// `register` on the same type observes either the old or the new handler, never a
/// partial one.
#[derive(Default)]
pub struct TypeHandlerRegistry {
    loaders: RwLock<HashMap<AssetTypeTag, LoadHandler>>,
    unloaders: RwLock<HashMap<AssetTypeTag, UnloadHandler>>,
}

impl TypeHandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the load function for `A`, returning the stored handler.
    pub fn register_load<A: Asset>(&self, loader: impl AssetLoader<A>) -> LoadHandler {
        let handler = LoadHandler {
            type_tag: AssetTypeTag::of::<A>(),
            inner: Arc::new(LoaderWrapper(loader, PhantomData)),
        };

        let previous = self
            .loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handler.type_tag, handler.clone());

        if previous.is_some() {
            log::debug!("Replaced load handler for '{}'", handler.type_tag);
        } else {
            log::debug!("Registered load handler for '{}'", handler.type_tag);
        }
        handler
    }

    /// Registers (or replaces) the unload function for `A`, returning the stored handler.
    pub fn register_unload<A: Asset>(&self, unloader: impl AssetUnloader<A>) -> UnloadHandler {
        let handler = UnloadHandler {
            type_tag: AssetTypeTag::of::<A>(),
            inner: Arc::new(UnloaderWrapper(unloader, PhantomData)),
        };

        let previous = self
            .unloaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handler.type_tag, handler.clone());

        if previous.is_some() {
            log::debug!("Replaced unload handler for '{}'", handler.type_tag);
        } else {
            log::debug!("Registered unload handler for '{}'", handler.type_tag);
        }
        handler
    }

    /// The load function registered for `A`, if any.
    pub fn find_load<A: Asset>(&self) -> Option<LoadHandler> {
        self.find_load_for(AssetTypeTag::of::<A>())
    }

    /// The load function registered for `type_tag`, if any.
    pub fn find_load_for(&self, type_tag: AssetTypeTag) -> Option<LoadHandler> {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_tag)
            .cloned()
    }

    /// The unload function registered for `A`, if any.
    pub fn find_unload<A: Asset>(&self) -> Option<UnloadHandler> {
        self.find_unload_for(AssetTypeTag::of::<A>())
    }

    /// The unload function registered for `type_tag`, if any.
    pub fn find_unload_for(&self, type_tag: AssetTypeTag) -> Option<UnloadHandler> {
        self.unloaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_tag)
            .cloned()
    }

    /// Removes the load function for `A`. Returns whether one was registered.
    pub fn clear_load<A: Asset>(&self) -> bool {
        self.loaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&AssetTypeTag::of::<A>())
            .is_some()
    }

    /// Removes the unload function for `A`. Returns whether one was registered.
    pub fn clear_unload<A: Asset>(&self) -> bool {
        self.unloaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&AssetTypeTag::of::<A>())
            .is_some()
    }
}

impl fmt::Debug for TypeHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaders = self.loaders.read().unwrap_or_else(PoisonError::into_inner).len();
        let unloaders = self
            .unloaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("TypeHandlerRegistry")
            .field("loaders", &loaders)
            .field("unloaders", &unloaders)
            .finish()
    }
}
