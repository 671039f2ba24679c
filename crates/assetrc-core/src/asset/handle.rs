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

use super::Asset;
use std::{fmt, ops::Deref, sync::Arc};

/// A thread-safe, shared handle to a cached asset.
///
/// Every successful `load` returns one of these. Cloning a handle is cheap and does
/// NOT count as a new logical owner: ownership is tracked by the cache's refcount,
/// which only `load`/`unload` change. Callers must never try to dispose the asset
/// themselves; the cache runs the registered unload function when the last owner
/// releases it.
pub struct AssetHandle<T: Asset>(Arc<T>);

impl<T: Asset> AssetHandle<T> {
    /// Creates a new `AssetHandle` that takes ownership of the asset data.
    pub fn new(asset: T) -> Self {
        Self(Arc::new(asset))
    }

    /// Wraps an already shared asset.
    pub fn from_arc(asset: Arc<T>) -> Self {
        Self(asset)
    }

    /// Returns `true` if both handles point at the same cached instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<T: Asset> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Asset> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Asset + fmt::Debug> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetHandle").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Glyphs(u32);
    impl Asset for Glyphs {}

    #[test]
    fn test_clones_share_the_instance() {
        let handle = AssetHandle::new(Glyphs(7));
        let clone = handle.clone();
        assert!(AssetHandle::ptr_eq(&handle, &clone));
        assert_eq!((*clone).0, 7);
    }

    #[test]
    fn test_distinct_handles_are_not_equal() {
        let a = AssetHandle::new(Glyphs(1));
        let b = AssetHandle::new(Glyphs(1));
        assert!(!AssetHandle::ptr_eq(&a, &b));
    }
}
