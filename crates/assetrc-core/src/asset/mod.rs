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

//! Provides the foundational traits and primitive types for the asset cache.
//!
//! The key components are:
//! - The [`Asset`] trait: A marker for all types that can be cached.
//! - [`AssetIdentity`]: the normalized, case-insensitive key an asset is cached under.
//! - [`AssetTypeTag`]: the stable runtime descriptor of a concrete asset type, used
//!   to key the handler registry and to detect type mismatches.
//! - [`AssetHandle`]: the shared, read-only view of a cached asset handed to callers.

mod handle;
mod identity;
mod type_tag;

pub use handle::*;
pub use identity::*;
pub use type_tag::*;

/// A marker trait for types that can be managed by the asset cache.
///
/// The supertraits enforce critical safety guarantees:
/// - `Send` + `Sync`: The asset can be shared between every owner that loaded it,
///   on any thread.
/// - `'static`: The asset does not borrow anything, so the cache may keep it
///   for as long as any owner holds a reference.
///
/// # Examples
///
/// ```
/// use assetrc_core::asset::Asset;
///
/// struct Texture {
///     width: u32,
///     height: u32,
/// }
///
/// impl Asset for Texture {}
/// ```
pub trait Asset: Send + Sync + 'static {}
