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

//! # assetrc Data
//!
//! The reference-counted asset store ([`RefCountedCache`]) and the type-keyed
//! registry of load/unload functions it dispatches through
//! ([`TypeHandlerRegistry`]).

#![warn(missing_docs)]

pub mod cache;
pub mod handlers;
pub mod metrics;

pub use cache::RefCountedCache;
pub use handlers::{
    AssetLoader, AssetUnloader, ErasedAsset, LoadHandler, TypeHandlerRegistry, UnloadHandler,
};
pub use metrics::CacheMetrics;
