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

//! # assetrc Agents
//!
//! The public-facing layer of the asset cache. A [`CacheGroup`] hands out
//! [`SharedCacheFacade`]s; facades built from the same group and the same
//! [`CacheConfig`](assetrc_core::CacheConfig) share one underlying
//! [`RefCountedCache`](assetrc_data::RefCountedCache), so an asset loaded by one
//! level is recognized and ref-shared by another.

#![warn(missing_docs)]

pub mod shared_cache;

pub use shared_cache::{CacheGroup, SharedCacheFacade};
