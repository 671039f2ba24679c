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

//! Acts as the facade layer over the reference-counted caches.
//!
//! The sharing contract is a documented precondition, not a runtime check: two
//! facades deduplicate assets only if they come from the same [`CacheGroup`] and
//! were built with equal root and provider. Any other combination silently yields
//! independent caches.

mod facade;
mod group;

pub use facade::SharedCacheFacade;
pub use group::CacheGroup;
