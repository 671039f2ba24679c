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

//! # assetrc Core
//!
//! Foundational crate containing the traits, primitive types and error contracts
//! shared by every layer of the reference-counted asset cache.
//!
//! Nothing in here knows how assets are stored or decoded; it only defines the
//! "common language" (identities, type tags, handles, configuration, errors)
//! that the storage and facade crates speak.

#![warn(missing_docs)]

pub mod asset;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod utils;

pub use config::{CacheConfig, ProviderId};
pub use error::{CacheError, CacheResult};
pub use utils::timer::Stopwatch;
