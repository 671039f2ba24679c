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

//! Defines the error hierarchy shared by the cache, the handler registry and the
//! facades.

use crate::asset::AssetTypeTag;
use thiserror::Error;

/// A specialized `Result` type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// An error raised by a cache, registry or facade operation.
///
/// Bookkeeping errors are reported synchronously and never retried. Errors raised
/// by caller-supplied load/unload functions are carried as the `source` of
/// [`CacheError::LoaderFailure`] / [`CacheError::UnloaderFailure`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A load was requested for a type with no registered load function.
    #[error("no load handler registered for asset type '{type_name}'")]
    NoHandlerRegistered {
        /// The requested asset type.
        type_name: &'static str,
    },

    /// The identity is already cached (or being constructed) as a different type.
    #[error("asset '{identity}' is cached as '{cached}' but was requested as '{requested}'")]
    TypeMismatch {
        /// The identity that was requested.
        identity: String,
        /// The type the identity is stored under.
        cached: &'static str,
        /// The type the caller asked for.
        requested: &'static str,
    },

    /// A load or unload function re-entered an identity that the same thread is
    /// currently constructing or releasing.
    #[error("asset '{identity}' was requested while this thread is still loading or releasing it")]
    RecursiveLoad {
        /// The identity that was re-entered.
        identity: String,
    },

    /// The registered load function failed. The cache was left unchanged.
    #[error("failed to load asset '{identity}'")]
    LoaderFailure {
        /// The identity being loaded.
        identity: String,
        /// The error returned by the load function.
        #[source]
        source: anyhow::Error,
    },

    /// The registered unload function failed. The entry was evicted regardless.
    #[error("failed to unload asset '{identity}'")]
    UnloaderFailure {
        /// The identity being released.
        identity: String,
        /// The error returned by the unload function.
        #[source]
        source: anyhow::Error,
    },

    /// A cache configuration could not be read or was invalid.
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Builds a [`CacheError::TypeMismatch`] from the two tags involved.
    pub fn type_mismatch(
        identity: impl Into<String>,
        cached: AssetTypeTag,
        requested: AssetTypeTag,
    ) -> Self {
        Self::TypeMismatch {
            identity: identity.into(),
            cached: cached.name(),
            requested: requested.name(),
        }
    }

    /// Wraps an error returned by a load function.
    ///
    /// If the load function itself failed with a `CacheError` (typically a nested
    /// sub-asset load), that error is returned unchanged.
    pub fn from_loader(identity: impl Into<String>, error: anyhow::Error) -> Self {
        match error.downcast::<CacheError>() {
            Ok(inner) => inner,
            Err(source) => Self::LoaderFailure {
                identity: identity.into(),
                source,
            },
        }
    }

    /// Wraps an error returned by an unload function, passing nested
    /// `CacheError`s through unchanged.
    pub fn from_unloader(identity: impl Into<String>, error: anyhow::Error) -> Self {
        match error.downcast::<CacheError>() {
            Ok(inner) => inner,
            Err(source) => Self::UnloaderFailure {
                identity: identity.into(),
                source,
            },
        }
    }
}
