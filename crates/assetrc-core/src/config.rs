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

//! Shared-identity configuration for caches and facades.
//!
//! Two facades deduplicate assets between each other only if they were built from
//! equal [`CacheConfig`]s: the same content root and the same backing provider.
//! The configuration is opaque to the cache beyond that equality.

use crate::asset::normalize;
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Identifies the backing provider (the opaque loader capability) a cache draws from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a provider identity from any string label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The provider label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root path plus provider identity, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheConfig {
    root: String,
    provider: ProviderId,
}

/// On-disk shape of a [`CacheConfig`] before validation.
#[derive(Debug, Deserialize)]
struct CacheConfigFile {
    root: PathBuf,
    provider: String,
}

impl CacheConfig {
    /// Creates a configuration, normalizing the root the same way identities are
    /// normalized and dropping any trailing separator.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidArgument`] if the root is empty.
    pub fn new(root: impl AsRef<Path>, provider: ProviderId) -> CacheResult<Self> {
        let raw = root.as_ref().to_string_lossy();
        let mut root = normalize(raw.trim());
        while root.len() > 1 && root.ends_with('/') {
            root.pop();
        }

        if root.is_empty() {
            return Err(CacheError::InvalidArgument(
                "cache root must not be empty".to_string(),
            ));
        }

        Ok(Self { root, provider })
    }

    /// Parses a configuration from RON text.
    ///
    /// ```
    /// use assetrc_core::CacheConfig;
    ///
    /// let config = CacheConfig::from_ron_str(r#"(root: "Content", provider: "pak")"#).unwrap();
    /// assert_eq!(config.root(), "Content");
    /// ```
    pub fn from_ron_str(text: &str) -> CacheResult<Self> {
        let file: CacheConfigFile =
            ron::from_str(text).map_err(|e| CacheError::Config(e.to_string()))?;
        Self::new(file.root, ProviderId::new(file.provider))
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded cache configuration from {}", path.display());
        Self::from_ron_str(&text)
    }

    /// The normalized content root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The content root as a path.
    pub fn root_path(&self) -> &Path {
        Path::new(&self.root)
    }

    /// The backing provider.
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.root, self.provider)
    }
}
