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

//! Canonical asset identities.
//!
//! Callers may spell the same asset several ways (`Fonts\Title`, `fonts/title`,
//! `fonts/extra/../title`). [`normalize`] folds separators and embedded parent
//! segments, and [`AssetIdentity`] compares the result case-insensitively, so all
//! of those collide to one cache key.

use crate::error::{CacheError, CacheResult};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// The separator every identity is rewritten to.
pub const CANONICAL_SEPARATOR: char = '/';

/// The separator callers may use instead of [`CANONICAL_SEPARATOR`].
pub const ALTERNATE_SEPARATOR: char = '\\';

const PARENT_MARKER: &str = "/../";

/// Canonicalizes an asset path.
///
/// Rewrites [`ALTERNATE_SEPARATOR`] to [`CANONICAL_SEPARATOR`], then collapses every
/// embedded `<dir>/../` pair, scanning left to right and stepping back to the previous
/// boundary after each removal so that cascades such as `a/b/../../c` resolve
/// completely. Leading parent markers (`../x`) are kept, as is a trailing `..`
/// that is not followed by a separator. The input is not validated.
///
/// ```
/// use assetrc_core::asset::normalize;
///
/// assert_eq!(normalize(r"a\b\..\c"), "a/c");
/// assert_eq!(normalize("a/b/../../c"), "c");
/// assert_eq!(normalize("../shared/font"), "../shared/font");
/// ```
pub fn normalize(path: &str) -> String {
    let mut path = path.replace(ALTERNATE_SEPARATOR, &CANONICAL_SEPARATOR.to_string());

    let mut from = 0;
    while let Some(offset) = path[from..].find(PARENT_MARKER) {
        let marker = from + offset;
        if marker == 0 {
            // Rooted `/../`: nothing precedes it to remove.
            from = 1;
            continue;
        }

        let segment_start = path[..marker]
            .rfind(CANONICAL_SEPARATOR)
            .map_or(0, |boundary| boundary + 1);

        if &path[segment_start..marker] == ".." {
            // `../../` stays as written.
            from = marker + 1;
            continue;
        }

        path.replace_range(segment_start..marker + PARENT_MARKER.len(), "");
        from = segment_start.saturating_sub(1);
    }

    path
}

/// A normalized, case-insensitive asset key.
///
/// Two identities are equal when their normalized spellings are equal ignoring
/// case; the first spelling seen is kept for display and for handing to load
/// functions.
#[derive(Clone)]
pub struct AssetIdentity {
    path: String,
    key: String,
}

impl AssetIdentity {
    /// Normalizes `name` into an identity.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidArgument`] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> CacheResult<Self> {
        if name.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "asset name must not be empty".to_string(),
            ));
        }

        let path = normalize(name);
        let key = path.to_lowercase();
        Ok(Self { path, key })
    }

    /// The normalized path, in the caller's original casing.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The comparison key (normalized and lowercased).
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for AssetIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AssetIdentity {}

impl Hash for AssetIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for AssetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for AssetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetIdentity({:?})", self.path)
    }
}

impl AsRef<str> for AssetIdentity {
    fn as_ref(&self) -> &str {
        &self.path
    }
}
