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

//! Typed identities and storage for scene assets.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ASSET_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique, typed identity for an asset.
///
/// Ids are never reused, so a renderer cache keyed by an `AssetId` can never
/// confuse a disposed asset with a new one.
pub struct AssetId<T> {
    raw: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssetId<T> {
    /// Allocates a fresh id.
    pub fn generate() -> Self {
        Self {
            raw: NEXT_ASSET_ID.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }

    /// The raw numeric value, stable for the life of the process.
    pub const fn raw(self) -> u64 {
        self.raw
    }
}

impl<T> Clone for AssetId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AssetId<T> {}

impl<T> PartialEq for AssetId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for AssetId<T> {}

impl<T> PartialOrd for AssetId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for AssetId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for AssetId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for AssetId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.raw)
    }
}

/// An object stored in [`Assets`] that knows its own identity.
pub trait Asset: Sized {
    /// The asset's id.
    fn id(&self) -> AssetId<Self>;
}

/// Storage for all assets of one type, keyed by id.
#[derive(Debug)]
pub struct Assets<A: Asset> {
    storage: HashMap<AssetId<A>, A>,
}

impl<A: Asset> Default for Assets<A> {
    fn default() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }
}

impl<A: Asset> Assets<A> {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an asset and returns its id.
    pub fn insert(&mut self, asset: A) -> AssetId<A> {
        let id = asset.id();
        self.storage.insert(id, asset);
        id
    }

    /// Returns the asset with `id`.
    pub fn get(&self, id: AssetId<A>) -> Option<&A> {
        self.storage.get(&id)
    }

    /// Returns the asset with `id` mutably.
    pub fn get_mut(&mut self, id: AssetId<A>) -> Option<&mut A> {
        self.storage.get_mut(&id)
    }

    /// Removes and returns the asset with `id`.
    pub fn remove(&mut self, id: AssetId<A>) -> Option<A> {
        self.storage.remove(&id)
    }

    /// Iterates over every stored asset.
    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.storage.values()
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
