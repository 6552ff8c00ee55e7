// Copyright 2024 Archetype ECS Contributors
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

//! Dense index assignment per component `TypeId`, used to turn type sets
//! into `BitSet`s for O(words) archetype matching.

use std::any::TypeId;

use rustc_hash::FxHashMap;

use crate::bitset::BitSet;

/// Assigns a dense `usize` index to every component type the first time it
/// is seen, and converts type-id sets to `BitSet`s against that indexing.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    indices: FxHashMap<TypeId, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the dense index for `type_id`, assigning a fresh one if this
    /// is the first time it has been referenced.
    pub fn index_of(&mut self, type_id: TypeId) -> usize {
        let next = self.indices.len();
        *self.indices.entry(type_id).or_insert(next)
    }

    /// Look up the dense index without assigning one.
    pub fn existing_index_of(&self, type_id: TypeId) -> Option<usize> {
        self.indices.get(&type_id).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Build a `BitSet` from an iterator of type ids, assigning dense
    /// indices for any type seen for the first time.
    pub fn bitset_of<'a>(&mut self, type_ids: impl IntoIterator<Item = &'a TypeId>) -> BitSet {
        let mut bits = BitSet::with_capacity(self.indices.len().max(64));
        for type_id in type_ids {
            bits.set(self.index_of(*type_id));
        }
        bits
    }

    /// Same as `bitset_of`, but never assigns new indices: types that have
    /// never been registered are skipped rather than aborting the whole
    /// set, since an unseen type trivially can't be present on any
    /// archetype's bitset either way (used for exclusion sets).
    pub fn existing_bitset_of<'a>(&self, type_ids: impl IntoIterator<Item = &'a TypeId>) -> BitSet {
        let mut bits = BitSet::with_capacity(self.indices.len().max(64));
        for type_id in type_ids {
            if let Some(idx) = self.existing_index_of(*type_id) {
                bits.set(idx);
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_assignment_is_stable() {
        let mut registry = TypeRegistry::new();
        let a = TypeId::of::<i32>();
        let b = TypeId::of::<f32>();
        let idx_a = registry.index_of(a);
        let idx_b = registry.index_of(b);
        assert_ne!(idx_a, idx_b);
        assert_eq!(registry.index_of(a), idx_a);
    }

    #[test]
    fn test_existing_bitset_of_missing_type() {
        let registry = TypeRegistry::new();
        assert!(registry
            .existing_bitset_of([TypeId::of::<i32>()].iter())
            .is_empty());
    }

    #[test]
    fn test_existing_bitset_of_skips_unregistered_but_keeps_registered_bits() {
        let mut registry = TypeRegistry::new();
        let a = TypeId::of::<i32>();
        let b = TypeId::of::<f32>();
        let unregistered = TypeId::of::<u8>();
        registry.index_of(a);
        let idx_b = registry.index_of(b);

        let bits = registry.existing_bitset_of([a, unregistered, b].iter());
        assert!(bits.contains(idx_b));
        assert!(!bits.is_empty());
    }
}
