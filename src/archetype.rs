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

//! Archetype storage: one set of component stores per distinct component
//! type set, laid out as structure-of-arrays down to the individual field.

use std::any::TypeId;

use rustc_hash::FxHashMap;

use crate::bitset::BitSet;
use crate::column::{ComponentStore, FieldPrimitive};
use crate::component::Component;
use crate::entity::EntityId;

/// Sorted set of component type ids identifying an archetype.
pub type ArchetypeSignature = Vec<TypeId>;

/// Structure-of-arrays storage for every entity sharing one component-type
/// set. Each component type owns a [`ComponentStore`], itself decomposed
/// into one column per declared primitive field.
pub struct Archetype {
    signature: ArchetypeSignature,
    bits: BitSet,
    entities: Vec<EntityId>,
    stores: Vec<ComponentStore>,
    store_indices: FxHashMap<TypeId, usize>,
}

impl Archetype {
    pub fn new(signature: ArchetypeSignature, bits: BitSet) -> Self {
        Self {
            signature,
            bits,
            entities: Vec::new(),
            stores: Vec::new(),
            store_indices: FxHashMap::default(),
        }
    }

    pub fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    pub fn bits(&self) -> &BitSet {
        &self.bits
    }

    pub fn component_types(&self) -> &[TypeId] {
        &self.signature
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.store_indices.contains_key(&type_id)
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Append `entity` as a new row. Callers must follow this with a
    /// `push_component` for every component type in the signature before
    /// the row is observable to queries, or the stores and entity list will
    /// disagree on length (see `I1` in the data-model invariants).
    pub fn allocate_row(&mut self, entity: EntityId) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        row
    }

    /// Remove `row`, swapping the last row into its place. Returns the
    /// entity that was swapped in, if any, so the caller can fix up its
    /// `EntityLocation`.
    pub fn remove_row(&mut self, row: usize) -> Option<EntityId> {
        if row >= self.entities.len() {
            return None;
        }
        self.entities.swap_remove(row);
        for store in &mut self.stores {
            store.swap_remove_row(row);
        }
        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    pub fn reserve_rows(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for store in &mut self.stores {
            store.reserve(additional);
        }
    }

    /// Create this component's store if it does not already exist.
    pub fn register_component<T: Component>(&mut self) {
        let type_id = TypeId::of::<T>();
        if !self.store_indices.contains_key(&type_id) {
            let idx = self.stores.len();
            self.stores
                .push(ComponentStore::new(T::type_name(), T::new_columns()));
            self.store_indices.insert(type_id, idx);
        }
    }

    /// Append one row's worth of `T` to its store. The store must already
    /// exist (via `register_component::<T>()`) and the row appended here
    /// must line up with the row just allocated in `allocate_row`.
    pub fn push_component<T: Component>(&mut self, value: T) {
        let idx = *self
            .store_indices
            .get(&TypeId::of::<T>())
            .expect("component store must be registered before pushing into it");
        value.push_into(&mut self.stores[idx]);
    }

    /// Overwrite an existing row's `T` value in place.
    pub fn write_component<T: Component>(&mut self, row: usize, value: T) {
        let idx = *self
            .store_indices
            .get(&TypeId::of::<T>())
            .expect("component store must be registered before writing into it");
        value.write_at(&mut self.stores[idx], row);
    }

    /// Reconstruct an owned `T` by reading every declared field at `row`.
    pub fn get_component<T: Component>(&self, row: usize) -> Option<T> {
        let idx = *self.store_indices.get(&TypeId::of::<T>())?;
        Some(T::read_at(&self.stores[idx], row))
    }

    pub fn store(&self, type_id: TypeId) -> Option<&ComponentStore> {
        let idx = *self.store_indices.get(&type_id)?;
        self.stores.get(idx)
    }

    pub fn store_mut(&mut self, type_id: TypeId) -> Option<&mut ComponentStore> {
        let idx = *self.store_indices.get(&type_id)?;
        self.stores.get_mut(idx)
    }

    /// Direct read access to one field's column, across every row.
    pub fn reader<T: FieldPrimitive>(&self, component: TypeId, field: &str) -> Option<&[T]> {
        self.store(component)?.field(field)?.as_slice::<T>().into()
    }

    /// Direct write access to one field's column, across every row. Writes
    /// through this slice take effect immediately; there is no write buffer.
    pub fn writer<T: FieldPrimitive>(
        &mut self,
        component: TypeId,
        field: &str,
    ) -> Option<&mut [T]> {
        self.store_mut(component)?.field_mut(field)?.as_mut_slice::<T>().into()
    }
}
