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

//! Owns every archetype, the entity→location table, and the query cache.

use std::any::TypeId;

use ahash::AHashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::archetype::{Archetype, ArchetypeSignature};
use crate::component::{Bundle, Component};
use crate::entity::{EntityId, EntityLocation};
use crate::query::{QueryBuilder, QuerySpec};
use crate::registry::TypeRegistry;

#[cfg(feature = "profiling")]
use tracing::trace;

struct CachedMatch {
    matches: Vec<usize>,
    seen_archetypes: usize,
}

#[derive(Default)]
struct QueryCacheState {
    registry: TypeRegistry,
    cache: FxHashMap<QuerySpec, CachedMatch>,
}

/// Owns every archetype and routes entity operations to the right one.
pub struct World {
    entity_locations: SlotMap<EntityId, EntityLocation>,
    archetypes: Vec<Archetype>,
    archetype_index: AHashMap<ArchetypeSignature, usize>,
    query_state: RwLock<QueryCacheState>,
}

impl World {
    pub fn new() -> Self {
        let mut world = Self {
            entity_locations: SlotMap::with_key(),
            archetypes: Vec::new(),
            archetype_index: AHashMap::new(),
            query_state: RwLock::new(QueryCacheState::default()),
        };
        // The empty archetype always exists at index 0, so entities with no
        // components still have somewhere to live.
        let empty_sig: ArchetypeSignature = Vec::new();
        let bits = world.query_state.write().registry.bitset_of(empty_sig.iter());
        world.archetypes.push(Archetype::new(empty_sig.clone(), bits));
        world.archetype_index.insert(empty_sig, 0);
        world
    }

    /// Spawn one entity with every component in `bundle`.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let archetype_idx = self.archetype_for::<B>();
        let entity = self
            .entity_locations
            .insert(EntityLocation { archetype_index: 0, row: 0 });

        let archetype = &mut self.archetypes[archetype_idx];
        let row = archetype.allocate_row(entity);
        bundle.push_into(archetype);

        self.entity_locations[entity] = EntityLocation {
            archetype_index: archetype_idx,
            row,
        };

        #[cfg(feature = "profiling")]
        trace!(archetype = archetype_idx, row, "spawned entity");

        entity
    }

    /// Spawn `count` entities sharing bundle type `B`, each built by calling
    /// `supplier(i)` for `i` in `0..count`. The i-th call (in order) becomes
    /// entity `i` of the returned list.
    pub fn spawn_batch<B: Bundle>(&mut self, count: usize, mut supplier: impl FnMut(usize) -> B) -> Vec<EntityId> {
        let archetype_idx = self.archetype_for::<B>();
        self.archetypes[archetype_idx].reserve_rows(count);

        let mut entities = Vec::with_capacity(count);
        for i in 0..count {
            let bundle = supplier(i);
            let entity = self
                .entity_locations
                .insert(EntityLocation { archetype_index: 0, row: 0 });
            let archetype = &mut self.archetypes[archetype_idx];
            let row = archetype.allocate_row(entity);
            bundle.push_into(archetype);
            self.entity_locations[entity] = EntityLocation {
                archetype_index: archetype_idx,
                row,
            };
            entities.push(entity);
        }
        entities
    }

    /// Remove `entity` and every component it carries. Returns `false` if
    /// the entity was already gone (despawning an unknown or stale entity
    /// is a no-op, not an error).
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        let Some(location) = self.entity_locations.remove(entity) else {
            return false;
        };
        let archetype = &mut self.archetypes[location.archetype_index];
        if let Some(swapped) = archetype.remove_row(location.row) {
            if let Some(loc) = self.entity_locations.get_mut(swapped) {
                loc.row = location.row;
            }
        }
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entity_locations.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.entity_locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_locations.is_empty()
    }

    /// Reconstruct an owned copy of `entity`'s `T`, if it has one.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<T> {
        let location = self.entity_locations.get(entity)?;
        self.archetypes[location.archetype_index].get_component::<T>(location.row)
    }

    /// Overwrite `entity`'s `T` in place. Returns `false` if the entity is
    /// unknown or does not carry `T`.
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) -> bool {
        let Some(location) = self.entity_locations.get(entity).copied() else {
            return false;
        };
        let Some(archetype) = self.archetypes.get_mut(location.archetype_index) else {
            return false;
        };
        if !archetype.contains(TypeId::of::<T>()) {
            return false;
        }
        archetype.write_component(location.row, value);
        true
    }

    pub fn archetype(&self, index: usize) -> &Archetype {
        &self.archetypes[index]
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Start building a query against this world.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    fn archetype_for<B: Bundle>(&mut self) -> usize {
        let mut signature = B::component_types().into_vec();
        signature.sort_unstable();

        if let Some(&idx) = self.archetype_index.get(&signature) {
            return idx;
        }

        let bits = self.query_state.write().registry.bitset_of(signature.iter());
        let mut archetype = Archetype::new(signature.clone(), bits);
        B::register_components(&mut archetype);
        let idx = self.archetypes.len();
        self.archetypes.push(archetype);
        self.archetype_index.insert(signature, idx);

        #[cfg(feature = "profiling")]
        trace!(archetype = idx, "created new archetype");

        idx
    }

    /// Resolve `spec` to the list of currently-matching archetype indices,
    /// extending the cached entry with any archetypes created since it was
    /// last computed rather than rescanning from scratch.
    pub(crate) fn resolve_query(&self, spec: &QuerySpec) -> Vec<usize> {
        let seen = self.archetypes.len();
        {
            let state = self.query_state.read();
            if let Some(cached) = state.cache.get(spec) {
                if cached.seen_archetypes == seen {
                    return cached.matches.clone();
                }
            }
        }

        let mut state = self.query_state.write();
        let QueryCacheState { registry, cache } = &mut *state;

        let required_types = spec.required_types();
        let required = registry.bitset_of(required_types.iter());
        let excluded = registry.existing_bitset_of(spec.excluded().iter());

        let entry = cache.entry(spec.clone()).or_insert_with(|| CachedMatch {
            matches: Vec::new(),
            seen_archetypes: 0,
        });

        for idx in entry.seen_archetypes..seen {
            if spec.matches_bits(&required, &excluded, self.archetypes[idx].bits()) {
                entry.matches.push(idx);
            }
        }
        entry.seen_archetypes = seen;
        entry.matches.clone()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_component;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl_component!(Position { x: f32, y: f32 });

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: f32,
    }
    impl_component!(Velocity { dx: f32 });

    #[test]
    fn test_spawn_despawn_roundtrip() {
        let mut world = World::new();
        let entity = world.spawn((Position { x: 1.0, y: 2.0 },));
        assert!(world.is_alive(entity));
        assert_eq!(world.get_component::<Position>(entity), Some(Position { x: 1.0, y: 2.0 }));
        assert!(world.despawn(entity));
        assert!(!world.is_alive(entity));
    }

    #[test]
    fn test_despawn_unknown_entity_is_noop() {
        let mut world = World::new();
        let entity = world.spawn((Position { x: 0.0, y: 0.0 },));
        world.despawn(entity);
        assert!(!world.despawn(entity));
    }

    #[test]
    fn test_archetype_segregation_by_component_set() {
        let mut world = World::new();
        world.spawn((Position { x: 0.0, y: 0.0 },));
        world.spawn((Position { x: 1.0, y: 1.0 }, Velocity { dx: 1.0 }));
        // empty archetype (index 0) + 2 distinct component-set archetypes
        assert_eq!(world.archetype_count(), 3);
    }

    #[test]
    fn test_despawn_swaps_last_entity_location() {
        let mut world = World::new();
        let e0 = world.spawn((Position { x: 0.0, y: 0.0 },));
        let e1 = world.spawn((Position { x: 1.0, y: 1.0 },));
        world.despawn(e0);
        assert_eq!(world.get_component::<Position>(e1), Some(Position { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn test_set_component_writes_through() {
        let mut world = World::new();
        let e = world.spawn((Position { x: 0.0, y: 0.0 },));
        assert!(world.set_component(e, Position { x: 5.0, y: 5.0 }));
        assert_eq!(world.get_component::<Position>(e), Some(Position { x: 5.0, y: 5.0 }));
    }

    #[test]
    fn test_spawn_batch_assigns_entities_in_supplier_order() {
        let mut world = World::new();
        let entities = world.spawn_batch(5, |i| Position { x: i as f32, y: 0.0 });
        for (i, &e) in entities.iter().enumerate() {
            assert_eq!(world.get_component::<Position>(e), Some(Position { x: i as f32, y: 0.0 }));
        }
    }

    #[test]
    fn test_query_cache_picks_up_new_archetypes() {
        let mut world = World::new();
        world.spawn((Position { x: 0.0, y: 0.0 },));
        let first = world.query().with_read_only::<Position>().build();
        assert_eq!(first.count(), 1);

        world.spawn((Position { x: 1.0, y: 1.0 }, Velocity { dx: 1.0 }));
        let second = world.query().with_read_only::<Position>().build();
        assert_eq!(second.count(), 2);
    }
}
