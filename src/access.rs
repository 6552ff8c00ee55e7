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

//! Declared component access for a system, and the predicate the scheduler
//! uses to decide whether two systems may run concurrently.

use std::any::TypeId;

use rustc_hash::FxHashSet;

/// A system's declared component access: what it reads, what it mutates,
/// and what it requires be absent from a matched archetype.
#[derive(Debug, Clone, Default)]
pub struct AccessDescriptor {
    pub read_only: FxHashSet<TypeId>,
    pub mutable: FxHashSet<TypeId>,
    pub excluded: FxHashSet<TypeId>,
}

impl AccessDescriptor {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn reads(mut self, type_id: TypeId) -> Self {
        self.read_only.insert(type_id);
        self
    }

    pub fn writes(mut self, type_id: TypeId) -> Self {
        self.mutable.insert(type_id);
        self
    }

    pub fn excludes(mut self, type_id: TypeId) -> Self {
        self.excluded.insert(type_id);
        self
    }

    /// Two access descriptors conflict if either mutates a type the other
    /// reads or mutates. Disjoint reads never conflict, and `excluded`
    /// plays no part in conflict detection — it only narrows which
    /// archetypes a query matches.
    pub fn conflicts_with(&self, other: &AccessDescriptor) -> bool {
        self.mutable.iter().any(|t| other.mutable.contains(t) || other.read_only.contains(t))
            || other.mutable.iter().any(|t| self.read_only.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_write_conflicts() {
        let a = AccessDescriptor::empty().writes(TypeId::of::<i32>());
        let b = AccessDescriptor::empty().writes(TypeId::of::<i32>());
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn test_read_read_does_not_conflict() {
        let a = AccessDescriptor::empty().reads(TypeId::of::<i32>());
        let b = AccessDescriptor::empty().reads(TypeId::of::<i32>());
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_write_read_conflicts_symmetrically() {
        let writer = AccessDescriptor::empty().writes(TypeId::of::<i32>());
        let reader = AccessDescriptor::empty().reads(TypeId::of::<i32>());
        assert!(writer.conflicts_with(&reader));
        assert!(reader.conflicts_with(&writer));
    }

    #[test]
    fn test_disjoint_types_never_conflict() {
        let a = AccessDescriptor::empty().writes(TypeId::of::<i32>());
        let b = AccessDescriptor::empty().writes(TypeId::of::<f32>());
        assert!(!a.conflicts_with(&b));
    }
}
