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

//! Query engine: a runtime, chainable builder that resolves to a cached
//! list of matching archetypes, plus the per-row wrapper types iteration
//! is built on.

use std::any::TypeId;
use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashSet;

use crate::archetype::Archetype;
use crate::bitset::BitSet;
use crate::component::Component;
use crate::world::World;

/// `(include, exclude, additional-required)` description of a query.
///
/// `read_only`/`mutable` name components the query actually fetches;
/// `additional_required` names components an archetype must carry even
/// though the query never reads or writes them (a presence-only filter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    read_only: Vec<TypeId>,
    mutable: Vec<TypeId>,
    additional_required: Vec<TypeId>,
    excluded: Vec<TypeId>,
}

impl QuerySpec {
    pub fn read_only(&self) -> &[TypeId] {
        &self.read_only
    }

    pub fn mutable(&self) -> &[TypeId] {
        &self.mutable
    }

    pub fn excluded(&self) -> &[TypeId] {
        &self.excluded
    }

    /// Every component type an archetype must carry to match, fetched or not.
    pub fn required_types(&self) -> FxHashSet<TypeId> {
        self.read_only
            .iter()
            .chain(self.mutable.iter())
            .chain(self.additional_required.iter())
            .copied()
            .collect()
    }

    pub fn matches_bits(&self, required: &BitSet, excluded: &BitSet, archetype_bits: &BitSet) -> bool {
        archetype_bits.contains_all(required) && !archetype_bits.intersects(excluded)
    }
}

/// Runtime, chainable query construction. Each call narrows or widens the
/// archetype set the query will match; `build` resolves it against the
/// owning world's archetype list (consulting the query cache first).
pub struct QueryBuilder<'w> {
    world: &'w World,
    spec: QuerySpec,
    fetchers: Vec<DynFetcher>,
}

impl<'w> QueryBuilder<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            spec: QuerySpec::default(),
            fetchers: Vec::new(),
        }
    }

    /// Require a component to be present, without fetching it.
    pub fn with<T: Component>(mut self) -> Self {
        self.spec.additional_required.push(TypeId::of::<T>());
        self
    }

    /// Fetch `T` read-only for every matched entity.
    ///
    /// # Panics
    /// Panics if `T` was already requested mutably on this builder — a
    /// query can never fetch the same component both ways, since the
    /// unsafe row iteration below relies on that being impossible.
    pub fn with_read_only<T: Component>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        assert!(
            !self.spec.mutable.contains(&type_id),
            "component already requested mutably by this query"
        );
        self.spec.read_only.push(type_id);
        self.fetchers.push(DynFetcher::read_only::<T>());
        self
    }

    /// Fetch `T` mutably for every matched entity.
    ///
    /// # Panics
    /// Panics if `T` was already requested read-only on this builder.
    pub fn with_mutable<T: Component>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        assert!(
            !self.spec.read_only.contains(&type_id),
            "component already requested read-only by this query"
        );
        self.spec.mutable.push(type_id);
        self.fetchers.push(DynFetcher::mutable::<T>());
        self
    }

    /// Exclude archetypes that carry `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.spec.excluded.push(TypeId::of::<T>());
        self
    }

    pub fn build(self) -> Query<'w> {
        let matches = self.world.resolve_query(&self.spec);
        Query {
            world: self.world,
            spec: self.spec,
            matches,
            fetchers: self.fetchers,
        }
    }
}

/// A resolved query: the list of archetype indices currently matching
/// `spec`, snapshotted at `build()` time.
pub struct Query<'w> {
    world: &'w World,
    spec: QuerySpec,
    matches: Vec<usize>,
    fetchers: Vec<DynFetcher>,
}

impl<'w> Query<'w> {
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn matched_archetypes(&self) -> &[usize] {
        &self.matches
    }

    /// Total number of entities across every matched archetype.
    pub fn count(&self) -> usize {
        self.matches.iter().map(|&i| self.world.archetype(i).len()).sum()
    }

    /// True if at least one entity matches.
    pub fn any(&self) -> bool {
        self.matches.iter().any(|&i| self.world.archetype(i).len() > 0)
    }

    // SAFETY: `archetype_ptr` hands out a raw pointer derived from a shared
    // reference into `World`'s archetype list. It is sound here because
    // every `FetchArg` resolves a *different* component's store by
    // `TypeId`, and a query's own spec can never name the same component as
    // both read-only and mutable (enforced at query construction), so the
    // resulting reads/writes never alias the same column within one row.
    fn archetype_ptr(&self, index: usize) -> *mut Archetype {
        self.world.archetype(index) as *const Archetype as *mut Archetype
    }

    /// Mutate `T` on every matched entity.
    pub fn modify<T: Component>(&self, mut f: impl FnMut(&mut T)) {
        for &idx in &self.matches {
            let ptr = self.archetype_ptr(idx);
            let len = unsafe { (*ptr).len() };
            for row in 0..len {
                let mut bound = unsafe { Mutable::<T>::fetch(ptr, row) };
                f(&mut bound);
            }
        }
    }

    /// Mutate `T` on every matched entity for which `predicate` returns true.
    pub fn modify_if<T: Component>(&self, mut predicate: impl FnMut(&T) -> bool, mut f: impl FnMut(&mut T)) {
        for &idx in &self.matches {
            let ptr = self.archetype_ptr(idx);
            let len = unsafe { (*ptr).len() };
            for row in 0..len {
                let mut bound = unsafe { Mutable::<T>::fetch(ptr, row) };
                if predicate(&bound) {
                    f(&mut bound);
                }
            }
        }
    }
}

/// Implemented by the wrapper types a `for_eachN` closure argument can bind
/// to: `ReadOnly<'r, T>` and `Mutable<'r, T>`.
///
/// # Safety
/// Implementors must resolve their component's store by `TypeId` and must
/// never be used to fetch the same component mutably more than once, or
/// both mutably and read-only, within a single row — `Query` upholds this
/// by construction (a `QuerySpec` never lists the same type in both
/// `read_only` and `mutable`).
pub unsafe trait FetchArg<'r> {
    fn component_type() -> TypeId;
    fn is_mutable() -> bool;

    /// # Safety
    /// `archetype` must be a valid, live pointer and `row` must be within
    /// bounds of it.
    unsafe fn fetch(archetype: *mut Archetype, row: usize) -> Self;
}

unsafe impl<'r, T: Component> FetchArg<'r> for ReadOnly<'r, T> {
    fn component_type() -> TypeId {
        TypeId::of::<T>()
    }

    fn is_mutable() -> bool {
        false
    }

    unsafe fn fetch(archetype: *mut Archetype, row: usize) -> Self {
        let store = (*archetype)
            .store(TypeId::of::<T>())
            .expect("matched archetype is missing a component the query fetches");
        ReadOnly::bind(store, row)
    }
}

unsafe impl<'r, T: Component> FetchArg<'r> for Mutable<'r, T> {
    fn component_type() -> TypeId {
        TypeId::of::<T>()
    }

    fn is_mutable() -> bool {
        true
    }

    unsafe fn fetch(archetype: *mut Archetype, row: usize) -> Self {
        let store = (*archetype)
            .store_mut(TypeId::of::<T>())
            .expect("matched archetype is missing a component the query fetches");
        Mutable::bind(store, row)
    }
}

/// Read-only, per-row handle to a component. Reconstructed once (from its
/// field columns) when bound and never written back.
pub struct ReadOnly<'r, T: Component> {
    value: T,
    _marker: std::marker::PhantomData<&'r T>,
}

impl<'r, T: Component> ReadOnly<'r, T> {
    fn bind(store: &'r crate::column::ComponentStore, row: usize) -> Self {
        Self {
            value: T::read_at(store, row),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'r, T: Component> Deref for ReadOnly<'r, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

/// Mutable, per-row handle to a component. Reconstructed when bound,
/// exposed to the caller by `&mut`, then written back field-by-field when
/// the handle is dropped — the decomposed-column write path has no single
/// contiguous `&mut T` to hand out directly.
pub struct Mutable<'r, T: Component> {
    store: &'r mut crate::column::ComponentStore,
    row: usize,
    value: Option<T>,
}

impl<'r, T: Component> Mutable<'r, T> {
    fn bind(store: &'r mut crate::column::ComponentStore, row: usize) -> Self {
        let value = T::read_at(store, row);
        Self {
            store,
            row,
            value: Some(value),
        }
    }
}

impl<'r, T: Component> Deref for Mutable<'r, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value taken before drop")
    }
}

impl<'r, T: Component> DerefMut for Mutable<'r, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value taken before drop")
    }
}

impl<'r, T: Component> Drop for Mutable<'r, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            T::write_at(value, self.store, self.row);
        }
    }
}

/// Type-erased per-row component handle, used by queries that fetch 7 or
/// more components — at that arity a fixed-arity tuple/generic-per-field
/// `for_eachN` is no longer practical to generate.
///
/// `ReadOnly`/`Mutable` aren't `'static` (they borrow `'r`), so they can't
/// ride `std::any::Any`; downcasting here is done by hand against the
/// `TypeId` recorded when the field was fetched.
pub struct DynField<'r> {
    type_id: TypeId,
    mutable: bool,
    slot: Box<dyn ErasedSlot + 'r>,
}

trait ErasedSlot {}

struct ReadOnlySlot<'r, T: Component>(ReadOnly<'r, T>);
struct MutableSlot<'r, T: Component>(Mutable<'r, T>);

impl<'r, T: Component> ErasedSlot for ReadOnlySlot<'r, T> {}
impl<'r, T: Component> ErasedSlot for MutableSlot<'r, T> {}

impl<'r> DynField<'r> {
    pub fn component_type(&self) -> TypeId {
        self.type_id
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Borrow the field as `&T`, or `None` if `T` doesn't match the
    /// component this field actually holds.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        if self.type_id != TypeId::of::<T>() {
            return None;
        }
        // SAFETY: `type_id` matched, so the trait object's concrete type is
        // known to be `ReadOnlySlot<'r, T>`/`MutableSlot<'r, T>` below.
        unsafe {
            if self.mutable {
                let slot = &*(self.slot.as_ref() as *const dyn ErasedSlot as *const () as *const MutableSlot<'r, T>);
                Some(&slot.0)
            } else {
                let slot = &*(self.slot.as_ref() as *const dyn ErasedSlot as *const () as *const ReadOnlySlot<'r, T>);
                Some(&slot.0)
            }
        }
    }

    /// Borrow the field as `&mut T`; `None` if `T` doesn't match, or the
    /// field was fetched read-only.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        if self.type_id != TypeId::of::<T>() || !self.mutable {
            return None;
        }
        // SAFETY: checked above that `type_id` matches and the field is mutable.
        unsafe {
            let slot = &mut *(self.slot.as_mut() as *mut dyn ErasedSlot as *mut () as *mut MutableSlot<'r, T>);
            Some(&mut slot.0)
        }
    }
}

/// Captured at `with_read_only`/`with_mutable` call time, when `T` is still
/// statically known, so `for_each_dyn` can fetch each field later without
/// any type parameter at all.
struct DynFetcher {
    fetch: Box<dyn for<'r> Fn(*mut Archetype, usize) -> DynField<'r>>,
}

impl DynFetcher {
    fn read_only<T: Component>() -> Self {
        Self {
            fetch: Box::new(|archetype, row| {
                let bound = unsafe { ReadOnly::<T>::fetch(archetype, row) };
                DynField {
                    type_id: TypeId::of::<T>(),
                    mutable: false,
                    slot: Box::new(ReadOnlySlot(bound)),
                }
            }),
        }
    }

    fn mutable<T: Component>() -> Self {
        Self {
            fetch: Box::new(|archetype, row| {
                let bound = unsafe { Mutable::<T>::fetch(archetype, row) };
                DynField {
                    type_id: TypeId::of::<T>(),
                    mutable: true,
                    slot: Box::new(MutableSlot(bound)),
                }
            }),
        }
    }

    fn call<'r>(&self, archetype: *mut Archetype, row: usize) -> DynField<'r> {
        (self.fetch)(archetype, row)
    }
}

impl<'w> Query<'w> {
    /// For queries fetching 7 or more components: invokes `f` once per
    /// matched row with an untyped array of wrapper handles, one per
    /// `with_read_only`/`with_mutable` call, in the order they were chained
    /// on the builder. Use `DynField::downcast_ref`/`downcast_mut` to
    /// recover a concrete component type.
    pub fn for_each_dyn<'r>(&'r self, mut f: impl FnMut(&mut [DynField<'r>])) {
        for &idx in &self.matches {
            let ptr = self.archetype_ptr(idx);
            let len = unsafe { (*ptr).len() };
            for row in 0..len {
                let mut fields: Vec<DynField<'r>> =
                    self.fetchers.iter().map(|fetcher| fetcher.call(ptr, row)).collect();
                f(&mut fields);
            }
        }
    }
}

macro_rules! impl_results {
    ($name:ident, $($arg:ident),+) => {
        impl<'w> Query<'w> {
            /// Materializes every matched row as an owned tuple, without
            /// any wrapper type — read-only, no unsafe fetch needed.
            pub fn $name<$($arg: Component),+>(&self) -> Vec<($($arg),+,)> {
                let mut out = Vec::new();
                for &idx in &self.matches {
                    let archetype = self.world.archetype(idx);
                    let len = archetype.len();
                    $(
                        #[allow(non_snake_case)]
                        let $arg = archetype
                            .store(TypeId::of::<$arg>())
                            .expect("matched archetype is missing a component the query fetches");
                    )+
                    for row in 0..len {
                        out.push(($($arg::read_at($arg, row)),+,));
                    }
                }
                out
            }
        }
    };
}

impl_results!(results1, A);
impl_results!(results2, A, B);
impl_results!(results3, A, B, C);
impl_results!(results4, A, B, C, D);
impl_results!(results5, A, B, C, D, E);
impl_results!(results6, A, B, C, D, E, F);

macro_rules! impl_scan {
    ($name:ident, $($arg:ident),+) => {
        impl<'w> Query<'w> {
            /// Unwrapped read-only scan: `f` receives plain component
            /// values directly rather than `ReadOnly` wrappers.
            pub fn $name<$($arg: Component),+>(&self, mut f: impl FnMut($($arg),+)) {
                for &idx in &self.matches {
                    let archetype = self.world.archetype(idx);
                    let len = archetype.len();
                    $(
                        #[allow(non_snake_case)]
                        let $arg = archetype
                            .store(TypeId::of::<$arg>())
                            .expect("matched archetype is missing a component the query fetches");
                    )+
                    for row in 0..len {
                        f($($arg::read_at($arg, row)),+);
                    }
                }
            }
        }
    };
}

impl_scan!(scan1, A);
impl_scan!(scan2, A, B);
impl_scan!(scan3, A, B, C);
impl_scan!(scan4, A, B, C, D);
impl_scan!(scan5, A, B, C, D, E);
impl_scan!(scan6, A, B, C, D, E, F);

macro_rules! impl_for_each {
    ($name:ident, $($arg:ident),+) => {
        impl<'w> Query<'w> {
            pub fn $name<'r, $($arg: FetchArg<'r>),+>(&'r self, mut f: impl FnMut($($arg),+)) {
                for &idx in &self.matches {
                    let ptr = self.archetype_ptr(idx);
                    let len = unsafe { (*ptr).len() };
                    for row in 0..len {
                        $(
                            #[allow(non_snake_case)]
                            let $arg = unsafe { $arg::fetch(ptr, row) };
                        )+
                        f($($arg),+);
                    }
                }
            }
        }
    };
}

impl_for_each!(for_each1, A);
impl_for_each!(for_each2, A, B);
impl_for_each!(for_each3, A, B, C);
impl_for_each!(for_each4, A, B, C, D);
impl_for_each!(for_each5, A, B, C, D, E);
impl_for_each!(for_each6, A, B, C, D, E, F);
