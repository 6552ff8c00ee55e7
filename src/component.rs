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

//! Component and Bundle traits
//!
//! Components are data attached to entities, decomposed field-by-field into
//! the owning archetype's columns. Bundles group multiple components for a
//! single spawn call.

use std::any::TypeId;

use smallvec::{smallvec, SmallVec};

use crate::archetype::Archetype;
use crate::column::{ComponentStore, FieldSpec};

/// Maximum number of components supported by Bundle implementations
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// A component that knows how to decompose itself into, and reconstruct
/// itself from, a set of primitive field columns.
///
/// Implemented per concrete type via [`impl_component!`], not as a blanket
/// impl: a type only participates in archetype storage once its field
/// layout has been declared.
pub trait Component: 'static + Send + Sync + Sized {
    /// Declared fields, in column order.
    fn field_specs() -> &'static [FieldSpec];

    /// Human-readable name used in diagnostics and store introspection.
    fn type_name() -> &'static str;

    /// Build a fresh, empty set of columns matching `field_specs()`.
    fn new_columns() -> Vec<crate::column::FieldColumn>;

    /// Append one row to `store`, writing every field of `self`.
    fn push_into(self, store: &mut ComponentStore);

    /// Overwrite row `row` of `store` with every field of `self`.
    fn write_at(self, store: &mut ComponentStore, row: usize);

    /// Reconstruct an owned value by reading row `row` from `store`.
    fn read_at(store: &ComponentStore, row: usize) -> Self;
}

/// Declare a [`Component`] impl for a struct of primitive fields.
///
/// ```ignore
/// struct Position { x: f32, y: f32 }
/// impl_component!(Position { x: f32, y: f32 });
/// ```
#[macro_export]
macro_rules! impl_component {
    ($ty:ident { $($field:ident: $field_ty:ty),* $(,)? }) => {
        impl $crate::component::Component for $ty {
            fn field_specs() -> &'static [$crate::column::FieldSpec] {
                static SPECS: &[$crate::column::FieldSpec] = &[
                    $(
                        $crate::column::FieldSpec {
                            name: stringify!($field),
                            ty: <$field_ty as $crate::column::FieldPrimitive>::TY,
                        },
                    )*
                ];
                SPECS
            }

            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn new_columns() -> Vec<$crate::column::FieldColumn> {
                let specs = <$ty as $crate::component::Component>::field_specs();
                let mut columns = Vec::with_capacity(specs.len());
                let mut _i = 0;
                $(
                    columns.push($crate::column::FieldColumn::new::<$field_ty>(specs[_i]));
                    _i += 1;
                )*
                columns
            }

            #[allow(unused_assignments)]
            fn push_into(self, store: &mut $crate::component::ComponentStoreHandle) {
                let mut _i = 0;
                $(
                    store.columns_mut()[_i].push::<$field_ty>(self.$field);
                    _i += 1;
                )*
            }

            #[allow(unused_assignments)]
            fn write_at(self, store: &mut $crate::component::ComponentStoreHandle, row: usize) {
                let mut _i = 0;
                $(
                    store.columns_mut()[_i].set::<$field_ty>(row, self.$field);
                    _i += 1;
                )*
            }

            fn read_at(store: &$crate::component::ComponentStoreHandle, row: usize) -> Self {
                #[allow(unused_mut, unused_variables)]
                let mut _i = 0;
                $ty {
                    $(
                        $field: {
                            let value = store.columns()[_i].get::<$field_ty>(row).clone();
                            _i += 1;
                            value
                        },
                    )*
                }
            }
        }
    };
}

// `ComponentStoreHandle` is re-exported here as an alias so generated impls
// can refer to `component::ComponentStoreHandle` without also importing
// `column::ComponentStore` at the call site.
pub use crate::column::ComponentStore as ComponentStoreHandle;

/// Bundle of components spawned together as a single entity.
pub trait Bundle: Send + Sync + 'static {
    /// Component type ids in this bundle, in declaration order.
    fn component_types() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Ensure every component store in `archetype` exists for this bundle.
    fn register_components(archetype: &mut Archetype)
    where
        Self: Sized;

    /// Append one row's worth of components to `archetype`'s stores. The
    /// archetype's entity list is managed separately by the caller.
    fn push_into(self, archetype: &mut Archetype)
    where
        Self: Sized;
}

macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn component_types() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(TypeId::of::<$T>()),*]
            }

            fn register_components(archetype: &mut Archetype) {
                $(archetype.register_component::<$T>();)*
            }

            #[allow(non_snake_case)]
            fn push_into(self, archetype: &mut Archetype) {
                let ($($T,)*) = self;
                $(archetype.push_component($T);)*
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
