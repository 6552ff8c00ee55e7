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

//! Archetype ECS - archetype-based component storage with a conflict-aware
//! parallel system scheduler.

pub mod access;
pub mod archetype;
pub mod bitset;
pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod schedule;
pub mod system;
pub mod world;

pub use access::AccessDescriptor;
pub use archetype::Archetype;
pub use component::{Bundle, Component};
pub use entity::{EntityId, EntityLocation};
pub use error::{EcsError, Result};
pub use executor::Executor;
pub use query::{DynField, Mutable, Query, QueryBuilder, ReadOnly};
pub use schedule::{Scheduler, SchedulerBuilder, Stage};
pub use system::{Mode, System, SystemBuilder};
pub use world::World;

/// Installs a process-wide `tracing` subscriber that prints to stdout at
/// `level` and above. Call once, near the start of `main`.
#[cfg(feature = "profiling")]
pub fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}
