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

//! Common imports for consumers of this crate.

pub use crate::access::AccessDescriptor;
pub use crate::component::{Bundle, Component};
pub use crate::entity::EntityId;
pub use crate::error::{EcsError, Result};
pub use crate::executor::Executor;
pub use crate::impl_component;
pub use crate::query::{DynField, Mutable, Query, QueryBuilder, ReadOnly};
pub use crate::schedule::{Scheduler, SchedulerBuilder};
pub use crate::system::{Mode, System, SystemBuilder};
pub use crate::world::World;
