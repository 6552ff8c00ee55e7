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

//! A named unit of work with a declared access descriptor, scheduled
//! alongside other systems by the stage computation in `schedule`.

use std::any::TypeId;

use crate::access::AccessDescriptor;
use crate::error::{EcsError, Result};
use crate::world::World;

/// Closure signature every system body runs as.
pub type SystemBody = Box<dyn FnMut(&World) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Lifecycle category controlling when a system is eligible to run. The
/// scheduler computes and executes stages independently per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Startup,
    #[default]
    Update,
    Shutdown,
}

/// A system's declared access, lifecycle mode, and its runnable body.
pub struct System {
    name: String,
    access: AccessDescriptor,
    mode: Mode,
    body: SystemBody,
}

impl System {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> &AccessDescriptor {
        &self.access
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn run(&mut self, world: &World) -> Result<()> {
        (self.body)(world).map_err(|cause| EcsError::SystemFailed {
            name: self.name.clone(),
            cause,
        })
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Builds a `System` by declaring its access piece by piece, mirroring the
/// query builder's chainable style.
pub struct SystemBuilder {
    name: String,
    access: AccessDescriptor,
    mode: Mode,
}

impl SystemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: AccessDescriptor::empty(),
            mode: Mode::default(),
        }
    }

    pub fn reads<T: 'static>(mut self) -> Self {
        self.access = self.access.reads(TypeId::of::<T>());
        self
    }

    pub fn writes<T: 'static>(mut self) -> Self {
        self.access = self.access.writes(TypeId::of::<T>());
        self
    }

    pub fn excludes<T: 'static>(mut self) -> Self {
        self.access = self.access.excludes(TypeId::of::<T>());
        self
    }

    /// Set the system's lifecycle mode. Defaults to `Mode::Update`.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build<F>(self, body: F) -> System
    where
        F: FnMut(&World) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        System {
            name: self.name,
            access: self.access,
            mode: self.mode,
            body: Box::new(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn test_system_runs_body() {
        let mut system = SystemBuilder::new("noop").build(|_world| Ok(()));
        let world = World::new();
        assert!(system.run(&world).is_ok());
    }

    #[test]
    fn test_system_wraps_body_error() {
        let mut system = SystemBuilder::new("failing").build(|_world| Err("boom".into()));
        let world = World::new();
        let err = system.run(&world).unwrap_err();
        match err {
            EcsError::SystemFailed { name, .. } => assert_eq!(name, "failing"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn test_default_mode_is_update() {
        let system = SystemBuilder::new("noop").build(|_| Ok(()));
        assert_eq!(system.mode(), Mode::Update);
    }

    #[test]
    fn test_mode_is_settable() {
        let system = SystemBuilder::new("setup").mode(Mode::Startup).build(|_| Ok(()));
        assert_eq!(system.mode(), Mode::Startup);
    }
}
