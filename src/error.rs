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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug)]
pub enum EcsError {
    /// A component type has no column in the archetype being addressed
    UnknownComponent,

    /// A row index was outside the bounds of an archetype's entity list
    RowOutOfBounds { row: usize, len: usize },

    /// Two systems were registered under the same name
    DuplicateSystemName(String),

    /// The explicit-ordering / conflict edges formed a cycle
    CircularDependency { name: String },

    /// No stage assignment exists for the current system set
    UnschedulableSet,

    /// A system body returned an error while a stage was executing
    SystemFailed {
        name: String,
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The scheduler was shut down while work was still outstanding
    SchedulerShutdown,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::UnknownComponent => write!(f, "unknown component type"),
            EcsError::RowOutOfBounds { row, len } => {
                write!(f, "row {row} out of bounds (archetype has {len} rows)")
            }
            EcsError::DuplicateSystemName(name) => {
                write!(f, "a system named '{name}' is already registered")
            }
            EcsError::CircularDependency { name } => {
                write!(f, "circular dependency detected at system '{name}'")
            }
            EcsError::UnschedulableSet => {
                write!(f, "no valid stage assignment exists for the registered systems")
            }
            EcsError::SystemFailed { name, cause } => {
                write!(f, "system '{name}' failed: {cause}")
            }
            EcsError::SchedulerShutdown => {
                write!(f, "scheduler was shut down before all stages completed")
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
