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

//! Stage computation: conflict edges plus explicit orderings are laid out
//! as a DAG, topologically layered by longest-path depth so that every
//! system in a stage is conflict-free with every other system in it, and
//! stages run one after another with a join barrier in between.

use std::collections::{HashMap, VecDeque};

use crate::error::{EcsError, Result};
use crate::system::{Mode, System};

/// A set of systems with no access conflicts among them; safe to run
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct Stage {
    pub system_indices: Vec<usize>,
}

/// A built, immutable execution plan: systems grouped into conflict-free
/// stages, computed independently per lifecycle `Mode` so that, e.g., a
/// `Startup` system never shares a stage (or a conflict edge) with an
/// `Update` system.
pub struct Scheduler {
    systems: Vec<System>,
    startup_stages: Vec<Stage>,
    update_stages: Vec<Stage>,
    shutdown_stages: Vec<Stage>,
}

impl Scheduler {
    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut [System] {
        &mut self.systems
    }

    pub fn startup_stages(&self) -> &[Stage] {
        &self.startup_stages
    }

    pub fn update_stages(&self) -> &[Stage] {
        &self.update_stages
    }

    pub fn shutdown_stages(&self) -> &[Stage] {
        &self.shutdown_stages
    }

    /// Every stage across all three modes, in the user-visible execution
    /// order: all startup stages, then all update stages, then all
    /// shutdown stages.
    pub fn stages(&self) -> Vec<Stage> {
        self.startup_stages
            .iter()
            .chain(self.update_stages.iter())
            .chain(self.shutdown_stages.iter())
            .cloned()
            .collect()
    }
}

/// Accumulates systems and explicit ordering constraints, then computes the
/// stage plan once via `build`. Once a `Scheduler` is built it cannot be
/// reconfigured; build a new `SchedulerBuilder` instead.
#[derive(Default)]
pub struct SchedulerBuilder {
    systems: Vec<System>,
    names: HashMap<String, usize>,
    ordering: Vec<(usize, usize)>,
    pending_ordering: Vec<(String, String)>,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system(mut self, system: System) -> Result<Self> {
        if self.names.contains_key(system.name()) {
            return Err(EcsError::DuplicateSystemName(system.name().to_string()));
        }
        self.names.insert(system.name().to_string(), self.systems.len());
        self.systems.push(system);
        Ok(self)
    }

    /// Require `before` to run in an earlier stage than `after`, overriding
    /// whatever order conflict detection alone would have produced.
    pub fn order(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.pending_ordering.push((before.into(), after.into()));
        self
    }

    pub fn build(mut self) -> Result<Scheduler> {
        for (before, after) in self.pending_ordering.drain(..) {
            let before_idx = *self
                .names
                .get(&before)
                .ok_or(EcsError::UnschedulableSet)?;
            let after_idx = *self.names.get(&after).ok_or(EcsError::UnschedulableSet)?;
            self.ordering.push((before_idx, after_idx));
        }

        let startup_stages = build_stages_for_mode(&self.systems, &self.ordering, Mode::Startup)?;
        let update_stages = build_stages_for_mode(&self.systems, &self.ordering, Mode::Update)?;
        let shutdown_stages = build_stages_for_mode(&self.systems, &self.ordering, Mode::Shutdown)?;
        Ok(Scheduler {
            systems: self.systems,
            startup_stages,
            update_stages,
            shutdown_stages,
        })
    }
}

/// Restrict `systems`/`ordering` to the subset with lifecycle mode `mode`,
/// compute their stages in isolation, then remap the local stage indices
/// back to indices into the full system list. An explicit ordering pair
/// whose two systems don't share `mode` is dropped rather than applied —
/// per-mode stages never reference a system outside that mode, so such a
/// pair cannot be honored here.
fn build_stages_for_mode(systems: &[System], ordering: &[(usize, usize)], mode: Mode) -> Result<Vec<Stage>> {
    let local_to_global: Vec<usize> = (0..systems.len()).filter(|&i| systems[i].mode() == mode).collect();
    if local_to_global.is_empty() {
        return Ok(Vec::new());
    }

    let global_to_local: HashMap<usize, usize> = local_to_global
        .iter()
        .enumerate()
        .map(|(local, &global)| (global, local))
        .collect();
    let local_systems: Vec<&System> = local_to_global.iter().map(|&g| &systems[g]).collect();
    let local_ordering: Vec<(usize, usize)> = ordering
        .iter()
        .filter_map(|&(before, after)| {
            Some((*global_to_local.get(&before)?, *global_to_local.get(&after)?))
        })
        .collect();

    let local_stages = build_stages(&local_systems, &local_ordering)?;
    Ok(local_stages
        .into_iter()
        .map(|stage| Stage {
            system_indices: stage.system_indices.into_iter().map(|local| local_to_global[local]).collect(),
        })
        .collect())
}

/// Compute the conflict-edge set, add explicit-ordering edges, then assign
/// each system to a stage by longest-path depth from any root.
///
/// An edge is added from *every* earlier system that conflicts with a later
/// one (in insertion order), not only the most recent such system — two
/// systems that both conflict with a later one but not with each other
/// still each need their own edge into it, or the later system could end up
/// sharing a stage with the first of them.
fn build_stages(systems: &[&System], ordering: &[(usize, usize)]) -> Result<Vec<Stage>> {
    let n = systems.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if systems[i].access().conflicts_with(systems[j].access()) {
                successors[i].push(j);
                indegree[j] += 1;
            }
        }
    }

    for &(before, after) in ordering {
        successors[before].push(after);
        indegree[after] += 1;
    }

    let mut depth = vec![0usize; n];
    let mut remaining_indegree = indegree.clone();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut visited = 0usize;

    while let Some(i) = queue.pop_front() {
        visited += 1;
        for &j in &successors[i] {
            depth[j] = depth[j].max(depth[i] + 1);
            remaining_indegree[j] -= 1;
            if remaining_indegree[j] == 0 {
                queue.push_back(j);
            }
        }
    }

    if visited != n {
        let stuck = (0..n)
            .find(|&i| remaining_indegree[i] > 0)
            .map(|i| systems[i].name().to_string())
            .unwrap_or_default();
        return Err(EcsError::CircularDependency { name: stuck });
    }

    let max_depth = depth.iter().copied().max().unwrap_or(0);
    let mut stages: Vec<Stage> = (0..=max_depth).map(|_| Stage::default()).collect();
    for (i, &d) in depth.iter().enumerate() {
        stages[d].system_indices.push(i);
    }
    Ok(stages)
}
