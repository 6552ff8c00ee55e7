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

//! Runs a built `Scheduler`'s stages, one after another, with every system
//! inside a stage running concurrently and a join barrier between stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EcsError, Result};
use crate::schedule::{Scheduler, Stage};
use crate::world::World;

/// Executes a scheduler's stages against a world.
///
/// With the `parallel` feature (on by default) each stage's systems run on
/// a rayon thread pool sized to `std::thread::available_parallelism()` by
/// default. Without it, stages still run one after another but each
/// system within a stage runs sequentially — useful for `miri` and
/// deterministic single-thread debugging.
pub struct Executor {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    idle_tx: crossbeam::channel::Sender<()>,
    idle_rx: crossbeam::channel::Receiver<()>,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_worker_count(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn with_worker_count(workers: usize) -> Self {
        let (idle_tx, idle_rx) = crossbeam::channel::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(false));
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .expect("failed to build rayon thread pool");
            Self {
                pool,
                shutdown,
                active,
                idle_tx,
                idle_rx,
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = workers;
            Self {
                shutdown,
                active,
                idle_tx,
                idle_rx,
            }
        }
    }

    /// Run every stage of `scheduler`, across all three modes, in the
    /// user-visible order: startup, then update, then shutdown.
    pub fn run(&self, scheduler: &mut Scheduler, world: &mut World) -> Result<()> {
        self.execute_stages(scheduler, world, scheduler.stages())
    }

    /// Run only `scheduler`'s startup stages.
    pub fn execute_startup(&self, scheduler: &mut Scheduler, world: &mut World) -> Result<()> {
        let stages = scheduler.startup_stages().to_vec();
        self.execute_stages(scheduler, world, stages)
    }

    /// Run only `scheduler`'s update stages. Call once per frame/tick.
    pub fn execute_update(&self, scheduler: &mut Scheduler, world: &mut World) -> Result<()> {
        let stages = scheduler.update_stages().to_vec();
        self.execute_stages(scheduler, world, stages)
    }

    /// Run only `scheduler`'s shutdown stages.
    pub fn execute_shutdown(&self, scheduler: &mut Scheduler, world: &mut World) -> Result<()> {
        let stages = scheduler.shutdown_stages().to_vec();
        self.execute_stages(scheduler, world, stages)
    }

    fn execute_stages(&self, scheduler: &mut Scheduler, world: &mut World, stages: Vec<Stage>) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(EcsError::SchedulerShutdown);
        }

        self.active.store(true, Ordering::SeqCst);
        let result = (|| {
            for stage in &stages {
                if self.shutdown.load(Ordering::SeqCst) {
                    return Err(EcsError::SchedulerShutdown);
                }
                self.run_stage(scheduler, world, stage)?;
            }
            Ok(())
        })();
        self.active.store(false, Ordering::SeqCst);
        let _ = self.idle_tx.try_send(());
        result
    }

    #[cfg(feature = "parallel")]
    fn run_stage(&self, scheduler: &mut Scheduler, world: &mut World, stage: &Stage) -> Result<()> {
        use rayon::prelude::*;

        let system_indices = stage.system_indices.clone();

        // SAFETY: stages are computed so that no two systems in the same
        // stage declare conflicting component access (see `schedule`'s
        // `build_stages`). Each thread below touches a disjoint system and
        // disjoint component data, so concurrent `&World` access through
        // the shared pointer never races.
        let systems_ptr = scheduler.systems_mut().as_mut_ptr() as usize;
        let world_ptr = world as *const World as usize;

        let results: Vec<Result<()>> = self.pool.install(|| {
            system_indices
                .par_iter()
                .map(move |&idx| {
                    let system = unsafe { &mut *(systems_ptr as *mut crate::system::System).add(idx) };
                    let world = unsafe { &*(world_ptr as *const World) };
                    system.run(world)
                })
                .collect()
        });

        for result in results {
            result?;
        }
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn run_stage(&self, scheduler: &mut Scheduler, world: &mut World, stage: &Stage) -> Result<()> {
        let systems = scheduler.systems_mut();
        for &idx in &stage.system_indices {
            systems[idx].run(world)?;
        }
        Ok(())
    }

    /// Signal that no further stages should run. In-flight stages still
    /// complete; `run` checks the flag only between stages.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Signal shutdown, then block until the in-flight `run()` call (if
    /// any) observes it and returns, or `timeout` elapses.
    pub fn shutdown_and_await(&self, timeout: Duration) -> Result<()> {
        self.shutdown();
        if !self.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        match self.idle_rx.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => Err(EcsError::SchedulerShutdown),
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => Ok(()),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
