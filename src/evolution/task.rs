//! Running an engine on a background thread.
//!
//! [`EvolutionEngine::spawn`] moves the engine to a dedicated thread and
//! returns an [`EvolutionTask`]: an abort handle, a channel of per-generation
//! [`GenerationReport`]s and the eventual result. Every task owns its own
//! [`AbortSignal`], so aborting one task never affects another.

use super::config::validate_run;
use super::engine::{EvolutionEngine, EvolutionResult};
use super::error::EvolutionError;
use super::observer::{ChannelObserver, GenerationReport};
use super::termination::{AbortSignal, TerminationCondition};
use std::hash::Hash;
use std::sync::mpsc::{self, Receiver, TryIter};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Handle to an evolution run executing on a background thread.
pub struct EvolutionTask<C> {
    abort: AbortSignal,
    updates: Receiver<GenerationReport<C>>,
    handle: JoinHandle<Result<EvolutionResult<C>, EvolutionError>>,
}

impl<C> EvolutionEngine<C>
where
    C: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Starts the run on a thread named `evolution`.
    ///
    /// Run parameters are validated before the thread is started, so
    /// configuration errors are returned here rather than from
    /// [`EvolutionTask::join`]. The task's abort signal is appended to
    /// `conditions`, so unlike [`evolve`](Self::evolve) an empty set is
    /// accepted: the run then continues until it is aborted.
    pub fn spawn(
        mut self,
        population_size: usize,
        elite_count: usize,
        mut conditions: Vec<Box<dyn TerminationCondition>>,
    ) -> Result<EvolutionTask<C>, EvolutionError> {
        let abort = AbortSignal::new();
        conditions.push(Box::new(abort.clone()));

        validate_run(population_size, elite_count, 0, conditions.len())?;
        self.config().validate()?;

        let (tx, updates) = mpsc::channel();
        self.add_observer(ChannelObserver::new(tx));

        let handle = thread::Builder::new()
            .name("evolution".to_owned())
            .spawn(move || {
                debug!("evolution thread started");
                self.evolve_population(population_size, elite_count, &mut conditions)
            })?;

        Ok(EvolutionTask {
            abort,
            updates,
            handle,
        })
    }
}

impl<C> EvolutionTask<C> {
    /// Requests cancellation. The run stops at the next generation boundary.
    ///
    /// Returns `false` if the task was already aborted.
    pub fn abort(&self) -> bool {
        self.abort.abort()
    }

    /// A clone of the task's abort signal, for handing to other threads.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Blocking receiver of per-generation reports.
    ///
    /// The channel closes when the run ends.
    pub fn updates(&self) -> &Receiver<GenerationReport<C>> {
        &self.updates
    }

    /// Drains the reports available right now without blocking.
    pub fn try_updates(&self) -> TryIter<'_, GenerationReport<C>> {
        self.updates.try_iter()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run and returns its best candidate.
    pub fn join(self) -> Result<C, EvolutionError> {
        self.join_population().map(|result| result.best)
    }

    /// Waits for the run and returns the full [`EvolutionResult`].
    pub fn join_population(self) -> Result<EvolutionResult<C>, EvolutionError> {
        self.handle
            .join()
            .map_err(|_| EvolutionError::TaskPanicked)?
    }
}
