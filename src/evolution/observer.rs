//! Per-generation progress callbacks.
//!
//! Observers are notified synchronously, in registration order, after each
//! generation is evaluated. They only see a borrowed, read-only
//! [`PopulationData`]. A failing observer is logged and skipped; it never
//! stops or desynchronizes the run.
//!
//! Callbacks run on the engine's thread. [`ChannelObserver`] forwards owned
//! [`GenerationReport`]s over a channel for callers that must consume
//! progress on another thread (a UI event loop, for example).

use super::types::{PopulationData, PopulationStats};
use std::sync::mpsc::Sender;

/// Receives a snapshot after every generation.
pub trait EvolutionObserver<C>: Send {
    fn population_update(&mut self, data: &PopulationData<'_, C>) -> anyhow::Result<()>;
}

/// Observer backed by a closure. Created by [`from_fn`].
pub struct FnObserver<F>(F);

/// Wraps a closure as an [`EvolutionObserver`].
///
/// # Examples
///
/// ```ignore
/// engine.add_observer(observer::from_fn(|data: &PopulationData<'_, Genome>| {
///     println!("generation {}: {}", data.stats.generation, data.stats.best_fitness);
///     Ok(())
/// }));
/// ```
pub fn from_fn<C, F>(f: F) -> FnObserver<F>
where
    F: FnMut(&PopulationData<'_, C>) -> anyhow::Result<()> + Send,
{
    FnObserver(f)
}

impl<C, F> EvolutionObserver<C> for FnObserver<F>
where
    F: FnMut(&PopulationData<'_, C>) -> anyhow::Result<()> + Send,
{
    fn population_update(&mut self, data: &PopulationData<'_, C>) -> anyhow::Result<()> {
        (self.0)(data)
    }
}

/// Owned summary of one generation: its statistics and a copy of its best candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport<C> {
    pub stats: PopulationStats,
    pub best: C,
}

impl<C: Clone> GenerationReport<C> {
    pub fn from_data(data: &PopulationData<'_, C>) -> Self {
        Self {
            stats: data.stats.clone(),
            best: data.best_candidate().clone(),
        }
    }
}

/// Forwards a [`GenerationReport`] per generation to an mpsc channel.
///
/// A disconnected receiver is not an error: the run keeps going and reports
/// are dropped.
pub struct ChannelObserver<C> {
    sender: Sender<GenerationReport<C>>,
}

impl<C> ChannelObserver<C> {
    pub fn new(sender: Sender<GenerationReport<C>>) -> Self {
        Self { sender }
    }
}

impl<C: Clone + Send> EvolutionObserver<C> for ChannelObserver<C> {
    fn population_update(&mut self, data: &PopulationData<'_, C>) -> anyhow::Result<()> {
        if self.sender.send(GenerationReport::from_data(data)).is_err() {
            tracing::trace!(
                generation = data.stats.generation,
                "report receiver disconnected"
            );
        }
        Ok(())
    }
}
