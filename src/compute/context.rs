//! Per-run evaluation context.

use std::sync::Arc;

use crate::schema::{ConfigError, Matrix, ObjectiveMode, RunConfig};

use super::cache::{CacheStats, EvaluationCache};
use super::fitness::FitnessComposer;
use super::neighbours::{IdentityRank, NeighbourOrdering};

/// Everything an evaluation needs, fixed before the evolutionary loop starts.
///
/// The ordering and identity rank are read-only and shared through `Arc`;
/// the only mutable state is inside the cache, behind its own locks. Pass the
/// context by reference into every evaluation call.
pub struct RunContext {
    config: RunConfig,
    ordering: Arc<NeighbourOrdering>,
    identity: Arc<IdentityRank>,
    cache: EvaluationCache,
}

impl RunContext {
    /// Create a context from a validated config and a prebuilt ordering.
    ///
    /// K is taken from `ordering`; `config.neighbours` only applies to
    /// [`RunContext::from_dataset`].
    pub fn new(config: RunConfig, ordering: NeighbourOrdering) -> Result<Self, ConfigError> {
        config.validate()?;
        let identity = IdentityRank::from(&ordering);
        let cache = EvaluationCache::from_config(&config.cache);

        log::info!(
            "Run context: {} objectives ({} mode), {} instances x {} neighbours, cache {}",
            config.num_objectives,
            config.objective,
            ordering.instances(),
            ordering.neighbours(),
            if cache.is_enabled() { "enabled" } else { "disabled" },
        );

        Ok(Self {
            config,
            ordering: Arc::new(ordering),
            identity: Arc::new(identity),
            cache,
        })
    }

    /// Compute the neighbour ordering from the original dataset, using
    /// `config.neighbours` as K.
    pub fn from_dataset(config: RunConfig, data: &Matrix) -> Result<Self, ConfigError> {
        config.validate()?;
        let ordering = NeighbourOrdering::from_dataset(data, config.neighbours)?;
        Self::new(config, ordering)
    }

    #[inline]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[inline]
    pub fn objective(&self) -> ObjectiveMode {
        self.config.objective
    }

    #[inline]
    pub fn ordering(&self) -> &NeighbourOrdering {
        &self.ordering
    }

    /// Shared handle to the ordering for other workers.
    pub fn ordering_handle(&self) -> Arc<NeighbourOrdering> {
        Arc::clone(&self.ordering)
    }

    #[inline]
    pub fn identity(&self) -> &IdentityRank {
        &self.identity
    }

    #[inline]
    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// Composer for this run's objective mode and count.
    pub fn composer(&self) -> FitnessComposer {
        FitnessComposer::new(self.config.objective, self.config.num_objectives)
    }

    /// Log and return the cache counters. Call at the end of a run.
    pub fn report(&self) -> CacheStats {
        let stats = self.cache.stats();
        log::info!("{stats}");
        stats
    }
}
