//! Run configuration for fitness evaluation.

use serde::{Deserialize, Serialize};

/// Which secondary objective is threaded through the fitness vector.
///
/// Chosen once per run, never per individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    /// Number of trees in the individual.
    #[serde(rename = "size")]
    TreeCount,
    /// Median tree runtime.
    #[serde(rename = "time")]
    Runtime,
    /// Functional complexity of the expressions, optionally with
    /// embedding dimensionality as a third objective.
    #[default]
    Functional,
    /// Tikhonov regularisation norm of the tree gradients.
    #[serde(rename = "tikhonov")]
    RegularizationNorm,
}

impl ObjectiveMode {
    /// Whether this mode can report a third (dimensionality) objective.
    #[inline]
    pub fn supports_tertiary(self) -> bool {
        matches!(self, ObjectiveMode::Functional)
    }

    /// Short name used in config files and logs.
    pub fn name(self) -> &'static str {
        match self {
            ObjectiveMode::TreeCount => "size",
            ObjectiveMode::Runtime => "time",
            ObjectiveMode::Functional => "functional",
            ObjectiveMode::RegularizationNorm => "tikhonov",
        }
    }
}

impl std::fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level configuration for a fitness-evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Secondary objective.
    #[serde(default)]
    pub objective: ObjectiveMode,
    /// Length of the fitness vector (2 or 3).
    #[serde(default = "default_num_objectives")]
    pub num_objectives: usize,
    /// Neighbours per instance (K) used for the neighbour ordering.
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
    /// Memoization settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            objective: ObjectiveMode::default(),
            num_objectives: default_num_objectives(),
            neighbours: default_neighbours(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_num_objectives() -> usize {
    3
}
fn default_neighbours() -> usize {
    10
}

/// Evaluation cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to recompute every evaluation.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Number of independent slots.
    #[serde(default = "default_cache_slots")]
    pub slots: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            slots: default_cache_slots(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_slots() -> usize {
    1
}

impl RunConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.num_objectives {
            2 => {}
            3 if self.objective.supports_tertiary() => {}
            3 => return Err(ConfigError::TertiaryUnsupported(self.objective)),
            n => return Err(ConfigError::InvalidObjectiveCount(n)),
        }
        if self.neighbours < 2 {
            return Err(ConfigError::TooFewNeighbours(self.neighbours));
        }
        if self.cache.slots == 0 {
            return Err(ConfigError::NoCacheSlots);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Number of objectives is {0}, should be 2 or 3")]
    InvalidObjectiveCount(usize),
    #[error("Objective mode '{0}' has no third objective")]
    TertiaryUnsupported(ObjectiveMode),
    #[error("At least 2 neighbours are required for rank correlation, got {0}")]
    TooFewNeighbours(usize),
    #[error("Dataset has {instances} instances, cannot take {neighbours} neighbours each")]
    DatasetTooSmall { instances: usize, neighbours: usize },
    #[error("Neighbour ordering rows must have equal length")]
    RaggedOrdering,
    #[error("Neighbour index {index} out of range for {instances} instances")]
    NeighbourOutOfRange { index: usize, instances: usize },
    #[error("Cache must have at least one slot")]
    NoCacheSlots,
}
