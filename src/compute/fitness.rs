//! Composition of the multi-objective fitness vector.

use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, ObjectiveMode};

use super::cache::CacheError;
use super::similarity::SimilarityScore;

/// Uniqueness ratio below which an embedding counts as collapsed.
pub const DEGENERACY_THRESHOLD: f64 = 0.9;

/// Base of the degenerate penalty, `DEGENERATE_BASE - uniqueness_ratio`.
/// Keeps every degenerate loss above any non-degenerate one.
pub const DEGENERATE_BASE: f64 = 2.0;

/// Fitness evaluation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitnessError {
    #[error("Number of objectives is {0}, should be 2 or 3")]
    InvalidObjectiveCount(usize),
    #[error("Objective mode '{mode}' cannot produce {num_objectives} objectives")]
    UnsupportedObjectiveCount {
        mode: ObjectiveMode,
        num_objectives: usize,
    },
    #[error("Embedding has {rows} rows, neighbour ordering has {instances} instances")]
    ShapeMismatch { rows: usize, instances: usize },
    #[error("Objective mode '{0}' needs an auxiliary value from the tree evaluator")]
    MissingAuxiliary(ObjectiveMode),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Minimized objectives handed to the selection algorithm.
///
/// Always 2 or 3 values; the first is the neighbourhood loss in `[0, 2]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FitnessVector(Vec<f64>);

impl<'de> Deserialize<'de> for FitnessVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<f64>::deserialize(deserializer)?;
        if !(2..=3).contains(&values.len()) {
            return Err(serde::de::Error::invalid_length(
                values.len(),
                &"2 or 3 objectives",
            ));
        }
        Ok(Self(values))
    }
}

impl FitnessVector {
    /// Neighbourhood-structure loss.
    #[inline]
    pub fn loss(&self) -> f64 {
        self.0[0]
    }

    /// Mode-specific second objective.
    #[inline]
    pub fn secondary(&self) -> f64 {
        self.0[1]
    }

    /// Embedding dimensionality, when three objectives are in use.
    #[inline]
    pub fn tertiary(&self) -> Option<f64> {
        self.0.get(2).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Whether the loss came from the degenerate branch.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.loss() > 1.0
    }
}

/// Map a correlation in `[-1, 1]` to a loss in `[0, 1]`, 0 being perfect.
#[inline]
pub fn normalized_loss(cost: f64) -> f64 {
    (1.0 - cost) / 2.0
}

/// Combines a similarity score with the run's secondary objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitnessComposer {
    pub mode: ObjectiveMode,
    pub num_objectives: usize,
}

impl FitnessComposer {
    pub fn new(mode: ObjectiveMode, num_objectives: usize) -> Self {
        Self {
            mode,
            num_objectives,
        }
    }

    /// Build the fitness vector.
    ///
    /// `secondary` is the mode's objective (tree count, runtime, complexity
    /// or regularisation norm). `dimensionality` is only reported in
    /// functional mode with three objectives.
    pub fn compose(
        &self,
        score: SimilarityScore,
        secondary: f64,
        dimensionality: usize,
    ) -> Result<FitnessVector, FitnessError> {
        let tertiary = match self.num_objectives {
            2 => None,
            3 if self.mode.supports_tertiary() => Some(dimensionality as f64),
            3 => {
                return Err(FitnessError::UnsupportedObjectiveCount {
                    mode: self.mode,
                    num_objectives: 3,
                });
            }
            n => return Err(FitnessError::InvalidObjectiveCount(n)),
        };

        let loss = if score.uniqueness_ratio < DEGENERACY_THRESHOLD {
            // Lower ratio is worse, and always worse than a valid embedding
            DEGENERATE_BASE - score.uniqueness_ratio
        } else {
            let loss = normalized_loss(score.cost);
            if loss == 0.0 {
                log::info!("Perfect neighbourhood preservation ({} mode)", self.mode);
            }
            loss
        };

        let mut values = Vec::with_capacity(self.num_objectives);
        values.push(loss);
        values.push(secondary);
        values.extend(tertiary);
        Ok(FitnessVector(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_MODES: [ObjectiveMode; 4] = [
        ObjectiveMode::TreeCount,
        ObjectiveMode::Runtime,
        ObjectiveMode::Functional,
        ObjectiveMode::RegularizationNorm,
    ];

    fn score(cost: f64, uniqueness_ratio: f64) -> SimilarityScore {
        SimilarityScore {
            cost,
            uniqueness_ratio,
        }
    }

    #[test]
    fn test_perfect_and_reversed_loss() {
        let composer = FitnessComposer::new(ObjectiveMode::TreeCount, 2);
        let perfect = composer.compose(score(1.0, 1.0), 3.0, 3).unwrap();
        assert_eq!(perfect.as_slice(), &[0.0, 3.0]);

        let reversed = composer.compose(score(-1.0, 1.0), 3.0, 3).unwrap();
        assert_eq!(reversed.loss(), 1.0);
        assert!(!reversed.is_degenerate());
    }

    #[test]
    fn test_degenerate_override() {
        let composer = FitnessComposer::new(ObjectiveMode::Runtime, 2);
        // A "perfect" correlation does not rescue a collapsed embedding.
        let fitness = composer.compose(score(1.0, 0.5), 0.02, 4).unwrap();
        assert_eq!(fitness.as_slice(), &[1.5, 0.02]);
        assert!(fitness.is_degenerate());
    }

    #[test]
    fn test_threshold_is_inclusive_for_valid() {
        let composer = FitnessComposer::new(ObjectiveMode::TreeCount, 2);
        let at = composer.compose(score(0.5, 0.9), 1.0, 1).unwrap();
        assert_eq!(at.loss(), 0.25);
        let below = composer.compose(score(0.5, 0.89), 1.0, 1).unwrap();
        assert!((below.loss() - 1.11).abs() < 1e-12);
    }

    #[test]
    fn test_functional_objective_counts() {
        let two = FitnessComposer::new(ObjectiveMode::Functional, 2)
            .compose(score(0.0, 1.0), 42.0, 5)
            .unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two.tertiary(), None);

        let three = FitnessComposer::new(ObjectiveMode::Functional, 3)
            .compose(score(0.0, 1.0), 42.0, 5)
            .unwrap();
        assert_eq!(three.as_slice(), &[0.5, 42.0, 5.0]);

        let degenerate = FitnessComposer::new(ObjectiveMode::Functional, 3)
            .compose(score(0.0, 0.25), 42.0, 5)
            .unwrap();
        assert_eq!(degenerate.as_slice(), &[1.75, 42.0, 5.0]);
    }

    #[test]
    fn test_invalid_objective_count_every_mode() {
        for mode in ALL_MODES {
            for ratio in [1.0, 0.1] {
                let err = FitnessComposer::new(mode, 4)
                    .compose(score(0.0, ratio), 1.0, 1)
                    .unwrap_err();
                assert_eq!(err, FitnessError::InvalidObjectiveCount(4));
            }
        }
    }

    #[test]
    fn test_three_objectives_only_in_functional_mode() {
        for mode in ALL_MODES {
            let result = FitnessComposer::new(mode, 3).compose(score(0.0, 1.0), 1.0, 1);
            if mode == ObjectiveMode::Functional {
                assert!(result.is_ok());
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    FitnessError::UnsupportedObjectiveCount {
                        mode,
                        num_objectives: 3
                    }
                );
            }
        }
    }

    #[test]
    fn test_serialization() {
        let fitness = FitnessComposer::new(ObjectiveMode::Functional, 3)
            .compose(score(1.0, 1.0), 2.5, 2)
            .unwrap();
        assert_eq!(serde_json::to_string(&fitness).unwrap(), "[0.0,2.5,2.0]");

        let parsed: FitnessVector = serde_json::from_str("[0.0,2.5,2.0]").unwrap();
        assert_eq!(parsed, fitness);
    }

    #[test]
    fn test_deserialize_rejects_wrong_length() {
        for json in ["[]", "[0.5]", "[0.5,1.0,2.0,3.0]"] {
            assert!(
                serde_json::from_str::<FitnessVector>(json).is_err(),
                "{json} should not parse"
            );
        }
        let fitness: FitnessVector = serde_json::from_str("[1.5,4.0]").unwrap();
        assert!(fitness.is_degenerate());
        assert_eq!(fitness.tertiary(), None);
    }

    proptest! {
        #[test]
        fn prop_loss_ranges_never_overlap(
            cost in -1.0f64..=1.0,
            ratio in 0.0f64..=1.0,
            secondary in 0.0f64..1e6,
        ) {
            let fitness = FitnessComposer::new(ObjectiveMode::TreeCount, 2)
                .compose(score(cost, ratio), secondary, 1)
                .unwrap();
            if ratio < DEGENERACY_THRESHOLD {
                prop_assert!(fitness.loss() > 1.0 && fitness.loss() <= 2.0);
            } else {
                prop_assert!((0.0..=1.0).contains(&fitness.loss()));
            }
            prop_assert_eq!(fitness.secondary(), secondary);
        }
    }
}
