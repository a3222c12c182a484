//! Fitness evaluation of individuals: tree output to fitness vector.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::schema::{Embedding, ObjectiveMode};

use super::cache::CacheSlot;
use super::context::RunContext;
use super::fitness::{FitnessError, FitnessVector};
use super::key::ContentKey;
use super::similarity::evaluate_similarity;

/// Cache slot holding neighbourhood similarity scores.
pub const SIMILARITY_SLOT: CacheSlot = CacheSlot::Use(0);

/// What the tree evaluator produces for one individual.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeOutput {
    /// `instances x trees` embedding.
    pub embedding: Embedding,
    /// Runtime, functional complexity or regularisation norm, depending on
    /// the objective mode. Unused in tree-count mode.
    pub auxiliary: Option<f64>,
}

impl TreeOutput {
    pub fn new(embedding: Embedding) -> Self {
        Self {
            embedding,
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, value: f64) -> Self {
        self.auxiliary = Some(value);
        self
    }

    /// Number of trees, one per embedding column.
    #[inline]
    pub fn tree_count(&self) -> usize {
        self.embedding.cols()
    }

    /// Secondary objective for `mode`.
    pub fn secondary(&self, mode: ObjectiveMode) -> Result<f64, FitnessError> {
        match mode {
            ObjectiveMode::TreeCount => Ok(self.tree_count() as f64),
            _ => self.auxiliary.ok_or(FitnessError::MissingAuxiliary(mode)),
        }
    }
}

/// Builds and executes an individual's expression trees.
///
/// Implemented by the GP system that owns the individuals. Must be callable
/// from several worker threads at once.
pub trait TreeEvaluator: Sync {
    type Individual: Sync;

    /// Evaluate every tree of `individual` over the dataset, measuring the
    /// auxiliary value `mode` needs.
    fn evaluate(&self, individual: &Self::Individual, mode: ObjectiveMode) -> TreeOutput;
}

/// Score a tree output, memoizing the similarity metric in [`SIMILARITY_SLOT`].
pub fn evaluate_output(
    ctx: &RunContext,
    output: &TreeOutput,
) -> Result<FitnessVector, FitnessError> {
    evaluate_output_in(ctx, output, SIMILARITY_SLOT)
}

/// Score a tree output using an explicit cache slot. Use
/// [`CacheSlot::Bypass`] for one-off evaluations that must not be stored.
pub fn evaluate_output_in(
    ctx: &RunContext,
    output: &TreeOutput,
    slot: CacheSlot,
) -> Result<FitnessVector, FitnessError> {
    let embedding = &output.embedding;
    let ordering = ctx.ordering();
    if embedding.rows() != ordering.instances() {
        return Err(FitnessError::ShapeMismatch {
            rows: embedding.rows(),
            instances: ordering.instances(),
        });
    }
    let secondary = output.secondary(ctx.objective())?;

    let key = ContentKey::new(embedding);
    let score = ctx.cache().lookup_or_compute(key, slot, || {
        evaluate_similarity(ordering, ctx.identity(), embedding)
    })?;

    ctx.composer().compose(score, secondary, output.tree_count())
}

/// Evaluates individuals against a run context.
pub struct FitnessEvaluator<'a, T: TreeEvaluator> {
    ctx: &'a RunContext,
    trees: T,
}

impl<'a, T: TreeEvaluator> FitnessEvaluator<'a, T> {
    pub fn new(ctx: &'a RunContext, trees: T) -> Self {
        Self { ctx, trees }
    }

    pub fn context(&self) -> &RunContext {
        self.ctx
    }

    /// Evaluate a single individual.
    pub fn evaluate(&self, individual: &T::Individual) -> Result<FitnessVector, FitnessError> {
        let output = self.trees.evaluate(individual, self.ctx.objective());
        evaluate_output(self.ctx, &output)
    }

    /// Evaluate a population in parallel. The first error aborts the batch.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn evaluate_batch(
        &self,
        population: &[T::Individual],
    ) -> Result<Vec<FitnessVector>, FitnessError> {
        population
            .par_iter()
            .map(|individual| self.evaluate(individual))
            .collect()
    }

    #[cfg(target_arch = "wasm32")]
    pub fn evaluate_batch(
        &self,
        population: &[T::Individual],
    ) -> Result<Vec<FitnessVector>, FitnessError> {
        // Sequential evaluation for WASM
        population
            .iter()
            .map(|individual| self.evaluate(individual))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::neighbours::NeighbourOrdering;
    use crate::schema::{CacheConfig, Matrix, RunConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Ordering whose nearest-first rows match `line()` exactly.
    fn forward_ordering() -> NeighbourOrdering {
        NeighbourOrdering::from_rows(vec![
            vec![1, 2, 3],
            vec![0, 2, 3],
            vec![1, 0, 3],
            vec![2, 1, 0],
        ])
        .unwrap()
    }

    fn line() -> Matrix {
        Matrix::column(vec![0.0, 1.0, 3.0, 7.0])
    }

    fn context(objective: ObjectiveMode, num_objectives: usize, enabled: bool) -> RunContext {
        let config = RunConfig {
            objective,
            num_objectives,
            cache: CacheConfig {
                enabled,
                ..Default::default()
            },
            ..Default::default()
        };
        RunContext::new(config, forward_ordering()).unwrap()
    }

    /// Individuals are just scale factors applied to a fixed line of points.
    struct ScaledLine {
        calls: AtomicUsize,
    }

    impl TreeEvaluator for ScaledLine {
        type Individual = f64;

        fn evaluate(&self, scale: &f64, _mode: ObjectiveMode) -> TreeOutput {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let values = line().as_slice().iter().map(|v| v * scale).collect();
            TreeOutput::new(Matrix::column(values)).with_auxiliary(scale.abs())
        }
    }

    #[test]
    fn test_perfect_embedding() {
        let ctx = context(ObjectiveMode::TreeCount, 2, true);
        let fitness = evaluate_output(&ctx, &TreeOutput::new(line())).unwrap();
        assert_eq!(fitness.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn test_reversed_neighbourhoods() {
        let ordering = NeighbourOrdering::from_rows(vec![
            vec![3, 2, 1],
            vec![3, 2, 0],
            vec![3, 0, 1],
            vec![0, 1, 2],
        ])
        .unwrap();
        let config = RunConfig {
            objective: ObjectiveMode::TreeCount,
            num_objectives: 2,
            ..Default::default()
        };
        let ctx = RunContext::new(config, ordering).unwrap();
        let fitness = evaluate_output(&ctx, &TreeOutput::new(line())).unwrap();
        assert_eq!(fitness.loss(), 1.0);
    }

    #[test]
    fn test_content_equal_outputs_hit_cache() {
        let ctx = context(ObjectiveMode::Runtime, 2, true);
        let a = TreeOutput::new(line()).with_auxiliary(0.5);
        let b = TreeOutput::new(line()).with_auxiliary(0.7);

        let fa = evaluate_output(&ctx, &a).unwrap();
        let fb = evaluate_output(&ctx, &b).unwrap();

        // Same loss from the shared entry, each keeps its own runtime
        assert_eq!(fa.loss(), fb.loss());
        assert_eq!(fa.secondary(), 0.5);
        assert_eq!(fb.secondary(), 0.7);

        let stats = ctx.cache().stats();
        assert_eq!(stats.accesses, 2);
        assert_eq!(stats.stores, 1);
    }

    #[test]
    fn test_bypass_slot_does_not_store() {
        let ctx = context(ObjectiveMode::TreeCount, 2, true);
        evaluate_output_in(&ctx, &TreeOutput::new(line()), CacheSlot::Bypass).unwrap();
        assert_eq!(ctx.cache().stats().entries, 0);
    }

    #[test]
    fn test_disabled_cache_still_scores() {
        let ctx = context(ObjectiveMode::TreeCount, 2, false);
        for _ in 0..2 {
            let fitness = evaluate_output(&ctx, &TreeOutput::new(line())).unwrap();
            assert_eq!(fitness.loss(), 0.0);
        }
        assert_eq!(ctx.cache().stats().entries, 0);
    }

    #[test]
    fn test_missing_auxiliary() {
        let ctx = context(ObjectiveMode::Functional, 3, true);
        let err = evaluate_output(&ctx, &TreeOutput::new(line())).unwrap_err();
        assert_eq!(err, FitnessError::MissingAuxiliary(ObjectiveMode::Functional));
    }

    #[test]
    fn test_shape_mismatch() {
        let ctx = context(ObjectiveMode::TreeCount, 2, true);
        let short = TreeOutput::new(Matrix::column(vec![0.0, 1.0]));
        assert_eq!(
            evaluate_output(&ctx, &short).unwrap_err(),
            FitnessError::ShapeMismatch {
                rows: 2,
                instances: 4
            }
        );
    }

    #[test]
    fn test_functional_three_objectives() {
        let ctx = context(ObjectiveMode::Functional, 3, true);
        let embedding =
            Matrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [3.0, 0.0], [7.0, 0.0]]).unwrap();
        let output = TreeOutput::new(embedding).with_auxiliary(12.0);
        let fitness = evaluate_output(&ctx, &output).unwrap();
        assert_eq!(fitness.as_slice(), &[0.0, 12.0, 2.0]);
    }

    #[test]
    fn test_collapsed_embedding_is_penalized() {
        let ctx = context(ObjectiveMode::TreeCount, 2, true);
        let collapsed = TreeOutput::new(Matrix::column(vec![1.0; 4]));
        let fitness = evaluate_output(&ctx, &collapsed).unwrap();
        assert!(fitness.is_degenerate());
        assert!((fitness.loss() - (2.0 - 1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_batch() {
        let ctx = context(ObjectiveMode::Runtime, 2, true);
        let evaluator = FitnessEvaluator::new(
            &ctx,
            ScaledLine {
                calls: AtomicUsize::new(0),
            },
        );

        // Repeated scales produce bit-identical embeddings
        let population = vec![1.0, 2.0, 1.0, 2.0, 0.0, -1.0];
        let fitness = evaluator.evaluate_batch(&population).unwrap();

        assert_eq!(fitness.len(), population.len());
        assert_eq!(fitness[0], fitness[2]);
        assert_eq!(fitness[0].loss(), 0.0);
        // Scale 0 collapses every point
        assert!(fitness[4].is_degenerate());
        // Mirroring preserves distances
        assert_eq!(fitness[5].loss(), 0.0);

        assert_eq!(evaluator.trees.calls.load(Ordering::Relaxed), population.len());
        let stats = evaluator.context().cache().stats();
        assert_eq!(stats.accesses, 6);
        assert_eq!(stats.entries, 4);
    }
}
