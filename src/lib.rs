//! GP-MaL fitness core - Neighbourhood-structure fitness for evolved embeddings.
//!
//! Genetic programming for manifold learning evolves sets of expression trees
//! that map a high-dimensional dataset to a low-dimensional embedding. This
//! crate scores those embeddings: how well each instance's nearest-neighbour
//! ordering from the original space survives, with a hard penalty for
//! collapsed embeddings, combined with a second (and optionally third)
//! objective into a vector for multi-objective selection.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Run configuration, matrices and JSON inputs
//! - `compute`: Neighbour orderings, similarity metric, evaluation cache and
//!   fitness composition
//!
//! Evaluations are memoized by embedding *content*: individuals that evaluate
//! to bit-identical embeddings share one cache entry.
//!
//! # Example
//!
//! ```rust,no_run
//! use gpmal::{
//!     compute::{RunContext, TreeOutput, evaluate_output},
//!     schema::{Matrix, ObjectiveMode, RunConfig},
//! };
//!
//! let data = Matrix::from_rows(&[[0.0, 0.1], [1.0, 0.9], [3.2, 3.0], [7.0, 6.5]]).unwrap();
//! let config = RunConfig {
//!     objective: ObjectiveMode::TreeCount,
//!     num_objectives: 2,
//!     neighbours: 2,
//!     ..Default::default()
//! };
//! let ctx = RunContext::from_dataset(config, &data).unwrap();
//!
//! // One tree projecting onto the first feature
//! let embedding = Matrix::column(vec![0.0, 1.0, 3.2, 7.0]);
//! let fitness = evaluate_output(&ctx, &TreeOutput::new(embedding)).unwrap();
//!
//! println!("Neighbourhood loss: {:.3}", fitness.loss());
//! println!("{}", ctx.report());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{
    ContentKey, EvaluationCache, FitnessComposer, FitnessError, FitnessEvaluator, FitnessVector,
    RunContext, TreeEvaluator, TreeOutput,
};
pub use schema::{Matrix, ObjectiveMode, RunConfig};
