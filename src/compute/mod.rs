//! Compute module - Neighbourhood similarity, memoization and fitness composition.

mod cache;
mod context;
mod evaluator;
mod fitness;
mod key;
mod neighbours;
mod similarity;

pub use cache::*;
pub use context::*;
pub use evaluator::*;
pub use fitness::*;
pub use key::*;
pub use neighbours::*;
pub use similarity::*;
