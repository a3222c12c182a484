//! Schema module - Configuration, matrix and input types for fitness evaluation.

mod config;
mod inputs;
mod matrix;

pub use config::*;
pub use inputs::*;
pub use matrix::*;
