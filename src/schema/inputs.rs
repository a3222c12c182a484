//! JSON input files consumed by the CLI.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Matrix;

/// Original high-dimensional dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// `instances x features`.
    pub data: Matrix,
    /// Class labels, carried through but unused by fitness evaluation.
    #[serde(default)]
    pub labels: Option<Vec<serde_json::Value>>,
}

/// One pre-computed tree-evaluator output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// `instances x trees`.
    pub embedding: Matrix,
    /// Mode-specific secondary value (runtime, complexity, norm).
    #[serde(default)]
    pub auxiliary: Option<f64>,
}

/// Errors reading input files.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, InputError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InputError::Parse {
        path: path.display().to_string(),
        source,
    })
}
