//! Original-space neighbour orderings.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::schema::{ConfigError, Matrix, euclidean};

use super::similarity::argsort;

/// `instances x K` matrix: row `i` lists instance `i`'s K nearest neighbours
/// in the original space, nearest first.
///
/// Built once per run and shared read-only by every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighbourOrdering {
    instances: usize,
    neighbours: usize,
    indices: Vec<usize>,
}

impl NeighbourOrdering {
    /// Build from explicit rows.
    ///
    /// Rejects ragged rows, rows with fewer than two neighbours, and indices
    /// that do not name an instance.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self, ConfigError> {
        let instances = rows.len();
        let neighbours = rows.first().map_or(0, Vec::len);
        if neighbours < 2 {
            return Err(ConfigError::TooFewNeighbours(neighbours));
        }

        let mut indices = Vec::with_capacity(instances * neighbours);
        // Rows are checked in order, length before indices, so the first
        // offending row decides which error is reported.
        for row in rows {
            if row.len() != neighbours {
                return Err(ConfigError::RaggedOrdering);
            }
            if let Some(&index) = row.iter().find(|&&j| j >= instances) {
                return Err(ConfigError::NeighbourOutOfRange { index, instances });
            }
            indices.extend(row);
        }

        Ok(Self {
            instances,
            neighbours,
            indices,
        })
    }

    /// Compute the `k` nearest neighbours of every row of `data`, excluding
    /// the row itself. Ties are broken by instance index.
    pub fn from_dataset(data: &Matrix, k: usize) -> Result<Self, ConfigError> {
        let instances = data.rows();
        if k < 2 {
            return Err(ConfigError::TooFewNeighbours(k));
        }
        if instances <= k {
            return Err(ConfigError::DatasetTooSmall {
                instances,
                neighbours: k,
            });
        }

        let nearest = |i: usize| -> Vec<usize> {
            let anchor = data.row(i);
            let others: Vec<usize> = (0..instances).filter(|&j| j != i).collect();
            let dists: Vec<f64> = others
                .iter()
                .map(|&j| euclidean(anchor, data.row(j)))
                .collect();
            argsort(&dists)
                .into_iter()
                .take(k)
                .map(|pos| others[pos])
                .collect()
        };

        #[cfg(not(target_arch = "wasm32"))]
        let rows: Vec<Vec<usize>> = (0..instances).into_par_iter().map(nearest).collect();
        #[cfg(target_arch = "wasm32")]
        let rows: Vec<Vec<usize>> = (0..instances).map(nearest).collect();

        log::debug!("Computed {k} nearest neighbours for {instances} instances");
        Self::from_rows(rows)
    }

    /// Number of instances (rows).
    #[inline]
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// Neighbours per instance (K).
    #[inline]
    pub fn neighbours(&self) -> usize {
        self.neighbours
    }

    /// Neighbour indices of instance `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[i * self.neighbours..(i + 1) * self.neighbours]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.chunks_exact(self.neighbours)
    }
}

/// Reference ranking `[0, 1, ..., K-1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRank(Vec<usize>);

impl IdentityRank {
    pub fn new(k: usize) -> Self {
        Self((0..k).collect())
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
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl From<&NeighbourOrdering> for IdentityRank {
    fn from(ordering: &NeighbourOrdering) -> Self {
        Self::new(ordering.neighbours())
    }
}
