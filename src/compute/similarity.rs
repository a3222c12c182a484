//! Neighbourhood-structure similarity between an embedding and the original
//! space.
//!
//! For each instance the distances to its K original-space neighbours are
//! measured in the embedding, ranked, and compared against the identity
//! ranking with Spearman's rank correlation. A collapsed embedding makes the
//! distances tie, which is tracked separately as a uniqueness ratio.

use crate::schema::{Matrix, euclidean};

use super::neighbours::{IdentityRank, NeighbourOrdering};

/// Result of a similarity evaluation. This is what the cache stores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScore {
    /// Mean rank correlation over all instances, in `[-1, 1]`.
    pub cost: f64,
    /// Mean fraction of distinct neighbour distances, in `[0, 1]`.
    pub uniqueness_ratio: f64,
}

/// Spearman rank correlation between two permutations of `0..n`.
///
/// `rho = 1 - 6 * sum(d^2) / (n * (n^2 - 1))`. For `n < 2` the denominator
/// vanishes and the neutral value `0.0` is returned.
pub fn spearman(a: &[usize], b: &[usize]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    if n < 2 {
        return 0.0;
    }

    let sum_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    let n = n as f64;
    1.0 - 6.0 * sum_sq / (n * (n * n - 1.0))
}

/// Indices that sort `values` ascending. Ties keep their original order.
pub fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Number of distinct values, compared exactly.
pub fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    // NaN != NaN, so every NaN counts as its own value
    sorted.dedup_by(|a, b| a == b);
    sorted.len()
}

/// Score how well `embedding` preserves the neighbour ordering.
///
/// `embedding` must have one row per row of `ordering`. The caller checks the
/// shape; this function is the cached hot path.
///
/// An all-NaN embedding scores as perfect: every NaN distance counts as
/// distinct and the stable argsort leaves equal NaNs in neighbour order.
pub fn evaluate_similarity(
    ordering: &NeighbourOrdering,
    identity: &IdentityRank,
    embedding: &Matrix,
) -> SimilarityScore {
    let n_instances = ordering.instances();
    let k = ordering.neighbours();
    if n_instances == 0 || k == 0 {
        return SimilarityScore {
            cost: 0.0,
            uniqueness_ratio: 0.0,
        };
    }

    let mut rho_sum = 0.0;
    let mut unique_sum = 0.0;
    let mut pair_dists = vec![0.0; k];

    for (i, neighbours) in ordering.iter_rows().enumerate() {
        let anchor = embedding.row(i);
        for (dist, &j) in pair_dists.iter_mut().zip(neighbours) {
            *dist = euclidean(anchor, embedding.row(j));
        }

        unique_sum += count_distinct(&pair_dists) as f64 / k as f64;

        let observed = argsort(&pair_dists);
        rho_sum += spearman(identity.as_slice(), &observed);
    }

    SimilarityScore {
        cost: rho_sum / n_instances as f64,
        uniqueness_ratio: unique_sum / n_instances as f64,
    }
}
