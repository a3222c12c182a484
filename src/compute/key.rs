//! Content-addressed cache keys for embeddings.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::schema::Matrix;

/// Value-equality key over a matrix snapshot.
///
/// Two keys are equal iff both shapes match and every value is
/// bit-identical. There is no epsilon: `0.0` and `-0.0` are different keys,
/// and a NaN equals a NaN with the same bit pattern. Tiny perturbations in a
/// nearly-collapsed embedding change its fitness, so they must not share an
/// entry.
#[derive(Debug, Clone)]
pub struct ContentKey {
    shape: (usize, usize),
    bits: Box<[u64]>,
    digest: u64,
}

impl ContentKey {
    /// Snapshot the contents of `matrix`.
    pub fn new(matrix: &Matrix) -> Self {
        let bits: Box<[u64]> = matrix.as_slice().iter().map(|v| v.to_bits()).collect();
        let shape = matrix.shape();

        // DefaultHasher::new() uses fixed keys, so the digest is stable
        // for the process lifetime.
        let mut hasher = DefaultHasher::new();
        shape.hash(&mut hasher);
        bits.hash(&mut hasher);
        let digest = hasher.finish();

        Self {
            shape,
            bits,
            digest,
        }
    }

    /// Shape of the matrix this key was taken from.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Precomputed content digest.
    #[inline]
    pub fn digest(&self) -> u64 {
        self.digest
    }
}

impl From<&Matrix> for ContentKey {
    fn from(matrix: &Matrix) -> Self {
        Self::new(matrix)
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.shape == other.shape && self.bits == other.bits
    }
}

impl Eq for ContentKey {}

impl Hash for ContentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.digest);
    }
}
