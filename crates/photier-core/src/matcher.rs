//! Face descriptor comparison.
//!
//! Two descriptors are the same face when the Euclidean distance between
//! their encodings is at most the tolerance.

use crate::types::ValidationError;

/// Default tolerance of the extraction library (lower is stricter).
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Euclidean distance between two encodings of equal length.
pub fn face_distance(a: &[f64], b: &[f64]) -> Result<f64, ValidationError> {
    if a.len() != b.len() {
        return Err(ValidationError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// Threshold comparator for face encodings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMatcher {
    tolerance: f64,
}

impl Default for FaceMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl FaceMatcher {
    pub fn new(tolerance: f64) -> Result<Self, ValidationError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ValidationError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn similar(&self, a: &[f64], b: &[f64]) -> Result<bool, ValidationError> {
        Ok(face_distance(a, b)? <= self.tolerance)
    }

    /// True if `candidate` is similar to any encoding in `pool`.
    /// Stops at the first match; an empty pool never matches.
    pub fn any_similar<'a, I>(&self, candidate: &[f64], pool: I) -> Result<bool, ValidationError>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        for other in pool {
            if self.similar(candidate, other)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if some encoding of `a` is similar to some encoding of `b`.
    pub fn any_pair_similar<'a, 'b, A, B>(&self, a: A, b: B) -> Result<bool, ValidationError>
    where
        A: IntoIterator<Item = &'a [f64]>,
        B: IntoIterator<Item = &'b [f64]> + Clone,
    {
        for candidate in a {
            if self.any_similar(candidate, b.clone())? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
