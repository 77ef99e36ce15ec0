use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("face encoding is empty")]
    EmptyEncoding,
    #[error("face encoding has a non-finite value at index {0}")]
    NonFiniteEncoding(usize),
    #[error("encoding length mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("similarity tolerance must be a finite, non-negative number (got {0})")]
    InvalidTolerance(f64),
}

/// Face region in the source image, in pixels.
///
/// Field order follows the extraction library: top, right, bottom, left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Location {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl From<[u32; 4]> for Location {
    fn from([top, right, bottom, left]: [u32; 4]) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl From<Location> for [u32; 4] {
    fn from(l: Location) -> Self {
        [l.top, l.right, l.bottom, l.left]
    }
}

/// One detected face: where it is and its descriptor vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDescriptor {
    pub location: Location,
    pub encoding: Vec<f64>,
}

impl FaceDescriptor {
    pub fn new(location: impl Into<Location>, encoding: Vec<f64>) -> Self {
        Self {
            location: location.into(),
            encoding,
        }
    }

    /// Reject empty encodings and NaN/infinite components.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.encoding.is_empty() {
            return Err(ValidationError::EmptyEncoding);
        }
        if let Some(idx) = self.encoding.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteEncoding(idx));
        }
        Ok(())
    }
}

/// A photo that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub url: String,
    pub faces: Vec<FaceDescriptor>,
}

impl NewPhoto {
    pub fn new(url: impl Into<String>, faces: Vec<FaceDescriptor>) -> Self {
        Self {
            url: url.into(),
            faces,
        }
    }
}

/// A persisted photo. Always holds at least one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub url: String,
    pub faces: Vec<FaceDescriptor>,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn encodings(&self) -> impl Iterator<Item = &[f64]> {
        self.faces.iter().map(|f| f.encoding.as_slice())
    }

    pub fn summary(&self) -> PhotoSummary {
        PhotoSummary {
            id: self.id,
            url: self.url.clone(),
        }
    }
}

/// `{id, url}` view of a stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSummary {
    pub id: i64,
    pub url: String,
}
