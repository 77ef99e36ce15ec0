//! Linear-scan search for stored photos that share a face with a target.

use crate::error::PhotierError;
use crate::extract::FaceExtractor;
use crate::matcher::FaceMatcher;
use crate::store::StoreHandle;
use crate::types::{FaceDescriptor, Photo, ValidationError};
use std::sync::Arc;

/// Photos in `photos` with at least one face similar to any of `target`.
///
/// Cost is `photos × faces per photo × target faces` comparisons. A photo
/// whose id equals `exclude` is skipped.
pub fn matching_photos(
    matcher: &FaceMatcher,
    target: &[FaceDescriptor],
    photos: Vec<Photo>,
    exclude: Option<i64>,
) -> Result<Vec<Photo>, ValidationError> {
    let target: Vec<&[f64]> = target.iter().map(|f| f.encoding.as_slice()).collect();
    let mut out = Vec::new();
    for photo in photos {
        if Some(photo.id) == exclude {
            continue;
        }
        if matcher.any_pair_similar(photo.encodings(), target.iter().copied())? {
            out.push(photo);
        }
    }
    Ok(out)
}

pub struct SimilarityEngine {
    store: StoreHandle,
    extractor: Arc<dyn FaceExtractor>,
    matcher: FaceMatcher,
}

impl SimilarityEngine {
    /// Queries compare faces with the same tolerance the store dedups with.
    pub fn new(store: StoreHandle, extractor: Arc<dyn FaceExtractor>) -> Self {
        Self {
            matcher: store.matcher(),
            store,
            extractor,
        }
    }

    /// Stored photos sharing a face with photo `id`, excluding that photo.
    pub async fn similar_to_photo_id(&self, id: i64) -> Result<Vec<Photo>, PhotierError> {
        let target = self.store.get_photo(id).await?;
        let photos = self.store.list_photos().await?;
        let found = matching_photos(&self.matcher, &target.faces, photos, Some(id))?;
        tracing::debug!(id, matches = found.len(), "similar by id");
        Ok(found)
    }

    /// Stored photos sharing a face with the image at `url`.
    ///
    /// The image is extracted on the fly and never stored. No photo is
    /// excluded, so a stored copy of the same URL is part of the result.
    pub async fn similar_to_external(&self, url: &str) -> Result<Vec<Photo>, PhotierError> {
        let faces = self.extractor.extract_faces(url).await?;
        for face in &faces {
            face.validate()?;
        }
        let photos = self.store.list_photos().await?;
        let found = matching_photos(&self.matcher, &faces, photos, None)?;
        tracing::debug!(url, faces = faces.len(), matches = found.len(), "similar by url");
        Ok(found)
    }
}
