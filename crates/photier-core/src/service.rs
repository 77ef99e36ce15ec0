//! Operations exposed to the API, CLI and scheduler layers.

use crate::error::PhotierError;
use crate::extract::{CandidateFeed, FaceExtractor};
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::similarity::SimilarityEngine;
use crate::store::{StoreHandle, StoreStats};
use crate::types::{FaceDescriptor, Photo, PhotoSummary};
use serde::Serialize;
use std::sync::Arc;

/// A stored photo together with the photos sharing a face with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoDetail {
    pub id: i64,
    pub url: String,
    pub faces_count: usize,
    pub similar: Vec<PhotoSummary>,
}

/// Result of a lookup by external URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarByUrl {
    pub url: String,
    pub similar: Vec<PhotoSummary>,
}

/// A photo just created from a URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedPhoto {
    pub id: i64,
    pub url: String,
    pub faces: Vec<FaceDescriptor>,
    pub faces_count: usize,
}

impl From<Photo> for CreatedPhoto {
    fn from(p: Photo) -> Self {
        Self {
            id: p.id,
            url: p.url,
            faces_count: p.faces.len(),
            faces: p.faces,
        }
    }
}

pub struct Photier {
    store: StoreHandle,
    similarity: SimilarityEngine,
    pipeline: IngestionPipeline,
}

impl Photier {
    pub fn new(store: StoreHandle, extractor: Arc<dyn FaceExtractor>) -> Self {
        Self {
            similarity: SimilarityEngine::new(store.clone(), Arc::clone(&extractor)),
            pipeline: IngestionPipeline::new(store.clone(), extractor),
            store,
        }
    }

    /// Every stored photo, by id.
    pub async fn list_photos(&self) -> Result<Vec<PhotoSummary>, PhotierError> {
        let photos = self.store.list_photos().await?;
        Ok(photos.iter().map(Photo::summary).collect())
    }

    pub async fn photo_with_similar(&self, id: i64) -> Result<PhotoDetail, PhotierError> {
        let photo = self.store.get_photo(id).await?;
        let similar = self.similarity.similar_to_photo_id(id).await?;
        Ok(PhotoDetail {
            id: photo.id,
            url: photo.url,
            faces_count: photo.faces.len(),
            similar: similar.iter().map(Photo::summary).collect(),
        })
    }

    pub async fn similar_by_url(&self, url: &str) -> Result<SimilarByUrl, PhotierError> {
        let similar = self.similarity.similar_to_external(url).await?;
        Ok(SimilarByUrl {
            url: url.to_string(),
            similar: similar.iter().map(Photo::summary).collect(),
        })
    }

    /// Extract and store one URL, surfacing any failure to the caller.
    pub async fn create_photo(&self, url: &str) -> Result<CreatedPhoto, PhotierError> {
        let photo = self.pipeline.ingest_one(url).await?;
        tracing::info!(id = photo.id, url, "photo created");
        Ok(photo.into())
    }

    /// Ingest an explicit list of candidate URLs.
    pub async fn ingest_urls<I>(&self, urls: I) -> Result<IngestReport, PhotierError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.pipeline.run(urls).await
    }

    /// Pull candidates from `feed` and ingest them.
    pub async fn run_ingestion(&self, feed: &dyn CandidateFeed) -> Result<IngestReport, PhotierError> {
        let candidates = feed.fetch_candidate_urls().await?;
        tracing::info!(candidates = candidates.len(), "ingestion batch started");
        self.pipeline.run(candidates).await
    }

    pub async fn stats(&self) -> Result<StoreStats, PhotierError> {
        Ok(self.store.stats().await?)
    }
}
