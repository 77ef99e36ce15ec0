//! Batch ingestion of candidate photo URLs.
//!
//! A failing URL never aborts the batch: its error is recorded in the
//! [`IngestReport`] and logged, and the next URL is processed.

use crate::error::{ErrorKind, PhotierError};
use crate::extract::FaceExtractor;
use crate::store::StoreHandle;
use crate::types::{NewPhoto, Photo};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A URL that was not ingested, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemIssue {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemIssue {
    fn new(url: String, err: &PhotierError) -> Self {
        Self {
            url,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Photos newly stored by this batch.
    pub inserted: usize,
    /// Candidates whose URL was already stored when the batch started.
    pub already_known: usize,
    /// Expected rejections: no face in the image, or the URL was stored
    /// concurrently.
    pub skipped: Vec<ItemIssue>,
    pub failures: Vec<ItemIssue>,
}

pub struct IngestionPipeline {
    store: StoreHandle,
    extractor: Arc<dyn FaceExtractor>,
}

impl IngestionPipeline {
    pub fn new(store: StoreHandle, extractor: Arc<dyn FaceExtractor>) -> Self {
        Self { store, extractor }
    }

    /// Extract and store a single URL. Errors are returned, not recorded.
    pub async fn ingest_one(&self, url: &str) -> Result<Photo, PhotierError> {
        let faces = self.extractor.extract_faces(url).await?;
        tracing::debug!(url, faces = faces.len(), "faces extracted");
        Ok(self.store.insert_photo(NewPhoto::new(url, faces)).await?)
    }

    /// Ingest every candidate not already stored.
    ///
    /// Only a failure to read the set of stored URLs is returned as an
    /// error; per-URL problems end up in the report.
    pub async fn run<I>(&self, candidates: I) -> Result<IngestReport, PhotierError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let known = self.store.known_urls().await?;
        let mut seen = HashSet::new();
        let mut report = IngestReport::default();

        for url in candidates {
            let url: String = url.into();
            if !seen.insert(url.clone()) {
                continue;
            }
            if known.contains(&url) {
                report.already_known += 1;
                continue;
            }

            match self.ingest_one(&url).await {
                Ok(photo) => {
                    report.inserted += 1;
                    tracing::debug!(id = photo.id, url = %photo.url, "ingested");
                }
                Err(e) if matches!(e.kind(), ErrorKind::DuplicateUrl | ErrorKind::InvalidPhoto) => {
                    tracing::debug!(url = %url, error = %e, "skipped");
                    report.skipped.push(ItemIssue::new(url, &e));
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "ingest failed");
                    report.failures.push(ItemIssue::new(url, &e));
                }
            }
        }

        tracing::info!(
            candidates = seen.len(),
            inserted = report.inserted,
            already_known = report.already_known,
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "ingestion batch finished"
        );
        Ok(report)
    }
}
