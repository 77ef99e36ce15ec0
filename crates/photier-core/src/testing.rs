//! In-memory collaborators for unit tests.

use crate::extract::{check_image_url, CandidateFeed, ExtractError, FaceExtractor, FeedError};
use crate::types::FaceDescriptor;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn face(encoding: &[f64]) -> FaceDescriptor {
    FaceDescriptor::new([10, 90, 110, 20], encoding.to_vec())
}

/// Extractor answering from a fixed url → result table.
///
/// Unsupported extensions fail like the real extractor; unscripted URLs
/// fail with a fetch error.
#[derive(Default)]
pub struct ScriptedExtractor {
    results: HashMap<String, Result<Vec<FaceDescriptor>, ExtractError>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExtractor {
    pub fn with_faces(mut self, url: &str, faces: Vec<FaceDescriptor>) -> Self {
        self.results.insert(url.to_string(), Ok(faces));
        self
    }

    pub fn with_error(mut self, url: &str, err: ExtractError) -> Self {
        self.results.insert(url.to_string(), Err(err));
        self
    }

    /// URLs passed to `extract_faces`, in call order.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl FaceExtractor for ScriptedExtractor {
    async fn extract_faces(&self, url: &str) -> Result<Vec<FaceDescriptor>, ExtractError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        check_image_url(url)?;
        self.results
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ExtractError::Fetch(format!("no scripted result for {url}"))))
    }
}

pub struct StaticFeed(pub Result<Vec<&'static str>, FeedError>);

#[async_trait]
impl CandidateFeed for StaticFeed {
    async fn fetch_candidate_urls(&self) -> Result<HashSet<String>, FeedError> {
        self.0
            .clone()
            .map(|urls| urls.into_iter().map(String::from).collect())
    }
}
