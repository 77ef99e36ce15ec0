//! Collaborator interfaces: face extraction and the candidate URL feed.
//!
//! Detection and encoding are not done here. Implementations live outside
//! the core (see `photier-net`) and are injected as trait objects.

use crate::types::FaceDescriptor;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Image types the extraction capability accepts, by URL path extension.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("unsupported image format: {0} (expected jpg, png or jpeg)")]
    UnsupportedFormat(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("encoder failed: {0}")]
    Encoder(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(String),
    #[error("malformed feed response: {0}")]
    Malformed(String),
}

/// Turns an image URL into the faces found in it.
#[async_trait]
pub trait FaceExtractor: Send + Sync {
    async fn extract_faces(&self, url: &str) -> Result<Vec<FaceDescriptor>, ExtractError>;
}

/// Source of candidate photo URLs for ingestion.
#[async_trait]
pub trait CandidateFeed: Send + Sync {
    async fn fetch_candidate_urls(&self) -> Result<HashSet<String>, FeedError>;
}

/// Lower-cased extension of the URL's last path segment.
///
/// Absolute URLs go through a WHATWG parser, so query, fragment and
/// backslash separators are handled the way a browser would. Bare paths
/// such as `a.jpg` are taken as they are.
pub fn url_extension(raw: &str) -> Option<String> {
    let file = match Url::parse(raw) {
        Ok(url) => url.path_segments()?.last()?.to_string(),
        Err(_) => {
            let path = raw.split(|c: char| c == '?' || c == '#').next()?;
            path.rsplit('/').next()?.to_string()
        }
    };
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Fail with `UnsupportedFormat` unless the URL names a jpg/png/jpeg file.
pub fn check_image_url(url: &str) -> Result<(), ExtractError> {
    match url_extension(url) {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ExtractError::UnsupportedFormat(url.to_string())),
    }
}
