//! photier-core: face encoding store and similarity engine.
//!
//! Keeps a deduplicated set of faces and an index of photos by URL, and
//! answers "which stored photos contain a face similar to this one?" by
//! linear scan. Face detection and encoding are delegated to a
//! [`FaceExtractor`] supplied by the caller.

pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod matcher;
pub mod service;
pub mod similarity;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{ErrorKind, PhotierError};
pub use extract::{CandidateFeed, ExtractError, FaceExtractor, FeedError};
pub use ingest::{IngestReport, IngestionPipeline};
pub use matcher::{FaceMatcher, DEFAULT_TOLERANCE};
pub use service::Photier;
pub use similarity::SimilarityEngine;
pub use store::{spawn_store, Database, StoreError, StoreHandle};
pub use types::{FaceDescriptor, Location, NewPhoto, Photo, PhotoSummary};
