//! photier-net: HTTP collaborators for the photier core.
//!
//! Provides the face extractor (image download + encoder service) and the
//! candidate URL feed client.

pub mod extractor;
pub mod feed;

#[cfg(test)]
mod testing;

pub use extractor::HttpExtractor;
pub use feed::FeedClient;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
