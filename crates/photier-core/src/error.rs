use crate::extract::{ExtractError, FeedError};
use crate::store::StoreError;
use crate::types::ValidationError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotierError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("invalid face descriptor: {0}")]
    Validation(#[from] ValidationError),
}

/// Transport-independent error category, for mapping to API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidPhoto,
    DuplicateUrl,
    NotFound,
    UnsupportedFormat,
    Fetch,
    Store,
}

impl PhotierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhotierError::Store(e) => match e {
                StoreError::Validation(_) => ErrorKind::Validation,
                StoreError::InvalidPhoto(_) => ErrorKind::InvalidPhoto,
                StoreError::DuplicateUrl(_) => ErrorKind::DuplicateUrl,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Sqlite(_)
                | StoreError::Corrupt(_)
                | StoreError::Io(_)
                | StoreError::ChannelClosed => ErrorKind::Store,
            },
            PhotierError::Extract(e) => match e {
                ExtractError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
                ExtractError::Fetch(_) | ExtractError::Encoder(_) => ErrorKind::Fetch,
            },
            PhotierError::Feed(_) => ErrorKind::Fetch,
            PhotierError::Validation(_) => ErrorKind::Validation,
        }
    }
}
