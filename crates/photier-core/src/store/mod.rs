//! SQLite-backed face and photo stores.
//!
//! [`Database`] is synchronous and owns its connection. Inside the daemon it
//! lives on a dedicated thread behind a [`StoreHandle`], which serializes all
//! access (single writer, no reader ever sees a half-written photo).

mod faces;
mod handle;
mod photos;

pub use faces::FaceInsert;
pub use handle::{spawn_store, StoreHandle, StoreStats};

use crate::codec::CodecError;
use crate::matcher::FaceMatcher;
use crate::types::ValidationError;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Wait this long for another process holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    url         TEXT    NOT NULL UNIQUE,
    locations   BLOB    NOT NULL,
    encodings   BLOB    NOT NULL,
    created_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS faces (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    location    BLOB    NOT NULL,
    encoding    BLOB    NOT NULL,
    created_at  TEXT    NOT NULL
);
"#;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt stored vector: {0}")]
    Corrupt(#[from] CodecError),
    #[error("invalid face descriptor: {0}")]
    Validation(#[from] ValidationError),
    #[error("photo already stored: {0}")]
    DuplicateUrl(String),
    #[error("no face found in photo: {0}")]
    InvalidPhoto(String),
    #[error("photo {0} not found")]
    NotFound(i64),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("store thread exited")]
    ChannelClosed,
}

/// Photo and face tables on one SQLite connection.
pub struct Database {
    conn: Connection,
    matcher: FaceMatcher,
}

impl Database {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: &Path, matcher: FaceMatcher) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::info!(path = %path.display(), "database opened");
        Self::init(conn, matcher)
    }

    pub fn open_in_memory(matcher: FaceMatcher) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, matcher)
    }

    fn init(conn: Connection, matcher: FaceMatcher) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, matcher })
    }

    pub fn matcher(&self) -> FaceMatcher {
        self.matcher
    }
}

/// Require exactly one decoded row (single-face columns).
fn single<T>(mut rows: Vec<T>) -> Result<T, CodecError> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        actual => Err(CodecError::UnexpectedRowCount {
            expected: 1,
            actual,
        }),
    }
}
