//! Photo store: one row per URL, with every face found in the image.

use super::faces::insert_face_if_new;
use super::{Database, StoreError};
use crate::codec::{decode_locations, decode_rows, encode_locations, encode_rows, CodecError};
use crate::types::{FaceDescriptor, Location, NewPhoto, Photo, ValidationError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::HashSet;

const PHOTO_COLUMNS: &str = "id, url, locations, encodings, created_at";

/// Undecoded `photos` row.
struct PhotoRow {
    id: i64,
    url: String,
    locations: Vec<u8>,
    encodings: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl PhotoRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            locations: row.get(2)?,
            encodings: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn decode(self) -> Result<Photo, StoreError> {
        let locations = decode_locations(&self.locations)?;
        let encodings = decode_rows(&self.encodings)?;
        if locations.is_empty() || locations.len() != encodings.len() {
            return Err(CodecError::UnexpectedRowCount {
                expected: locations.len().max(1),
                actual: encodings.len(),
            }
            .into());
        }
        let faces = locations
            .into_iter()
            .zip(encodings)
            .map(|(location, encoding)| FaceDescriptor { location, encoding })
            .collect();
        Ok(Photo {
            id: self.id,
            url: self.url,
            faces,
            created_at: self.created_at,
        })
    }
}

impl Database {
    /// Persist a photo and register its faces in the face store.
    ///
    /// Fails with `DuplicateUrl` if the URL is already stored and with
    /// `InvalidPhoto` if no face was found. Faces that are already known
    /// are not an error. Everything runs in one write transaction.
    pub fn insert_photo(&mut self, photo: &NewPhoto) -> Result<Photo, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if url_exists(&tx, &photo.url)? {
            return Err(StoreError::DuplicateUrl(photo.url.clone()));
        }
        if photo.faces.is_empty() {
            return Err(StoreError::InvalidPhoto(photo.url.clone()));
        }
        validate_faces(&photo.faces)?;

        let mut new_faces = 0usize;
        for face in &photo.faces {
            if insert_face_if_new(&tx, &self.matcher, face)?.is_inserted() {
                new_faces += 1;
            }
        }

        let locations: Vec<Location> = photo.faces.iter().map(|f| f.location).collect();
        let encodings: Vec<&[f64]> = photo.faces.iter().map(|f| f.encoding.as_slice()).collect();
        let created_at = Utc::now();

        let inserted = tx.execute(
            "INSERT INTO photos (url, locations, encodings, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                photo.url,
                encode_locations(&locations)?,
                encode_rows(&encodings)?,
                created_at,
            ],
        );
        inserted.map_err(|e| insert_error(e, &photo.url))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::info!(
            id,
            url = %photo.url,
            faces = photo.faces.len(),
            new_faces,
            "photo stored"
        );

        Ok(Photo {
            id,
            url: photo.url.clone(),
            faces: photo.faces.clone(),
            created_at,
        })
    }

    pub fn get_photo(&self, id: i64) -> Result<Photo, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                [id],
                PhotoRow::from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?
            .decode()
    }

    pub fn get_photo_by_url(&self, url: &str) -> Result<Option<Photo>, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE url = ?1"),
                [url],
                PhotoRow::from_row,
            )
            .optional()?
            .map(PhotoRow::decode)
            .transpose()
    }

    /// All photos, by id ascending.
    pub fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PHOTO_COLUMNS} FROM photos ORDER BY id"))?;
        let rows = stmt
            .query_map([], PhotoRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(PhotoRow::decode).collect()
    }

    /// URLs of every stored photo, without decoding any vectors.
    pub fn known_urls(&self) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT url FROM photos")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    pub fn photo_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// A `UNIQUE(url)` violation means another writer stored the URL first.
fn insert_error(err: rusqlite::Error, url: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::DuplicateUrl(url.to_string())
        }
        e => e.into(),
    }
}

fn url_exists(conn: &Connection, url: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM photos WHERE url = ?1", [url], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Every face must be well-formed and all encodings must share one length.
fn validate_faces(faces: &[FaceDescriptor]) -> Result<(), ValidationError> {
    let expected = faces.first().map(|f| f.encoding.len()).unwrap_or(0);
    for face in faces {
        face.validate()?;
        if face.encoding.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                expected,
                actual: face.encoding.len(),
            });
        }
    }
    Ok(())
}
