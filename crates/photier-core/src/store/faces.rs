//! Face store: one row per distinct face ever seen.

use super::{single, Database, StoreError};
use crate::codec::{decode_locations, decode_rows, encode_locations, encode_rows};
use crate::matcher::FaceMatcher;
use crate::types::FaceDescriptor;
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};

/// Outcome of [`Database::insert_face_if_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceInsert {
    Inserted,
    /// A stored face is within tolerance; nothing was written.
    AlreadyKnown,
}

impl FaceInsert {
    pub fn is_inserted(self) -> bool {
        self == FaceInsert::Inserted
    }
}

impl Database {
    /// Store `face` unless a similar face is already stored.
    pub fn insert_face_if_new(&mut self, face: &FaceDescriptor) -> Result<FaceInsert, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = insert_face_if_new(&tx, &self.matcher, face)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// All stored faces in insertion order.
    pub fn list_faces(&self) -> Result<Vec<FaceDescriptor>, StoreError> {
        load_faces(&self.conn)
    }

    pub fn face_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM faces", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Check-then-insert against every stored face. Callers must hold a write
/// transaction so the check and the insert are not interleaved.
pub(super) fn insert_face_if_new(
    conn: &Connection,
    matcher: &FaceMatcher,
    face: &FaceDescriptor,
) -> Result<FaceInsert, StoreError> {
    face.validate()?;

    let stored = load_faces(conn)?;
    if matcher.any_similar(&face.encoding, stored.iter().map(|f| f.encoding.as_slice()))? {
        tracing::debug!(stored = stored.len(), "face already known");
        return Ok(FaceInsert::AlreadyKnown);
    }

    conn.execute(
        "INSERT INTO faces (location, encoding, created_at) VALUES (?1, ?2, ?3)",
        params![
            encode_locations(std::slice::from_ref(&face.location))?,
            encode_rows(std::slice::from_ref(&face.encoding))?,
            Utc::now(),
        ],
    )?;
    tracing::debug!(id = conn.last_insert_rowid(), "new face stored");
    Ok(FaceInsert::Inserted)
}

fn load_faces(conn: &Connection) -> Result<Vec<FaceDescriptor>, StoreError> {
    let mut stmt = conn.prepare("SELECT location, encoding FROM faces ORDER BY id")?;
    let raw = stmt
        .query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(location, encoding)| {
            Ok(FaceDescriptor {
                location: single(decode_locations(&location)?)?,
                encoding: single(decode_rows(&encoding)?)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationError;

    fn db() -> Database {
        Database::open_in_memory(FaceMatcher::default()).unwrap()
    }

    fn face(encoding: &[f64]) -> FaceDescriptor {
        FaceDescriptor::new([10, 60, 70, 5], encoding.to_vec())
    }

    #[test]
    fn test_first_face_inserted() {
        let mut db = db();
        let outcome = db.insert_face_if_new(&face(&[0.1, 0.2, 0.3])).unwrap();
        assert_eq!(outcome, FaceInsert::Inserted);
        assert_eq!(db.face_count().unwrap(), 1);
    }

    #[test]
    fn test_same_face_twice_not_stored() {
        let mut db = db();
        let f = face(&[0.1, 0.2, 0.3]);
        assert!(db.insert_face_if_new(&f).unwrap().is_inserted());
        assert_eq!(db.insert_face_if_new(&f).unwrap(), FaceInsert::AlreadyKnown);
        assert_eq!(db.face_count().unwrap(), 1);
    }

    #[test]
    fn test_near_identical_face_not_stored() {
        let mut db = db();
        db.insert_face_if_new(&face(&[0.1, 0.2, 0.3])).unwrap();
        let outcome = db.insert_face_if_new(&face(&[0.15, 0.25, 0.28])).unwrap();
        assert_eq!(outcome, FaceInsert::AlreadyKnown);
        assert_eq!(db.face_count().unwrap(), 1);
    }

    #[test]
    fn test_distinct_face_stored() {
        let mut db = db();
        db.insert_face_if_new(&face(&[0.0, 0.0, 0.0])).unwrap();
        let outcome = db.insert_face_if_new(&face(&[1.0, 1.0, 1.0])).unwrap();
        assert_eq!(outcome, FaceInsert::Inserted);
        assert_eq!(db.face_count().unwrap(), 2);
    }

    #[test]
    fn test_list_faces_insertion_order() {
        let mut db = db();
        let a = face(&[0.0, 0.0]);
        let b = FaceDescriptor::new([1, 2, 3, 4], vec![2.0, 2.0]);
        let c = face(&[-2.0, 2.0]);
        for f in [&a, &b, &c] {
            db.insert_face_if_new(f).unwrap();
        }
        assert_eq!(db.list_faces().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_rejects_empty_encoding() {
        let mut db = db();
        let err = db.insert_face_if_new(&face(&[])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyEncoding)
        ));
        assert_eq!(db.face_count().unwrap(), 0);
    }

    #[test]
    fn test_rejects_length_mismatch_with_store() {
        let mut db = db();
        db.insert_face_if_new(&face(&[0.0, 0.0, 0.0])).unwrap();
        let err = db.insert_face_if_new(&face(&[5.0, 5.0])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DimensionMismatch { .. })
        ));
        assert_eq!(db.face_count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_row_surfaces_as_store_error() {
        let db = db();
        db.conn
            .execute(
                "INSERT INTO faces (location, encoding, created_at) VALUES (?1, ?2, ?3)",
                params![b"[1, 2, 3, 4]".to_vec(), b"[0.1]".to_vec(), Utc::now()],
            )
            .unwrap();
        assert!(matches!(db.list_faces(), Err(StoreError::Corrupt(_))));
    }
}
