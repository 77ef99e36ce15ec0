use super::{Database, FaceInsert, StoreError};
use crate::matcher::FaceMatcher;
use crate::types::{FaceDescriptor, NewPhoto, Photo};
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};

/// Row counts of both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub photos: usize,
    pub faces: usize,
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// Messages sent from async callers to the store thread.
enum StoreRequest {
    InsertPhoto {
        photo: NewPhoto,
        reply: Reply<Photo>,
    },
    InsertFace {
        face: FaceDescriptor,
        reply: Reply<FaceInsert>,
    },
    GetPhoto {
        id: i64,
        reply: Reply<Photo>,
    },
    GetPhotoByUrl {
        url: String,
        reply: Reply<Option<Photo>>,
    },
    ListPhotos {
        reply: Reply<Vec<Photo>>,
    },
    ListFaces {
        reply: Reply<Vec<FaceDescriptor>>,
    },
    KnownUrls {
        reply: Reply<HashSet<String>>,
    },
    Stats {
        reply: Reply<StoreStats>,
    },
}

/// Clone-safe handle to the store thread.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreRequest>,
    matcher: FaceMatcher,
}

impl StoreHandle {
    /// The comparator the store deduplicates faces with.
    pub fn matcher(&self) -> FaceMatcher {
        self.matcher
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)?
    }

    pub async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, StoreError> {
        self.request(|reply| StoreRequest::InsertPhoto { photo, reply })
            .await
    }

    pub async fn insert_face_if_new(&self, face: FaceDescriptor) -> Result<FaceInsert, StoreError> {
        self.request(|reply| StoreRequest::InsertFace { face, reply })
            .await
    }

    pub async fn get_photo(&self, id: i64) -> Result<Photo, StoreError> {
        self.request(|reply| StoreRequest::GetPhoto { id, reply }).await
    }

    pub async fn get_photo_by_url(&self, url: &str) -> Result<Option<Photo>, StoreError> {
        let url = url.to_string();
        self.request(|reply| StoreRequest::GetPhotoByUrl { url, reply })
            .await
    }

    pub async fn list_photos(&self) -> Result<Vec<Photo>, StoreError> {
        self.request(|reply| StoreRequest::ListPhotos { reply }).await
    }

    pub async fn list_faces(&self) -> Result<Vec<FaceDescriptor>, StoreError> {
        self.request(|reply| StoreRequest::ListFaces { reply }).await
    }

    pub async fn known_urls(&self) -> Result<HashSet<String>, StoreError> {
        self.request(|reply| StoreRequest::KnownUrls { reply }).await
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.request(|reply| StoreRequest::Stats { reply }).await
    }
}

/// Move the database onto a dedicated OS thread and return a handle to it.
///
/// The thread serves requests one at a time and exits once every handle
/// has been dropped.
pub fn spawn_store(mut db: Database) -> Result<StoreHandle, StoreError> {
    let (tx, mut rx) = mpsc::channel::<StoreRequest>(32);
    let matcher = db.matcher();

    std::thread::Builder::new()
        .name("photier-store".into())
        .spawn(move || {
            tracing::debug!("store thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    StoreRequest::InsertPhoto { photo, reply } => {
                        let _ = reply.send(db.insert_photo(&photo));
                    }
                    StoreRequest::InsertFace { face, reply } => {
                        let _ = reply.send(db.insert_face_if_new(&face));
                    }
                    StoreRequest::GetPhoto { id, reply } => {
                        let _ = reply.send(db.get_photo(id));
                    }
                    StoreRequest::GetPhotoByUrl { url, reply } => {
                        let _ = reply.send(db.get_photo_by_url(&url));
                    }
                    StoreRequest::ListPhotos { reply } => {
                        let _ = reply.send(db.list_photos());
                    }
                    StoreRequest::ListFaces { reply } => {
                        let _ = reply.send(db.list_faces());
                    }
                    StoreRequest::KnownUrls { reply } => {
                        let _ = reply.send(db.known_urls());
                    }
                    StoreRequest::Stats { reply } => {
                        let stats = db.photo_count().and_then(|photos| {
                            Ok(StoreStats {
                                photos,
                                faces: db.face_count()?,
                            })
                        });
                        let _ = reply.send(stats);
                    }
                }
            }
            tracing::debug!("store thread exiting");
        })?;

    Ok(StoreHandle { tx, matcher })
}
