//! Local handles for downloaded binary payloads.
//!
//! A `BlobHandle` stays valid until revoked or until the registry is dropped.
//! Nothing is released automatically.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use uuid::Uuid;

const BLOB_SCHEME_PREFIX: &str = "blob:charkeeper/";

/// Opaque reference to a payload held by a `BlobRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    pub id: Uuid,
    pub url: String,
}

/// A downloaded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Shared store of blobs; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    entries: Arc<RwLock<HashMap<Uuid, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: Bytes, content_type: Option<String>) -> BlobHandle {
        let id = Uuid::new_v4();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id, Blob { content_type, bytes });
        BlobHandle {
            id,
            url: format!("{BLOB_SCHEME_PREFIX}{id}"),
        }
    }

    pub fn get(&self, handle: &BlobHandle) -> Option<Blob> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&handle.id).cloned()
    }

    /// Look a payload up by its handle URL.
    pub fn get_by_url(&self, url: &str) -> Option<Blob> {
        let id = url.strip_prefix(BLOB_SCHEME_PREFIX)?.parse::<Uuid>().ok()?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&id).cloned()
    }

    /// Release the payload. Returns `false` if it was already gone.
    pub fn revoke(&self, handle: &BlobHandle) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&handle.id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
