//! In-memory blob registry and preview handles.
//!
//! A blob is materialized file content addressed by an object URL
//! (`blob:pipestash/<uuid>`). It stays alive until its URL is revoked, so
//! every handle must be released when it is superseded.

use base64::Engine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use uuid::Uuid;

use pipestash_common::FileId;

#[derive(Debug)]
struct Blob {
    data: Arc<Vec<u8>>,
    mime: &'static str,
}

/// Registry of live blobs.
#[derive(Debug, Default)]
pub struct BlobArena {
    blobs: Mutex<HashMap<String, Blob>>,
}

impl BlobArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `data` and return its object URL.
    pub fn create(&self, data: Vec<u8>, mime: &'static str) -> String {
        let url = format!("blob:pipestash/{}", Uuid::new_v4());
        self.blobs().insert(
            url.clone(),
            Blob {
                data: Arc::new(data),
                mime,
            },
        );
        url
    }

    /// Drop the blob behind `url`. Returns false if it was already gone.
    pub fn revoke(&self, url: &str) -> bool {
        self.blobs().remove(url).is_some()
    }

    /// Content and MIME type behind `url`.
    pub fn get(&self, url: &str) -> Option<(Arc<Vec<u8>>, &'static str)> {
        self.blobs()
            .get(url)
            .map(|blob| (blob.data.clone(), blob.mime))
    }

    /// Number of blobs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.blobs().len()
    }
}

/// A materialized preview of one image file.
///
/// Call [`PreviewHandle::release`] when the handle is superseded. A handle
/// dropped without release is revoked anyway and logged as a leak.
#[derive(Debug)]
pub struct PreviewHandle {
    file_id: FileId,
    url: String,
    mime: &'static str,
    generation: u64,
    arena: Arc<BlobArena>,
    released: bool,
}

impl PreviewHandle {
    /// Materialize `data` in `arena`.
    pub fn materialize(
        arena: &Arc<BlobArena>,
        file_id: FileId,
        data: Vec<u8>,
        mime: &'static str,
        generation: u64,
    ) -> Self {
        let url = arena.create(data, mime);
        Self {
            file_id,
            url,
            mime,
            generation,
            arena: arena.clone(),
            released: false,
        }
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    /// Object URL of the blob.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// Reload generation that produced this handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The blob content as a `data:` URL.
    pub fn data_url(&self) -> Option<String> {
        let (data, mime) = self.arena.get(&self.url)?;
        Some(format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(data.as_slice())
        ))
    }

    /// Revoke the blob.
    pub fn release(mut self) {
        self.arena.revoke(&self.url);
        self.released = true;
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!("Preview for {} dropped without release", self.file_id);
            self.arena.revoke(&self.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_create_and_revoke() {
        let arena = BlobArena::new();
        let url = arena.create(vec![1, 2, 3], "image/png");
        assert!(url.starts_with("blob:pipestash/"));
        assert_eq!(arena.live_count(), 1);

        let (data, mime) = arena.get(&url).unwrap();
        assert_eq!(data.as_slice(), &[1, 2, 3]);
        assert_eq!(mime, "image/png");

        assert!(arena.revoke(&url));
        assert!(!arena.revoke(&url));
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_handle_release() {
        let arena = Arc::new(BlobArena::new());
        let handle =
            PreviewHandle::materialize(&arena, FileId::new("f1"), b"img".to_vec(), "image/gif", 1);
        assert_eq!(arena.live_count(), 1);
        assert_eq!(handle.data_url().unwrap(), "data:image/gif;base64,aW1n");

        handle.release();
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_unreleased_handle_is_revoked_on_drop() {
        let arena = Arc::new(BlobArena::new());
        {
            let _handle =
                PreviewHandle::materialize(&arena, FileId::new("f1"), vec![0], "image/png", 1);
            assert_eq!(arena.live_count(), 1);
        }
        assert_eq!(arena.live_count(), 0);
    }
}
