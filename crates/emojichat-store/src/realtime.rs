//! Contract of the shared real-time document store.
//!
//! Writes complete asynchronously and become visible to every subscriber of
//! the collection, the writer included, as a fresh full snapshot. There is no
//! other acknowledgement and no ordering guarantee between collections.

use crate::error::Result;
use crate::models::{CollectionPath, DocumentId, DocumentWrite, StoredDocument, WriteMode};
use crate::subscription::Subscription;

#[allow(async_fn_in_trait)]
pub trait RealtimeStore {
    /// Create a document with a store-assigned id.
    async fn add(&self, path: &CollectionPath, write: DocumentWrite) -> Result<DocumentId>;

    /// Create or update the document `id`.
    async fn set(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        write: DocumentWrite,
        mode: WriteMode,
    ) -> Result<()>;

    /// One-shot read of a single document.
    async fn get(&self, path: &CollectionPath, id: &DocumentId) -> Result<Option<StoredDocument>>;

    /// Start streaming full snapshots of `path`, beginning with its current
    /// state.
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription>;
}
