use async_trait::async_trait;

use crate::{Document, DocumentId, Fields, ListQuery, StoreResult};

/// Document storage operations the orchestration layer relies on.
///
/// `delete` must be idempotent. `update` replaces the given top-level fields
/// and leaves the others untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Document>;

    /// Replace the given fields of an existing document
    async fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> StoreResult<Document>;

    /// Delete a document
    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<()>;

    /// Fetch one document, `StoreError::NotFound` if absent
    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Document>;

    /// Filtered, ordered, cursor-paginated listing
    async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Document>>;
}
