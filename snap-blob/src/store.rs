use async_trait::async_trait;
use url::Url;

use crate::{BlobId, BlobPayload, BlobReceipt, BlobResult, PreviewSpec};

/// Blob storage operations the orchestration layer relies on.
///
/// Implementations must make `delete` idempotent: deleting an id that does
/// not exist succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a payload and return its receipt (including the assigned id)
    async fn upload(&self, payload: BlobPayload) -> BlobResult<BlobReceipt>;

    /// Delete a blob
    async fn delete(&self, id: &BlobId) -> BlobResult<()>;

    /// Derive the preview URL for a stored blob
    async fn preview_url(&self, id: &BlobId, spec: &PreviewSpec) -> BlobResult<Url>;
}
