//! Compensating transaction helper.
//!
//! A [`Saga`] tracks the blobs uploaded during one multi-step operation.
//! If a later step fails, [`Saga::abort`] deletes them before the error is
//! handed back. Deletes that must wait until the document change is durable
//! (the blob a document used to point at) are registered with
//! [`Saga::defer_delete`] and only run inside [`Saga::commit`].
//!
//! Every delete runs on its own tokio task and is awaited. If the caller
//! stops polling while a delete is in flight, the task still finishes.

use std::sync::Arc;

use snap_blob::{BlobError, BlobId, BlobPayload, BlobResult, BlobStore, PreviewSpec};
use tracing::{debug, warn};

use crate::errors::{OrchestratorError, OrchestratorResult, OrphanedBlobWarning};
use crate::media::MediaReference;

pub struct Saga {
    name: &'static str,
    blobs: Arc<dyn BlobStore>,
    compensations: Vec<BlobId>,
    deferred: Vec<BlobId>,
}

impl Saga {
    pub fn begin(name: &'static str, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            name,
            blobs,
            compensations: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Delete `id` if the saga aborts
    pub fn track_upload(&mut self, id: BlobId) {
        self.compensations.push(id);
    }

    /// Delete `id` once the saga commits
    pub fn defer_delete(&mut self, id: BlobId) {
        self.deferred.push(id);
    }

    pub fn pending_compensations(&self) -> &[BlobId] {
        &self.compensations
    }

    /// Upload a payload and derive its preview.
    ///
    /// If the preview cannot be derived the new blob is deleted before the
    /// error is returned.
    pub async fn stage_media(
        &mut self,
        payload: BlobPayload,
        spec: &PreviewSpec,
    ) -> OrchestratorResult<MediaReference> {
        let receipt = match self.blobs.upload(payload).await {
            Ok(receipt) => receipt,
            Err(source) => {
                return Err(self.abort(OrchestratorError::BlobUpload { source }).await);
            }
        };
        debug!(saga = self.name, blob_id = %receipt.id, size = receipt.size_bytes, "blob uploaded");
        self.track_upload(receipt.id.clone());

        let url = match self.blobs.preview_url(&receipt.id, spec).await {
            Ok(url) => url,
            Err(source) => {
                let err = OrchestratorError::PreviewDerivation {
                    blob_id: receipt.id,
                    source,
                };
                return Err(self.abort(err).await);
            }
        };

        match MediaReference::new(receipt.id, url) {
            Ok(media) => Ok(media),
            Err(err) => Err(self.abort(err).await),
        }
    }

    /// Pass a step result through, aborting the saga on error
    pub async fn check<T>(&mut self, result: OrchestratorResult<T>) -> OrchestratorResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => Err(self.abort(err).await),
        }
    }

    /// Run every compensation and return `err` unchanged.
    ///
    /// A failed compensation is logged; it never replaces `err`.
    pub async fn abort(&mut self, err: OrchestratorError) -> OrchestratorError {
        self.deferred.clear();
        let compensations: Vec<BlobId> = self.compensations.drain(..).collect();
        for id in compensations {
            match self.delete_detached(id.clone()).await {
                Ok(()) => debug!(saga = self.name, blob_id = %id, "compensating delete done"),
                Err(e) => warn!(
                    saga = self.name,
                    blob_id = %id,
                    error = %e,
                    cause = %err,
                    "compensating delete failed; blob may be orphaned"
                ),
            }
        }
        err
    }

    /// Forget compensations and run deferred deletes.
    ///
    /// Deferred deletes are best effort: each failure becomes a warning.
    pub async fn commit(mut self) -> Vec<OrphanedBlobWarning> {
        self.compensations.clear();
        let deferred: Vec<BlobId> = self.deferred.drain(..).collect();

        let mut warnings = Vec::new();
        for id in deferred {
            if let Err(e) = self.delete_detached(id.clone()).await {
                warn!(saga = self.name, blob_id = %id, error = %e, "post-commit blob delete failed");
                warnings.push(OrphanedBlobWarning {
                    blob_id: id,
                    reason: e.to_string(),
                });
            }
        }
        warnings
    }

    async fn delete_detached(&self, id: BlobId) -> BlobResult<()> {
        let blobs = Arc::clone(&self.blobs);
        let task = tokio::spawn(async move { blobs.delete(&id).await });
        match task.await {
            Ok(result) => result,
            Err(join) => Err(BlobError::backend(join)),
        }
    }
}

impl Drop for Saga {
    fn drop(&mut self) {
        if !self.compensations.is_empty() {
            warn!(
                saga = self.name,
                uploads = ?self.compensations,
                "saga dropped before commit or abort; uploaded blobs were not compensated"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_blob::{BlobOp, MemoryBlobStore};
    use tracing_test::traced_test;

    fn store() -> Arc<MemoryBlobStore> {
        Arc::new(MemoryBlobStore::default())
    }

    #[tokio::test]
    async fn abort_deletes_tracked_uploads() {
        let blobs = store();
        let mut saga = Saga::begin("test", blobs.clone());
        let media = saga
            .stage_media(BlobPayload::from_bytes(&b"img"[..]), &PreviewSpec::default())
            .await
            .unwrap();
        assert!(blobs.contains(media.blob_id()));

        let err = saga.abort(OrchestratorError::validation("later step")).await;
        assert!(matches!(err, OrchestratorError::Validation { .. }));
        assert!(blobs.is_empty());
        assert!(saga.pending_compensations().is_empty());
    }

    #[tokio::test]
    async fn preview_failure_compensates_inside_stage() {
        let blobs = store();
        blobs.fail_next(BlobOp::Preview);
        let mut saga = Saga::begin("test", blobs.clone());

        let err = saga
            .stage_media(BlobPayload::from_bytes(&b"img"[..]), &PreviewSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::PreviewDerivation { .. }));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn upload_failure_leaves_nothing_to_compensate() {
        let blobs = store();
        blobs.fail_next(BlobOp::Upload);
        let mut saga = Saga::begin("test", blobs.clone());

        let err = saga
            .stage_media(BlobPayload::from_bytes(&b"img"[..]), &PreviewSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::BlobUpload { .. }));
        assert!(saga.pending_compensations().is_empty());
    }

    #[tokio::test]
    async fn commit_keeps_uploads_and_runs_deferred_deletes() {
        let blobs = store();
        let old = blobs
            .upload(BlobPayload::from_bytes(&b"old"[..]))
            .await
            .unwrap();

        let mut saga = Saga::begin("test", blobs.clone());
        let media = saga
            .stage_media(BlobPayload::from_bytes(&b"new"[..]), &PreviewSpec::default())
            .await
            .unwrap();
        saga.defer_delete(old.id.clone());

        let warnings = saga.commit().await;
        assert!(warnings.is_empty());
        assert!(blobs.contains(media.blob_id()));
        assert!(!blobs.contains(&old.id));
    }

    #[tokio::test]
    async fn abort_skips_deferred_deletes() {
        let blobs = store();
        let old = blobs
            .upload(BlobPayload::from_bytes(&b"old"[..]))
            .await
            .unwrap();

        let mut saga = Saga::begin("test", blobs.clone());
        saga.defer_delete(old.id.clone());
        saga.abort(OrchestratorError::validation("x")).await;
        assert!(saga.commit().await.is_empty());
        assert!(blobs.contains(&old.id));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_deferred_delete_becomes_warning() {
        let blobs = store();
        let old = blobs
            .upload(BlobPayload::from_bytes(&b"old"[..]))
            .await
            .unwrap();
        blobs.fail_next(BlobOp::Delete);

        let mut saga = Saga::begin("test", blobs.clone());
        saga.defer_delete(old.id.clone());
        let warnings = saga.commit().await;

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].blob_id, old.id);
        assert!(logs_contain("post-commit blob delete failed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_compensation_is_logged_and_original_error_kept() {
        let blobs = store();
        let mut saga = Saga::begin("test", blobs.clone());
        let media = saga
            .stage_media(BlobPayload::from_bytes(&b"img"[..]), &PreviewSpec::default())
            .await
            .unwrap();
        blobs.fail_next(BlobOp::Delete);

        let err = saga.abort(OrchestratorError::validation("original")).await;
        assert!(err.to_string().contains("original"));
        assert!(blobs.contains(media.blob_id()));
        assert!(logs_contain("compensating delete failed"));
    }
}
