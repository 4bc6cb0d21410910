use std::collections::HashMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use url::Url;

use crate::{
    BlobConfig, BlobError, BlobId, BlobPayload, BlobReceipt, BlobResult, BlobStore, PreviewSpec,
    PreviewUrlBuilder,
};

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobOp {
    Upload,
    Delete,
    Preview,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    receipt: BlobReceipt,
}

/// In-process blob store.
///
/// Used as the default backend for local runs and as the test double for the
/// orchestrator. Failures can be injected per operation with [`fail_next`].
///
/// [`fail_next`]: MemoryBlobStore::fail_next
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, StoredBlob>>,
    urls: PreviewUrlBuilder,
    config: BlobConfig,
    faults: Mutex<HashMap<BlobOp, u32>>,
}

impl MemoryBlobStore {
    pub fn new(urls: PreviewUrlBuilder, config: BlobConfig) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            urls,
            config,
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next call of `op` fail with a backend error
    pub fn fail_next(&self, op: BlobOp) {
        self.fail_times(op, 1);
    }

    /// Make the next `times` calls of `op` fail with a backend error
    pub fn fail_times(&self, op: BlobOp, times: u32) {
        *self.faults.lock().entry(op).or_insert(0) += times;
    }

    pub fn contains(&self, id: &BlobId) -> bool {
        self.blobs.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Ids of every stored blob, sorted
    pub fn ids(&self) -> Vec<BlobId> {
        let mut ids: Vec<BlobId> = self.blobs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Raw content of a stored blob
    pub fn read(&self, id: &BlobId) -> Option<Bytes> {
        self.blobs.read().get(id).map(|b| b.data.clone())
    }

    /// Receipt recorded when the blob was stored
    pub fn receipt(&self, id: &BlobId) -> Option<BlobReceipt> {
        self.blobs.read().get(id).map(|b| b.receipt.clone())
    }

    fn take_fault(&self, op: BlobOp) -> BlobResult<()> {
        let mut faults = self.faults.lock();
        match faults.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(BlobError::backend(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("injected {op:?} failure"),
                )))
            }
            _ => Ok(()),
        }
    }

    async fn collect(&self, payload: BlobPayload) -> BlobResult<Bytes> {
        let mut body = payload.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);
            if buf.len() as u64 > self.config.max_blob_bytes {
                return Err(BlobError::upload_rejected(format!(
                    "payload exceeds maximum of {} bytes",
                    self.config.max_blob_bytes
                )));
            }
        }
        Ok(buf.freeze())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(PreviewUrlBuilder::default(), BlobConfig::default())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, payload: BlobPayload) -> BlobResult<BlobReceipt> {
        self.take_fault(BlobOp::Upload)?;

        if let Some(size) = payload.size_hint {
            if size > self.config.max_blob_bytes {
                return Err(BlobError::upload_rejected(format!(
                    "blob size {} exceeds maximum {}",
                    size, self.config.max_blob_bytes
                )));
            }
        }
        if !self.config.accepts(payload.content_type.as_deref()) {
            return Err(BlobError::upload_rejected(format!(
                "content type {:?} not accepted",
                payload.content_type
            )));
        }

        let content_type = payload.content_type.clone();
        let filename = payload.filename.clone();
        let data = self.collect(payload).await?;
        if data.is_empty() && self.config.reject_empty {
            return Err(BlobError::upload_rejected("empty payload"));
        }

        let mut receipt = BlobReceipt::new(BlobId::new(), data.len() as u64);
        if let Some(ct) = content_type {
            receipt = receipt.with_content_type(ct);
        }
        if let Some(name) = filename {
            receipt = receipt.with_filename(name);
        }

        self.blobs.write().insert(
            receipt.id.clone(),
            StoredBlob {
                data,
                receipt: receipt.clone(),
            },
        );
        Ok(receipt)
    }

    async fn delete(&self, id: &BlobId) -> BlobResult<()> {
        self.take_fault(BlobOp::Delete)?;
        self.blobs.write().remove(id);
        Ok(())
    }

    async fn preview_url(&self, id: &BlobId, spec: &PreviewSpec) -> BlobResult<Url> {
        self.take_fault(BlobOp::Preview)?;
        if !self.contains(id) {
            return Err(BlobError::not_found(id.as_str()));
        }
        self.urls.file_preview(id, spec)
    }
}
