//! # snap-blob: blob storage for snapgram
//!
//! `snap-blob` defines the storage contract the snapgram orchestrator needs
//! from a blob service and ships an in-process implementation.
//!
//! ## Key Features
//!
//! - **Small contract**: upload, idempotent delete, derived preview URL
//! - **Preview policy**: fixed bounds, crop gravity and quality live in [`PreviewSpec`], not in user input
//! - **Hosted URLs**: [`PreviewUrlBuilder`] produces preview and initials-avatar URLs for a bucket
//! - **Test friendly**: [`MemoryBlobStore`] supports per-operation fault injection
//!
//! ## Quick Start
//!
//! ```rust
//! use snap_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryBlobStore::default();
//!
//! let receipt = store
//!     .upload(BlobPayload::from_bytes(&b"\x89PNG"[..]).with_content_type("image/png"))
//!     .await?;
//!
//! let preview = store.preview_url(&receipt.id, &PreviewSpec::default()).await?;
//! assert!(preview.as_str().contains("/preview?width=2000"));
//!
//! store.delete(&receipt.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Orchestrator   │  ← compensations, ordering
//! ├──────────────────┤
//! │    BlobStore     │  ← upload / delete / preview
//! └──────────────────┘
//! ```

mod config;
mod error;
mod memory;
mod preview;
pub mod store;
mod types;

pub use config::BlobConfig;
pub use error::{BlobError, BlobResult};
pub use memory::{BlobOp, MemoryBlobStore};
pub use preview::{Gravity, PreviewSpec, PreviewUrlBuilder, MAX_PREVIEW_DIMENSION};
pub use store::BlobStore;
pub use types::{BlobId, BlobPayload, BlobReceipt, ByteStream};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobId, BlobPayload, BlobReceipt, BlobResult, BlobStore, MemoryBlobStore,
        PreviewSpec,
    };
}
