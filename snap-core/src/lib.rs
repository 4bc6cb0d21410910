//! # snap-core: all-or-nothing resource writes for snapgram
//!
//! A post or profile is a document plus, optionally, an image held in a
//! separate blob store. The two stores share no transaction, so
//! [`Orchestrator`] sequences every write and compensates on failure:
//!
//! - a document never references a blob that does not exist
//! - a failed create or update never leaves its freshly uploaded blob behind
//! - a replaced or deleted blob is removed only after the document change
//!   has succeeded; if that removal fails the caller gets an
//!   [`OrphanedBlobWarning`] instead of an error
//!
//! ## Quick Start
//!
//! ```rust
//! use snap_blob::{BlobPayload, MemoryBlobStore};
//! use snap_core::{Orchestrator, OrchestratorConfig, ResourceKind};
//! use snap_docs::{Fields, MemoryDocumentStore};
//!
//! # #[tokio::main]
//! # async fn main() -> snap_core::OrchestratorResult<()> {
//! let orchestrator = Orchestrator::new(
//!     MemoryBlobStore::default(),
//!     MemoryDocumentStore::new(),
//!     OrchestratorConfig::new(),
//! );
//! let posts = ResourceKind::new("posts", "creator");
//!
//! let post = orchestrator
//!     .create_resource(&posts, "u1", Fields::new(), BlobPayload::from_bytes(&b"img"[..]))
//!     .await?;
//! assert!(post.media.is_some());
//!
//! let media = post.media.as_ref().map(|m| m.blob_id().clone());
//! let outcome = orchestrator.delete_resource(&posts, &post.id, media.as_ref()).await?;
//! assert!(outcome.is_clean());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ PostService / UserService /  │  ← typed records, feed queries
//! │ SaveService                  │
//! ├──────────────────────────────┤
//! │ Orchestrator + Saga          │  ← ordering, compensation
//! ├──────────────┬───────────────┤
//! │  BlobStore   │ DocumentStore │
//! └──────────────┴───────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod media;
pub mod orchestrator;
pub mod resource;
pub mod saga;
pub mod services;
pub mod tags;
pub mod telemetry;

pub use config::{Settings, SnapConfig, ENV_PREFIX};
pub use errors::{ErrorKind, OrchestratorError, OrchestratorResult, OrphanedBlobWarning};
pub use media::{MediaReference, IMAGE_ID_FIELD, IMAGE_URL_FIELD};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use resource::{LikeSet, Outcome, Page, PageRequest, Resource, ResourceKind, LIKES_FIELD, TAGS_FIELD};
pub use saga::Saga;
pub use services::{
    NewAccount, NewPost, Post, PostService, PostUpdate, ProfileImage, ProfileUpdate, SaveService,
    SavedPost, Services, UserProfile, UserService,
};
pub use tags::TagList;

#[cfg(feature = "tracing-basic")]
pub use telemetry::init_tracing;
