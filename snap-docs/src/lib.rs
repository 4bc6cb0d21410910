//! # snap-docs: document storage for snapgram
//!
//! Structured records in named collections, queryable by filter, ordering
//! and an opaque continuation cursor.
//!
//! ```rust
//! use snap_docs::{DocumentStore, Fields, ListQuery, MemoryDocumentStore};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> snap_docs::StoreResult<()> {
//! let store = MemoryDocumentStore::new();
//! let fields: Fields = json!({"caption": "hello"}).as_object().cloned().unwrap_or_default();
//! let doc = store.create("posts", fields).await?;
//!
//! let page = store.list("posts", &ListQuery::new().limit(9)).await?;
//! assert_eq!(page[0].id, doc.id);
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod query;
pub mod store;
mod types;

pub use error::{StoreError, StoreResult};
pub use memory::{DocOp, MemoryDocumentStore};
pub use query::{Cursor, Direction, Filter, ListQuery, OrderKey, Ordering};
pub use store::DocumentStore;
pub use types::{Document, DocumentId, Fields};
