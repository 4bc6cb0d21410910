use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use uuid::Uuid;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Unique identifier for a blob, assigned by the store on upload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(pub String);

impl BlobId {
    /// Generate a new random blob ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An upload request: metadata plus the content stream
pub struct BlobPayload {
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub size_hint: Option<u64>,
    pub body: ByteStream,
}

impl BlobPayload {
    /// Wrap an existing byte stream
    pub fn from_stream(body: ByteStream) -> Self {
        Self {
            content_type: None,
            filename: None,
            size_hint: None,
            body,
        }
    }

    /// Build a payload from an in-memory buffer
    pub fn from_bytes<B: Into<Bytes>>(data: B) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(data) });
        Self {
            size_hint: Some(size),
            ..Self::from_stream(Box::pin(stream))
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

impl std::fmt::Debug for BlobPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobPayload")
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

/// Receipt returned after successfully storing a blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobReceipt {
    pub id: BlobId,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub created_at: i64,
}

impl BlobReceipt {
    pub fn new(id: BlobId, size_bytes: u64) -> Self {
        Self {
            id,
            size_bytes,
            content_type: None,
            filename: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_content_type(mut self, content_type: String) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_filename(mut self, filename: String) -> Self {
        self.filename = Some(filename);
        self
    }
}
