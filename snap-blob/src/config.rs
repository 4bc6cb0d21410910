/// Configuration for blob stores
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single blob (safety guard)
    pub max_blob_bytes: u64,

    /// Reject zero-length uploads
    pub reject_empty: bool,

    /// If non-empty, only content types starting with one of these prefixes are accepted
    pub accepted_content_types: Vec<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 50 * 1024 * 1024, // 50MB
            reject_empty: true,
            accepted_content_types: Vec::new(),
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Accept zero-length uploads
    pub fn allow_empty(mut self) -> Self {
        self.reject_empty = false;
        self
    }

    /// Restrict uploads to a content type prefix, e.g. `image/`
    pub fn accept_content_type<S: Into<String>>(mut self, prefix: S) -> Self {
        self.accepted_content_types.push(prefix.into());
        self
    }

    /// Whether a declared content type passes the filter
    pub fn accepts(&self, content_type: Option<&str>) -> bool {
        if self.accepted_content_types.is_empty() {
            return true;
        }
        match content_type {
            Some(ct) => self
                .accepted_content_types
                .iter()
                .any(|prefix| ct.starts_with(prefix.as_str())),
            None => false,
        }
    }
}
