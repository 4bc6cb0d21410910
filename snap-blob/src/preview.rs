use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{BlobError, BlobId, BlobResult};

/// Largest width or height a preview may request
pub const MAX_PREVIEW_DIMENSION: u32 = 4000;

/// Which part of the image is kept when a preview is cropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gravity {
    Center,
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Gravity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Center => "center",
            Gravity::TopLeft => "top-left",
            Gravity::Top => "top",
            Gravity::TopRight => "top-right",
            Gravity::Left => "left",
            Gravity::Right => "right",
            Gravity::BottomLeft => "bottom-left",
            Gravity::Bottom => "bottom",
            Gravity::BottomRight => "bottom-right",
        }
    }
}

impl FromStr for Gravity {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let gravity = match s {
            "center" => Gravity::Center,
            "top-left" => Gravity::TopLeft,
            "top" => Gravity::Top,
            "top-right" => Gravity::TopRight,
            "left" => Gravity::Left,
            "right" => Gravity::Right,
            "bottom-left" => Gravity::BottomLeft,
            "bottom" => Gravity::Bottom,
            "bottom-right" => Gravity::BottomRight,
            other => return Err(BlobError::invalid(format!("unknown gravity: {other}"))),
        };
        Ok(gravity)
    }
}

impl std::fmt::Display for Gravity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preview policy: fixed bounds, crop gravity and output quality.
///
/// These are application constants, never user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSpec {
    pub max_width: u32,
    pub max_height: u32,
    pub gravity: Gravity,
    pub quality: u8,
}

impl Default for PreviewSpec {
    fn default() -> Self {
        Self {
            max_width: 2000,
            max_height: 2000,
            gravity: Gravity::Top,
            quality: 100,
        }
    }
}

impl PreviewSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Check the policy against the limits the preview renderer accepts
    pub fn validate(&self) -> BlobResult<()> {
        if self.max_width == 0 || self.max_width > MAX_PREVIEW_DIMENSION {
            return Err(BlobError::invalid(format!(
                "preview width {} outside 1..={}",
                self.max_width, MAX_PREVIEW_DIMENSION
            )));
        }
        if self.max_height == 0 || self.max_height > MAX_PREVIEW_DIMENSION {
            return Err(BlobError::invalid(format!(
                "preview height {} outside 1..={}",
                self.max_height, MAX_PREVIEW_DIMENSION
            )));
        }
        if self.quality > 100 {
            return Err(BlobError::invalid(format!(
                "preview quality {} outside 0..=100",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Builds hosted-platform URLs for file previews and generated avatars.
///
/// Previews look like
/// `{endpoint}/storage/buckets/{bucket}/files/{id}/preview?width=..&height=..&gravity=..&quality=..&project=..`.
#[derive(Debug, Clone)]
pub struct PreviewUrlBuilder {
    /// Validated by [`PreviewUrlBuilder::new`]; parsed again per URL
    endpoint: String,
    project: String,
    bucket: String,
}

impl Default for PreviewUrlBuilder {
    /// Local development endpoint, project `snapgram`, bucket `media`
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/v1".to_string(),
            project: "snapgram".to_string(),
            bucket: "media".to_string(),
        }
    }
}

impl PreviewUrlBuilder {
    pub fn new(endpoint: &str, project: impl Into<String>, bucket: impl Into<String>) -> BlobResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BlobError::invalid(format!("invalid endpoint {endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(BlobError::invalid(format!("endpoint {endpoint} cannot be a base URL")));
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            project: project.into(),
            bucket: bucket.into(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// URL of a resized preview of `id`
    pub fn file_preview(&self, id: &BlobId, spec: &PreviewSpec) -> BlobResult<Url> {
        if id.is_empty() {
            return Err(BlobError::invalid("cannot build a preview for an empty blob id"));
        }
        spec.validate()?;

        let mut url = self.join(&["storage", "buckets", &self.bucket, "files", id.as_str(), "preview"])?;
        url.query_pairs_mut()
            .append_pair("width", &spec.max_width.to_string())
            .append_pair("height", &spec.max_height.to_string())
            .append_pair("gravity", spec.gravity.as_str())
            .append_pair("quality", &spec.quality.to_string())
            .append_pair("project", &self.project);
        Ok(url)
    }

    /// URL of a generated initials avatar for `name`
    pub fn initials_avatar(&self, name: &str) -> BlobResult<Url> {
        let mut url = self.join(&["avatars", "initials"])?;
        url.query_pairs_mut()
            .append_pair("name", name.trim())
            .append_pair("project", &self.project);
        Ok(url)
    }

    fn join(&self, segments: &[&str]) -> BlobResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| BlobError::invalid(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        url.path_segments_mut()
            .map_err(|_| BlobError::invalid("endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
