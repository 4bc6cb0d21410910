use serde::Serialize;
use serde_json::Value;
use snap_blob::BlobId;
use snap_docs::Fields;
use url::Url;

use crate::errors::{OrchestratorError, OrchestratorResult};

/// Document field holding the blob id
pub const IMAGE_ID_FIELD: &str = "imageId";
/// Document field holding the derived preview URL
pub const IMAGE_URL_FIELD: &str = "imageUrl";

/// A stored blob plus the preview URL derived from it.
///
/// Both halves always travel together: a document carries either both media
/// fields or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaReference {
    blob_id: BlobId,
    preview_url: Url,
}

impl MediaReference {
    pub fn new(blob_id: BlobId, preview_url: Url) -> OrchestratorResult<Self> {
        if blob_id.is_empty() {
            return Err(OrchestratorError::validation("media reference needs a blob id"));
        }
        Ok(Self {
            blob_id,
            preview_url,
        })
    }

    pub fn blob_id(&self) -> &BlobId {
        &self.blob_id
    }

    pub fn preview_url(&self) -> &Url {
        &self.preview_url
    }

    /// Write both media fields
    pub fn write_to(&self, fields: &mut Fields) {
        fields.insert(
            IMAGE_ID_FIELD.to_string(),
            Value::String(self.blob_id.to_string()),
        );
        fields.insert(
            IMAGE_URL_FIELD.to_string(),
            Value::String(self.preview_url.to_string()),
        );
    }

    /// Read the media fields, rejecting a half-set pair
    pub fn read_from(fields: &Fields) -> Result<Option<Self>, String> {
        let id = non_null(fields.get(IMAGE_ID_FIELD));
        let url = non_null(fields.get(IMAGE_URL_FIELD));
        match (id, url) {
            (None, None) => Ok(None),
            (Some(id), Some(url)) => {
                let id = id
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| format!("{IMAGE_ID_FIELD} must be a non-empty string"))?;
                let url = url
                    .as_str()
                    .ok_or_else(|| format!("{IMAGE_URL_FIELD} must be a string"))?;
                let url = Url::parse(url).map_err(|e| format!("{IMAGE_URL_FIELD}: {e}"))?;
                Ok(Some(Self {
                    blob_id: BlobId::from(id),
                    preview_url: url,
                }))
            }
            (Some(_), None) => Err(format!("{IMAGE_ID_FIELD} set without {IMAGE_URL_FIELD}")),
            (None, Some(_)) => Err(format!("{IMAGE_URL_FIELD} set without {IMAGE_ID_FIELD}")),
        }
    }

    /// Remove the media fields from a field set
    pub(crate) fn strip(fields: &mut Fields) {
        fields.remove(IMAGE_ID_FIELD);
        fields.remove(IMAGE_URL_FIELD);
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn round_trips_through_fields() {
        let media = MediaReference::new(
            BlobId::from("b1"),
            Url::parse("http://localhost/v1/storage/buckets/media/files/b1/preview").unwrap(),
        )
        .unwrap();
        let mut f = Fields::new();
        media.write_to(&mut f);
        assert_eq!(MediaReference::read_from(&f).unwrap(), Some(media));
    }

    #[test]
    fn absent_or_null_pair_is_none() {
        assert_eq!(MediaReference::read_from(&Fields::new()).unwrap(), None);
        let f = fields(json!({"imageId": null, "imageUrl": null}));
        assert_eq!(MediaReference::read_from(&f).unwrap(), None);
    }

    #[test]
    fn half_set_pair_is_rejected() {
        let f = fields(json!({"imageId": "b1"}));
        assert!(MediaReference::read_from(&f).is_err());
        let f = fields(json!({"imageUrl": "http://x/y"}));
        assert!(MediaReference::read_from(&f).is_err());
        let f = fields(json!({"imageId": "", "imageUrl": "http://x/y"}));
        assert!(MediaReference::read_from(&f).is_err());
    }

    #[test]
    fn empty_blob_id_cannot_be_referenced() {
        let err = MediaReference::new(BlobId::from(""), Url::parse("http://x/y").unwrap());
        assert!(err.is_err());
    }
}
