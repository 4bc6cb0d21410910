use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snap_docs::{Cursor, Document, DocumentId, Fields, Filter, Ordering};

use crate::errors::{OrchestratorError, OrchestratorResult, OrphanedBlobWarning};
use crate::media::MediaReference;

/// Document field holding the like set
pub const LIKES_FIELD: &str = "likes";
/// Document field holding the normalized tag list
pub const TAGS_FIELD: &str = "tags";

/// Where a kind of resource lives and which field names its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    pub collection: String,
    pub owner_field: String,
    /// Created documents always carry a `tags` array, empty if none given
    pub tagged: bool,
}

impl ResourceKind {
    pub fn new(collection: impl Into<String>, owner_field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            owner_field: owner_field.into(),
            tagged: false,
        }
    }

    pub fn with_tags(mut self) -> Self {
        self.tagged = true;
        self
    }
}

/// A persisted resource with its media reference lifted out of the raw fields
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: DocumentId,
    pub collection: String,
    pub fields: Fields,
    pub media: Option<MediaReference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Lift a stored document, rejecting a half-set media pair
    pub fn from_document(doc: Document) -> OrchestratorResult<Self> {
        let media = MediaReference::read_from(&doc.fields)
            .map_err(|message| OrchestratorError::decode(&doc.collection, doc.id.as_str(), message))?;
        let mut fields = doc.fields;
        MediaReference::strip(&mut fields);
        Ok(Self {
            id: doc.id,
            collection: doc.collection,
            fields,
            media,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn likes(&self) -> LikeSet {
        LikeSet::from_value(self.field(LIKES_FIELD))
    }

    /// Deserialize the non-media fields into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> OrchestratorResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            OrchestratorError::decode(&self.collection, self.id.as_str(), e.to_string())
        })
    }
}

/// The set of user ids that liked a resource.
///
/// Toggling is computed client side and written back as a whole field, so
/// two concurrent togglers race and the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeSet(BTreeSet<String>);

impl LikeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The set with `id` added if absent, removed if present
    pub fn toggled(&self, id: &str) -> Self {
        let mut next = self.0.clone();
        if !next.remove(id) {
            next.insert(id.to_string());
        }
        Self(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }

    /// Non-string entries are ignored
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Self::default(),
        }
    }
}

impl FromIterator<String> for LikeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for LikeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

/// A successful result plus any non-fatal cleanup problems
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<OrphanedBlobWarning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// One page of a listing request
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub filters: Vec<Filter>,
    pub order: Ordering,
    pub page_size: usize,
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    /// First page, most recently modified first
    pub fn first(page_size: usize) -> Self {
        Self {
            filters: Vec::new(),
            order: Ordering::default(),
            page_size,
            cursor: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: Ordering) -> Self {
        self.order = order;
        self
    }

    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Items of one page and the cursor for the next, `None` at the end
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn toggling_adds_then_removes() {
        let start: LikeSet = ["u1"].into_iter().collect();
        let liked = start.toggled("u2");
        assert_eq!(liked, ["u1", "u2"].into_iter().collect::<LikeSet>());
        assert_eq!(liked.toggled("u2"), start);
    }

    #[test]
    fn like_set_reads_arrays_only() {
        let v = json!(["a", 3, "b"]);
        let set = LikeSet::from_value(Some(&v));
        assert_eq!(set.len(), 2);
        assert!(LikeSet::from_value(Some(&json!("a"))).is_empty());
        assert!(LikeSet::from_value(None).is_empty());
    }

    #[test]
    fn resource_lifts_media_out_of_fields() {
        let doc = Document {
            id: DocumentId::from("p1"),
            collection: "posts".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            fields: json!({
                "caption": "hi",
                "imageId": "b1",
                "imageUrl": "http://localhost/v1/storage/buckets/media/files/b1/preview"
            })
            .as_object()
            .cloned()
            .unwrap(),
        };

        let resource = Resource::from_document(doc).unwrap();
        assert_eq!(resource.media.as_ref().unwrap().blob_id().as_str(), "b1");
        assert!(resource.field("imageId").is_none());
        assert_eq!(resource.str_field("caption"), Some("hi"));
    }

    #[test]
    fn resource_rejects_dangling_media() {
        let doc = Document {
            id: DocumentId::from("p1"),
            collection: "posts".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            fields: json!({"imageId": "b1"}).as_object().cloned().unwrap(),
        };
        let err = Resource::from_document(doc).unwrap_err();
        assert!(matches!(err, OrchestratorError::Decode { .. }));
    }
}
