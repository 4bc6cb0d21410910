use std::sync::Arc;

use serde_json::Value;
use snap_blob::{BlobId, BlobPayload, BlobStore, PreviewSpec};
use snap_docs::{Cursor, DocumentId, DocumentStore, Fields, Filter, ListQuery, Ordering};
use tracing::{debug, info, instrument, warn};

use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::media::MediaReference;
use crate::resource::{LikeSet, Outcome, Page, PageRequest, Resource, ResourceKind, LIKES_FIELD, TAGS_FIELD};
use crate::saga::Saga;
use crate::tags::TagList;

/// Policy the orchestrator applies to every operation
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub preview: PreviewSpec,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview(mut self, preview: PreviewSpec) -> Self {
        self.preview = preview;
        self
    }
}

/// Sequences blob uploads, preview derivation and document writes so that a
/// document never references a blob that is missing, and a failed write
/// never leaves a freshly uploaded blob behind.
#[derive(Clone)]
pub struct Orchestrator {
    blobs: Arc<dyn BlobStore>,
    docs: Arc<dyn DocumentStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new<B, D>(blobs: B, docs: D, config: OrchestratorConfig) -> Self
    where
        B: BlobStore + 'static,
        D: DocumentStore + 'static,
    {
        Self::from_shared(Arc::new(blobs), Arc::new(docs), config)
    }

    /// Build from store handles the caller keeps a reference to
    pub fn from_shared(
        blobs: Arc<dyn BlobStore>,
        docs: Arc<dyn DocumentStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            blobs,
            docs,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.docs
    }

    /// Upload `payload`, derive its preview and create the document.
    ///
    /// A failure after the upload deletes the uploaded blob before returning.
    #[instrument(skip_all, fields(collection = %kind.collection, owner = %owner_id))]
    pub async fn create_resource(
        &self,
        kind: &ResourceKind,
        owner_id: &str,
        fields: Fields,
        payload: BlobPayload,
    ) -> OrchestratorResult<Resource> {
        require_id("owner id", owner_id)?;

        let mut saga = Saga::begin("create_resource", Arc::clone(&self.blobs));
        let media = saga.stage_media(payload, &self.config.preview).await?;

        let mut fields = normalize_created(kind, fields);
        fields.insert(kind.owner_field.clone(), Value::String(owner_id.to_string()));
        media.write_to(&mut fields);

        let created = self
            .docs
            .create(&kind.collection, fields)
            .await
            .map_err(|source| OrchestratorError::DocumentPersist {
                collection: kind.collection.clone(),
                source,
            });
        let doc = saga.check(created).await?;
        saga.commit().await;

        info!(id = %doc.id, blob_id = %media.blob_id(), "resource created");
        Resource::from_document(doc)
    }

    /// Create a document that carries no media
    #[instrument(skip_all, fields(collection = %kind.collection, owner = %owner_id))]
    pub async fn create_record(
        &self,
        kind: &ResourceKind,
        owner_id: &str,
        fields: Fields,
    ) -> OrchestratorResult<Resource> {
        require_id("owner id", owner_id)?;

        let mut fields = normalize_created(kind, fields);
        fields.insert(kind.owner_field.clone(), Value::String(owner_id.to_string()));
        let doc = self
            .docs
            .create(&kind.collection, fields)
            .await
            .map_err(|source| OrchestratorError::DocumentPersist {
                collection: kind.collection.clone(),
                source,
            })?;
        Resource::from_document(doc)
    }

    /// Update a resource, optionally replacing its media.
    ///
    /// Without a payload `previous_media` is written back unchanged. With a
    /// payload the new blob is staged first; the old blob is deleted only
    /// after the document update has succeeded, and a failure to delete it is
    /// reported as a warning on the outcome.
    ///
    /// The stored document must decode before anything is uploaded or
    /// written; a malformed document is reported untouched.
    #[instrument(skip_all, fields(collection = %kind.collection, id = %resource_id, replace_media = new_payload.is_some()))]
    pub async fn update_resource(
        &self,
        kind: &ResourceKind,
        resource_id: &DocumentId,
        fields: Fields,
        new_payload: Option<BlobPayload>,
        previous_media: Option<&MediaReference>,
    ) -> OrchestratorResult<Outcome<Resource>> {
        self.get_resource(kind, resource_id).await?;

        let mut saga = Saga::begin("update_resource", Arc::clone(&self.blobs));
        let media = match new_payload {
            Some(payload) => {
                let staged = saga.stage_media(payload, &self.config.preview).await?;
                if let Some(previous) = previous_media {
                    if previous.blob_id() != staged.blob_id() {
                        saga.defer_delete(previous.blob_id().clone());
                    }
                }
                Some(staged)
            }
            None => previous_media.cloned(),
        };

        let mut fields = normalize_fields(fields);
        if let Some(media) = &media {
            media.write_to(&mut fields);
        }

        let updated = self
            .docs
            .update(&kind.collection, resource_id, fields)
            .await
            .map_err(|source| OrchestratorError::DocumentPersist {
                collection: kind.collection.clone(),
                source,
            });
        let doc = saga.check(updated).await?;
        let warnings = saga.commit().await;

        debug!(warnings = warnings.len(), "resource updated");
        Ok(Outcome {
            value: Resource::from_document(doc)?,
            warnings,
        })
    }

    /// Delete the document, then its blob.
    ///
    /// If the document delete fails the blob is left alone. If the blob
    /// delete fails afterwards the operation still succeeds with a warning.
    #[instrument(skip_all, fields(collection = %kind.collection, id = %resource_id))]
    pub async fn delete_resource(
        &self,
        kind: &ResourceKind,
        resource_id: &DocumentId,
        blob_id: Option<&BlobId>,
    ) -> OrchestratorResult<Outcome<()>> {
        require_id("resource id", resource_id.as_str())?;
        if let Some(blob_id) = blob_id {
            require_id("blob id", blob_id.as_str())?;
        }

        self.docs
            .delete(&kind.collection, resource_id)
            .await
            .map_err(|source| OrchestratorError::DocumentDelete {
                collection: kind.collection.clone(),
                source,
            })?;

        let mut saga = Saga::begin("delete_resource", Arc::clone(&self.blobs));
        if let Some(blob_id) = blob_id {
            saga.defer_delete(blob_id.clone());
        }
        let warnings = saga.commit().await;
        if !warnings.is_empty() {
            warn!(orphans = warnings.len(), "resource deleted but its blob was not");
        }
        Ok(Outcome {
            value: (),
            warnings,
        })
    }

    pub async fn get_resource(
        &self,
        kind: &ResourceKind,
        resource_id: &DocumentId,
    ) -> OrchestratorResult<Resource> {
        require_id("resource id", resource_id.as_str())?;
        let doc = self
            .docs
            .get(&kind.collection, resource_id)
            .await
            .map_err(|e| OrchestratorError::from_read(&kind.collection, e))?;
        Resource::from_document(doc)
    }

    /// One bounded page; `next_cursor` is `None` once a short page comes back
    #[instrument(skip_all, fields(collection = %kind.collection, page_size = request.page_size))]
    pub async fn list_resources_page(
        &self,
        kind: &ResourceKind,
        request: PageRequest,
    ) -> OrchestratorResult<Page<Resource>> {
        if request.page_size == 0 {
            return Err(OrchestratorError::validation("page size must be at least 1"));
        }
        let page_size = request.page_size;
        let query = ListQuery {
            filters: request.filters,
            order: request.order,
            limit: Some(page_size),
            cursor: request.cursor,
        };

        let items = self.query(kind, &query).await?;
        let next_cursor = if items.len() < page_size {
            None
        } else {
            items.last().map(|r| Cursor::after(r.id.clone()))
        };
        Ok(Page { items, next_cursor })
    }

    /// Single unpaginated query
    pub async fn list_resources(
        &self,
        kind: &ResourceKind,
        filters: Vec<Filter>,
        order: Ordering,
        limit: Option<usize>,
    ) -> OrchestratorResult<Vec<Resource>> {
        let query = ListQuery {
            filters,
            order,
            limit,
            cursor: None,
        };
        self.query(kind, &query).await
    }

    /// Add or remove `liker_id` from `current` and write the whole set back.
    ///
    /// Not atomic across clients: two concurrent toggles on the same
    /// resource can lose one of them.
    #[instrument(skip_all, fields(collection = %kind.collection, id = %resource_id, liker = %liker_id))]
    pub async fn toggle_like_membership(
        &self,
        kind: &ResourceKind,
        resource_id: &DocumentId,
        liker_id: &str,
        current: &LikeSet,
    ) -> OrchestratorResult<Resource> {
        require_id("liker id", liker_id)?;
        let next = current.toggled(liker_id);
        self.set_likes(kind, resource_id, &next).await
    }

    /// Replace the like set
    pub async fn set_likes(
        &self,
        kind: &ResourceKind,
        resource_id: &DocumentId,
        likes: &LikeSet,
    ) -> OrchestratorResult<Resource> {
        self.get_resource(kind, resource_id).await?;
        let mut fields = Fields::new();
        fields.insert(LIKES_FIELD.to_string(), likes.to_value());

        let doc = self
            .docs
            .update(&kind.collection, resource_id, fields)
            .await
            .map_err(|source| OrchestratorError::DocumentPersist {
                collection: kind.collection.clone(),
                source,
            })?;
        Resource::from_document(doc)
    }

    async fn query(&self, kind: &ResourceKind, query: &ListQuery) -> OrchestratorResult<Vec<Resource>> {
        let docs = self
            .docs
            .list(&kind.collection, query)
            .await
            .map_err(|source| OrchestratorError::Query {
                collection: kind.collection.clone(),
                source,
            })?;
        docs.into_iter().map(Resource::from_document).collect()
    }
}

fn require_id(what: &str, id: &str) -> OrchestratorResult<()> {
    if id.trim().is_empty() {
        return Err(OrchestratorError::validation(format!("missing {what}")));
    }
    Ok(())
}

/// Turn a free-text `tags` field into a list and drop caller supplied media
/// fields, which only the orchestrator may write.
fn normalize_fields(mut fields: Fields) -> Fields {
    MediaReference::strip(&mut fields);
    if let Some(Value::String(raw)) = fields.get(TAGS_FIELD) {
        let tags = TagList::parse(raw).to_value();
        fields.insert(TAGS_FIELD.to_string(), tags);
    }
    fields
}

/// Fields for a new document; tagged kinds get `[]` when no tags were sent
fn normalize_created(kind: &ResourceKind, fields: Fields) -> Fields {
    let mut fields = normalize_fields(fields);
    if kind.tagged {
        let tags = fields
            .entry(TAGS_FIELD.to_string())
            .or_insert(Value::Null);
        if tags.is_null() {
            *tags = TagList::default().to_value();
        }
    }
    fields
}
