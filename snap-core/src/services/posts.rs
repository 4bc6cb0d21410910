use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use snap_blob::{BlobId, BlobPayload};
use snap_docs::{Cursor, DocumentId, Filter, OrderKey, Ordering};

use super::object;
use crate::config::Settings;
use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::media::MediaReference;
use crate::orchestrator::Orchestrator;
use crate::resource::{LikeSet, Outcome, Page, PageRequest, Resource, ResourceKind, LIKES_FIELD};

pub const CREATOR_FIELD: &str = "creator";
pub const CAPTION_FIELD: &str = "caption";

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: DocumentId,
    pub creator: String,
    pub caption: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub media: Option<MediaReference>,
    pub likes: LikeSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PostFields {
    creator: String,
    #[serde(default)]
    caption: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl TryFrom<Resource> for Post {
    type Error = OrchestratorError;

    fn try_from(resource: Resource) -> OrchestratorResult<Self> {
        let fields: PostFields = resource.decode()?;
        Ok(Self {
            likes: resource.likes(),
            id: resource.id,
            creator: fields.creator,
            caption: fields.caption,
            location: fields.location,
            tags: fields.tags,
            media: resource.media,
            created_at: resource.created_at,
            updated_at: resource.updated_at,
        })
    }
}

/// A post to publish; the image is required
#[derive(Debug)]
pub struct NewPost {
    pub creator: String,
    pub caption: String,
    pub location: Option<String>,
    /// Free text, comma separated
    pub tags: String,
    pub file: BlobPayload,
}

/// Edits to an existing post. `file` replaces the image when present.
#[derive(Debug)]
pub struct PostUpdate {
    pub post_id: DocumentId,
    pub caption: String,
    pub location: Option<String>,
    pub tags: String,
    pub file: Option<BlobPayload>,
    pub previous_media: Option<MediaReference>,
}

#[derive(Clone)]
pub struct PostService {
    orchestrator: Orchestrator,
    kind: ResourceKind,
    feed_page_size: usize,
    recent_limit: usize,
}

impl PostService {
    pub fn new(orchestrator: Orchestrator, settings: &Settings) -> Self {
        Self {
            orchestrator,
            kind: ResourceKind::new(settings.posts_collection.clone(), CREATOR_FIELD).with_tags(),
            feed_page_size: settings.feed_page_size,
            recent_limit: settings.recent_limit,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub async fn create_post(&self, post: NewPost) -> OrchestratorResult<Post> {
        let fields = object(json!({
            "caption": post.caption,
            "location": post.location,
            "tags": post.tags,
        }));
        self.orchestrator
            .create_resource(&self.kind, &post.creator, fields, post.file)
            .await?
            .try_into()
    }

    pub async fn update_post(&self, update: PostUpdate) -> OrchestratorResult<Outcome<Post>> {
        let fields = object(json!({
            "caption": update.caption,
            "location": update.location,
            "tags": update.tags,
        }));
        let outcome = self
            .orchestrator
            .update_resource(
                &self.kind,
                &update.post_id,
                fields,
                update.file,
                update.previous_media.as_ref(),
            )
            .await?;
        Ok(Outcome {
            value: outcome.value.try_into()?,
            warnings: outcome.warnings,
        })
    }

    /// Delete a post and its image; both ids are required
    pub async fn delete_post(
        &self,
        post_id: &DocumentId,
        image_id: &BlobId,
    ) -> OrchestratorResult<Outcome<()>> {
        if image_id.is_empty() {
            return Err(OrchestratorError::validation("missing image id"));
        }
        self.orchestrator
            .delete_resource(&self.kind, post_id, Some(image_id))
            .await
    }

    pub async fn get_post(&self, post_id: &DocumentId) -> OrchestratorResult<Post> {
        self.orchestrator
            .get_resource(&self.kind, post_id)
            .await?
            .try_into()
    }

    /// Posts whose caption contains `term`, ignoring case
    pub async fn search_posts(&self, term: &str) -> OrchestratorResult<Vec<Post>> {
        if term.trim().is_empty() {
            return Err(OrchestratorError::validation("missing search term"));
        }
        let resources = self
            .orchestrator
            .list_resources(
                &self.kind,
                vec![Filter::search(CAPTION_FIELD, term.trim())],
                Ordering::default(),
                None,
            )
            .await?;
        collect_posts(resources)
    }

    /// Infinite feed: most recently modified first
    pub async fn feed_page(&self, cursor: Option<Cursor>) -> OrchestratorResult<Page<Post>> {
        let page = self
            .orchestrator
            .list_resources_page(&self.kind, PageRequest::first(self.feed_page_size).after(cursor))
            .await?;
        Ok(Page {
            items: collect_posts(page.items)?,
            next_cursor: page.next_cursor,
        })
    }

    /// Every post by `user_id`, newest first
    pub async fn user_posts(&self, user_id: &str) -> OrchestratorResult<Vec<Post>> {
        if user_id.trim().is_empty() {
            return Err(OrchestratorError::validation("missing user id"));
        }
        let resources = self
            .orchestrator
            .list_resources(
                &self.kind,
                vec![Filter::equal(CREATOR_FIELD, user_id)],
                Ordering::desc(OrderKey::CreatedAt),
                None,
            )
            .await?;
        collect_posts(resources)
    }

    /// The newest posts, bounded by the configured limit
    pub async fn recent_posts(&self) -> OrchestratorResult<Vec<Post>> {
        let resources = self
            .orchestrator
            .list_resources(
                &self.kind,
                Vec::new(),
                Ordering::desc(OrderKey::CreatedAt),
                Some(self.recent_limit),
            )
            .await?;
        collect_posts(resources)
    }

    /// Posts whose like set contains `user_id`
    pub async fn liked_by(&self, user_id: &str) -> OrchestratorResult<Vec<Post>> {
        if user_id.trim().is_empty() {
            return Err(OrchestratorError::validation("missing user id"));
        }
        let resources = self
            .orchestrator
            .list_resources(
                &self.kind,
                vec![Filter::equal(LIKES_FIELD, user_id)],
                Ordering::default(),
                None,
            )
            .await?;
        collect_posts(resources)
    }

    pub async fn toggle_like(
        &self,
        post_id: &DocumentId,
        liker_id: &str,
        current: &LikeSet,
    ) -> OrchestratorResult<Post> {
        self.orchestrator
            .toggle_like_membership(&self.kind, post_id, liker_id, current)
            .await?
            .try_into()
    }

    pub async fn set_likes(&self, post_id: &DocumentId, likes: &LikeSet) -> OrchestratorResult<Post> {
        self.orchestrator
            .set_likes(&self.kind, post_id, likes)
            .await?
            .try_into()
    }
}

fn collect_posts(resources: Vec<Resource>) -> OrchestratorResult<Vec<Post>> {
    resources.into_iter().map(Post::try_from).collect()
}
