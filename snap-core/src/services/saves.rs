use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use snap_docs::{DocumentId, Filter, OrderKey, Ordering};

use super::object;
use crate::config::Settings;
use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::Orchestrator;
use crate::resource::{Resource, ResourceKind};

pub const USER_FIELD: &str = "user";
pub const POST_FIELD: &str = "post";

/// A bookmark linking a user to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPost {
    pub id: DocumentId,
    pub user: String,
    pub post: DocumentId,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SaveFields {
    user: String,
    post: DocumentId,
}

impl TryFrom<Resource> for SavedPost {
    type Error = OrchestratorError;

    fn try_from(resource: Resource) -> OrchestratorResult<Self> {
        let fields: SaveFields = resource.decode()?;
        Ok(Self {
            id: resource.id,
            user: fields.user,
            post: fields.post,
            created_at: resource.created_at,
        })
    }
}

#[derive(Clone)]
pub struct SaveService {
    orchestrator: Orchestrator,
    kind: ResourceKind,
}

impl SaveService {
    pub fn new(orchestrator: Orchestrator, settings: &Settings) -> Self {
        Self {
            orchestrator,
            kind: ResourceKind::new(settings.saves_collection.clone(), USER_FIELD),
        }
    }

    pub async fn save_post(&self, user_id: &str, post_id: &DocumentId) -> OrchestratorResult<SavedPost> {
        if post_id.as_str().trim().is_empty() {
            return Err(OrchestratorError::validation("missing post id"));
        }
        let fields = object(json!({ "post": post_id }));
        self.orchestrator
            .create_record(&self.kind, user_id, fields)
            .await?
            .try_into()
    }

    /// Remove a save record; deleting one that is already gone succeeds
    pub async fn delete_saved(&self, record_id: &DocumentId) -> OrchestratorResult<()> {
        self.orchestrator
            .delete_resource(&self.kind, record_id, None)
            .await
            .map(|outcome| outcome.into_value())
    }

    /// Saves made by `user_id`, newest first
    pub async fn saved_by(&self, user_id: &str) -> OrchestratorResult<Vec<SavedPost>> {
        if user_id.trim().is_empty() {
            return Err(OrchestratorError::validation("missing user id"));
        }
        self.orchestrator
            .list_resources(
                &self.kind,
                vec![Filter::equal(USER_FIELD, user_id)],
                Ordering::desc(OrderKey::CreatedAt),
                None,
            )
            .await?
            .into_iter()
            .map(SavedPost::try_from)
            .collect()
    }
}
