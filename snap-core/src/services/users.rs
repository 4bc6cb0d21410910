use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use snap_blob::{BlobPayload, PreviewUrlBuilder};
use snap_docs::{DocumentId, Filter, OrderKey, Ordering};
use tracing::{info, instrument};
use url::Url;

use super::object;
use crate::config::Settings;
use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::media::MediaReference;
use crate::orchestrator::Orchestrator;
use crate::resource::{Outcome, Resource, ResourceKind};

pub const ACCOUNT_ID_FIELD: &str = "accountId";
/// Generated avatar URL, kept apart from the uploaded media pair
pub const AVATAR_URL_FIELD: &str = "avatarUrl";

/// The picture shown for a user
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileImage {
    /// Initials avatar produced at registration
    Generated { url: Url },
    Uploaded(MediaReference),
}

impl ProfileImage {
    pub fn url(&self) -> &Url {
        match self {
            ProfileImage::Generated { url } => url,
            ProfileImage::Uploaded(media) => media.preview_url(),
        }
    }

    pub fn media(&self) -> Option<&MediaReference> {
        match self {
            ProfileImage::Generated { .. } => None,
            ProfileImage::Uploaded(media) => Some(media),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: DocumentId,
    pub account_id: String,
    pub name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<ProfileImage>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileFields {
    account_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl TryFrom<Resource> for UserProfile {
    type Error = OrchestratorError;

    fn try_from(resource: Resource) -> OrchestratorResult<Self> {
        let fields: ProfileFields = resource.decode()?;
        let image = match (resource.media, fields.avatar_url) {
            (Some(media), _) => Some(ProfileImage::Uploaded(media)),
            (None, Some(raw)) => {
                let url = Url::parse(&raw).map_err(|e| {
                    OrchestratorError::decode(
                        &resource.collection,
                        resource.id.as_str(),
                        format!("{AVATAR_URL_FIELD}: {e}"),
                    )
                })?;
                Some(ProfileImage::Generated { url })
            }
            (None, None) => None,
        };
        Ok(Self {
            id: resource.id,
            account_id: fields.account_id,
            name: fields.name,
            username: fields.username,
            email: fields.email,
            bio: fields.bio,
            image,
            created_at: resource.created_at,
        })
    }
}

/// Profile record for an account created by the identity provider
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
}

/// Edits to a profile. `file` replaces the uploaded picture when present.
#[derive(Debug)]
pub struct ProfileUpdate {
    pub user_id: DocumentId,
    pub name: String,
    pub bio: Option<String>,
    pub file: Option<BlobPayload>,
    pub previous_media: Option<MediaReference>,
}

#[derive(Clone)]
pub struct UserService {
    orchestrator: Orchestrator,
    kind: ResourceKind,
    urls: PreviewUrlBuilder,
}

impl UserService {
    pub fn new(orchestrator: Orchestrator, settings: &Settings, urls: PreviewUrlBuilder) -> Self {
        Self {
            orchestrator,
            kind: ResourceKind::new(settings.users_collection.clone(), ACCOUNT_ID_FIELD),
            urls,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Create the profile record with a generated initials avatar
    #[instrument(skip_all, fields(account = %account.account_id))]
    pub async fn register(&self, account: NewAccount) -> OrchestratorResult<UserProfile> {
        if account.name.trim().is_empty() {
            return Err(OrchestratorError::validation("missing name"));
        }
        let avatar = self
            .urls
            .initials_avatar(&account.name)
            .map_err(|e| OrchestratorError::validation(e.to_string()))?;

        let fields = object(json!({
            "name": account.name,
            "email": account.email,
            "username": account.username,
            AVATAR_URL_FIELD: avatar.as_str(),
        }));
        let profile: UserProfile = self
            .orchestrator
            .create_record(&self.kind, &account.account_id, fields)
            .await?
            .try_into()?;
        info!(user_id = %profile.id, "profile registered");
        Ok(profile)
    }

    /// The profile linked to an authenticated account
    pub async fn current_user(&self, account_id: &str) -> OrchestratorResult<UserProfile> {
        if account_id.trim().is_empty() {
            return Err(OrchestratorError::validation("missing account id"));
        }
        let mut found = self
            .orchestrator
            .list_resources(
                &self.kind,
                vec![Filter::equal(ACCOUNT_ID_FIELD, account_id)],
                Ordering::desc(OrderKey::CreatedAt),
                Some(1),
            )
            .await?;
        match found.pop() {
            Some(resource) => resource.try_into(),
            None => Err(OrchestratorError::not_found(
                &self.kind.collection,
                format!("{ACCOUNT_ID_FIELD}={account_id}"),
            )),
        }
    }

    /// Newest profiles first
    pub async fn list_users(&self, limit: Option<usize>) -> OrchestratorResult<Vec<UserProfile>> {
        if limit == Some(0) {
            return Err(OrchestratorError::validation("limit must be at least 1"));
        }
        self.orchestrator
            .list_resources(&self.kind, Vec::new(), Ordering::desc(OrderKey::CreatedAt), limit)
            .await?
            .into_iter()
            .map(UserProfile::try_from)
            .collect()
    }

    pub async fn get_user(&self, user_id: &DocumentId) -> OrchestratorResult<UserProfile> {
        self.orchestrator
            .get_resource(&self.kind, user_id)
            .await?
            .try_into()
    }

    /// Update name and bio, optionally replacing the uploaded picture.
    ///
    /// A generated avatar is never deleted from storage; only an uploaded
    /// picture that was replaced is.
    pub async fn update_user(&self, update: ProfileUpdate) -> OrchestratorResult<Outcome<UserProfile>> {
        let fields = object(json!({
            "name": update.name,
            "bio": update.bio,
        }));
        let outcome = self
            .orchestrator
            .update_resource(
                &self.kind,
                &update.user_id,
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
}
