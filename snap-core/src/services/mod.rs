//! Typed services for the social feed: posts, user profiles and saved posts.
//!
//! Each service owns a [`ResourceKind`](crate::resource::ResourceKind) and
//! hands every multi-step write to the [`Orchestrator`].

pub mod posts;
pub mod saves;
pub mod users;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use snap_blob::BlobStore;
use snap_docs::{DocumentStore, Fields};

use crate::config::Settings;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};

pub use posts::{NewPost, Post, PostService, PostUpdate};
pub use saves::{SaveService, SavedPost};
pub use users::{NewAccount, ProfileImage, ProfileUpdate, UserProfile, UserService};

/// All services wired against one pair of stores
#[derive(Clone)]
pub struct Services {
    pub posts: PostService,
    pub users: UserService,
    pub saves: SaveService,
}

impl Services {
    pub fn build(
        blobs: Arc<dyn BlobStore>,
        docs: Arc<dyn DocumentStore>,
        settings: &Settings,
    ) -> Result<Self> {
        let config = OrchestratorConfig::new().with_preview(settings.preview.clone());
        let orchestrator = Orchestrator::from_shared(blobs, docs, config);
        Ok(Self {
            posts: PostService::new(orchestrator.clone(), settings),
            users: UserService::new(orchestrator.clone(), settings, settings.url_builder()?),
            saves: SaveService::new(orchestrator, settings),
        })
    }
}

fn object(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
