use std::sync::Arc;

use snap_blob::{BlobId, BlobOp, BlobPayload, MemoryBlobStore};
use snap_core::{
    NewAccount, NewPost, OrchestratorError, PostUpdate, ProfileImage, ProfileUpdate, Services,
    Settings, SnapConfig,
};
use snap_docs::{DocOp, DocumentId, MemoryDocumentStore};

struct Harness {
    blobs: Arc<MemoryBlobStore>,
    docs: Arc<MemoryDocumentStore>,
    services: Services,
}

fn harness_with(settings: Settings) -> Harness {
    let blobs = Arc::new(MemoryBlobStore::default());
    let docs = Arc::new(MemoryDocumentStore::new());
    let services = Services::build(blobs.clone(), docs.clone(), &settings).unwrap();
    Harness {
        blobs,
        docs,
        services,
    }
}

fn harness() -> Harness {
    harness_with(Settings::default())
}

fn image(bytes: &'static [u8]) -> BlobPayload {
    BlobPayload::from_bytes(bytes).with_content_type("image/jpeg")
}

fn new_post(creator: &str, caption: &str) -> NewPost {
    NewPost {
        creator: creator.to_string(),
        caption: caption.to_string(),
        location: Some("Lisbon".to_string()),
        tags: "travel, sea,, ".to_string(),
        file: image(b"jpeg"),
    }
}

fn account(id: &str, name: &str) -> NewAccount {
    NewAccount {
        account_id: id.to_string(),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        username: Some(id.to_string()),
    }
}

#[tokio::test]
async fn test_create_post_normalizes_tags_and_links_image() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "Sunset")).await.unwrap();

    assert_eq!(post.tags, vec!["travel".to_string(), "sea".to_string()]);
    assert_eq!(post.creator, "u1");
    assert_eq!(post.location.as_deref(), Some("Lisbon"));
    let media = post.media.as_ref().unwrap();
    assert!(h.blobs.contains(media.blob_id()));

    let url = media.preview_url().as_str();
    assert!(url.contains("width=2000"));
    assert!(url.contains("gravity=top"));
    assert!(url.contains("quality=100"));
}

#[tokio::test]
async fn test_update_post_swaps_image() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "v1")).await.unwrap();
    let old = post.media.clone().unwrap();

    let outcome = h
        .services
        .posts
        .update_post(PostUpdate {
            post_id: post.id.clone(),
            caption: "v2".to_string(),
            location: None,
            tags: String::new(),
            file: Some(image(b"other")),
            previous_media: Some(old.clone()),
        })
        .await
        .unwrap();

    let updated = outcome.value;
    assert_eq!(updated.caption, "v2");
    assert!(updated.tags.is_empty());
    assert!(updated.location.is_none());
    assert!(!h.blobs.contains(old.blob_id()));
    assert!(h.blobs.contains(updated.media.unwrap().blob_id()));
}

#[tokio::test]
async fn test_update_post_without_file_keeps_image() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "v1")).await.unwrap();

    let outcome = h
        .services
        .posts
        .update_post(PostUpdate {
            post_id: post.id.clone(),
            caption: "v2".to_string(),
            location: post.location.clone(),
            tags: "a,b".to_string(),
            file: None,
            previous_media: post.media.clone(),
        })
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.value.media, post.media);
    assert_eq!(h.blobs.len(), 1);
}

#[tokio::test]
async fn test_delete_post_requires_image_id() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "bye")).await.unwrap();

    let err = h
        .services
        .posts
        .delete_post(&post.id, &BlobId::from(""))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation { .. }));
    assert_eq!(h.docs.count("posts"), 1);

    let media = post.media.unwrap();
    let outcome = h.services.posts.delete_post(&post.id, media.blob_id()).await.unwrap();
    assert!(outcome.is_clean());
    assert!(h.blobs.is_empty());
    assert_eq!(h.docs.count("posts"), 0);
}

#[tokio::test]
async fn test_search_posts_by_caption() {
    let h = harness();
    for caption in ["Beach day", "mountain hike", "BEACH night"] {
        h.services.posts.create_post(new_post("u1", caption)).await.unwrap();
    }

    let found = h.services.posts.search_posts("beach").await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.caption.to_lowercase().contains("beach")));

    let err = h.services.posts.search_posts("   ").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation { .. }));
}

#[tokio::test]
async fn test_feed_pages_follow_configured_size() {
    let mut config = SnapConfig::new();
    config.set("feed.page_size", "2");
    let h = harness_with(Settings::from_config(&config).unwrap());
    for n in 0..5 {
        h.services
            .posts
            .create_post(new_post("u1", &format!("post {n}")))
            .await
            .unwrap();
    }

    let mut captions = Vec::new();
    let mut cursor = None;
    loop {
        let page = h.services.posts.feed_page(cursor).await.unwrap();
        assert!(page.items.len() <= 2);
        captions.extend(page.items.iter().map(|p| p.caption.clone()));
        if page.is_last() {
            break;
        }
        cursor = page.next_cursor;
    }
    assert_eq!(captions, vec!["post 4", "post 3", "post 2", "post 1", "post 0"]);
}

#[tokio::test]
async fn test_user_and_recent_posts() {
    let mut config = SnapConfig::new();
    config.set("feed.recent_limit", "2");
    let h = harness_with(Settings::from_config(&config).unwrap());
    h.services.posts.create_post(new_post("u1", "first")).await.unwrap();
    h.services.posts.create_post(new_post("u2", "other")).await.unwrap();
    h.services.posts.create_post(new_post("u1", "second")).await.unwrap();

    let mine = h.services.posts.user_posts("u1").await.unwrap();
    let captions: Vec<_> = mine.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, vec!["second", "first"]);

    let recent = h.services.posts.recent_posts().await.unwrap();
    let captions: Vec<_> = recent.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, vec!["second", "other"]);

    assert!(h.services.posts.user_posts("").await.is_err());
}

#[tokio::test]
async fn test_like_toggle_and_liked_by() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "likeable")).await.unwrap();

    let post = h
        .services
        .posts
        .toggle_like(&post.id, "u2", &post.likes)
        .await
        .unwrap();
    assert!(post.likes.contains("u2"));

    let liked = h.services.posts.liked_by("u2").await.unwrap();
    assert_eq!(liked.len(), 1);

    let post = h
        .services
        .posts
        .toggle_like(&post.id, "u2", &post.likes)
        .await
        .unwrap();
    assert!(post.likes.is_empty());
    assert!(h.services.posts.liked_by("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_post_failure_leaves_nothing() {
    let h = harness();
    h.docs.fail_next(DocOp::Create);

    let err = h.services.posts.create_post(new_post("u1", "x")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::DocumentPersist { .. }));
    assert!(h.blobs.is_empty());
}

#[tokio::test]
async fn test_register_generates_initials_avatar() {
    let h = harness();
    let profile = h.services.users.register(account("acc1", "Ada Lovelace")).await.unwrap();

    assert_eq!(profile.account_id, "acc1");
    match profile.image {
        Some(ProfileImage::Generated { ref url }) => {
            assert!(url.path().ends_with("/avatars/initials"));
            assert!(url.query().unwrap_or_default().contains("name=Ada+Lovelace"));
        }
        ref other => panic!("expected generated avatar, got {other:?}"),
    }
    assert!(h.blobs.is_empty());

    let current = h.services.users.current_user("acc1").await.unwrap();
    assert_eq!(current.id, profile.id);
    assert_eq!(h.services.users.get_user(&profile.id).await.unwrap(), current);
}

#[tokio::test]
async fn test_current_user_unknown_account_is_not_found() {
    let h = harness();
    let err = h.services.users.current_user("nobody").await.unwrap_err();
    assert_eq!(err.kind().status_code(), 404);

    let err = h.services.users.register(account("acc1", " ")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation { .. }));
}

#[tokio::test]
async fn test_list_users_newest_first() {
    let h = harness();
    for (id, name) in [("a", "Ann"), ("b", "Bob"), ("c", "Cy")] {
        h.services.users.register(account(id, name)).await.unwrap();
    }

    let users = h.services.users.list_users(Some(2)).await.unwrap();
    let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Cy", "Bob"]);
    assert_eq!(h.services.users.list_users(None).await.unwrap().len(), 3);
    assert!(h.services.users.list_users(Some(0)).await.is_err());
}

#[tokio::test]
async fn test_update_user_replaces_uploaded_picture_only() {
    let h = harness();
    let profile = h.services.users.register(account("acc1", "Ada")).await.unwrap();

    // first upload: nothing stored to replace
    let outcome = h
        .services
        .users
        .update_user(ProfileUpdate {
            user_id: profile.id.clone(),
            name: "Ada L".to_string(),
            bio: Some("math".to_string()),
            file: Some(image(b"face")),
            previous_media: profile.image.as_ref().and_then(|i| i.media().cloned()),
        })
        .await
        .unwrap();
    let first = outcome.value.image.clone().unwrap();
    let first_media = first.media().cloned().unwrap();
    assert_eq!(outcome.value.bio.as_deref(), Some("math"));
    assert_eq!(h.blobs.len(), 1);

    let outcome = h
        .services
        .users
        .update_user(ProfileUpdate {
            user_id: profile.id.clone(),
            name: "Ada L".to_string(),
            bio: None,
            file: Some(image(b"face2")),
            previous_media: Some(first_media.clone()),
        })
        .await
        .unwrap();
    let second = outcome.value.image.unwrap();
    assert!(matches!(second, ProfileImage::Uploaded(_)));
    assert!(!h.blobs.contains(first_media.blob_id()));
    assert_eq!(h.blobs.len(), 1);
}

#[tokio::test]
async fn test_update_user_failure_keeps_old_picture() {
    let h = harness();
    let profile = h.services.users.register(account("acc1", "Ada")).await.unwrap();
    h.blobs.fail_next(BlobOp::Preview);

    let err = h
        .services
        .users
        .update_user(ProfileUpdate {
            user_id: profile.id.clone(),
            name: "Ada".to_string(),
            bio: None,
            file: Some(image(b"face")),
            previous_media: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::PreviewDerivation { .. }));
    assert!(h.blobs.is_empty());

    let unchanged = h.services.users.get_user(&profile.id).await.unwrap();
    assert_eq!(unchanged.image, profile.image);
}

#[tokio::test]
async fn test_save_and_unsave_post() {
    let h = harness();
    let post = h.services.posts.create_post(new_post("u1", "keep")).await.unwrap();

    let saved = h.services.saves.save_post("u2", &post.id).await.unwrap();
    assert_eq!(saved.post, post.id);
    assert_eq!(saved.user, "u2");

    let mine = h.services.saves.saved_by("u2").await.unwrap();
    assert_eq!(mine, vec![saved.clone()]);
    assert!(h.services.saves.saved_by("u1").await.unwrap().is_empty());

    h.services.saves.delete_saved(&saved.id).await.unwrap();
    h.services.saves.delete_saved(&saved.id).await.unwrap();
    assert!(h.services.saves.saved_by("u2").await.unwrap().is_empty());

    let err = h
        .services
        .saves
        .save_post("u2", &DocumentId::from(""))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation { .. }));
}
