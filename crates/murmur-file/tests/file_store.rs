//! End-to-end tests of the sync layer over the file-backed store.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use murmur_core::{Backend, Credentials, Fields, Filter, RemoteStore, StoreUrl};
use murmur_file::{FileBackend, FileSession};
use murmur_sync::{
    FeedSynchronizer, Inbox, Notices, OptimisticEngine, RelationSpec, RelationToggle, SyncConfig,
    ensure_profile,
};

fn backend(dir: &TempDir) -> FileBackend {
    let url = StoreUrl::new(format!("file://{}", dir.path().display())).unwrap();
    FileBackend::from_url(url).unwrap()
}

async fn sign_up(backend: &FileBackend, username: &str) -> FileSession {
    backend
        .create_account(username, "hunter22", None)
        .await
        .unwrap();
    backend
        .login(Credentials::new(username, "hunter22"))
        .await
        .unwrap()
}

fn post(content: &str, owner: &str) -> Fields {
    match json!({"content": content, "user_id": owner}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn login_checks_password() {
    let dir = TempDir::new().unwrap();
    let backend = backend(&dir);
    backend.create_account("ada", "secret", Some("Ada")).await.unwrap();

    let error = backend
        .login(Credentials::new("ada", "wrong"))
        .await
        .unwrap_err();
    assert!(error.is_auth_error());

    let error = backend
        .login(Credentials::new("nobody", "secret"))
        .await
        .unwrap_err();
    assert!(error.is_auth_error());
}

#[tokio::test]
async fn persisted_token_restores_session() {
    let dir = TempDir::new().unwrap();
    let backend = backend(&dir);
    let session = sign_up(&backend, "ada").await;

    let restored = FileSession::from_persisted(backend.clone(), session.token()).unwrap();
    assert_eq!(restored.actor(), session.actor());

    let forged = murmur_core::AuthToken::new(r#"{"id":"abc","password_hash":"x"}"#);
    assert!(FileSession::from_persisted(backend, forged).is_err());
}

#[tokio::test]
async fn feed_pages_over_files() {
    let dir = TempDir::new().unwrap();
    let backend = backend(&dir);
    let session = Arc::new(sign_up(&backend, "ada").await);
    let config = SyncConfig::default();

    for i in 0..25 {
        session
            .create(&config.collections.posts, &post(&format!("post {}", i), session.actor().as_str()))
            .await
            .unwrap();
    }

    let feed = FeedSynchronizer::posts(session.clone(), &config, Notices::new());
    let first = feed.load_first_page(Filter::new()).await.unwrap();
    assert_eq!(first.items[0].get_str("content"), Some("post 24"));
    assert!(first.has_more);

    assert_eq!(feed.load_next_page().await.unwrap().len(), 10);
    assert_eq!(feed.load_next_page().await.unwrap().len(), 5);
    assert!(!feed.has_more());
    assert_eq!(feed.items().last().unwrap().get_str("content"), Some("post 0"));
}

#[tokio::test]
async fn likes_show_up_in_post_cards() {
    let dir = TempDir::new().unwrap();
    let backend = backend(&dir);
    let ada = Arc::new(sign_up(&backend, "ada").await);
    let bob = Arc::new(sign_up(&backend, "bob").await);
    let config = SyncConfig::default();

    ensure_profile(ada.as_ref(), &config.collections.profiles).await.unwrap();
    let created = ada
        .create(&config.collections.posts, &post("hello", ada.actor().as_str()))
        .await
        .unwrap();

    let engine = Arc::new(OptimisticEngine::new(Notices::new()));
    let like = RelationToggle::load(bob.clone(), RelationSpec::likes(&config), created.id.clone(), engine)
        .await
        .unwrap()
        .notify_on_create(ada.actor().clone());
    assert!(like.toggle().await.is_committed());

    let feed = FeedSynchronizer::posts(bob.clone(), &config, Notices::new());
    feed.load_first_page(Filter::new()).await.unwrap();
    let card = feed.item(&created.id).unwrap();
    assert_eq!(card.get_str("author_name"), Some(&ada.actor().as_str()[..8]));
    assert_eq!(card.get_i64("like_count"), Some(1));
    assert_eq!(card.get_bool("liked_by_actor"), Some(true));

    let inbox = Inbox::new(ada.clone(), &config, Notices::new());
    let notifications = inbox.load().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].from_user.as_ref(), Some(bob.actor()));
    assert!(inbox.mark_all_read().await.is_complete());
    assert_eq!(inbox.unread_count(), 0);
}
