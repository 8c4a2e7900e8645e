mod common;

use common::*;
use kilog_store::Store;

#[tokio::test]
async fn file_database_creates_parent_dirs_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("kilog.db");
    let url = format!("sqlite://{}", path.display());

    let store = Store::connect(&url, 2).await.unwrap();
    store.ping().await.unwrap();
    user(&store, "disk").await;
    assert!(path.exists());
    drop(store);

    let reopened = Store::connect(&url, 1).await.unwrap();
    assert!(reopened.get_user_by_auth_id("user_disk").await.unwrap().is_some());
    // Reconnecting re-runs the migrations without duplicating the seed.
    let catalog = reopened.list_exercises(0, None, None).await.unwrap();
    assert_eq!(catalog.len(), 8);
}
