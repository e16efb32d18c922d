//! Unique path generation against live stores

use std::collections::HashSet;
use std::sync::Arc;

use filekeeper::naming::PathNaming;
use filekeeper::test_utils::{local_registry, registry_from_backends, MemoryBackend, SaturatedBackend};
use filekeeper::{FileKeeperError, ReplicatedStore, ReplicationPolicy};

#[tokio::test]
async fn allocated_paths_never_collide() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_from_backends(
        Arc::new(MemoryBackend::new()),
        None,
        &dir.path().join("staging"),
        ReplicationPolicy::default(),
    );
    let store = ReplicatedStore::new(registry);
    let naming = PathNaming::new(20);

    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let path = naming
            .generate_unique_path("files/docs", "txt", &store)
            .await
            .unwrap();
        // occupy the path so the next search must avoid it
        store.put(&path, b"").await.unwrap();
        assert!(seen.insert(path), "generated a path twice");
    }
    assert_eq!(seen.len(), 1000);
}

#[tokio::test]
async fn allocation_checks_every_configured_disk() {
    let dir = tempfile::tempdir().unwrap();
    let registry = local_registry(dir.path(), true).await;
    let store = ReplicatedStore::new(registry.clone());
    let naming = PathNaming::new(20);

    let path = naming
        .generate_unique_path("files/docs", "txt", &store)
        .await
        .unwrap();
    assert!(path.starts_with("files/docs/"));
    assert!(path.ends_with(".txt"));
    assert!(!store.exists(&path).await.unwrap());
}

#[tokio::test]
async fn saturated_store_exhausts_the_retry_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_from_backends(
        Arc::new(SaturatedBackend),
        None,
        &dir.path().join("staging"),
        ReplicationPolicy::default(),
    );
    let store = ReplicatedStore::new(registry);
    let naming = PathNaming::new(5);

    let err = naming
        .generate_unique_path("files/docs", "txt", &store)
        .await
        .unwrap_err();
    match err {
        FileKeeperError::PathExhausted {
            directory,
            attempts,
        } => {
            assert_eq!(directory, "files/docs");
            assert_eq!(attempts, 5);
        }
        other => panic!("expected PathExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn entity_folders_suffix_on_collision() {
    let dir = tempfile::tempdir().unwrap();
    let registry = local_registry(dir.path(), false).await;
    let store = ReplicatedStore::new(registry);
    let naming = PathNaming::new(20);

    let first = naming
        .entity_folder("files", "media", None, "trip", &store)
        .await
        .unwrap();
    assert_eq!(first, "files/media/trip");

    // occupy the folder; the next entity with the same stem gets a suffix
    store.put("files/media/trip/a.png", b"x").await.unwrap();
    let second = naming
        .entity_folder("files", "media", None, "trip", &store)
        .await
        .unwrap();
    assert_eq!(second, "files/media/trip_2");

    store.put("files/media/trip_2/a.png", b"x").await.unwrap();
    let third = naming
        .entity_folder("files", "media", None, "trip", &store)
        .await
        .unwrap();
    assert_eq!(third, "files/media/trip_3");
}

#[tokio::test]
async fn owner_subfolder_lands_between_category_and_entity() {
    let dir = tempfile::tempdir().unwrap();
    let registry = local_registry(dir.path(), false).await;
    let store = ReplicatedStore::new(registry);
    let naming = PathNaming::new(20);

    let folder = naming
        .entity_folder("files", "media", Some("user42"), "trip", &store)
        .await
        .unwrap();
    assert_eq!(folder, "files/media/user42/trip");
}
