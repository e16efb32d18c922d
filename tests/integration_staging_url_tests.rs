//! Staging area and URL resolution

use std::sync::Arc;

use filekeeper::naming::PathNaming;
use filekeeper::storage::{Disk, DiskName, LocalStorageBackend};
use filekeeper::test_utils::{local_registry, registry_from_backends, MemoryBackend};
use filekeeper::{
    DiskRegistry, ReplicatedStore, ReplicationPolicy, StagingArea, StorageBackend, UrlResolver,
};

fn staging_area(registry: Arc<DiskRegistry>) -> (ReplicatedStore, StagingArea) {
    let store = ReplicatedStore::new(registry);
    let staging = StagingArea::new(store.clone(), PathNaming::new(20));
    (store, staging)
}

#[tokio::test]
async fn local_objects_pass_through_without_staging() {
    let dir = tempfile::tempdir().unwrap();
    let registry = local_registry(dir.path(), false).await;
    let (store, staging) = staging_area(registry.clone());

    store.put("files/docs/a.txt", b"local").await.unwrap();
    let staged = staging.materialize("files/docs/a.txt").await.unwrap();

    assert!(!staged.is_staged());
    assert_eq!(
        staged.path(),
        dir.path().join("primary").join("files/docs/a.txt")
    );

    // releasing a pass-through handle must not delete the disk file
    staging.release(staged).await.unwrap();
    assert!(store.exists("files/docs/a.txt").await.unwrap());
}

#[tokio::test]
async fn remote_objects_are_staged_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_from_backends(
        Arc::new(MemoryBackend::remote()),
        None,
        &dir.path().join("staging"),
        ReplicationPolicy::default(),
    );
    let (store, staging) = staging_area(registry);

    store.put("files/docs/remote.txt", b"cloud bytes").await.unwrap();
    let staged = staging.materialize("files/docs/remote.txt").await.unwrap();

    assert!(staged.is_staged());
    let local = staged.path().to_path_buf();
    assert!(local.starts_with(dir.path().join("staging").join("tmp_files")));
    assert_eq!(tokio::fs::read(&local).await.unwrap(), b"cloud bytes");

    staging.release(staged).await.unwrap();
    assert!(!tokio::fs::try_exists(&local).await.unwrap());
}

#[tokio::test]
async fn scoped_releases_on_success_and_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_from_backends(
        Arc::new(MemoryBackend::remote()),
        None,
        &dir.path().join("staging"),
        ReplicationPolicy::default(),
    );
    let (store, staging) = staging_area(registry.clone());

    store.put("files/docs/remote.txt", b"cloud bytes").await.unwrap();

    let seen = staging
        .scoped("files/docs/remote.txt", |local| async move {
            Ok(tokio::fs::read(&local).await?)
        })
        .await
        .unwrap();
    assert_eq!(seen, b"cloud bytes");

    let err: filekeeper::Result<()> = staging
        .scoped("files/docs/remote.txt", |_local| async move {
            Err(filekeeper::FileKeeperError::Transform("boom".to_string()))
        })
        .await;
    assert!(err.is_err());

    // no scratch copies survive either path
    assert!(registry
        .staging()
        .list_all("tmp_files")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn clear_drops_the_staging_directory() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_from_backends(
        Arc::new(MemoryBackend::remote()),
        None,
        &dir.path().join("staging"),
        ReplicationPolicy::default(),
    );
    let (store, staging) = staging_area(registry.clone());

    store.put("files/docs/remote.txt", b"bytes").await.unwrap();
    let staged = staging.materialize("files/docs/remote.txt").await.unwrap();
    // simulate a leaked handle by forgetting to release through the area
    std::mem::forget(staged);

    staging.clear().await.unwrap();
    assert!(registry
        .staging()
        .list_all("tmp_files")
        .await
        .unwrap()
        .is_empty());
}

fn registry_with_urls(
    staging_root: &std::path::Path,
    primary_url: Option<&str>,
    backup_url: Option<&str>,
    serve_from_backup: bool,
) -> Arc<DiskRegistry> {
    let primary = Disk::new(
        DiskName::Primary,
        Arc::new(MemoryBackend::new()),
        primary_url.map(String::from),
    );
    let backup = backup_url.map(|url| {
        Disk::new(
            DiskName::Backup,
            Arc::new(MemoryBackend::new()),
            Some(url.to_string()),
        )
    });
    Arc::new(DiskRegistry::new(
        primary,
        backup,
        Arc::new(LocalStorageBackend::new(staging_root)),
        ReplicationPolicy { serve_from_backup },
    ))
}

#[tokio::test]
async fn explicit_base_url_wins() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_urls(dir.path(), Some("https://cdn.example.com/"), None, false);
    let resolver = UrlResolver::new(registry);

    assert_eq!(
        resolver.url_for("files/docs/a.txt"),
        "https://cdn.example.com/files/docs/a.txt"
    );
}

#[tokio::test]
async fn native_url_is_second_choice() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Disk::new(
        DiskName::Primary,
        Arc::new(MemoryBackend::remote().with_native_url("https://bucket.s3.example")),
        None,
    );
    let registry = Arc::new(DiskRegistry::new(
        primary,
        None,
        Arc::new(LocalStorageBackend::new(dir.path())),
        ReplicationPolicy::default(),
    ));
    let resolver = UrlResolver::new(registry);

    assert_eq!(
        resolver.url_for("files/docs/a.txt"),
        "https://bucket.s3.example/files/docs/a.txt"
    );
}

#[tokio::test]
async fn relative_fallback_when_nothing_else_applies() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_urls(dir.path(), None, None, false);
    let resolver = UrlResolver::new(registry);

    assert_eq!(resolver.url_for("files/docs/a.txt"), "/files/docs/a.txt");
    // host separators normalize to forward slashes
    assert_eq!(resolver.url_for("files\\docs\\b.txt"), "/files/docs/b.txt");
}

#[tokio::test]
async fn serve_from_backup_redirects_urls_only() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_urls(
        dir.path(),
        Some("https://primary.example.com"),
        Some("https://backup.example.com"),
        true,
    );
    let resolver = UrlResolver::new(registry.clone());

    assert_eq!(
        resolver.url_for("files/docs/a.txt"),
        "https://backup.example.com/files/docs/a.txt"
    );
    // explicit disk choice still works
    assert_eq!(
        resolver
            .url_for_disk(DiskName::Primary, "files/docs/a.txt")
            .unwrap(),
        "https://primary.example.com/files/docs/a.txt"
    );

    // writes keep replicating to every disk regardless of the policy
    let store = ReplicatedStore::new(registry.clone());
    store.put("files/docs/a.txt", b"x").await.unwrap();
    assert!(registry.primary().backend().exists("files/docs/a.txt").await.unwrap());
    assert!(registry
        .backup()
        .unwrap()
        .backend()
        .exists("files/docs/a.txt")
        .await
        .unwrap());
}

#[tokio::test]
async fn serve_from_backup_without_backup_falls_back_to_primary() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with_urls(dir.path(), Some("https://primary.example.com"), None, true);
    let resolver = UrlResolver::new(registry);

    assert_eq!(
        resolver.url_for("files/docs/a.txt"),
        "https://primary.example.com/files/docs/a.txt"
    );
}
