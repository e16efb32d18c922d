//! Image pipeline: create, resize, rotate, rename, delete

use std::sync::Arc;

use filekeeper::test_utils::{
    config_with_local_disks, file_keeper, sample_png, MockTranscoder,
};
use filekeeper::{
    build_registry, Dimensions, FileKeeper, MemoryHashIndex, ResizeRequest, Rotation,
    StorageBackend, Upload,
};

async fn keeper_with_rename_policy(base: &std::path::Path, rename_on_change: bool) -> FileKeeper {
    let mut config = config_with_local_disks(base, false);
    config.media.update_names_on_change = rename_on_change;
    let registry = build_registry(&config).await.unwrap();
    FileKeeper::new(
        config,
        registry,
        Arc::new(MemoryHashIndex::new()),
        Arc::new(MockTranscoder::succeeding()),
    )
}

fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

#[tokio::test]
async fn create_produces_three_distinct_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = file_keeper(dir.path(), true).await;

    let upload = Upload::new("Trip to Paris 2019.png", sample_png(800, 600));
    let media = keeper.media().create(&upload).await.unwrap();

    assert_eq!(media.mime_type, "image/png");
    assert_eq!(media.folder_path, "files/media/trip_to_paris_2019");
    assert_eq!(media.original_name, "trip_to_paris_2019.png");
    assert_eq!(media.hash, "media/trip_to_paris_2019.png");
    assert_eq!(media.storage, "local");

    let paths = media.artifact_paths();
    let distinct: std::collections::HashSet<_> = paths.iter().collect();
    assert_eq!(distinct.len(), 3);
    for path in &paths {
        assert!(keeper.store().exists(path).await.unwrap());
    }

    // original untouched, main scaled to 500 wide, thumbnail inside 250 box
    let original = keeper.read(&media.original_path).await.unwrap();
    assert_eq!(original, upload.bytes);
    assert_eq!(
        decoded_dimensions(&keeper.read(&media.path).await.unwrap()),
        (500, 375)
    );
    assert_eq!(
        decoded_dimensions(&keeper.read(&media.thumbnail_path).await.unwrap()),
        (250, 188)
    );
}

#[tokio::test]
async fn resize_without_rename_keeps_paths_and_changes_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = keeper_with_rename_policy(dir.path(), false).await;

    let upload = Upload::new("photo.png", sample_png(800, 600));
    let media = keeper.media().create(&upload).await.unwrap();
    let main_before = keeper.read(&media.path).await.unwrap();
    let path_before = media.path.clone();
    let thumb_before = media.thumbnail_path.clone();

    let request = ResizeRequest {
        image_size: Some(Dimensions::new(1000, 1000)),
        ..Default::default()
    };
    let media = keeper.media().resize(media, request).await.unwrap();

    assert_eq!(media.path, path_before);
    assert_eq!(media.thumbnail_path, thumb_before);
    let main_after = keeper.read(&media.path).await.unwrap();
    assert_ne!(main_after, main_before);
    assert_eq!(decoded_dimensions(&main_after), (1000, 750));
}

#[tokio::test]
async fn resize_with_rename_policy_yields_fresh_paths() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = keeper_with_rename_policy(dir.path(), true).await;

    let upload = Upload::new("photo.png", sample_png(800, 600));
    let media = keeper.media().create(&upload).await.unwrap();
    let path_before = media.path.clone();
    let thumb_before = media.thumbnail_path.clone();

    let media = keeper
        .media()
        .resize(media, ResizeRequest::default())
        .await
        .unwrap();

    assert_ne!(media.path, path_before);
    assert_ne!(media.thumbnail_path, thumb_before);
    assert!(!keeper.store().exists(&path_before).await.unwrap());
    assert!(!keeper.store().exists(&thumb_before).await.unwrap());
    assert!(keeper.store().exists(&media.path).await.unwrap());
    assert!(keeper.store().exists(&media.thumbnail_path).await.unwrap());
    // renamed artifacts stay inside the entity folder
    assert!(media.path.starts_with(&media.folder_path));
}

#[tokio::test]
async fn resize_requires_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = keeper_with_rename_policy(dir.path(), false).await;

    let upload = Upload::new("photo.png", sample_png(100, 100));
    let media = keeper.media().create(&upload).await.unwrap();
    keeper.store().delete(&media.original_path).await.unwrap();

    let err = keeper
        .media()
        .resize(media, ResizeRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        filekeeper::FileKeeperError::MissingOriginal { .. }
    ));
}

#[tokio::test]
async fn four_quarter_turns_restore_the_image() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = keeper_with_rename_policy(dir.path(), false).await;

    let upload = Upload::new("photo.png", sample_png(64, 32));
    let mut media = keeper.media().create(&upload).await.unwrap();
    let before = keeper.read(&media.path).await.unwrap();

    for _ in 0..4 {
        media = keeper
            .media()
            .rotate(media, Rotation::Degrees(90))
            .await
            .unwrap();
    }

    let after = keeper.read(&media.path).await.unwrap();
    let before_pixels = image::load_from_memory(&before).unwrap().to_rgba8();
    let after_pixels = image::load_from_memory(&after).unwrap().to_rgba8();
    assert_eq!(before_pixels.as_raw(), after_pixels.as_raw());
}

#[tokio::test]
async fn single_turn_swaps_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = keeper_with_rename_policy(dir.path(), false).await;

    let upload = Upload::new("photo.png", sample_png(64, 32));
    let media = keeper.media().create(&upload).await.unwrap();
    let (w, h) = decoded_dimensions(&keeper.read(&media.path).await.unwrap());

    let media = keeper.media().rotate(media, Rotation::Left).await.unwrap();
    assert_eq!(
        decoded_dimensions(&keeper.read(&media.path).await.unwrap()),
        (h, w)
    );
}

#[tokio::test]
async fn untransformable_formats_bypass_the_codec() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = file_keeper(dir.path(), false).await;

    let upload = Upload::new("drawing.svg", b"<svg xmlns='x'/>".to_vec())
        .with_mime_type("image/svg+xml");
    let media = keeper.media().create(&upload).await.unwrap();

    // stored verbatim, no resizing
    assert_eq!(keeper.read(&media.path).await.unwrap(), upload.bytes);
    assert_eq!(
        keeper.read(&media.thumbnail_path).await.unwrap(),
        upload.bytes
    );

    // rotate is a true no-op: same record, same stored bytes
    let path_before = media.path.clone();
    let bytes_before = keeper.read(&media.path).await.unwrap();
    let media = keeper.media().rotate(media, Rotation::Left).await.unwrap();
    assert_eq!(media.path, path_before);
    assert_eq!(keeper.read(&media.path).await.unwrap(), bytes_before);

    // resize as well
    let media = keeper
        .media()
        .resize(media, ResizeRequest::default())
        .await
        .unwrap();
    assert_eq!(media.path, path_before);
}

#[tokio::test]
async fn delete_removes_every_artifact_and_the_folder() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = file_keeper(dir.path(), true).await;

    let upload = Upload::new("photo.png", sample_png(100, 80));
    let media = keeper.media().create(&upload).await.unwrap();
    let paths: Vec<String> = media
        .artifact_paths()
        .into_iter()
        .map(String::from)
        .collect();
    let folder = media.folder_path.clone();

    keeper.media().delete(media).await.unwrap();

    for path in &paths {
        assert!(!keeper.store().exists(path).await.unwrap());
    }
    let registry = keeper.store().registry();
    assert!(registry
        .primary()
        .backend()
        .list_all(&folder)
        .await
        .unwrap()
        .is_empty());
    assert!(!registry
        .primary()
        .backend()
        .exists(&folder)
        .await
        .unwrap());
}

#[tokio::test]
async fn duplicate_uploads_get_suffixed_folders_and_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = file_keeper(dir.path(), false).await;

    let upload = Upload::new("photo.png", sample_png(50, 50));
    let first = keeper.media().create(&upload).await.unwrap();
    let second = keeper.media().create(&upload).await.unwrap();

    assert_eq!(first.folder_path, "files/media/photo");
    assert_eq!(second.folder_path, "files/media/photo_2");
    assert_eq!(first.hash, "media/photo.png");
    assert_eq!(second.hash, "media/2-photo.png");
}

#[tokio::test]
async fn update_replaces_files_but_keeps_identity() {
    let dir = tempfile::tempdir().unwrap();
    let keeper = file_keeper(dir.path(), false).await;

    let media = keeper
        .media()
        .create(&Upload::new("photo.png", sample_png(50, 50)))
        .await
        .unwrap();
    let id = media.id;
    let old_paths: Vec<String> = media
        .artifact_paths()
        .into_iter()
        .map(String::from)
        .collect();

    let replaced = keeper
        .media()
        .update(&Upload::new("newer.png", sample_png(60, 60)), media)
        .await
        .unwrap();

    assert_eq!(replaced.id, id);
    assert_eq!(replaced.original_name, "newer.png");
    for path in &old_paths {
        assert!(!keeper.store().exists(path).await.unwrap());
    }
    for path in replaced.artifact_paths() {
        assert!(keeper.store().exists(path).await.unwrap());
    }
}
