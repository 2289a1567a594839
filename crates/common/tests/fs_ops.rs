//! Integration tests for the filesystem operations over a shared root

mod common;

use bytes::Bytes;

use ::common::fs::FsError;

#[tokio::test]
async fn write_then_read_round_trips() {
    let (_store, fs) = common::setup_writable_fs().await;

    let entry = fs
        .write("/notes.txt", Bytes::from_static(b"hello world"))
        .await
        .unwrap();
    assert_eq!(entry.name, "notes.txt");
    assert_eq!(entry.size, 11);
    assert!(!entry.is_dir);

    let data = fs.read("/notes.txt").await.unwrap();
    assert_eq!(&data[..], b"hello world");
}

#[tokio::test]
async fn write_replaces_existing_content() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/f.txt", Bytes::from_static(b"one")).await.unwrap();
    fs.write("/f.txt", Bytes::from_static(b"two")).await.unwrap();

    let data = fs.read("/f.txt").await.unwrap();
    assert_eq!(&data[..], b"two");

    // still a single entry
    let entries = fs.list("/").await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn list_reports_decoded_sizes_and_kinds() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/docs/a.txt", Bytes::from_static(b"alpha"))
        .await
        .unwrap();
    fs.mkdir("/docs/sub").await.unwrap();

    let entries = fs.list("/docs").await.unwrap();
    assert_eq!(entries.len(), 2);

    let file = entries.iter().find(|e| e.name == "a.txt").unwrap();
    assert!(!file.is_dir);
    assert_eq!(file.size, 5);

    let dir = entries.iter().find(|e| e.name == "sub").unwrap();
    assert!(dir.is_dir);
    assert_eq!(dir.size, 0);
}

#[tokio::test]
async fn list_of_missing_directory_is_dir_not_found() {
    let (_store, fs) = common::setup_writable_fs().await;
    let err = fs.list("/nope").await.unwrap_err();
    assert!(matches!(err, FsError::DirNotFound(_)));
}

#[tokio::test]
async fn stat_of_the_root_is_a_directory() {
    let (_store, fs) = common::setup_writable_fs().await;
    let entry = fs.stat("/").await.unwrap();
    assert!(entry.is_dir);
    assert!(entry.name.is_empty());
}

#[tokio::test]
async fn stat_of_missing_path_is_not_found() {
    let (_store, fs) = common::setup_writable_fs().await;
    let err = fs.stat("/missing.txt").await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
}

#[tokio::test]
async fn read_of_a_directory_is_not_a_file() {
    let (_store, fs) = common::setup_writable_fs().await;
    fs.mkdir("/dir").await.unwrap();
    let err = fs.read("/dir").await.unwrap_err();
    assert!(matches!(err, FsError::NotAFile(_)));
}

#[tokio::test]
async fn mkdir_creates_missing_parents() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.mkdir("/a/b/c").await.unwrap();

    let entries = fs.list("/a/b").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "c");
    assert!(entries[0].is_dir);
}

#[tokio::test]
async fn rmdir_removes_an_empty_directory() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.mkdir("/empty").await.unwrap();
    fs.rmdir("/empty").await.unwrap();

    assert!(fs.list("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn rmdir_of_non_empty_directory_fails() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/dir/f.txt", Bytes::from_static(b"x")).await.unwrap();

    let err = fs.rmdir("/dir").await.unwrap_err();
    assert!(matches!(err, FsError::DirNotEmpty(_)));

    // the failed removal left the tree untouched
    assert_eq!(fs.list("/dir").await.unwrap().len(), 1);
}

#[tokio::test]
async fn remove_drops_a_file() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/f.txt", Bytes::from_static(b"x")).await.unwrap();
    fs.remove("/f.txt").await.unwrap();

    assert!(fs.list("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_of_missing_file_is_not_found() {
    let (_store, fs) = common::setup_writable_fs().await;
    let err = fs.remove("/missing.txt").await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
}

#[tokio::test]
async fn rename_moves_content_between_paths() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/old.txt", Bytes::from_static(b"payload"))
        .await
        .unwrap();
    let entry = fs.rename("/old.txt", "/sub/new.txt").await.unwrap();
    assert_eq!(entry.name, "new.txt");

    let data = fs.read("/sub/new.txt").await.unwrap();
    assert_eq!(&data[..], b"payload");
    assert!(matches!(
        fs.stat("/old.txt").await.unwrap_err(),
        FsError::NotFound(_)
    ));
}

#[tokio::test]
async fn copy_shares_the_source_node() {
    let (_store, fs) = common::setup_writable_fs().await;

    let src = fs
        .write("/src.txt", Bytes::from_static(b"shared"))
        .await
        .unwrap();
    let dst = fs.copy("/src.txt", "/dst.txt").await.unwrap();

    // a copy is a new link to the same node
    assert_eq!(src.hash, dst.hash);
    assert_eq!(&fs.read("/dst.txt").await.unwrap()[..], b"shared");
    assert_eq!(&fs.read("/src.txt").await.unwrap()[..], b"shared");
}

#[tokio::test]
async fn purge_resets_the_tree() {
    let (_store, fs) = common::setup_writable_fs().await;

    fs.write("/a.txt", Bytes::from_static(b"a")).await.unwrap();
    fs.mkdir("/dir").await.unwrap();

    fs.purge().await.unwrap();
    assert!(fs.list("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn base_scopes_the_view_to_a_subtree() {
    let (store, fs) = common::setup_writable_fs().await;

    fs.write("/scoped/inner.txt", Bytes::from_static(b"inner"))
        .await
        .unwrap();
    fs.write("/outside.txt", Bytes::from_static(b"outside"))
        .await
        .unwrap();

    let scoped = ::common::fs::Fs::new(
        std::sync::Arc::new(store.clone()),
        fs.root().clone(),
        "scoped",
    );

    let entries = scoped.list("/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "inner.txt");

    // purging the scoped view leaves the rest of the tree alone
    scoped.purge().await.unwrap();
    let top = fs.list("/").await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "outside.txt");
}
