use std::fs;

use tempfile::tempdir;

use crate::{
    error::Error,
    nav::{
        delete_directory, directory_tree, disk_usage, is_valid_path, path_info, BookmarkStore,
        Navigator, HISTORY_LIMIT,
    },
};

#[tokio::test]
async fn back_and_forward() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let a = root.join("a");
    let b = root.join("b");
    fs::create_dir(&a).unwrap();
    fs::create_dir(&b).unwrap();

    let mut navigator = Navigator::new(&root);
    navigator.navigate_to(&a).await.unwrap();
    navigator.navigate_to(&b).await.unwrap();

    assert_eq!(navigator.go_back().unwrap(), a);
    assert_eq!(navigator.go_back().unwrap(), root);
    assert_eq!(navigator.go_back(), Err(Error::NoBackHistory));
    assert_eq!(navigator.go_forward().unwrap(), a);

    // a new navigation drops the forward history
    navigator.navigate_to(&root).await.unwrap();
    assert_eq!(navigator.go_forward(), Err(Error::NoForwardHistory));
}

#[tokio::test]
async fn navigating_to_same_directory_keeps_history() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let mut navigator = Navigator::new(&root);
    navigator.navigate_to(&root.join(".")).await.unwrap();
    assert_eq!(navigator.history().count(), 0);
}

#[tokio::test]
async fn navigation_errors() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();

    let mut navigator = Navigator::new(dir.path());
    assert!(matches!(
        navigator.navigate_to(&dir.path().join("missing")).await,
        Err(Error::FileDoesNotExist(_))
    ));
    assert!(matches!(
        navigator.navigate_to(&file).await,
        Err(Error::FileIsNotDirectory(_))
    ));

    let mut at_root = Navigator::new("/");
    assert_eq!(at_root.go_up().await, Err(Error::AlreadyAtRoot));
}

#[tokio::test]
async fn history_is_capped() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let mut navigator = Navigator::new(&root);

    for i in 0..HISTORY_LIMIT + 5 {
        let path = root.join(i.to_string());
        fs::create_dir(&path).unwrap();
        navigator.navigate_to(&path).await.unwrap();
    }

    assert_eq!(navigator.history().count(), HISTORY_LIMIT);
    assert_eq!(navigator.history().next().unwrap(), &root.join("4"));
}

#[tokio::test]
async fn up_and_breadcrumbs() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let nested = root.join("x/y");
    fs::create_dir_all(&nested).unwrap();

    let mut navigator = Navigator::new(&nested);
    let crumbs = navigator.breadcrumbs();
    assert_eq!(crumbs[0].path, std::path::Path::new("/"));
    assert_eq!(crumbs.last().unwrap().name, "y");

    assert_eq!(navigator.go_up().await.unwrap(), root.join("x"));
}

#[tokio::test]
async fn recent_directories_are_unique() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let a = root.join("a");
    let gone = root.join("gone");
    fs::create_dir(&a).unwrap();
    fs::create_dir(&gone).unwrap();

    let mut navigator = Navigator::new(&root);
    navigator.navigate_to(&a).await.unwrap();
    navigator.navigate_to(&gone).await.unwrap();
    navigator.navigate_to(&root).await.unwrap();
    navigator.navigate_to(&a).await.unwrap();
    fs::remove_dir(&gone).unwrap();

    let recent = navigator.recent_directories(10);
    assert_eq!(recent, [a.clone(), root.clone()]);
    assert_eq!(navigator.recent_directories(1), [a]);
}

#[tokio::test]
async fn create_and_delete_directories() {
    let dir = tempdir().unwrap();
    let navigator = Navigator::new(dir.path());

    let created = navigator.create_directory("new", None).await.unwrap();
    assert!(created.is_dir());
    assert!(matches!(
        navigator.create_directory("new", None).await,
        Err(Error::FileAlreadyExists(_))
    ));

    fs::write(created.join("f"), "x").unwrap();
    assert!(delete_directory(&created, false).await.is_err());
    delete_directory(&created, true).await.unwrap();
    assert!(!created.exists());
}

#[tokio::test]
async fn tree_is_truncated_at_depth() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("b/deep/deeper")).unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join(".hidden")).unwrap();
    fs::write(dir.path().join("file.txt"), "x").unwrap();

    let tree = directory_tree(dir.path(), 2).await.unwrap();
    let names = tree
        .children
        .iter()
        .map(|child| child.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["a", "b"]);

    let deep = &tree.children[1].children[0];
    assert_eq!(deep.name, "deep");
    assert!(deep.truncated);
    assert!(deep.children.is_empty());
    assert_eq!(tree.count(), 4);
}

#[tokio::test]
async fn bookmarks_persist() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("state/bookmarks.json");
    let target = dir.path().canonicalize().unwrap();

    let mut store = BookmarkStore::load(&file).await.unwrap();
    assert!(store.is_empty());
    store.add("tmp", &target).await.unwrap();
    assert_eq!(
        store.add("tmp", &target).await.unwrap_err(),
        Error::BookmarkAlreadyExists("tmp".to_owned())
    );

    let store = BookmarkStore::load(&file).await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get("tmp").unwrap().created.is_some());

    let mut navigator = Navigator::new("/");
    navigator.navigate_to_bookmark(&store, "tmp").await.unwrap();
    assert_eq!(navigator.current(), target);

    let mut store = store;
    store.remove("tmp").await.unwrap();
    assert_eq!(
        store.remove("tmp").await,
        Err(Error::BookmarkDoesNotExist("tmp".to_owned()))
    );
}

#[tokio::test]
async fn session_round_trip() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();

    let mut navigator = Navigator::new(&root);
    navigator.navigate_to(&sub).await.unwrap();
    let session = root.join("session.json");
    navigator.save(&session).await.unwrap();

    let restored = Navigator::load(&session, &root).await.unwrap();
    assert_eq!(restored, navigator);

    let fresh = Navigator::load(&root.join("none.json"), &root).await.unwrap();
    assert_eq!(fresh.current(), root);
}

#[tokio::test]
async fn info_and_validity() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("d")).unwrap();
    fs::write(dir.path().join("f"), "x").unwrap();

    assert!(is_valid_path(dir.path()).await);
    assert!(!is_valid_path(&dir.path().join("f")).await);

    let info = path_info(dir.path()).await;
    assert!(info.exists);
    assert_eq!((info.file_count, info.dir_count), (1, 1));
    assert!(info.disk.is_some());

    let usage = disk_usage(dir.path()).unwrap();
    assert!(usage.total >= usage.used);
}
