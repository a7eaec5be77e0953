use std::{
    fs,
    os::unix::fs::{symlink, PermissionsExt},
    path::Path,
    time::Duration,
};

use tempfile::tempdir;

use crate::{
    error::Error,
    file::{
        clean_filename, cleanup_temp_files, copy, create_backup, create_directory, create_file,
        delete, directory_size, directory_stats, file_info, find_duplicates, guess_mime,
        is_safe_path, is_within, list_directory, move_path, normalize, read_file, rename, safe_copy,
        write_file, Clipboard, DuplicateOptions, ExcludeSet, FileKind, ListOptions, SortBy,
        Walker,
    },
};

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn create_read_and_append() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/notes.txt");

    create_file(&path, "hello").await.unwrap();
    write_file(&path, b" world", true).await.unwrap();
    assert_eq!(read_file(&path).await.unwrap(), "hello world");

    write_file(&path, b"reset", false).await.unwrap();
    assert_eq!(read_file(&path).await.unwrap(), "reset");
}

#[tokio::test]
async fn reading_missing_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.txt");
    let result = read_file(&path).await;
    assert_eq!(result, Err(Error::FileDoesNotExist(path)));
}

#[tokio::test]
async fn delete_removes_trees() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    write(&tree.join("a/b/c.txt"), "c");

    delete(&tree).await.unwrap();
    assert!(!tree.exists());

    let result = delete(&tree).await;
    assert!(matches!(result, Err(Error::FileDoesNotExist(_))));
}

#[tokio::test]
async fn copy_directory_recreates_symlinks() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("one.txt"), "1");
    write(&src.join("sub/two.txt"), "22");
    symlink("one.txt", src.join("link")).unwrap();

    let dst = dir.path().join("out/dst");
    let size = copy(&src, &dst).await.unwrap();

    assert_eq!(size, 3);
    assert_eq!(fs::read_to_string(dst.join("sub/two.txt")).unwrap(), "22");
    assert_eq!(
        fs::read_link(dst.join("link")).unwrap(),
        Path::new("one.txt")
    );
}

#[tokio::test]
async fn move_into_existing_directory() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("file.txt");
    let target_dir = dir.path().join("target");
    write(&src, "x");
    fs::create_dir(&target_dir).unwrap();

    let moved = move_path(&src, &target_dir).await.unwrap();
    assert_eq!(moved, target_dir.join("file.txt"));
    assert!(moved.exists());
    assert!(!src.exists());
}

#[tokio::test]
async fn rename_validates_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    write(&path, "a");
    write(&dir.path().join("b.txt"), "b");

    assert_eq!(
        rename(&path, "x/y").await,
        Err(Error::InvalidName("x/y".to_owned()))
    );
    assert_eq!(rename(&path, "  ").await, Err(Error::InvalidName("  ".to_owned())));
    assert!(matches!(
        rename(&path, "b.txt").await,
        Err(Error::FileAlreadyExists(_))
    ));

    let renamed = rename(&path, "c.txt").await.unwrap();
    assert_eq!(renamed, dir.path().join("c.txt"));
}

#[tokio::test]
async fn create_directory_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x/y/z");
    create_directory(&path).await.unwrap();
    create_directory(&path).await.unwrap();
    assert!(path.is_dir());
}

#[tokio::test]
async fn sizes_and_stats() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), "aaaa");
    write(&dir.path().join("deep/b.txt"), "bb");
    write(&dir.path().join(".hidden/c.txt"), "c");

    assert_eq!(directory_size(dir.path(), 10).await.unwrap(), 7);
    assert_eq!(directory_size(dir.path(), 1).await.unwrap(), 4);
    assert_eq!(directory_stats(dir.path(), false).await.unwrap(), (6, 2));
    assert_eq!(directory_stats(dir.path(), true).await.unwrap(), (7, 3));
}

#[tokio::test]
async fn info_of_small_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Data.TXT");
    write(&path, "abc");

    let info = file_info(&path).await.unwrap();
    assert_eq!(info.name, "Data.TXT");
    assert_eq!(info.kind, FileKind::File);
    assert_eq!(info.size, 3);
    assert_eq!(info.extension, ".txt");
    assert_eq!(info.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(info.md5.as_deref(), Some("900150983cd24fb0d6963f7d28e17f72"));
    assert!(info.is_readable);
    assert!(!info.is_hidden);
    assert_eq!(info.permissions.len(), 3);
}

#[tokio::test]
async fn info_of_symlink() {
    let dir = tempdir().unwrap();
    let link = dir.path().join(".link");
    symlink("elsewhere", &link).unwrap();

    let info = file_info(&link).await.unwrap();
    assert_eq!(info.kind, FileKind::Symlink);
    assert!(info.is_hidden);
    assert_eq!(info.link_target.as_deref(), Some(Path::new("elsewhere")));
    assert!(info.md5.is_none());
}

#[test]
fn mime_guesses() {
    assert_eq!(guess_mime(Path::new("a.PNG")).as_deref(), Some("image/png"));
    assert_eq!(guess_mime(Path::new("a.unknown")), None);
    assert_eq!(guess_mime(Path::new("Makefile")), None);
}

#[tokio::test]
async fn listing_sorts_directories_first() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("b.txt"), "bbbbbb");
    write(&dir.path().join("A.md"), "a");
    write(&dir.path().join(".secret"), "s");
    fs::create_dir(dir.path().join("zdir")).unwrap();

    let names = |entries: Vec<crate::file::Entry>| {
        entries
            .into_iter()
            .map(|entry| entry.name)
            .collect::<Vec<_>>()
    };

    let entries = list_directory(dir.path(), ListOptions::default())
        .await
        .unwrap();
    assert_eq!(names(entries), ["zdir", "A.md", "b.txt"]);

    let options = ListOptions {
        show_hidden: true,
        sort_by: SortBy::Size,
        reverse: true,
        directories_first: true,
    };
    let entries = list_directory(dir.path(), options).await.unwrap();
    let listed = names(entries);
    assert_eq!(listed[0], "zdir");
    assert_eq!(listed[1], "b.txt");
    assert_eq!(listed.len(), 4);

    let options = ListOptions {
        directories_first: false,
        ..ListOptions::default()
    };
    let entries = list_directory(dir.path(), options).await.unwrap();
    assert_eq!(names(entries), ["A.md", "b.txt", "zdir"]);
}

#[tokio::test]
async fn listing_a_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("f");
    write(&path, "");
    let result = list_directory(&path, ListOptions::default()).await;
    assert_eq!(result.unwrap_err(), Error::FileIsNotDirectory(path));
}

#[tokio::test]
async fn clipboard_cut_and_paste() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("a.txt");
    let target = dir.path().join("target");
    write(&src, "a");
    fs::create_dir(&target).unwrap();

    let mut clipboard = Clipboard::new();
    assert_eq!(clipboard.paste(&target).await, Err(Error::ClipboardEmpty));

    clipboard.cut(vec![src.clone()]);
    let pasted = clipboard.paste(&target).await.unwrap();
    assert_eq!(pasted, [target.join("a.txt")]);
    assert!(!src.exists());
    assert!(clipboard.is_empty());
}

#[tokio::test]
async fn failed_cut_keeps_only_unmoved_paths() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let missing = dir.path().join("missing.txt");
    let last = dir.path().join("last.txt");
    let target = dir.path().join("target");
    write(&first, "1");
    write(&last, "3");
    fs::create_dir(&target).unwrap();

    let mut clipboard = Clipboard::new();
    clipboard.cut(vec![first.clone(), missing.clone(), last.clone()]);
    let result = clipboard.paste(&target).await;
    assert_eq!(result, Err(Error::FileDoesNotExist(missing.clone())));
    assert!(target.join("first.txt").exists());
    assert_eq!(clipboard.paths, [missing, last.clone()]);

    clipboard.paths.remove(0);
    clipboard.paste(&target).await.unwrap();
    assert!(target.join("last.txt").exists());
    assert!(clipboard.is_empty());
}

#[tokio::test]
async fn pasting_a_copy_next_to_itself_is_refused() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("a.txt");
    write(&src, "important data");

    let mut clipboard = Clipboard::new();
    clipboard.copy(vec![src.clone()]);
    let result = clipboard.paste(dir.path()).await;
    assert_eq!(result, Err(Error::SameFile(src.clone())));
    assert_eq!(fs::read_to_string(&src).unwrap(), "important data");
}

#[tokio::test]
async fn clipboard_copy_is_kept() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("a.txt");
    let target = dir.path().join("target");
    write(&src, "a");
    fs::create_dir(&target).unwrap();

    let mut clipboard = Clipboard::new();
    clipboard.copy(vec![src.clone()]);
    clipboard.paste(&target).await.unwrap();
    assert!(src.exists());
    assert!(target.join("a.txt").exists());
    assert!(!clipboard.is_empty());
}

#[test]
fn clean_filenames() {
    assert_eq!(clean_filename("a<b>c.txt", "_"), "a_b_c.txt");
    assert_eq!(clean_filename("  name.. ", "_"), "name");
    assert_eq!(clean_filename("CON.txt", "_"), "_CON.txt");
    assert_eq!(clean_filename("...", "_"), "unnamed_file");
    assert_eq!(clean_filename("a\0b", "-"), "a-b");
}

#[test]
fn path_containment() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("inner")).unwrap();

    assert!(is_safe_path(dir.path(), Path::new("inner/new.txt")));
    assert!(!is_safe_path(dir.path(), Path::new("../escape")));
    assert!(is_within(Path::new("/a/b"), Path::new("c/../d")));
    assert!(!is_within(Path::new("/a/b"), Path::new("../../etc")));
}

#[test]
fn parent_components_are_never_folded_into_each_other() {
    assert_eq!(normalize(Path::new("a/../../b")), Path::new("../b"));
    assert_eq!(normalize(Path::new("../../out/x")), Path::new("../../out/x"));
    assert_eq!(normalize(Path::new("/../etc")), Path::new("/etc"));

    // out/../../../out/x is two levels above `out`
    assert!(!is_within(Path::new("out"), Path::new("../../../out/x")));
    assert!(!is_within(Path::new("../dest"), Path::new("../../dest/x")));
    assert!(is_within(Path::new("../dest"), Path::new("x/../y")));
}

#[tokio::test]
async fn backups_and_safe_copies() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.txt");
    write(&path, "data");

    let plain = create_backup(&path, None, false).await.unwrap();
    assert_eq!(plain, dir.path().join("report_backup.txt"));

    let backups = dir.path().join("backups");
    let stamped = create_backup(&path, Some(&backups), true).await.unwrap();
    let name = stamped.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("report_") && name.ends_with(".txt"));
    assert_eq!(name.len(), "report_YYYYmmdd_HHMMSS.txt".len());

    let copy_path = dir.path().join("copy.txt");
    safe_copy(&path, &copy_path, false, true).await.unwrap();
    let result = safe_copy(&path, &copy_path, false, true).await;
    assert_eq!(result, Err(Error::FileAlreadyExists(copy_path.clone())));
    safe_copy(&path, &copy_path, true, true).await.unwrap();
}

#[tokio::test]
async fn copying_onto_the_source_is_refused() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    let linked = dir.path().join("b.txt");
    write(&file, "important data");
    fs::hard_link(&file, &linked).unwrap();

    let result = copy(&file, &file).await;
    assert_eq!(result, Err(Error::SameFile(file.clone())));
    let alias = dir.path().join(".").join("a.txt");
    assert_eq!(copy(&file, &alias).await, Err(Error::SameFile(alias)));
    assert_eq!(copy(&file, &linked).await, Err(Error::SameFile(linked.clone())));

    let result = safe_copy(&file, &file, true, true).await;
    assert_eq!(result, Err(Error::SameFile(file.clone())));
    let result = safe_copy(&file, &linked, true, false).await;
    assert_eq!(result, Err(Error::SameFile(linked)));
    assert_eq!(fs::read_to_string(&file).unwrap(), "important data");

    let tree = dir.path().join("tree");
    write(&tree.join("kept.txt"), "kept");
    assert_eq!(copy(&tree, &tree).await, Err(Error::SameFile(tree.clone())));
    assert_eq!(fs::read_to_string(tree.join("kept.txt")).unwrap(), "kept");
}

#[tokio::test]
async fn copying_a_directory_into_itself_is_refused() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    write(&tree.join("f.txt"), "f");

    let inner = tree.join("sub");
    let result = copy(&tree, &inner).await;
    assert!(matches!(result, Err(Error::CopyIntoItself { .. })));
    assert!(!inner.exists());

    // through a symlink to the source
    let link = dir.path().join("link");
    symlink(&tree, &link).unwrap();
    let result = copy(&tree, &link.join("sub")).await;
    assert!(matches!(result, Err(Error::CopyIntoItself { .. })));
    assert!(!inner.exists());

    let sibling = dir.path().join("tree-copy");
    assert_eq!(copy(&tree, &sibling).await.unwrap(), 1);
}

#[tokio::test]
async fn read_only_directories_are_copied_with_their_mode() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("locked");
    let dst = dir.path().join("copy");
    write(&src.join("nested/f.txt"), "f");
    let read_only = fs::Permissions::from_mode(0o555);
    fs::set_permissions(src.join("nested"), read_only.clone()).unwrap();
    fs::set_permissions(&src, read_only).unwrap();

    let result = copy(&src, &dst).await;

    let copied_mode = fs::metadata(&dst).map(|m| m.permissions().mode() & 0o777);
    for path in [&src, &src.join("nested"), &dst, &dst.join("nested")] {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o755));
    }
    assert_eq!(result.unwrap(), 1);
    assert_eq!(copied_mode.unwrap(), 0o555);
    assert_eq!(fs::read_to_string(dst.join("nested/f.txt")).unwrap(), "f");
}

#[tokio::test]
async fn cleanup_respects_age() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.tmp"), "a");
    write(&dir.path().join("b.tmp"), "b");
    fs::create_dir(dir.path().join("keep")).unwrap();

    let removed = cleanup_temp_files(dir.path(), Some(Duration::from_secs(3600)))
        .await
        .unwrap();
    assert_eq!(removed, 0);

    let removed = cleanup_temp_files(dir.path(), None).await.unwrap();
    assert_eq!(removed, 2);
    assert!(dir.path().join("keep").exists());
}

#[tokio::test]
async fn duplicates_are_grouped() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), "same");
    write(&dir.path().join("sub/b.txt"), "same");
    write(&dir.path().join("c.log"), "same");
    write(&dir.path().join("d.txt"), "diff");
    write(&dir.path().join("e.txt"), "unique size");

    let groups = find_duplicates(dir.path(), DuplicateOptions::default())
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.values().next().unwrap().len(), 3);

    let options = DuplicateOptions {
        extensions: vec!["TXT".to_owned()],
        recursive: false,
        ..DuplicateOptions::default()
    };
    let groups = find_duplicates(dir.path(), options).await.unwrap();
    assert!(groups.is_empty());
}

#[test]
fn walker_prunes_hidden_and_excluded() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("keep.rs"), "");
    write(&dir.path().join(".git/config"), "");
    write(&dir.path().join("target/out.o"), "");
    write(&dir.path().join("src/main.rs"), "");
    write(&dir.path().join("src/.env"), "");

    let excludes = ExcludeSet::new(&["target"]).unwrap();
    let mut files = Walker::new(dir.path())
        .skip_hidden(true)
        .excludes(excludes)
        .files()
        .map(|entry| {
            entry
                .path()
                .strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>();
    files.sort();

    assert_eq!(files, ["keep.rs", "src/.env", "src/main.rs"]);
}
