use std::{fs, path::Path};

use tempfile::tempdir;

use crate::{
    error::Error,
    search::{
        find_in_file, looks_like_text, words, MatchKind, NameMatcher, SearchEngine, SearchIndex,
        SearchQuery, HISTORY_LIMIT,
    },
    task::CancelFlag,
};

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn names(results: &[crate::search::SearchResult]) -> Vec<String> {
    let mut names = results
        .iter()
        .map(|result| result.name.clone())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn glob_and_regex_matchers() {
    let glob = NameMatcher::new("*.TXT", false, false).unwrap();
    assert!(glob.is_match("notes.txt"));
    assert!(!glob.is_match("notes.md"));

    let sensitive = NameMatcher::new("*.TXT", true, false).unwrap();
    assert!(!sensitive.is_match("notes.txt"));

    let regex = NameMatcher::new(r"^re\d+", false, true).unwrap();
    assert!(regex.is_match("RE42.log"));
    assert!(!regex.is_match("are42"));

    assert!(matches!(
        NameMatcher::new("(", false, true),
        Err(Error::InvalidPattern { .. })
    ));
}

#[test]
fn text_sniffing() {
    assert!(looks_like_text(b""));
    assert!(looks_like_text(b"plain text\n"));
    assert!(!looks_like_text(b"bin\0ary"));
    assert!(!looks_like_text(&[0xff; 64]));
}

#[test]
fn content_lines_are_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    let long_line = format!("  needle {}  ", "x".repeat(300));
    write(&path, &format!("first\nsecond\n{long_line}\n"));

    let (line, number) = find_in_file(&path, "NEEDLE", false).unwrap().unwrap();
    assert_eq!(number, 3);
    assert_eq!(line.chars().count(), 200);
    assert!(line.starts_with("needle"));

    assert!(find_in_file(&path, "NEEDLE", true).unwrap().is_none());
}

#[test]
fn index_words_and_search() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("Annual_Report-2024.pdf");
    let notes = dir.path().join("meeting notes.txt");
    write(&report, "r");
    write(&notes, "n");

    assert_eq!(words("Annual_Report-2024.pdf"), ["annual_report", "2024", "pdf"]);

    let mut index = SearchIndex::new();
    index.add_file(&report).unwrap();
    index.add_file(&notes).unwrap();
    assert!(index.is_indexed(&report));

    assert_eq!(index.search("report").into_iter().collect::<Vec<_>>(), [report.clone()]);
    assert!(index.search("report notes").is_empty());
    assert_eq!(index.search("*").len(), 2);

    fs::remove_file(&notes).unwrap();
    assert_eq!(index.prune(None), 1);
    assert_eq!(index.len(), 1);

    let bytes = index.to_bytes().unwrap();
    assert_eq!(SearchIndex::from_bytes(&bytes).unwrap(), index);
}

#[test]
fn index_update_skips_hidden_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), "a");
    write(&dir.path().join(".cache/b.txt"), "b");

    let mut index = SearchIndex::new();
    let cancel = CancelFlag::new();
    assert_eq!(index.update(dir.path(), &cancel, None).unwrap(), 1);
    assert_eq!(index.update(dir.path(), &cancel, None).unwrap(), 0);

    cancel.cancel();
    write(&dir.path().join("c.txt"), "c");
    assert_eq!(
        index.update(dir.path(), &cancel, None),
        Err(Error::Cancelled)
    );
}

#[tokio::test]
async fn filesystem_search_with_filters() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("small.txt"), "x");
    write(&dir.path().join("big.txt"), &"y".repeat(100));
    write(&dir.path().join("image.png"), "z");
    write(&dir.path().join(".hidden/inside.txt"), "x");

    let mut engine = SearchEngine::new();
    let query = SearchQuery {
        file_type: Some(".TXT".to_owned()),
        size_min: Some(10),
        use_index: false,
        ..SearchQuery::default()
    };
    let results = engine.search(dir.path(), query, None).await.unwrap();
    assert_eq!(names(&results), ["big.txt"]);

    // matched files are indexed on the way
    assert_eq!(engine.stats().await.indexed_files, 1);
}

#[tokio::test]
async fn content_search_reports_lines() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), "alpha\nfind me here\n");
    write(&dir.path().join("b.txt"), "nothing\n");
    write(&dir.path().join("find"), "unrelated\n");

    let mut engine = SearchEngine::new();
    let query = SearchQuery {
        content: Some("find".to_owned()),
        ..SearchQuery::default()
    };
    let mut results = engine.search(dir.path(), query, None).await.unwrap();
    results.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(names(&results), ["a.txt", "find"]);
    assert_eq!(results[0].kind, MatchKind::Content);
    assert_eq!(results[0].line.as_deref(), Some("find me here"));
    assert_eq!(results[0].line_number, Some(2));
    // name matched the content text as a pattern
    assert_eq!(results[1].kind, MatchKind::Filename);
}

#[tokio::test]
async fn indexed_search_is_limited_to_root() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("one/report.txt"), "1");
    write(&dir.path().join("two/report.txt"), "2");
    write(&dir.path().join("two/other.txt"), "3");

    let mut engine = SearchEngine::new();
    engine
        .search(dir.path(), SearchQuery::new("*"), None)
        .await
        .unwrap();

    let query = SearchQuery::new("report*");
    let results = engine
        .search(&dir.path().join("two"), query, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("two/report.txt"));

    let limited = SearchQuery {
        max_results: 1,
        ..SearchQuery::default()
    };
    let results = engine.search(dir.path(), limited, None).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn search_root_must_be_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    write(&file, "");

    let mut engine = SearchEngine::new();
    let missing = engine
        .search(&dir.path().join("missing"), SearchQuery::default(), None)
        .await;
    assert!(matches!(missing, Err(Error::FileDoesNotExist(_))));

    let not_dir = engine.search(&file, SearchQuery::default(), None).await;
    assert!(matches!(not_dir, Err(Error::FileIsNotDirectory(_))));
}

#[tokio::test]
async fn quick_search_falls_back_to_walking() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("Projects/plan.md"), "");
    write(&dir.path().join("misc/projection.txt"), "");

    let engine = SearchEngine::new();
    let results = engine
        .quick_search(dir.path(), "PROJ", 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let results = engine.quick_search(dir.path(), "proj", 1).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn history_is_capped_and_clearable() {
    let dir = tempdir().unwrap();
    let mut engine = SearchEngine::new();
    for i in 0..HISTORY_LIMIT + 3 {
        let query = SearchQuery {
            use_index: false,
            ..SearchQuery::new(format!("{i}*"))
        };
        engine.search(dir.path(), query, None).await.unwrap();
    }

    assert_eq!(engine.history().count(), HISTORY_LIMIT);
    assert_eq!(engine.history().next().unwrap().pattern, "3*");

    engine.clear_history();
    engine.clear_index().await;
    let stats = engine.stats().await;
    assert_eq!((stats.history_count, stats.indexed_files), (0, 0));
}

#[tokio::test]
async fn index_persists_between_engines() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("data/kept.txt"), "k");
    let index_file = dir.path().join("state/index.bin");

    let engine = SearchEngine::new();
    engine.update_index(&dir.path().join("data"), None).await.unwrap();
    engine.save(&index_file).await.unwrap();

    let loaded = SearchEngine::load(&index_file).await.unwrap();
    assert_eq!(loaded.stats().await.indexed_files, 1);

    let fresh = SearchEngine::load(&dir.path().join("missing.bin")).await.unwrap();
    assert_eq!(fresh.stats().await.indexed_files, 0);
}

#[tokio::test]
async fn excludes_and_depth_apply_to_both_strategies() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("top.txt"), "t");
    write(&dir.path().join("debug.log"), "l");
    write(&dir.path().join("build/out.txt"), "o");
    write(&dir.path().join("src/lib.txt"), "s");

    let mut engine = SearchEngine::new();
    for use_index in [false, true] {
        let query = SearchQuery {
            excludes: vec!["*.log".to_owned(), "build".to_owned()],
            use_index,
            ..SearchQuery::default()
        };
        let results = engine.search(dir.path(), query, None).await.unwrap();
        assert_eq!(names(&results), ["lib.txt", "top.txt"], "use_index: {use_index}");

        let shallow = SearchQuery {
            recursive: false,
            use_index,
            ..SearchQuery::default()
        };
        let results = engine.search(dir.path(), shallow, None).await.unwrap();
        assert_eq!(names(&results), ["debug.log", "top.txt"], "use_index: {use_index}");
    }
}

#[tokio::test]
async fn restored_history_keeps_the_newest_entries() {
    let dir = tempdir().unwrap();
    let mut engine = SearchEngine::new();
    for i in 0..3 {
        engine
            .search(dir.path(), SearchQuery::new(format!("{i}*")), None)
            .await
            .unwrap();
    }
    let stored = engine.history().cloned().collect::<Vec<_>>();

    let mut restored = SearchEngine::new();
    restored.restore_history(stored.iter().cycle().take(HISTORY_LIMIT + 1).cloned());
    assert_eq!(restored.history().count(), HISTORY_LIMIT);
    // the oldest of the HISTORY_LIMIT + 1 entries was dropped
    assert_eq!(restored.history().next(), stored.get(1));
    assert_eq!(restored.history().last(), stored.get(HISTORY_LIMIT % 3));
}
