use std::{fs, path::Path, time::Duration};

use tempfile::tempdir;

use crate::{
    error::Error,
    launch::{
        associations, default_app, interpreter_for, mime_type, open_folder, run_script,
        terminal_directory, AppKind, Platform, DEFAULT_SCRIPT_TIMEOUT,
    },
};

#[test]
fn default_applications_by_extension() {
    assert_eq!(default_app(Path::new("a.PDF")), AppKind::PdfViewer);
    assert_eq!(default_app(Path::new("song.flac")), AppKind::AudioPlayer);
    assert_eq!(default_app(Path::new("noext")), AppKind::OpenFile);
    assert_eq!(default_app(Path::new("x.unknown")), AppKind::OpenFile);
}

#[test]
fn associations_list_default_first_without_duplicates() {
    let associations = associations();
    assert_eq!(
        associations[".txt"],
        [AppKind::TextEditor, AppKind::Browser]
    );
    assert_eq!(
        associations[".png"],
        [AppKind::ImageViewer, AppKind::Browser]
    );
    assert_eq!(associations[".mp4"], [AppKind::VideoPlayer]);
    assert_eq!(associations[".zip"], [AppKind::ArchiveManager]);
}

#[test]
fn platform_command_tables() {
    assert_eq!(
        Platform::Linux.command(AppKind::Spreadsheet),
        ["libreoffice", "--calc"]
    );
    assert_eq!(Platform::Linux.command(AppKind::OpenFolder), ["xdg-open"]);
    assert_eq!(Platform::MacOs.command(AppKind::TextEditor), ["open", "-e"]);
    assert_eq!(Platform::MacOs.command(AppKind::VideoPlayer), ["open"]);
}

#[test]
fn interpreters_by_extension() {
    assert_eq!(interpreter_for(Path::new("run.SH")).unwrap(), ["bash"]);
    assert_eq!(
        interpreter_for(Path::new("tool.py")).unwrap(),
        ["python3", "python"]
    );
    assert_eq!(
        interpreter_for(Path::new("setup.exe")),
        Err(Error::UnsupportedScript(".exe".to_owned()))
    );
}

#[test]
fn mime_types() {
    assert_eq!(mime_type(Path::new("a.md")).as_deref(), Some("text/markdown"));
    assert_eq!(mime_type(Path::new("a.nothing")), None);
}

#[tokio::test]
async fn shell_scripts_report_output() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("hello.sh");
    fs::write(&script, "echo \"hello $1\"\necho oops >&2\nexit 3\n").unwrap();

    let output = run_script(&script, &["world".to_owned()], DEFAULT_SCRIPT_TIMEOUT)
        .await
        .unwrap();
    assert!(!output.success);
    assert_eq!(output.status, Some(3));
    assert_eq!(output.stdout, "hello world\n");
    assert_eq!(output.stderr, "oops\n");
}

#[tokio::test]
async fn scripts_time_out() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("slow.sh");
    fs::write(&script, "sleep 5\n").unwrap();

    let limit = Duration::from_millis(100);
    assert_eq!(
        run_script(&script, &[], limit).await.unwrap_err(),
        Error::Timeout(limit)
    );
}

#[tokio::test]
async fn script_errors() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        run_script(&dir.path().join("missing.sh"), &[], DEFAULT_SCRIPT_TIMEOUT).await,
        Err(Error::FileDoesNotExist(_))
    ));

    let binary = dir.path().join("prog.bin");
    fs::write(&binary, "x").unwrap();
    assert!(matches!(
        run_script(&binary, &[], DEFAULT_SCRIPT_TIMEOUT).await,
        Err(Error::UnsupportedScript(_))
    ));
}

#[tokio::test]
async fn terminals_open_in_the_containing_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();

    assert_eq!(terminal_directory(&file).await.unwrap(), dir.path());
    assert_eq!(terminal_directory(dir.path()).await.unwrap(), dir.path());
    assert!(matches!(
        terminal_directory(&dir.path().join("missing")).await,
        Err(Error::FileDoesNotExist(_))
    ));
}

#[tokio::test]
async fn open_folder_requires_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();

    assert!(matches!(
        open_folder(&file).await,
        Err(Error::FileIsNotDirectory(_))
    ));
}
