use std::{
    fs::{self, File},
    io::Write,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::tempdir;
use zip::{write::SimpleFileOptions, ZipWriter};

use crate::{
    archive::{
        compress, decide_entry, estimate_size, extract, info, plan_entries, supported_formats,
        ArchiveFormat, CompressOptions, EntryDecision, ExtractOptions,
    },
    error::Error,
    file::ExcludeSet,
    task::CancelFlag,
};

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Writes a tar with names stored verbatim, `..` included.
fn raw_tar(path: &Path, entries: &[(&str, &str, u32)]) {
    let mut builder = ::tar::Builder::new(File::create(path).unwrap());
    for (name, content, mode) in entries {
        let mut header = ::tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(content.len() as u64);
        header.set_mode(*mode);
        header.set_entry_type(::tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
    }
    builder.finish().unwrap();
}

fn sample_tree(root: &Path) -> PathBuf {
    let project = root.join("project");
    write(&project.join("README.md"), &"readme ".repeat(200));
    write(&project.join("src/main.rs"), "fn main() {}\n");
    write(&project.join("target/debug/out.o"), "object");
    project
}

fn options(format: ArchiveFormat) -> CompressOptions {
    CompressOptions {
        format,
        ..CompressOptions::default()
    }
}

#[test]
fn entries_are_named_relative_to_input_parent() {
    let dir = tempdir().unwrap();
    let project = sample_tree(dir.path());
    let single = dir.path().join("single.txt");
    write(&single, "s");

    let excludes = ExcludeSet::new(&["target"]).unwrap();
    let entries = plan_entries(&[project, single], &excludes).unwrap();
    let names = entries
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        ["project/README.md", "project/src/main.rs", "single.txt"]
    );
}

#[tokio::test]
async fn round_trip_every_multi_file_format() {
    for format in supported_formats() {
        if format == ArchiveFormat::Gzip {
            continue;
        }

        let dir = tempdir().unwrap();
        let project = sample_tree(dir.path());
        let output = dir.path().join(format!("out{}", format.extension()));

        let compress_options = CompressOptions {
            excludes: vec!["target".to_owned()],
            ..options(format)
        };
        let stats = compress(&[project], &output, compress_options)
            .await
            .unwrap();
        assert_eq!(stats.files_processed, 2, "{format}");
        assert!(stats.compressed_size > 0);

        let archive_info = info(&output).await.unwrap();
        assert_eq!(archive_info.format, format);
        assert_eq!(archive_info.entry_count, 2);
        assert!(!archive_info.encrypted);

        let dest = dir.path().join("extracted");
        let stats = extract(&output, &dest, ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(stats.files_processed, 2, "{format}");
        assert_eq!(
            fs::read_to_string(dest.join("project/src/main.rs")).unwrap(),
            "fn main() {}\n"
        );
        assert!(!dest.join("project/target").exists());
    }
}

#[tokio::test]
async fn gzip_holds_a_single_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    write(&input, &"gzip me ".repeat(100));
    let output = dir.path().join("notes.txt.gz");

    let stats = compress(&[input.clone()], &output, options(ArchiveFormat::Gzip))
        .await
        .unwrap();
    assert!(stats.compressed_size < stats.original_size);
    assert!(stats.ratio() > 0.0);

    let archive_info = info(&output).await.unwrap();
    assert_eq!(archive_info.entries, ["notes.txt"]);

    let dest = dir.path().join("out");
    extract(&output, &dest, ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(
        fs::read(dest.join("notes.txt")).unwrap(),
        fs::read(&input).unwrap()
    );

    let again = extract(&output, &dest, ExtractOptions::default()).await;
    assert!(matches!(again, Err(Error::FileAlreadyExists(_))));

    let two = compress(
        &[input.clone(), input],
        &dir.path().join("two.gz"),
        options(ArchiveFormat::Gzip),
    )
    .await;
    assert_eq!(two.unwrap_err(), Error::GzipSingleFile);
}

#[tokio::test]
async fn compress_validates_arguments() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.txt");
    write(&input, "a");
    let output = dir.path().join("a.zip");

    assert_eq!(
        compress(&[], &output, CompressOptions::default())
            .await
            .unwrap_err(),
        Error::NoInputs
    );
    assert!(matches!(
        compress(&[dir.path().join("missing")], &output, CompressOptions::default()).await,
        Err(Error::FileDoesNotExist(_))
    ));
    assert!(matches!(
        compress(&[input.clone()], &dir.path().join("no/dir/a.zip"), CompressOptions::default())
            .await,
        Err(Error::FileDoesNotExist(_))
    ));

    let bad_level = CompressOptions {
        level: 10,
        ..CompressOptions::default()
    };
    assert_eq!(
        compress(&[input.clone()], &output, bad_level)
            .await
            .unwrap_err(),
        Error::InvalidCompressionLevel(10)
    );

    write(&output, "taken");
    assert!(matches!(
        compress(&[input], &output, CompressOptions::default()).await,
        Err(Error::FileAlreadyExists(_))
    ));
}

#[tokio::test]
async fn cancelled_compression_leaves_no_output() {
    let dir = tempdir().unwrap();
    let project = sample_tree(dir.path());
    let output = dir.path().join("out.tar.gz");

    let cancel = CancelFlag::new();
    cancel.cancel();
    let cancelled = CompressOptions {
        cancel,
        ..options(ArchiveFormat::TarGz)
    };
    assert_eq!(
        compress(&[project], &output, cancelled).await.unwrap_err(),
        Error::Cancelled
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn extraction_keeps_existing_files_unless_overwriting() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("data.txt");
    write(&input, "archived");
    let output = dir.path().join("data.zip");
    compress(&[input], &output, CompressOptions::default())
        .await
        .unwrap();

    let dest = dir.path().join("dest");
    write(&dest.join("data.txt"), "local");

    let stats = extract(&output, &dest, ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.files_processed, 0);
    assert_eq!(fs::read_to_string(dest.join("data.txt")).unwrap(), "local");

    let overwrite = ExtractOptions {
        overwrite: true,
        ..ExtractOptions::default()
    };
    extract(&output, &dest, overwrite).await.unwrap();
    assert_eq!(
        fs::read_to_string(dest.join("data.txt")).unwrap(),
        "archived"
    );
}

#[tokio::test]
async fn extraction_filter_selects_entries() {
    let dir = tempdir().unwrap();
    let project = sample_tree(dir.path());
    let output = dir.path().join("p.tar");
    compress(&[project], &output, options(ArchiveFormat::Tar))
        .await
        .unwrap();

    let dest = dir.path().join("dest");
    let only_markdown = ExtractOptions {
        filter: Some(Arc::new(|name: &str| name.ends_with(".md"))),
        ..ExtractOptions::default()
    };
    let stats = extract(&output, &dest, only_markdown).await.unwrap();
    assert_eq!(stats.files_processed, 1);
    assert!(dest.join("project/README.md").exists());
    assert!(!dest.join("project/src").exists());
}

#[tokio::test]
async fn traversal_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("evil.zip");
    let mut writer = ZipWriter::new(File::create(&output).unwrap());
    writer
        .start_file("../escaped.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"nope").unwrap();
    writer
        .start_file("safe.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"ok").unwrap();
    writer.finish().unwrap();

    let dest = dir.path().join("dest");
    let stats = extract(&output, &dest, ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.files_processed, 1);
    assert!(dest.join("safe.txt").exists());
    assert!(!dir.path().join("escaped.txt").exists());
}

#[tokio::test]
async fn tar_traversal_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("evil.tar");
    raw_tar(
        &archive,
        &[
            ("../escaped.txt", "nope", 0o644),
            ("a/../../../dest/climbed.txt", "nope", 0o644),
            ("a/../safe.txt", "ok", 0o644),
        ],
    );

    let dest = dir.path().join("nested/dest");
    let stats = extract(&archive, &dest, ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.files_processed, 1);
    assert!(dest.join("safe.txt").exists());
    assert!(!dir.path().join("nested/escaped.txt").exists());
    assert!(!dir.path().join("dest/climbed.txt").exists());
}

#[test]
fn relative_destinations_do_not_absorb_parent_entries() {
    let options = ExtractOptions::default();
    assert!(matches!(
        decide_entry(Path::new("out"), "../../../out/x", &options),
        EntryDecision::Skip
    ));
    assert!(matches!(
        decide_entry(Path::new("../out"), "x/y", &options),
        EntryDecision::Extract(target) if target == Path::new("../out/x/y")
    ));
}

#[tokio::test]
async fn stored_modes_follow_preserve_permissions() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("tools.tar");
    raw_tar(&archive, &[("run.sh", "#!/bin/sh\n", 0o755)]);

    let kept = dir.path().join("kept");
    extract(&archive, &kept, ExtractOptions::default())
        .await
        .unwrap();
    let mode = fs::metadata(kept.join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    let plain = dir.path().join("plain");
    let options = ExtractOptions {
        preserve_permissions: false,
        ..ExtractOptions::default()
    };
    extract(&archive, &plain, options).await.unwrap();
    let mode = fs::metadata(plain.join("run.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0);
}

#[tokio::test]
async fn unknown_and_corrupt_archives() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("plain.dat");
    write(&plain, "just some text that is not an archive");
    assert!(matches!(
        info(&plain).await,
        Err(Error::UnknownArchiveFormat(_))
    ));

    let broken = dir.path().join("broken.zip");
    write(&broken, "PK but not really");
    assert!(matches!(
        extract(&broken, &dir.path().join("out"), ExtractOptions::default()).await,
        Err(Error::CorruptArchive { .. })
    ));

    assert!(matches!(
        extract(dir.path(), &dir.path().join("out"), ExtractOptions::default()).await,
        Err(Error::FileIsDirectory(_))
    ));
}

#[tokio::test]
async fn format_is_sniffed_without_extension() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.txt");
    write(&input, "a");
    let output = dir.path().join("bundle.zip");
    compress(&[input], &output, CompressOptions::default())
        .await
        .unwrap();

    let renamed = dir.path().join("bundle");
    fs::rename(&output, &renamed).unwrap();
    assert_eq!(ArchiveFormat::detect(&renamed).unwrap(), ArchiveFormat::Zip);
}

#[test]
fn formats_from_names() {
    assert_eq!(
        ArchiveFormat::from_extension(Path::new("x.TAR.GZ")),
        Some(ArchiveFormat::TarGz)
    );
    assert_eq!(
        ArchiveFormat::from_extension(Path::new("x.tgz")),
        Some(ArchiveFormat::TarGz)
    );
    assert_eq!(
        ArchiveFormat::from_extension(Path::new("x.gz")),
        Some(ArchiveFormat::Gzip)
    );
    assert_eq!(ArchiveFormat::from_extension(Path::new("x")), None);
    assert_eq!("tbz2".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarBz2);
    assert!(matches!(
        "rar".parse::<ArchiveFormat>(),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn size_estimate_uses_format_ratio() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.bin");
    write(&input, &"x".repeat(1000));

    assert_eq!(
        estimate_size(&[input.clone()], ArchiveFormat::Tar)
            .await
            .unwrap(),
        1000
    );
    assert_eq!(
        estimate_size(&[input], ArchiveFormat::TarGz).await.unwrap(),
        300
    );
}
