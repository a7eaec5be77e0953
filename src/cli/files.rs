use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use clap::builder::styling::{AnsiColor, Style};
use humantime::format_duration;
use log::info;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::{
    error::{Error, Result},
    file::{
        self, clean_filename, cleanup_temp_files, create_backup, directory_size,
        directory_stats, file_info, find_duplicates, list_directory, safe_copy,
        DuplicateOptions, Entry, FileKind, ListOptions,
    },
    format::{format_path, format_size, format_time},
    hash::hash_file,
    nav::{self, directory_tree, disk_usage, DirectoryTree, DiskUsage},
};

use super::{
    args::{
        BackupArgs, CatArgs, CleanNameArgs, CleanTempArgs, CopyArgs, DupesArgs, HashArgs,
        ListArgs, MkdirArgs, MoveArgs, PathArgs, RemoveArgs, RenameArgs, TouchArgs, TreeArgs,
        UsageArgs, WriteArgs,
    },
    context::{progress_logger, Context},
    print_json, print_stat,
};

pub async fn ls(ctx: &Context, args: ListArgs) -> Result<()> {
    let browser = &ctx.settings().browser;
    let path = ctx.resolve(args.path.as_deref()).await?;
    let options = ListOptions {
        show_hidden: args.all || browser.show_hidden_files,
        sort_by: args.sort.unwrap_or(browser.sort_by),
        reverse: args.reverse == browser.sort_ascending,
        directories_first: browser.group_directories_first,
    };

    let entries = list_directory(&path, options).await?;
    if ctx.json {
        return print_json(&entries);
    }

    for entry in &entries {
        let name = display_name(entry, browser.show_file_extensions);
        let style = entry_style(entry);
        if args.long {
            let permissions = entry.permissions.as_deref().unwrap_or("???");
            let size = if entry.is_directory() {
                "-".to_owned()
            } else {
                format_size(entry.size)
            };
            let modified = entry.modified.as_ref().map(format_time).unwrap_or_default();
            info!("{permissions} {size:>10} {modified:>19} {style}{name}{style:#}");
        } else {
            info!("{style}{name}{style:#}");
        }
    }

    if ctx.stats {
        let total_size = entries.iter().map(|entry| entry.size).sum::<u64>();
        print_stat("entries", entries.len());
        print_stat("total size", format_size(total_size));
    }

    Ok(())
}

fn display_name(entry: &Entry, show_extensions: bool) -> String {
    if show_extensions || entry.is_directory() || entry.extension.is_empty() {
        return entry.name.clone();
    }

    Path::new(&entry.name)
        .file_stem()
        .map_or_else(|| entry.name.clone(), |stem| stem.to_string_lossy().into_owned())
}

fn entry_style(entry: &Entry) -> Style {
    match entry.kind {
        Some(FileKind::Directory) => AnsiColor::BrightBlue.on_default(),
        Some(FileKind::Symlink) => AnsiColor::Cyan.on_default(),
        Some(FileKind::Other) => AnsiColor::Yellow.on_default(),
        None => AnsiColor::Red.on_default(),
        Some(FileKind::File) => Style::new(),
    }
}

pub async fn info(ctx: &Context, args: PathArgs) -> Result<()> {
    let info = file_info(&args.path).await?;
    if ctx.json {
        return print_json(&info);
    }

    let optional_time = |time: Option<&chrono::DateTime<chrono::Utc>>| {
        time.map_or_else(|| "unknown".to_owned(), format_time)
    };

    print_stat("name", &info.name);
    print_stat("path", format_path(&info.path));
    print_stat("kind", info.kind);
    print_stat("size", format_size(info.size));
    if !info.extension.is_empty() {
        print_stat("extension", &info.extension);
    }
    if let Some(mime_type) = &info.mime_type {
        print_stat("mime type", mime_type);
    }
    print_stat("created", optional_time(info.created.as_ref()));
    print_stat("modified", optional_time(info.modified.as_ref()));
    print_stat("accessed", optional_time(info.accessed.as_ref()));
    print_stat("permissions", &info.permissions);
    print_stat(
        "access",
        format!(
            "{}{}{}",
            if info.is_readable { 'r' } else { '-' },
            if info.is_writable { 'w' } else { '-' },
            if info.is_executable { 'x' } else { '-' },
        ),
    );
    print_stat("owner", format!("{}:{}", info.owner, info.group));
    print_stat("inode", info.inode);
    print_stat("hidden", info.is_hidden);
    if let Some(target) = &info.link_target {
        print_stat("link target", format_path(target));
    }
    if let Some(md5) = &info.md5 {
        print_stat("md5", md5);
    }

    Ok(())
}

pub async fn touch(ctx: &Context, args: TouchArgs) -> Result<()> {
    ctx.check_allowed(&args.path)?;
    if !args.force && file::try_exists(&args.path).await? {
        return Err(Error::FileAlreadyExists(args.path));
    }

    file::create_file(&args.path, &args.content).await?;
    info!("created {}", format_path(&args.path));
    Ok(())
}

pub async fn cat(ctx: &Context, args: CatArgs) -> Result<()> {
    let metadata = file::symlink_metadata(&args.path).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(args.path));
    }

    let limit = ctx.settings().performance.file_preview_size_limit;
    if !args.force && metadata.len() > limit {
        return Err(Error::Cli(format!(
            "{} is larger than the preview limit of {} (use --force)",
            format_path(&args.path),
            format_size(limit)
        )));
    }

    let bytes = file::read_bytes(&args.path).await?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

pub async fn write(ctx: &Context, args: WriteArgs) -> Result<()> {
    ctx.check_allowed(&args.path)?;

    let content = match args.content {
        Some(content) => content.into_bytes(),
        None => {
            let mut buffer = Vec::new();
            tokio::io::stdin().read_to_end(&mut buffer).await?;
            buffer
        }
    };

    if ctx.settings().security.backup_before_edit && file::try_exists(&args.path).await? {
        let backup = create_backup(&args.path, None, true).await?;
        info!("backed up to {}", format_path(&backup));
    }

    file::write_file(&args.path, &content, args.append).await?;
    if ctx.stats {
        print_stat("written", format_size(content.len()));
    }

    Ok(())
}

pub async fn mkdir(ctx: &Context, args: MkdirArgs) -> Result<()> {
    let parent = ctx.resolve(args.parent.as_deref()).await?;
    ctx.check_allowed(&parent.join(&args.name))?;

    let navigator = ctx.navigator().await?;
    let path = navigator.create_directory(&args.name, Some(&parent)).await?;
    info!("created {}", format_path(&path));
    Ok(())
}

pub async fn rm(ctx: &Context, args: RemoveArgs) -> Result<()> {
    if ctx.settings().security.confirm_delete && !args.yes {
        return Err(Error::Cli(
            "deleting needs --yes while security.confirm_delete is set".to_owned(),
        ));
    }

    for path in &args.paths {
        ctx.check_allowed(path)?;
    }

    for path in &args.paths {
        let metadata = file::symlink_metadata(path).await?;
        if metadata.is_dir() {
            nav::delete_directory(path, args.recursive).await?;
        } else {
            file::delete(path).await?;
        }
        info!("deleted {}", format_path(path));
    }

    Ok(())
}

pub async fn cp(ctx: &Context, args: CopyArgs) -> Result<()> {
    ctx.check_allowed(&args.dst)?;

    let overwrite = args.overwrite || !ctx.settings().security.confirm_overwrite;
    let start = Instant::now();
    let metadata = file::symlink_metadata(&args.src).await?;
    let size = if metadata.is_dir() {
        if !overwrite && file::try_exists(&args.dst).await? {
            return Err(Error::FileAlreadyExists(args.dst));
        }
        file::copy(&args.src, &args.dst).await?
    } else {
        safe_copy(&args.src, &args.dst, overwrite, args.verify).await?
    };

    info!(
        "copied {} to {}",
        format_path(&args.src),
        format_path(&args.dst)
    );
    if ctx.stats {
        print_stat("copied", format_size(size));
        print_stat("elapsed time", format_duration(start.elapsed()));
    }

    Ok(())
}

pub async fn mv(ctx: &Context, args: MoveArgs) -> Result<()> {
    ctx.check_allowed(&args.src)?;
    ctx.check_allowed(&args.dst)?;

    let overwrite = args.overwrite || !ctx.settings().security.confirm_overwrite;
    if !overwrite {
        let target = file::move_target(&args.src, &args.dst).await?;
        if file::try_exists(&target).await? {
            return Err(Error::FileAlreadyExists(target));
        }
    }

    let target = file::move_path(&args.src, &args.dst).await?;
    info!("moved {} to {}", format_path(&args.src), format_path(&target));
    Ok(())
}

pub async fn rename(ctx: &Context, args: RenameArgs) -> Result<()> {
    ctx.check_allowed(&args.path)?;

    let target = file::rename(&args.path, &args.new_name).await?;
    info!("renamed {} to {}", format_path(&args.path), format_path(&target));
    Ok(())
}

#[derive(Serialize)]
struct Usage {
    path: PathBuf,
    size: u64,
    files: Option<u64>,
    disk: Option<DiskUsage>,
}

pub async fn du(ctx: &Context, args: UsageArgs) -> Result<()> {
    let path = ctx.resolve(args.path.as_deref()).await?;
    let metadata = file::symlink_metadata(&path).await?;

    let (size, files) = if metadata.is_dir() {
        let size = directory_size(&path, args.depth).await?;
        let (_, files) = directory_stats(&path, args.all).await?;
        (size, Some(files))
    } else {
        (metadata.len(), None)
    };
    let disk = disk_usage(&path).ok();

    if ctx.json {
        return print_json(&Usage {
            path,
            size,
            files,
            disk,
        });
    }

    info!("{} {}", format_size(size), format_path(&path));
    if let Some(files) = files {
        print_stat("files", files);
    }
    if let Some(disk) = disk {
        print_stat(
            "filesystem",
            format!(
                "{} used of {} ({:.1}%), {} free",
                format_size(disk.used),
                format_size(disk.total),
                disk.percent_used(),
                format_size(disk.free)
            ),
        );
    }

    Ok(())
}

pub async fn hash(ctx: &Context, args: HashArgs) -> Result<()> {
    let mut hashes = BTreeMap::new();
    for path in args.paths {
        let hash = hash_file(path.clone(), args.algorithm).await?;
        if !ctx.json {
            info!("{hash}  {}", format_path(&path));
        }
        hashes.insert(path, hash);
    }

    if ctx.json {
        print_json(&hashes)?;
    }

    Ok(())
}

pub async fn dupes(ctx: &Context, args: DupesArgs) -> Result<()> {
    let path = ctx.resolve(args.path.as_deref()).await?;
    let options = DuplicateOptions {
        recursive: !args.no_recursive,
        min_size: args.min_size,
        extensions: args.extensions,
        algorithm: args.algorithm,
        jobs: args
            .tasks
            .unwrap_or(ctx.settings().performance.max_worker_threads)
            .max(1),
        progress: Some(progress_logger("hashed")),
        ..DuplicateOptions::default()
    };

    let groups = find_duplicates(&path, options).await?;
    if ctx.json {
        return print_json(&groups);
    }

    let hash_style = AnsiColor::BrightBlack.on_default();
    for (hash, paths) in &groups {
        info!("{hash_style}{hash}{hash_style:#}");
        for path in paths {
            info!("  {}", format_path(path));
        }
    }

    if ctx.stats {
        let duplicates = groups.values().map(|paths| paths.len() - 1).sum::<usize>();
        print_stat("groups", groups.len());
        print_stat("redundant files", duplicates);
    }

    Ok(())
}

pub async fn backup(ctx: &Context, args: BackupArgs) -> Result<()> {
    if let Some(dir) = &args.dir {
        ctx.check_allowed(dir)?;
    }

    let backup = create_backup(&args.path, args.dir.as_deref(), !args.no_timestamp).await?;
    info!("backed up to {}", format_path(&backup));
    Ok(())
}

pub fn clean_name(ctx: &Context, args: CleanNameArgs) -> Result<()> {
    let cleaned = args
        .names
        .iter()
        .map(|name| clean_filename(name, &args.replacement))
        .collect::<Vec<_>>();

    if ctx.json {
        return print_json(&cleaned);
    }

    for name in cleaned {
        info!("{name}");
    }

    Ok(())
}

pub async fn clean_temp(ctx: &Context, args: CleanTempArgs) -> Result<()> {
    ctx.check_allowed(&args.dir)?;

    let removed = cleanup_temp_files(&args.dir, args.older_than).await?;
    info!("removed {removed} files from {}", format_path(&args.dir));
    Ok(())
}

pub async fn tree(ctx: &Context, args: TreeArgs) -> Result<()> {
    let path = ctx.resolve(args.path.as_deref()).await?;
    let tree = directory_tree(&path, args.depth).await?;
    if ctx.json {
        return print_json(&tree);
    }

    print_tree(&tree, 0);
    if ctx.stats {
        print_stat("directories", tree.count());
    }

    Ok(())
}

fn print_tree(tree: &DirectoryTree, depth: usize) {
    let indent = "  ".repeat(depth);
    let style = AnsiColor::BrightBlue.on_default();
    let suffix = if tree.truncated { "/..." } else { "/" };
    match &tree.error {
        Some(err) => {
            let error_style = AnsiColor::Red.on_default();
            info!(
                "{indent}{style}{}{style:#}{suffix} {error_style}({err}){error_style:#}",
                tree.name
            );
        }
        None => info!("{indent}{style}{}{style:#}{suffix}", tree.name),
    }

    for child in &tree.children {
        print_tree(child, depth + 1);
    }
}
