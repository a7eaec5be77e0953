use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use globset::{Glob, GlobSetBuilder};
use humantime::format_duration;
use log::info;

use crate::{
    archive::{self, ArchiveFormat, CompressOptions, EntryFilter, ExtractOptions},
    error::Result,
    file,
    format::{format_path, format_size, format_time},
    stats::ArchiveStats,
};

use super::{
    args::{ArchiveInfoArgs, CompressArgs, ExtractArgs},
    context::{progress_logger, Context},
    print_json, print_stat,
};

pub async fn compress(ctx: &Context, args: CompressArgs) -> Result<()> {
    let settings = &ctx.settings().compression;
    let format = args
        .format
        .or_else(|| ArchiveFormat::from_extension(&args.output))
        .unwrap_or(settings.default_format);

    if args.estimate {
        let estimate = archive::estimate_size(&args.inputs, format).await?;
        if ctx.json {
            return print_json(&estimate);
        }
        info!("about {} as {format}", format_size(estimate));
        return Ok(());
    }

    ctx.check_allowed(&args.output)?;
    let options = CompressOptions {
        format,
        level: args.level.unwrap_or(settings.compression_level),
        excludes: args.exclude,
        progress: Some(progress_logger("compressed")),
        ..CompressOptions::default()
    };

    let stats = archive::compress(&args.inputs, &args.output, options).await?;
    if ctx.json {
        return print_json(&stats);
    }

    info!("created {}", format_path(&args.output));
    if ctx.stats {
        print_archive_stats(&stats);
        print_stat("compressed size", format_size(stats.compressed_size));
        print_stat("space saved", format!("{:.1}%", stats.ratio()));
    }

    Ok(())
}

pub async fn extract(ctx: &Context, args: ExtractArgs) -> Result<()> {
    let settings = &ctx.settings().compression;
    let dest = match args.dest {
        Some(dest) => dest,
        None => default_destination(&args.archive, settings.create_subdir_on_extract),
    };
    ctx.check_allowed(&dest)?;

    let filter = if args.only.is_empty() {
        None
    } else {
        let mut builder = GlobSetBuilder::new();
        for pattern in &args.only {
            builder.add(Glob::new(pattern)?);
        }
        let globs = builder.build()?;
        let filter: EntryFilter = Arc::new(move |name: &str| globs.is_match(name));
        Some(filter)
    };

    let options = ExtractOptions {
        overwrite: args.overwrite || settings.overwrite_existing,
        preserve_permissions: settings.preserve_permissions,
        filter,
        progress: Some(progress_logger("extracted")),
        ..ExtractOptions::default()
    };

    let stats = archive::extract(&args.archive, &dest, options).await?;
    if ctx.json {
        return print_json(&stats);
    }

    info!("extracted to {}", format_path(&dest));
    if ctx.stats {
        print_archive_stats(&stats);
    }

    Ok(())
}

/// Next to the archive, in a directory named after it when `subdir` is set.
fn default_destination(archive: &Path, subdir: bool) -> PathBuf {
    let parent = archive
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_owned);
    if !subdir {
        return parent;
    }

    let name = file::name_of(archive);
    let stem = ArchiveFormat::from_extension(archive)
        .and_then(|format| {
            let cut = name.len().checked_sub(format.extension().len())?;
            let (stem, extension) = (name.get(..cut)?, name.get(cut..)?);
            extension
                .eq_ignore_ascii_case(format.extension())
                .then_some(stem)
        })
        .filter(|stem| !stem.is_empty())
        .map_or_else(
            || {
                archive
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            },
            ToOwned::to_owned,
        );

    parent.join(stem)
}

fn print_archive_stats(stats: &ArchiveStats) {
    print_stat("files", stats.files_processed);
    print_stat("original size", format_size(stats.original_size));
    print_stat("elapsed time", format_duration(stats.elapsed));
}

pub async fn info(ctx: &Context, args: ArchiveInfoArgs) -> Result<()> {
    let info = archive::info(&args.archive).await?;
    if ctx.json {
        return print_json(&info);
    }

    print_stat("format", info.format);
    print_stat("size", format_size(info.size));
    if let Some(modified) = &info.modified {
        print_stat("modified", format_time(modified));
    }
    print_stat("entries", info.entry_count);
    if info.encrypted {
        print_stat("encrypted", true);
    }

    if args.list {
        for entry in &info.entries {
            info!("  {entry}");
        }
    }

    Ok(())
}
