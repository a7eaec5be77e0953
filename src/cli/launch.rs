use std::io::{self, Write};

use clap::builder::styling::AnsiColor;
use itertools::Itertools;
use log::info;
use nix::unistd::AccessFlags;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    file::{self, has_access},
    format::format_path,
    launch::{
        self, associations, default_app, is_app_available, mime_type, run_script, AppKind,
    },
};

use super::{
    args::{AppsArgs, MaybePathArgs, OpenArgs, RunArgs},
    context::Context,
    print_json, print_stat,
};

pub async fn open(ctx: &Context, args: OpenArgs) -> Result<()> {
    let metadata = file::symlink_metadata(&args.path).await?;
    let executable = metadata.is_file() && has_access(&args.path, AccessFlags::X_OK);
    if executable && ctx.settings().security.block_executable_files {
        return Err(Error::PermissionDenied(args.path));
    }

    launch::open(&args.path, args.app).await?;
    info!("opened {}", format_path(&args.path));
    Ok(())
}

pub async fn open_folder(ctx: &Context, args: MaybePathArgs) -> Result<()> {
    let path = ctx.resolve(args.path.as_deref()).await?;
    launch::open_folder(&path).await?;
    info!("opened {}", format_path(&path));
    Ok(())
}

pub async fn terminal(ctx: &Context, args: MaybePathArgs) -> Result<()> {
    let path = ctx.resolve(args.path.as_deref()).await?;
    launch::open_in_terminal(&path).await
}

pub async fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    if ctx.settings().security.block_executable_files {
        return Err(Error::PermissionDenied(args.script));
    }

    let output = run_script(&args.script, &args.args, args.timeout).await?;
    if ctx.json {
        print_json(&output)?;
    } else {
        io::stdout().write_all(output.stdout.as_bytes())?;
        io::stderr().write_all(output.stderr.as_bytes())?;
    }

    if output.success {
        Ok(())
    } else {
        let status = output
            .status
            .map_or_else(|| "a signal".to_owned(), |code| format!("status {code}"));
        Err(Error::Cli(format!(
            "{} exited with {status}",
            format_path(&args.script)
        )))
    }
}

#[derive(Serialize)]
struct FileApps {
    default: AppKind,
    available: bool,
    mime_type: Option<String>,
}

pub fn apps(ctx: &Context, args: AppsArgs) -> Result<()> {
    if let Some(path) = args.path {
        let default = default_app(&path);
        let apps = FileApps {
            default,
            available: is_app_available(default),
            mime_type: mime_type(&path),
        };
        if ctx.json {
            return print_json(&apps);
        }

        print_stat("application", apps.default);
        print_stat("available", apps.available);
        if let Some(mime_type) = &apps.mime_type {
            print_stat("mime type", mime_type);
        }
        return Ok(());
    }

    let associations = associations();
    if ctx.json {
        return print_json(&associations);
    }

    let style = AnsiColor::BrightBlue.on_default();
    for (extension, apps) in &associations {
        info!("{style}{extension}{style:#} {}", apps.iter().join(", "));
    }

    let missing = AppKind::ALL
        .into_iter()
        .filter(|&kind| !is_app_available(kind))
        .join(", ");
    if !missing.is_empty() {
        print_stat("unavailable", missing);
    }

    Ok(())
}
