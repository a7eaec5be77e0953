use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use clap::builder::styling::AnsiColor;
use log::info;
use serde::Serialize;

use crate::{
    error::Result,
    file,
    format::{format_path, format_size},
    nav::{drives, DiskUsage, Navigator, PathInfo},
};

use super::{
    args::{BookmarkArgs, BookmarkCommand, NavArgs, NavCommand},
    context::Context,
    print_json, print_stat,
};

pub async fn main(ctx: &mut Context, args: NavArgs) -> Result<()> {
    let mut navigator = ctx.navigator().await?;

    match args.command {
        NavCommand::Pwd => print_current(ctx, &navigator)?,
        NavCommand::Cd(args) => {
            // relative to the session directory, not the process
            let target = navigator.current().join(&args.path);
            navigator.navigate_to(&target).await?;
            moved(ctx, &navigator).await?;
        }
        NavCommand::Back => {
            navigator.go_back()?;
            moved(ctx, &navigator).await?;
        }
        NavCommand::Forward => {
            navigator.go_forward()?;
            moved(ctx, &navigator).await?;
        }
        NavCommand::Up => {
            navigator.go_up().await?;
            moved(ctx, &navigator).await?;
        }
        NavCommand::Home => {
            navigator.go_home().await?;
            moved(ctx, &navigator).await?;
        }
        NavCommand::History { clear } => {
            if clear {
                navigator.clear_history();
                ctx.save_navigator(&navigator).await?;
            } else {
                print_history(ctx, &navigator)?;
            }
        }
        NavCommand::Recent { limit } => {
            let limit = limit.unwrap_or(ctx.settings().performance.max_recent_directories);
            let recent = navigator.recent_directories(limit);
            if ctx.json {
                return print_json(&recent);
            }
            for path in &recent {
                info!("{}", format_path(path));
            }
        }
        NavCommand::Crumbs => {
            let crumbs = navigator.breadcrumbs();
            if ctx.json {
                return print_json(&crumbs);
            }
            let names = crumbs
                .iter()
                .map(|crumb| crumb.name.as_str())
                .collect::<Vec<_>>();
            info!("{}", names.join(" > "));
        }
        NavCommand::Drives => {
            let drives = drives();
            if ctx.json {
                return print_json(&drives);
            }
            for drive in &drives {
                let style = AnsiColor::BrightBlue.on_default();
                info!("{style}{}{style:#} {}", drive.name, format_path(&drive.path));
                match (&drive.usage, &drive.error) {
                    (Some(usage), _) => print_usage(usage),
                    (None, Some(err)) => print_stat("  error", err),
                    (None, None) => {}
                }
            }
        }
        NavCommand::Info(args) => {
            let info = navigator.path_info(args.path.as_deref()).await;
            if ctx.json {
                return print_json(&info);
            }
            print_path_info(&info);
        }
    }

    Ok(())
}

async fn moved(ctx: &mut Context, navigator: &Navigator) -> Result<()> {
    ctx.save_navigator(navigator).await?;
    print_current(ctx, navigator)
}

fn print_current(ctx: &Context, navigator: &Navigator) -> Result<()> {
    if ctx.json {
        return print_json(&navigator.current());
    }

    info!("{}", format_path(navigator.current()));
    Ok(())
}

#[derive(Serialize)]
struct History<'a> {
    back: Vec<&'a PathBuf>,
    current: &'a Path,
    forward: Vec<&'a PathBuf>,
}

fn print_history(ctx: &Context, navigator: &Navigator) -> Result<()> {
    let history = History {
        back: navigator.history().collect(),
        current: navigator.current(),
        forward: navigator.forward_history().collect(),
    };
    if ctx.json {
        return print_json(&history);
    }

    let dim = AnsiColor::BrightBlack.on_default();
    for path in &history.back {
        info!("{dim}  {}{dim:#}", format_path(path));
    }
    let current = AnsiColor::Green.on_default();
    info!("{current}> {}{current:#}", format_path(history.current));
    for path in history.forward.iter().rev() {
        info!("{dim}  {}{dim:#}", format_path(path));
    }

    Ok(())
}

fn print_usage(usage: &DiskUsage) {
    print_stat(
        "  usage",
        format!(
            "{} used of {} ({:.1}%), {} free",
            format_size(usage.used),
            format_size(usage.total),
            usage.percent_used(),
            format_size(usage.free)
        ),
    );
}

fn print_path_info(info: &PathInfo) {
    print_stat("path", format_path(&info.path));
    print_stat("exists", info.exists);
    print_stat("readable", info.readable);
    print_stat("writable", info.writable);
    print_stat("files", info.file_count);
    print_stat("directories", info.dir_count);
    if let Some(usage) = &info.disk {
        print_usage(usage);
    }
    if let Some(err) = &info.error {
        print_stat("error", err);
    }
}

pub async fn bookmark(ctx: &mut Context, args: BookmarkArgs) -> Result<()> {
    let mut bookmarks = ctx.bookmarks().await?;

    match args.command {
        BookmarkCommand::Add { name, path } => {
            let path = ctx.resolve(path.as_deref()).await?;
            let path = file::absolute(&path)?;
            bookmarks.add(&name, &path).await?;
            info!("{name} -> {}", format_path(&path));
        }
        BookmarkCommand::Rm { name } => {
            bookmarks.remove(&name).await?;
            info!("removed {name}");
        }
        BookmarkCommand::Ls => {
            if ctx.json {
                let listed = bookmarks.iter().collect::<BTreeMap<_, _>>();
                return print_json(&listed);
            }
            let style = AnsiColor::BrightBlue.on_default();
            for (name, bookmark) in bookmarks.iter() {
                info!("{style}{name}{style:#} {}", format_path(&bookmark.path));
            }
        }
        BookmarkCommand::Go { name } => {
            let mut navigator = ctx.navigator().await?;
            navigator.navigate_to_bookmark(&bookmarks, &name).await?;
            moved(ctx, &navigator).await?;
        }
    }

    Ok(())
}
