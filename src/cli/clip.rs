use std::path::PathBuf;

use log::info;

use crate::{
    error::Result,
    file::{self, ClipboardAction},
    format::format_path,
};

use super::{
    args::{ClipArgs, ClipCommand},
    context::Context,
    print_json,
};

pub async fn main(ctx: &Context, args: ClipArgs) -> Result<()> {
    let mut clipboard = ctx.clipboard().await?;

    match args.command {
        ClipCommand::Copy { paths } => {
            let paths = absolute_all(&paths)?;
            info!("holding {} paths to copy", paths.len());
            clipboard.copy(paths);
            ctx.save_clipboard(&clipboard).await?;
        }
        ClipCommand::Cut { paths } => {
            for path in &paths {
                ctx.check_allowed(path)?;
            }
            let paths = absolute_all(&paths)?;
            info!("holding {} paths to move", paths.len());
            clipboard.cut(paths);
            ctx.save_clipboard(&clipboard).await?;
        }
        ClipCommand::Paste(args) => {
            let dir = ctx.resolve(args.path.as_deref()).await?;
            ctx.check_allowed(&dir)?;

            let pasted = clipboard.paste(&dir).await;
            ctx.save_clipboard(&clipboard).await?;
            for path in pasted? {
                info!("{}", format_path(&path));
            }
        }
        ClipCommand::Show => {
            if ctx.json {
                return print_json(&clipboard);
            }
            match clipboard.action {
                Some(action) if !clipboard.is_empty() => {
                    let verb = match action {
                        ClipboardAction::Copy => "copy",
                        ClipboardAction::Cut => "move",
                    };
                    info!("{} paths to {verb}:", clipboard.paths.len());
                    for path in &clipboard.paths {
                        info!("  {}", format_path(path));
                    }
                }
                _ => info!("clipboard is empty"),
            }
        }
        ClipCommand::Clear => {
            clipboard.clear();
            ctx.save_clipboard(&clipboard).await?;
        }
    }

    Ok(())
}

fn absolute_all(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|path| file::absolute(path)).collect()
}
