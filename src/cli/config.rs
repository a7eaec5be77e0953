use log::{info, warn};
use serde_json::Value;

use crate::{error::Result, format::format_path};

use super::{
    args::{ConfigArgs, ConfigCommand},
    context::Context,
    parse::parse_setting_value,
    print_json,
};

pub async fn main(ctx: &mut Context, args: ConfigArgs) -> Result<()> {
    let settings = &mut ctx.settings;

    match args.command {
        ConfigCommand::Path => info!("{}", format_path(settings.file())),
        ConfigCommand::Get { key } => {
            let value = match key {
                Some(key) => settings.get(&key)?,
                None => serde_json::to_value(settings.settings())?,
            };
            print_value(&value)?;
        }
        ConfigCommand::Set { key, value } => {
            let value = parse_setting_value(&value);
            settings.set(&key, value).await?;
            print_value(&settings.get(&key)?)?;
        }
        ConfigCommand::Reset { section } => {
            settings.reset(section.as_deref()).await?;
            match section {
                Some(section) => info!("reset {section} to defaults"),
                None => info!("reset all settings to defaults"),
            }
        }
        ConfigCommand::Export { path, sections } => {
            settings.export(&path, &sections).await?;
            info!("exported settings to {}", format_path(&path));
        }
        ConfigCommand::Import { path, replace } => {
            settings.import(&path, !replace).await?;
            info!("imported settings from {}", format_path(&path));
        }
        ConfigCommand::Validate => {
            let problems = settings.validate().await?;
            if ctx.json {
                return print_json(&problems);
            }

            if problems.is_empty() {
                info!("settings are valid");
            }
            for problem in &problems {
                warn!("{problem}");
            }
        }
    }

    Ok(())
}

/// Strings print bare; everything else as JSON.
fn print_value(value: &Value) -> Result<()> {
    match value {
        Value::String(s) => println!("{s}"),
        other => print_json(other)?,
    }

    Ok(())
}
