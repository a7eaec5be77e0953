use std::{path::Path, process::Stdio, time::Duration};

use clap::builder::styling::AnsiColor;
use log::debug;
use serde::Serialize;
use tokio::{process::Command, time::timeout};

use crate::{
    error::{Error, Result},
    file::{self, extension_of},
    format::format_path,
};

pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

const INTERPRETERS: &[(&str, &[&str])] = &[
    (".py", &["python3", "python"]),
    (".js", &["node"]),
    (".sh", &["bash"]),
    (".ps1", &["pwsh", "powershell"]),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptOutput {
    pub success: bool,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Candidate interpreters for a script, by extension.
pub fn interpreter_for(path: &Path) -> Result<&'static [&'static str]> {
    let extension = extension_of(path);
    INTERPRETERS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|&(_, interpreters)| interpreters)
        .ok_or(Error::UnsupportedScript(extension))
}

/// Runs a script with the interpreter for its extension and collects its
/// output. The process is killed once `limit` elapses.
pub async fn run_script(path: &Path, args: &[String], limit: Duration) -> Result<ScriptOutput> {
    let metadata = file::symlink_metadata(path).await?;
    if metadata.is_dir() {
        return Err(Error::FileIsDirectory(path.to_owned()));
    }

    let candidates = interpreter_for(path)?;
    let interpreter = candidates
        .iter()
        .find_map(|program| which::which(program).ok())
        .ok_or_else(|| Error::NoApplication(candidates.join(" or ")))?;

    let child = Command::new(&interpreter)
        .arg(path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let style = AnsiColor::Magenta.on_default();
    debug!(
        "{style}running{style:#} {} with {}",
        format_path(path),
        format_path(&interpreter)
    );

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout(limit))??;

    Ok(ScriptOutput {
        success: output.status.success(),
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
