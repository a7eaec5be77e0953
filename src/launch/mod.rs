mod script;

#[cfg(test)]
mod tests;

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

use clap::{builder::styling::AnsiColor, ValueEnum};
use log::{debug, warn};
use nix::unistd::AccessFlags;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::{
    error::{Error, Result},
    file::{self, extension_of, has_access},
    format::format_path,
};

pub use self::script::{interpreter_for, run_script, ScriptOutput, DEFAULT_SCRIPT_TIMEOUT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AppKind {
    /// The platform's generic opener
    OpenFile,
    OpenFolder,
    TextEditor,
    Browser,
    ImageViewer,
    PdfViewer,
    WordProcessor,
    Spreadsheet,
    Presentation,
    ArchiveManager,
    AudioPlayer,
    VideoPlayer,
}

impl AppKind {
    pub const ALL: [AppKind; 12] = [
        AppKind::OpenFile,
        AppKind::OpenFolder,
        AppKind::TextEditor,
        AppKind::Browser,
        AppKind::ImageViewer,
        AppKind::PdfViewer,
        AppKind::WordProcessor,
        AppKind::Spreadsheet,
        AppKind::Presentation,
        AppKind::ArchiveManager,
        AppKind::AudioPlayer,
        AppKind::VideoPlayer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AppKind::OpenFile => "open_file",
            AppKind::OpenFolder => "open_folder",
            AppKind::TextEditor => "text_editor",
            AppKind::Browser => "browser",
            AppKind::ImageViewer => "image_viewer",
            AppKind::PdfViewer => "pdf_viewer",
            AppKind::WordProcessor => "word_processor",
            AppKind::Spreadsheet => "spreadsheet",
            AppKind::Presentation => "presentation",
            AppKind::ArchiveManager => "archive_manager",
            AppKind::AudioPlayer => "audio_player",
            AppKind::VideoPlayer => "video_player",
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Program and leading arguments used to open files with `kind`.
    pub fn command(self, kind: AppKind) -> &'static [&'static str] {
        match self {
            Platform::Linux => match kind {
                AppKind::OpenFile | AppKind::OpenFolder | AppKind::Browser => &["xdg-open"],
                AppKind::TextEditor => &["gedit"],
                AppKind::ImageViewer => &["eog"],
                AppKind::PdfViewer => &["evince"],
                AppKind::WordProcessor => &["libreoffice", "--writer"],
                AppKind::Spreadsheet => &["libreoffice", "--calc"],
                AppKind::Presentation => &["libreoffice", "--impress"],
                AppKind::ArchiveManager => &["file-roller"],
                AppKind::AudioPlayer => &["rhythmbox"],
                AppKind::VideoPlayer => &["vlc"],
            },
            Platform::MacOs => match kind {
                AppKind::TextEditor => &["open", "-e"],
                _ => &["open"],
            },
        }
    }

    /// Terminal emulators tried in order, with the argument that sets the
    /// working directory.
    fn terminals(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Platform::Linux => &[
                ("gnome-terminal", &["--working-directory"]),
                ("konsole", &["--workdir"]),
                ("xfce4-terminal", &["--working-directory"]),
                ("xterm", &[]),
            ],
            Platform::MacOs => &[("open", &["-a", "Terminal"])],
        }
    }
}

const TEXT_EXTENSIONS: &[&str] = &[".txt", ".py", ".js", ".html", ".css", ".json", ".xml", ".md"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp"];
const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".flac"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mkv", ".mov"];

const DEFAULT_APPS: &[(&str, AppKind)] = &[
    (".txt", AppKind::TextEditor),
    (".py", AppKind::TextEditor),
    (".js", AppKind::TextEditor),
    (".html", AppKind::Browser),
    (".css", AppKind::Browser),
    (".json", AppKind::TextEditor),
    (".xml", AppKind::TextEditor),
    (".md", AppKind::TextEditor),
    (".jpg", AppKind::ImageViewer),
    (".jpeg", AppKind::ImageViewer),
    (".png", AppKind::ImageViewer),
    (".gif", AppKind::ImageViewer),
    (".bmp", AppKind::ImageViewer),
    (".svg", AppKind::Browser),
    (".pdf", AppKind::PdfViewer),
    (".doc", AppKind::WordProcessor),
    (".docx", AppKind::WordProcessor),
    (".xls", AppKind::Spreadsheet),
    (".xlsx", AppKind::Spreadsheet),
    (".ppt", AppKind::Presentation),
    (".pptx", AppKind::Presentation),
    (".zip", AppKind::ArchiveManager),
    (".rar", AppKind::ArchiveManager),
    (".7z", AppKind::ArchiveManager),
    (".tar", AppKind::ArchiveManager),
    (".gz", AppKind::ArchiveManager),
    (".mp3", AppKind::AudioPlayer),
    (".wav", AppKind::AudioPlayer),
    (".flac", AppKind::AudioPlayer),
    (".mp4", AppKind::VideoPlayer),
    (".avi", AppKind::VideoPlayer),
    (".mkv", AppKind::VideoPlayer),
    (".mov", AppKind::VideoPlayer),
];

pub fn default_app(path: &Path) -> AppKind {
    let extension = extension_of(path);
    DEFAULT_APPS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map_or(AppKind::OpenFile, |&(_, kind)| kind)
}

/// Applications able to open each known extension, default first.
pub fn associations() -> BTreeMap<String, Vec<AppKind>> {
    DEFAULT_APPS
        .iter()
        .map(|&(ext, default)| {
            let extras: &[AppKind] = if TEXT_EXTENSIONS.contains(&ext) {
                &[AppKind::TextEditor, AppKind::Browser]
            } else if IMAGE_EXTENSIONS.contains(&ext) {
                &[AppKind::ImageViewer, AppKind::Browser]
            } else if AUDIO_EXTENSIONS.contains(&ext) {
                &[AppKind::AudioPlayer]
            } else if VIDEO_EXTENSIONS.contains(&ext) {
                &[AppKind::VideoPlayer]
            } else {
                &[]
            };

            let mut apps = vec![default];
            for &app in extras {
                if !apps.contains(&app) {
                    apps.push(app);
                }
            }
            (ext.to_owned(), apps)
        })
        .collect()
}

pub fn is_app_available(kind: AppKind) -> bool {
    is_program_available(Platform::current().command(kind)[0])
}

fn is_program_available(program: &str) -> bool {
    which::which(program).is_ok()
}

pub fn mime_type(path: &Path) -> Option<String> {
    file::guess_mime(path)
}

/// Starts `argv` followed by `extra` without waiting for it.
fn spawn_detached(argv: &[&str], extra: &[&Path], dir: Option<&Path>) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::NoApplication(String::new()))?;
    if !is_program_available(program) {
        return Err(Error::NoApplication((*program).to_owned()));
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    command.spawn()?;
    Ok(())
}

/// Runs executables directly; opens other files with `app`, the default
/// application for the extension, or the system opener.
pub async fn open(path: &Path, app: Option<AppKind>) -> Result<()> {
    let metadata = file::symlink_metadata(path).await?;
    let platform = Platform::current();
    let formatted_path = format_path(path);

    if metadata.is_file() && has_access(path, AccessFlags::X_OK) {
        let program = file::absolute(path)?;
        spawn_detached(&[program.to_string_lossy().as_ref()], &[], path.parent())?;
        let style = AnsiColor::Magenta.on_default();
        debug!("{style}executed{style:#} {formatted_path}");
        return Ok(());
    }

    let kind = app.unwrap_or_else(|| default_app(path));
    if let Err(err) = spawn_detached(platform.command(kind), &[path], None) {
        warn!("cannot open {formatted_path} with {kind}: {err}");
        spawn_detached(platform.command(AppKind::OpenFile), &[path], None)?;
    }

    let style = AnsiColor::Magenta.on_default();
    debug!("{style}opened{style:#} {formatted_path} with {kind}");
    Ok(())
}

pub async fn open_folder(path: &Path) -> Result<()> {
    let metadata = file::symlink_metadata(path).await?;
    if !metadata.is_dir() {
        return Err(Error::FileIsNotDirectory(path.to_owned()));
    }

    spawn_detached(Platform::current().command(AppKind::OpenFolder), &[path], None)?;
    let style = AnsiColor::Magenta.on_default();
    debug!("{style}opened folder{style:#} {}", format_path(path));
    Ok(())
}

/// Directory a terminal opened at `path` starts in: files open in their
/// parent directory.
pub async fn terminal_directory(path: &Path) -> Result<PathBuf> {
    let metadata = file::symlink_metadata(path).await?;
    if metadata.is_dir() {
        return Ok(path.to_owned());
    }

    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => Ok(parent.to_owned()),
        None => Ok(PathBuf::from(".")),
    }
}

/// Opens the first available terminal emulator at `path`.
pub async fn open_in_terminal(path: &Path) -> Result<()> {
    let dir = terminal_directory(path).await?;

    for (program, args) in Platform::current().terminals() {
        if !is_program_available(program) {
            continue;
        }

        let mut argv = vec![*program];
        argv.extend_from_slice(args);
        let extra = if args.is_empty() { vec![] } else { vec![dir.as_path()] };
        spawn_detached(&argv, &extra, Some(&dir))?;

        let style = AnsiColor::Magenta.on_default();
        debug!("{style}opened {program}{style:#} in {}", format_path(&dir));
        return Ok(());
    }

    Err(Error::NoApplication("terminal".to_owned()))
}
