mod archive;
mod args;
mod clip;
mod config;
mod context;
mod files;
mod launch;
mod nav;
mod parse;
mod search;

use std::fmt::Display;

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use log::{error, info};
use serde::Serialize;

use crate::{error::Result, logger};

use self::{
    args::{
        AppsArgs, ArchiveInfoArgs, BackupArgs, BookmarkArgs, CatArgs, CleanNameArgs,
        CleanTempArgs, ClipArgs, CompressArgs, ConfigArgs, CopyArgs, DupesArgs, ExtractArgs,
        GlobalArgs, HashArgs, IndexArgs, ListArgs, MaybePathArgs, MkdirArgs, MoveArgs, NavArgs,
        OpenArgs, PathArgs, QuickSearchArgs, RemoveArgs, RenameArgs, RunArgs, SearchArgs,
        TouchArgs, TreeArgs, UsageArgs, WriteArgs,
    },
    context::Context,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls(ListArgs),
    /// Show detailed information about a file
    Info(PathArgs),
    /// Create a file
    Touch(TouchArgs),
    /// Print a text file
    Cat(CatArgs),
    /// Write text to a file
    Write(WriteArgs),
    /// Create a directory
    Mkdir(MkdirArgs),
    /// Delete files or directories
    Rm(RemoveArgs),
    /// Copy a file or directory
    Cp(CopyArgs),
    /// Move a file or directory
    Mv(MoveArgs),
    /// Rename a file or directory in place
    Rename(RenameArgs),
    /// Show the size of a directory and the usage of its filesystem
    Du(UsageArgs),
    /// Hash files
    Hash(HashArgs),
    /// Find files with identical content
    Dupes(DupesArgs),
    /// Make a backup copy of a file
    Backup(BackupArgs),
    /// Print file names with invalid characters replaced
    CleanName(CleanNameArgs),
    /// Remove old files from a directory
    CleanTemp(CleanTempArgs),
    /// Show the directory tree
    Tree(TreeArgs),
    /// Move around the session directory
    Nav(NavArgs),
    /// Manage named bookmarks
    Bookmark(BookmarkArgs),
    /// Copy and move files through a persistent clipboard
    Clip(ClipArgs),
    /// Search for files by name, content, type, size and date
    Search(SearchArgs),
    /// Find names containing a substring
    QuickSearch(QuickSearchArgs),
    /// Manage the search index
    Index(IndexArgs),
    /// Create an archive
    Compress(CompressArgs),
    /// Extract an archive
    Extract(ExtractArgs),
    /// Show what an archive contains
    ArchiveInfo(ArchiveInfoArgs),
    /// Read and change settings
    Config(ConfigArgs),
    /// Open a file with its application, or run it if executable
    Open(OpenArgs),
    /// Open a directory in the file browser
    OpenFolder(MaybePathArgs),
    /// Open a terminal in a directory
    Terminal(MaybePathArgs),
    /// Run a script with its interpreter
    Run(RunArgs),
    /// Show application associations
    Apps(AppsArgs),
}

pub async fn main() {
    let cli = Cli::parse();
    init_logger(&cli.global);

    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut ctx = Context::load(&cli.global).await?;

    match cli.command {
        Command::Ls(args) => files::ls(&ctx, args).await,
        Command::Info(args) => files::info(&ctx, args).await,
        Command::Touch(args) => files::touch(&ctx, args).await,
        Command::Cat(args) => files::cat(&ctx, args).await,
        Command::Write(args) => files::write(&ctx, args).await,
        Command::Mkdir(args) => files::mkdir(&ctx, args).await,
        Command::Rm(args) => files::rm(&ctx, args).await,
        Command::Cp(args) => files::cp(&ctx, args).await,
        Command::Mv(args) => files::mv(&ctx, args).await,
        Command::Rename(args) => files::rename(&ctx, args).await,
        Command::Du(args) => files::du(&ctx, args).await,
        Command::Hash(args) => files::hash(&ctx, args).await,
        Command::Dupes(args) => files::dupes(&ctx, args).await,
        Command::Backup(args) => files::backup(&ctx, args).await,
        Command::CleanName(args) => files::clean_name(&ctx, args),
        Command::CleanTemp(args) => files::clean_temp(&ctx, args).await,
        Command::Tree(args) => files::tree(&ctx, args).await,
        Command::Nav(args) => nav::main(&mut ctx, args).await,
        Command::Bookmark(args) => nav::bookmark(&mut ctx, args).await,
        Command::Clip(args) => clip::main(&ctx, args).await,
        Command::Search(args) => search::search(&ctx, args).await,
        Command::QuickSearch(args) => search::quick_search(&ctx, args).await,
        Command::Index(args) => search::index(&ctx, args).await,
        Command::Compress(args) => archive::compress(&ctx, args).await,
        Command::Extract(args) => archive::extract(&ctx, args).await,
        Command::ArchiveInfo(args) => archive::info(&ctx, args).await,
        Command::Config(args) => config::main(&mut ctx, args).await,
        Command::Open(args) => launch::open(&ctx, args).await,
        Command::OpenFolder(args) => launch::open_folder(&ctx, args).await,
        Command::Terminal(args) => launch::terminal(&ctx, args).await,
        Command::Run(args) => launch::run(&ctx, args).await,
        Command::Apps(args) => launch::apps(&ctx, args),
    }
}

fn init_logger(args: &GlobalArgs) {
    let level = logger::level_from_args(args.logger.verbose, args.logger.quiet);
    logger::init(level, args.logger.color);
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}

fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::BrightBlack.on_default();
    info!("{style}{name}:{style:#} {value}");
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
