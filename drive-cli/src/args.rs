//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "drivectl",
    about = "Upload, download, and list Google Drive files",
    version
)]
pub struct Cli {
    /// Path to the registered application's client secrets JSON
    #[arg(long, global = true, default_value = core_auth::DEFAULT_CLIENT_SECRET_PATH)]
    pub client_secret: PathBuf,

    /// Where the credential is persisted between runs
    #[arg(long, global = true, default_value = core_auth::DEFAULT_STORE_PATH)]
    pub token_file: PathBuf,

    /// Fail instead of starting the interactive authorization flow
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a local file to Drive
    Upload(UploadArgs),
    /// Download a Drive file to local storage
    Download(DownloadArgs),
    /// List Drive files and folders recursively
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Local file, or a directory to pick a file from
    #[arg(long)]
    pub local_path: PathBuf,

    /// Destination Drive folder id; selected interactively when absent
    #[arg(long)]
    pub drive_path: Option<String>,

    /// Name to give the file in Drive; defaults to the local file name
    #[arg(long)]
    pub file_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Local destination file or directory
    #[arg(long)]
    pub local_path: PathBuf,

    /// Drive file id, or a folder id to pick a file from
    #[arg(long)]
    pub drive_path: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Folder id to list from; defaults to everything visible
    #[arg(long)]
    pub drive_path: Option<String>,
}
