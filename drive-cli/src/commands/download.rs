//! `drivectl download` — pick a remote file, stream it to local storage.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use provider_google_drive::{DriveClient, RemoteEntry};

use crate::args::DownloadArgs;
use crate::ui;

pub async fn run(drive: &DriveClient, args: DownloadArgs) -> Result<()> {
    let target = resolve_remote_file(drive, args.drive_path).await?;
    let dest = resolve_destination_path(&args.local_path, &target.name);
    debug!(file_id = %target.id, dest = ?dest, "download target resolved");

    let bar = ui::transfer_bar(&format!("Downloading {}", target.name));
    let result = drive
        .download_to_path(&target.id, &dest, |fraction| ui::set_fraction(&bar, fraction))
        .await;

    match result {
        Ok(bytes) => {
            bar.finish();
            println!("Downloaded {} bytes to {}", bytes, dest.display());
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            eprintln!(
                "The transfer did not complete; {} is truncated and should not be trusted.",
                dest.display()
            );
            Err(e.into())
        }
    }
}

/// An explicit file id is used as-is; a folder id (or no id) enumerates
/// files for interactive selection.
async fn resolve_remote_file(
    drive: &DriveClient,
    drive_path: Option<String>,
) -> Result<RemoteEntry> {
    match drive_path {
        Some(id) => {
            let entry = drive.metadata(&id).await?;
            if entry.is_folder() {
                pick_file(drive, Some(&entry.id)).await
            } else {
                Ok(entry)
            }
        }
        None => pick_file(drive, None).await,
    }
}

async fn pick_file(drive: &DriveClient, root: Option<&str>) -> Result<RemoteEntry> {
    let files: Vec<RemoteEntry> = drive
        .walk(root)
        .await?
        .into_iter()
        .filter(|listed| !listed.entry.is_folder())
        .map(|listed| listed.entry)
        .collect();

    let chosen = ui::select("Select the file to download", &files, |entry| {
        format!("{} ({})", entry.name, entry.id)
    })?;
    Ok(chosen.clone())
}

/// Downloading into a directory keeps the remote name; anything else is the
/// destination file itself.
fn resolve_destination_path(local: &Path, remote_name: &str) -> PathBuf {
    if local.is_dir() {
        local.join(remote_name)
    } else {
        local.to_path_buf()
    }
}
