//! `drivectl upload` — pick a local file, pick a destination folder, send it.

use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use provider_google_drive::{DriveClient, ListedEntry};

use crate::args::UploadArgs;
use crate::ui;

pub async fn run(drive: &DriveClient, args: UploadArgs) -> Result<()> {
    let local = resolve_local_source(&args.local_path)?;
    let display_name = match args.file_name {
        Some(name) => name,
        None => local
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cannot derive a file name from {}", local.display()))?,
    };
    let parent = resolve_destination(drive, args.drive_path).await?;
    debug!(local = ?local, name = %display_name, parent = ?parent, "upload source resolved");

    let bar = ui::transfer_bar(&format!("Uploading {}", display_name));
    let result = drive
        .upload_file(&local, &display_name, parent.as_deref(), |fraction| {
            ui::set_fraction(&bar, fraction)
        })
        .await;

    match result {
        Ok(id) => {
            bar.finish();
            println!("Uploaded file id: {}", id);
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}

/// An explicit file is used as-is; a directory enumerates its files for
/// interactive selection.
fn resolve_local_source(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let files = ui::local_files(path)?;
    if files.is_empty() {
        bail!("{} contains no files", path.display());
    }
    let chosen = ui::select("Select the file to upload", &files, |p| {
        p.strip_prefix(path).unwrap_or(p).display().to_string()
    })?;
    Ok(chosen.clone())
}

/// An explicit folder id is used as-is; otherwise the visible folder tree is
/// enumerated for interactive selection, with the top level as the first
/// choice.
async fn resolve_destination(
    drive: &DriveClient,
    drive_path: Option<String>,
) -> Result<Option<String>> {
    if let Some(id) = drive_path {
        return Ok(Some(id));
    }

    let mut choices: Vec<(String, Option<String>)> =
        vec![("My Drive (top level)".to_string(), None)];
    for ListedEntry { entry, depth } in drive
        .walk(None)
        .await?
        .into_iter()
        .filter(|listed| listed.entry.is_folder())
    {
        choices.push((
            format!("{}{}/ ({})", "  ".repeat(depth), entry.name, entry.id),
            Some(entry.id),
        ));
    }

    let chosen = ui::select("Select the destination folder", &choices, |c| c.0.clone())?;
    Ok(chosen.1.clone())
}
