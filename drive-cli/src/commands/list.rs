//! `drivectl list` — recursive, indented listing.

use anyhow::Result;
use provider_google_drive::{DriveClient, EntryKind, ListedEntry};

use crate::args::ListArgs;

pub async fn run(drive: &DriveClient, args: ListArgs) -> Result<()> {
    let listing = drive.walk(args.drive_path.as_deref()).await?;

    if listing.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    for ListedEntry { entry, depth } in listing {
        let kind = match entry.kind {
            EntryKind::Folder => "folder",
            EntryKind::File => "file",
        };
        println!("{}{} ({}) - {}", "  ".repeat(depth), entry.name, entry.id, kind);
    }

    Ok(())
}
