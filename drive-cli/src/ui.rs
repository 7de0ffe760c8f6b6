//! Interactive prompts, progress rendering, and local file enumeration.

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Keyboard-navigable selection over enumerated choices.
pub fn select<'a, T>(
    prompt: &str,
    items: &'a [T],
    render: impl Fn(&T) -> String,
) -> Result<&'a T> {
    if items.is_empty() {
        bail!("nothing to select from");
    }

    let labels: Vec<String> = items.iter().map(render).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(&items[index])
}

/// A percentage bar for one chunked transfer.
pub fn transfer_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {percent:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(label.to_string());
    bar
}

/// Map a transfer fraction in `[0, 1]` onto the bar.
pub fn set_fraction(bar: &ProgressBar, fraction: f64) {
    bar.set_position((fraction * 100.0).round() as u64);
}

/// Every file under `root`, found with an explicit worklist so deeply nested
/// directories cannot exhaust the stack.
pub fn local_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
