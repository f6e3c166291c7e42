//! Directory listing.
//!
//! Collects the files a directory contributes to a run: every regular file
//! underneath it, flattened to bare filenames and ordered by
//! [`naming::compare_names`](crate::naming::compare_names).
//!
//! ## Exclusions
//!
//! - Hidden paths: any file or directory whose name starts with `.` and is
//!   longer than one character (`.git/`, `.DS_Store`). Hidden directories are
//!   not descended into.
//! - The reserved index filename (`README.md` by default), which the index
//!   writer owns.
//! - Filenames that are not valid UTF-8 (logged and skipped).
//!
//! Subdirectory structure is not preserved: `a/x.md` and `x.md` both list as
//! `x.md`, and only the first occurrence is kept.

use crate::naming;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Listing {path}: {source}")]
    Walk {
        path: String,
        source: walkdir::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.len() > 1 && name.starts_with('.'))
}

/// List the files under `dir`, sorted in processing order.
///
/// `reserved` names a file to leave out (the index page).
pub fn list_files(dir: &Path, reserved: Option<&str>) -> Result<Vec<String>, ScanError> {
    if dir.exists() && !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.display().to_string()));
    }

    let mut files: Vec<String> = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.display().to_string(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!(
                dir = %dir.display(),
                file = %entry.path().display(),
                operation = "list",
                "skipping non UTF-8 filename"
            );
            continue;
        };
        if Some(name) == reserved {
            continue;
        }
        if files.iter().any(|f| f == name) {
            warn!(
                dir = %dir.display(),
                file = name,
                operation = "list",
                "duplicate filename in subdirectory, keeping first"
            );
            continue;
        }
        files.push(name.to_string());
    }

    naming::sort_names(&mut files);
    debug!(dir = %dir.display(), ?files, "listed directory");
    Ok(files)
}
