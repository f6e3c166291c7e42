//! Per-directory index page.
//!
//! Written after every post in a directory is linked:
//!
//! ```text
//! # Categories linux
//! * ## [home](../README.md)
//! * ### [Installing Arch](1_install.md)
//! * ### [Setting up X](2_xorg.md)
//! ```
//!
//! Entries follow title map order. A post without a captured title is listed
//! under its filename.

use crate::atomic::write_atomic;
use crate::config::Settings;
use crate::types::TitleMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Writing index {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render the index page for `titles`.
pub fn format_index(label: &str, titles: &TitleMap, settings: &Settings) -> String {
    let out = &settings.output;
    let eol = &out.end_of_line;
    let mut page = format!("# Categories {label}{eol}");
    page.push_str(&format!("* ## [home]({}){eol}", out.home_link));
    for (file, title) in titles.iter() {
        page.push_str(&format!("* ### [{title}]({file}){eol}"));
    }
    if let Some(footer) = &out.index_footer {
        page.push_str(footer);
    }
    page
}

/// Write the index page to `path`, replacing any existing file.
pub fn write_index(
    path: &Path,
    label: &str,
    titles: &TitleMap,
    settings: &Settings,
) -> Result<(), IndexError> {
    let page = format_index(label, titles, settings);
    write_atomic(path, page.as_bytes()).map_err(|source| IndexError::Write {
        path: path.to_path_buf(),
        source,
    })
}
