//! Previous/next navigation links.
//!
//! Second pass over a directory. Once every post is rewritten and the
//! directory's [`TitleMap`] is complete, each post gets a footer appended:
//!
//! ```text
//! [上一级](README.md)      always: back to the directory index
//! [上一篇](1_intro.md)     unless this is the first post
//! [下一篇](3_deploy.md)    unless this is the last post
//! ```
//!
//! Neighbours are positions in the title map, which is processing order.
//! The footer starts with the parent marker, so the next run's rewrite pass
//! strips it before new links are appended.

use crate::config::Settings;
use crate::types::TitleMap;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("{0} is not in the title map")]
    NotInTitleMap(String),
    #[error("Appending links to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Neighbours of one post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Work out a post's neighbours from its position in `titles`.
pub fn nav_links(file: &str, titles: &TitleMap) -> Result<NavLinks, NavError> {
    let pos = titles
        .position(file)
        .ok_or_else(|| NavError::NotInTitleMap(file.to_string()))?;
    let prev = pos
        .checked_sub(1)
        .and_then(|i| titles.file_at(i))
        .map(str::to_string);
    let next = titles.file_at(pos + 1).map(str::to_string);
    Ok(NavLinks { prev, next })
}

/// Footer text for a post.
pub fn format_nav(links: &NavLinks, settings: &Settings) -> String {
    let out = &settings.output;
    let eol = &out.end_of_line;
    let mut text = format!("[{}]({}){eol}", out.parent_text, out.index_file);
    if let Some(prev) = &links.prev {
        text.push_str(&format!("[{}]({prev}){eol}", out.prev_text));
    }
    if let Some(next) = &links.next {
        text.push_str(&format!("[{}]({next}){eol}", out.next_text));
    }
    text
}

/// Append the navigation footer to post `file` in `posts_dir`.
///
/// The post must already exist. A line break is added first when the post
/// does not end with one.
pub fn append_nav(
    posts_dir: &Path,
    file: &str,
    titles: &TitleMap,
    settings: &Settings,
) -> Result<NavLinks, NavError> {
    let links = nav_links(file, titles)?;
    let path = posts_dir.join(file);
    let io_err = |source| NavError::Io {
        path: path.clone(),
        source,
    };

    let needs_break = fs::read(&path)
        .map_err(io_err)?
        .last()
        .is_some_and(|b| *b != b'\n');

    let mut footer = String::new();
    if needs_break {
        footer.push_str(&settings.output.end_of_line);
    }
    footer.push_str(&format_nav(&links, settings));

    let mut post = OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(io_err)?;
    post.write_all(footer.as_bytes()).map_err(io_err)?;
    Ok(links)
}
