//! Post rewriting.
//!
//! First of the two passes over a directory. Each post is read once, line by
//! line, through a small state machine:
//!
//! ```text
//! SeekingTitle ──first line──▶ Body ──parent marker──▶ Done
//! ```
//!
//! - **SeekingTitle**: only the first line is a title candidate. A heading
//!   line (`# Setting up`) is kept verbatim and its text becomes the post's
//!   title. Any other first line is handled as a body line.
//! - **Body**: image embed lines (`addimage 7`) are replaced by a link to the
//!   relocated image. Everything else is copied verbatim, line endings
//!   included.
//! - **Done**: reached on the first line containing the parent marker
//!   (`[上一级]`). That line and the rest of the file are dropped, which strips
//!   the navigation links a previous run appended.
//!
//! The rewritten text replaces the post through [`write_atomic`], so an
//! interrupted run never leaves a post half-written.

use crate::atomic::write_atomic;
use crate::config::{Patterns, Settings};
use crate::images::{self, Clock, ImageError};
use crate::types::TitleMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Reading post {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Writing post {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a post has no title.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TitleError {
    #[error("first line is not a heading")]
    NotAHeading,
    #[error("heading has no title text")]
    NoTitleText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingTitle,
    Body,
    Done,
}

/// One image reference met while rewriting.
#[derive(Debug)]
pub struct ImageOutcome {
    /// 1-based line number in the original post.
    pub line: usize,
    pub number: String,
    /// Link written into the post, or why the line was left alone.
    pub result: Result<String, ImageError>,
}

/// Result of rewriting one post's text.
#[derive(Debug)]
pub struct Rewrite {
    pub output: String,
    pub title: Result<String, TitleError>,
    pub images: Vec<ImageOutcome>,
    /// 1-based line number of the parent marker, when the post was truncated.
    pub truncated_at: Option<usize>,
}

fn capture_title(line: &str, patterns: &Patterns) -> Result<String, TitleError> {
    patterns
        .title
        .find(line)
        .map(|m| m.as_str().trim_end().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(TitleError::NoTitleText)
}

/// Rewrite a post's text.
///
/// `relocate` is called with the image number of each embed line and returns
/// the link to write in its place.
pub fn rewrite_text<F>(content: &str, settings: &Settings, mut relocate: F) -> Rewrite
where
    F: FnMut(&str) -> Result<String, ImageError>,
{
    let patterns = &settings.patterns;
    let eol = &settings.output.end_of_line;
    let marker = settings.output.parent_marker();

    let mut state = State::SeekingTitle;
    let mut title = Err(TitleError::NotAHeading);
    let mut images = Vec::new();
    let mut truncated_at = None;
    let mut output = String::with_capacity(content.len());

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let text = line.trim_end_matches(['\n', '\r']);

        if state == State::SeekingTitle {
            state = State::Body;
            if patterns.heading.is_match(text) {
                title = capture_title(text, patterns);
                output.push_str(line);
                continue;
            }
        }

        if patterns.image_embed.is_match(text) {
            if let Some(number) = patterns.image_number.find(text) {
                let number = number.as_str().to_string();
                let result = relocate(&number);
                let replaced = match &result {
                    Ok(link) => {
                        output.push_str(&format!("![]({link}){eol}"));
                        true
                    }
                    Err(_) => false,
                };
                images.push(ImageOutcome {
                    line: index + 1,
                    number,
                    result,
                });
                if replaced {
                    continue;
                }
            }
        }

        if text.contains(&marker) {
            state = State::Done;
            truncated_at = Some(index + 1);
        }
        if state == State::Done {
            break;
        }
        output.push_str(line);
    }

    Rewrite {
        output,
        title,
        images,
        truncated_at,
    }
}

/// Where a post lives and what it may touch.
pub struct PostContext<'a> {
    /// Run root; image sources are relative to it.
    pub root: &'a Path,
    /// Posts directory as configured (used in logs).
    pub dir: &'a Path,
    pub settings: &'a Settings,
    pub clock: &'a dyn Clock,
}

impl PostContext<'_> {
    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(self.dir)
    }
}

/// Rewrite post `name` on disk and record it in `titles`.
///
/// Failed image references are logged and left as they were. The post is only
/// recorded once its rewritten content is safely on disk.
pub fn rewrite_post(
    ctx: &PostContext<'_>,
    name: &str,
    titles: &mut TitleMap,
) -> Result<Rewrite, RewriteError> {
    let posts_dir = ctx.posts_dir();
    let path = posts_dir.join(name);
    let content = fs::read_to_string(&path).map_err(|source| RewriteError::Read {
        path: path.clone(),
        source,
    })?;

    let rewrite = rewrite_text(&content, ctx.settings, |number| {
        let timestamp = ctx.clock.timestamp();
        images::relocate(number, &timestamp, name, ctx.root, &posts_dir, ctx.settings)
            .map(|r| r.link)
    });

    for image in &rewrite.images {
        match &image.result {
            Ok(link) => debug!(
                dir = %ctx.dir.display(),
                file = name,
                line = image.line,
                %link,
                "relocated image"
            ),
            Err(e) => warn!(
                dir = %ctx.dir.display(),
                file = name,
                line = image.line,
                operation = "relocate_image",
                "image {} left in place: {e}",
                image.number
            ),
        }
    }

    write_atomic(&path, rewrite.output.as_bytes())
        .map_err(|source| RewriteError::Write { path, source })?;

    if let Err(e) = &rewrite.title {
        warn!(
            dir = %ctx.dir.display(),
            file = name,
            operation = "capture_title",
            "no title captured: {e}"
        );
    }
    titles.insert(name, rewrite.title.as_ref().ok().cloned());
    Ok(rewrite)
}
