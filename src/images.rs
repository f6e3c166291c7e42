//! Image relocation.
//!
//! Posts reference screenshots by number (`addimage 7`). The numbered source
//! file lives in the configured source directory and is moved next to the
//! posts under a name tied to the post, so that the source directory can be
//! emptied and reused:
//!
//! ```text
//! screenshots/Screenshot_7.png  →  ../images/setup_202401311542_7.png
//! └ img_src_dir/prefix N suffix     └ images/<post stem>_<timestamp>_N suffix
//! ```
//!
//! The destination directory is `images/`, a sibling of the posts directory.
//! Moves use `rename`, so a reference either moves completely or not at all.
//! Each reference fails independently: a missing source only affects the line
//! that named it.

use crate::config::Settings;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory, relative to a posts directory, that relocated images land in.
pub const IMAGES_DIR: &str = "../images";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Source image not found: {0}")]
    SourceMissing(PathBuf),
    #[error("Creating images directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Moving {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Source of the timestamps embedded in relocated image names.
pub trait Clock {
    /// Current time as `YYYYmmddHHMM`.
    fn timestamp(&self) -> String;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        Local::now().format("%Y%m%d%H%M").to_string()
    }
}

/// A clock that always reads the same time.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.clone()
    }
}

/// Source and destination of one image reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    /// Source file, relative to the run root.
    pub source: PathBuf,
    /// Destination on disk.
    pub destination: PathBuf,
    /// Destination as written into the post, relative to the post.
    pub link: String,
}

impl Relocation {
    /// Compute paths for image `number` referenced by `post_name`.
    ///
    /// `root` is the run root that `img_src_dir` is relative to; `post_dir`
    /// is the directory holding the post.
    pub fn plan(
        number: &str,
        timestamp: &str,
        post_name: &str,
        root: &Path,
        post_dir: &Path,
        settings: &Settings,
    ) -> Self {
        let images = &settings.images;
        let file_name = format!(
            "{}_{}_{}{}",
            post_stem(post_name),
            timestamp,
            number,
            images.suffix
        );
        let source = root
            .join(&images.src_dir)
            .join(format!("{}{}{}", images.prefix, number, images.suffix));
        Self {
            source,
            destination: post_dir.join(IMAGES_DIR).join(&file_name),
            link: format!("{IMAGES_DIR}/{file_name}"),
        }
    }

    /// Move the source image to its destination.
    pub fn apply(&self) -> Result<(), ImageError> {
        if !self.source.is_file() {
            return Err(ImageError::SourceMissing(self.source.clone()));
        }
        if let Some(dir) = self.destination.parent() {
            fs::create_dir_all(dir).map_err(|source| ImageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::rename(&self.source, &self.destination).map_err(|source| ImageError::Move {
            from: self.source.clone(),
            to: self.destination.clone(),
            source,
        })
    }
}

/// Post filename without its extension (`setup.md` → `setup`).
fn post_stem(post_name: &str) -> &str {
    Path::new(post_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(post_name)
}

/// Plan and perform the move for one image reference.
pub fn relocate(
    number: &str,
    timestamp: &str,
    post_name: &str,
    root: &Path,
    post_dir: &Path,
    settings: &Settings,
) -> Result<Relocation, ImageError> {
    let relocation = Relocation::plan(number, timestamp, post_name, root, post_dir, settings);
    relocation.apply()?;
    Ok(relocation)
}
