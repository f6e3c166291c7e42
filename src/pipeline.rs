//! Run orchestration.
//!
//! A run walks the configured directories one at a time:
//!
//! ```text
//! for each include_dir:
//!     list      scan::list_files          (processing order)
//!     pass 1    rewrite::rewrite_post     (per post, builds the TitleMap)
//!     pass 2    nav::append_nav           (per post, reads the TitleMap)
//!     index     index::write_index
//! sweep         delete leftover source images matching delete_ori_img_regex
//! ```
//!
//! Failures are isolated as narrowly as possible. A bad image reference only
//! affects its line, a bad post only itself, an unwritable index only its
//! directory. Everything is logged and collected into a [`RunReport`].
//! Configuration and listing errors abort the run.

use crate::config::{ConfigError, Settings};
use crate::images::{Clock, ImageError, Relocation};
use crate::index;
use crate::nav::{self, NavLinks};
use crate::rewrite::{self, ImageOutcome, PostContext, Rewrite};
use crate::scan::{self, ScanError};
use crate::types::TitleMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Directory {dir}: {source}")]
    Scan { dir: PathBuf, source: ScanError },
}

/// One image reference in a post.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub line: usize,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ImageOutcome> for ImageReport {
    fn from(outcome: ImageOutcome) -> Self {
        let (link, error) = match outcome.result {
            Ok(link) => (Some(link), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            line: outcome.line,
            number: outcome.number,
            link,
            error,
        }
    }
}

/// What happened to one post.
#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageReport>,
    /// Line of the parent marker the post was cut at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<NavLinks>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl PostReport {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            title: None,
            images: Vec::new(),
            truncated_at: None,
            links: None,
            errors: Vec::new(),
        }
    }

    fn record_rewrite(&mut self, rewrite: Rewrite) {
        let Rewrite {
            title,
            images,
            truncated_at,
            ..
        } = rewrite;
        self.title = title.ok();
        self.images = images.into_iter().map(ImageReport::from).collect();
        self.truncated_at = truncated_at;
    }
}

/// What happened to one include directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    /// Directory as configured, relative to the run root.
    pub dir: PathBuf,
    pub label: String,
    /// Posts in processing order.
    pub posts: Vec<PostReport>,
    /// Index page written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<PathBuf>,
    /// Directory-level failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Leftover source images removed at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub deleted: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub directories: Vec<DirectoryReport>,
    pub sweep: SweepReport,
}

impl RunReport {
    /// Failures at every level: posts, images, directories, sweep.
    pub fn error_count(&self) -> usize {
        let dirs: usize = self
            .directories
            .iter()
            .map(|d| {
                d.errors.len()
                    + d.posts
                        .iter()
                        .map(|p| p.errors.len() + p.images.iter().filter(|i| i.error.is_some()).count())
                        .sum::<usize>()
            })
            .sum();
        dirs + self.sweep.failed.len()
    }

    /// Whether any directory failed as a whole (e.g. its index).
    pub fn has_directory_errors(&self) -> bool {
        self.directories.iter().any(|d| !d.errors.is_empty())
    }
}

fn list_posts(root: &Path, dir: &Path, settings: &Settings) -> Result<Vec<String>, PipelineError> {
    scan::list_files(&root.join(dir), Some(settings.output.index_file.as_str())).map_err(|source| {
        PipelineError::Scan {
            dir: dir.to_path_buf(),
            source,
        }
    })
}

/// Rewrite, link, and index one directory.
pub fn process_directory(
    root: &Path,
    dir: &Path,
    settings: &Settings,
    clock: &dyn Clock,
) -> Result<DirectoryReport, PipelineError> {
    let files = list_posts(root, dir, settings)?;
    info!(dir = %dir.display(), posts = files.len(), "processing directory");

    let ctx = PostContext {
        root,
        dir,
        settings,
        clock,
    };
    let posts_dir = ctx.posts_dir();
    let mut titles = TitleMap::new();
    let mut posts: Vec<PostReport> = files.iter().map(|f| PostReport::new(f)).collect();

    for post in &mut posts {
        match rewrite::rewrite_post(&ctx, &post.file, &mut titles) {
            Ok(rewrite) => post.record_rewrite(rewrite),
            Err(e) => {
                error!(
                    dir = %dir.display(),
                    file = %post.file,
                    operation = "rewrite",
                    "{e}"
                );
                post.errors.push(e.to_string());
            }
        }
    }

    for post in &mut posts {
        match nav::append_nav(&posts_dir, &post.file, &titles, settings) {
            Ok(links) => post.links = Some(links),
            Err(e) => {
                error!(
                    dir = %dir.display(),
                    file = %post.file,
                    operation = "link",
                    "{e}"
                );
                post.errors.push(e.to_string());
            }
        }
    }

    for post in posts.iter_mut().filter(|p| !titles.contains(&p.file)) {
        warn!(
            dir = %dir.display(),
            file = %post.file,
            operation = "index",
            "left out of the index: post was not rewritten"
        );
        post.errors
            .push(format!("Not indexed: {} was not rewritten", post.file));
    }

    let label = settings.category_label(dir);
    let index_path = posts_dir.join(&settings.output.index_file);
    let mut errors = Vec::new();
    let index = match index::write_index(&index_path, &label, &titles, settings) {
        Ok(()) => Some(dir.join(&settings.output.index_file)),
        Err(e) => {
            error!(dir = %dir.display(), operation = "index", "{e}");
            errors.push(e.to_string());
            None
        }
    };

    Ok(DirectoryReport {
        dir: dir.to_path_buf(),
        label,
        posts,
        index,
        errors,
    })
}

/// Report what [`process_directory`] would do, without touching anything.
///
/// Image links are previewed with the clock's current timestamp; references
/// whose source image is missing are reported as errors.
pub fn plan_directory(
    root: &Path,
    dir: &Path,
    settings: &Settings,
    clock: &dyn Clock,
) -> Result<DirectoryReport, PipelineError> {
    let files = list_posts(root, dir, settings)?;
    let posts_dir = root.join(dir);
    let mut titles = TitleMap::new();
    let mut posts = Vec::with_capacity(files.len());

    for file in &files {
        let mut post = PostReport::new(file);
        match fs::read_to_string(posts_dir.join(file)) {
            Ok(content) => {
                let rewrite = rewrite::rewrite_text(&content, settings, |number| {
                    let plan = Relocation::plan(
                        number,
                        &clock.timestamp(),
                        file,
                        root,
                        &posts_dir,
                        settings,
                    );
                    if plan.source.is_file() {
                        Ok(plan.link)
                    } else {
                        Err(ImageError::SourceMissing(plan.source))
                    }
                });
                titles.insert(file.as_str(), rewrite.title.as_ref().ok().cloned());
                post.record_rewrite(rewrite);
            }
            Err(e) => post.errors.push(format!("Reading post: {e}")),
        }
        posts.push(post);
    }

    for post in &mut posts {
        match nav::nav_links(&post.file, &titles) {
            Ok(links) => post.links = Some(links),
            Err(e) => post.errors.push(e.to_string()),
        }
    }

    Ok(DirectoryReport {
        dir: dir.to_path_buf(),
        label: settings.category_label(dir),
        posts,
        index: None,
        errors: Vec::new(),
    })
}

/// Delete source images matching `delete_ori_img_regex`.
///
/// A missing source directory is treated as empty.
pub fn sweep_source_images(root: &Path, settings: &Settings) -> Result<SweepReport, PipelineError> {
    let src_dir = root.join(&settings.images.src_dir);
    let mut report = SweepReport::default();
    if !src_dir.exists() {
        debug!(dir = %src_dir.display(), "no source image directory to sweep");
        return Ok(report);
    }

    let images = scan::list_files(&src_dir, None).map_err(|source| PipelineError::Scan {
        dir: settings.images.src_dir.clone(),
        source,
    })?;

    for image in images
        .iter()
        .filter(|name| settings.images.delete_pattern.is_match(name))
    {
        let path = src_dir.join(image);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %path.display(), "deleted source image");
                report.deleted.push(settings.images.src_dir.join(image));
            }
            Err(e) => {
                warn!(
                    dir = %src_dir.display(),
                    file = %image,
                    operation = "delete_source_image",
                    "{e}"
                );
                report.failed.push(format!("{}: {e}", path.display()));
            }
        }
    }
    Ok(report)
}

/// Process every configured directory, then sweep source images.
pub fn run(root: &Path, settings: &Settings, clock: &dyn Clock) -> Result<RunReport, PipelineError> {
    if settings.include_dirs.is_empty() {
        warn!("config lists no include_dir items");
    }
    let mut directories = Vec::with_capacity(settings.include_dirs.len());
    for dir in &settings.include_dirs {
        directories.push(process_directory(root, dir, settings, clock)?);
    }
    let sweep = sweep_source_images(root, settings)?;
    info!(
        directories = directories.len(),
        deleted_images = sweep.deleted.len(),
        "run complete"
    );
    Ok(RunReport { directories, sweep })
}

/// Plan every configured directory without modifying anything.
pub fn plan(root: &Path, settings: &Settings, clock: &dyn Clock) -> Result<Vec<DirectoryReport>, PipelineError> {
    settings
        .include_dirs
        .iter()
        .map(|dir| plan_directory(root, dir, settings, clock))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn three_posts(site: &TestSite) {
        site.write_post("posts", "2_post.md", "# Title 2\nbody two\n");
        site.write_post("posts", "1_post.md", "# Title 1\nbody one\n");
        site.write_post("posts", "post.md", "# Title 3\nbody three\n");
    }

    #[test]
    fn processes_in_natural_order() {
        let site = TestSite::new();
        three_posts(&site);

        let report =
            process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        assert_eq!(report_files(&report), vec!["1_post.md", "2_post.md", "post.md"]);
        assert_eq!(find_post(&report, "1_post.md").title.as_deref(), Some("Title 1"));
    }

    #[test]
    fn links_neighbours_and_writes_index() {
        let site = TestSite::new();
        three_posts(&site);

        process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        assert_eq!(
            site.read("posts/1_post.md"),
            "# Title 1\nbody one\n[上一级](README.md)\n[下一篇](2_post.md)\n"
        );
        assert_eq!(
            site.read("posts/2_post.md"),
            "# Title 2\nbody two\n[上一级](README.md)\n[上一篇](1_post.md)\n[下一篇](post.md)\n"
        );
        assert_eq!(
            site.read("posts/post.md"),
            "# Title 3\nbody three\n[上一级](README.md)\n[上一篇](2_post.md)\n"
        );
        assert_eq!(
            site.read("posts/README.md"),
            "# Categories posts\n\
             * ## [home](../README.md)\n\
             * ### [Title 1](1_post.md)\n\
             * ### [Title 2](2_post.md)\n\
             * ### [Title 3](post.md)\n"
        );
    }

    #[test]
    fn rerun_replaces_old_links() {
        let site = TestSite::new();
        three_posts(&site);
        let dir = Path::new("posts");

        process_directory(site.root(), dir, &site.settings, &clock()).unwrap();
        let first = site.read("posts/2_post.md");
        process_directory(site.root(), dir, &site.settings, &clock()).unwrap();

        assert_eq!(site.read("posts/2_post.md"), first);
    }

    #[test]
    fn new_post_relinks_neighbours() {
        let site = TestSite::new();
        site.write_post("posts", "1_a.md", "# A\n");
        site.write_post("posts", "3_c.md", "# C\n");
        let dir = Path::new("posts");
        process_directory(site.root(), dir, &site.settings, &clock()).unwrap();

        site.write_post("posts", "2_b.md", "# B\n");
        process_directory(site.root(), dir, &site.settings, &clock()).unwrap();

        assert_eq!(
            site.read("posts/1_a.md"),
            "# A\n[上一级](README.md)\n[下一篇](2_b.md)\n"
        );
    }

    #[test]
    fn single_post_gets_parent_link_only() {
        let site = TestSite::new();
        site.write_post("posts", "only.md", "# Only\n");

        let report =
            process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        assert_eq!(site.read("posts/only.md"), "# Only\n[上一级](README.md)\n");
        assert_eq!(
            find_post(&report, "only.md").links,
            Some(NavLinks::default())
        );
    }

    #[test]
    fn relocates_images_and_reports_missing_ones() {
        let site = TestSite::new();
        site.write_post("posts", "1_a.md", "# A\naddimage 1\naddimage 2\n");
        site.source_image(1);

        let report =
            process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        let post = find_post(&report, "1_a.md");
        assert_eq!(post.images.len(), 2);
        assert!(post.images[0].error.is_none());
        assert!(post.images[1].error.is_some());
        assert_eq!(
            site.read("posts/1_a.md"),
            format!(
                "# A\n![](../images/1_a_{TEST_TIMESTAMP}_1.png)\naddimage 2\n[上一级](README.md)\n"
            )
        );
        assert_eq!(
            RunReport {
                directories: vec![report],
                sweep: SweepReport::default()
            }
            .error_count(),
            1
        );
    }

    #[test]
    fn unreadable_post_fails_alone() {
        let site = TestSite::new();
        site.write_post("posts", "1_a.md", "# A\n");
        site.write_post("posts", "3_c.md", "# C\n");
        // Invalid UTF-8 cannot be read as text.
        fs::write(site.root().join("posts/2_bad.md"), b"\xff\xfe\x00").unwrap();

        let report =
            process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        let bad = find_post(&report, "2_bad.md");
        assert_eq!(
            bad.errors.len(),
            3,
            "rewrite, link and index all fail: {:?}",
            bad.errors
        );
        assert!(bad.errors[2].starts_with("Not indexed: 2_bad.md"));
        assert_eq!(
            site.read("posts/1_a.md"),
            "# A\n[上一级](README.md)\n[下一篇](3_c.md)\n"
        );
        assert!(!site.read("posts/README.md").contains("2_bad.md"));
        assert_eq!(
            fs::read(site.root().join("posts/2_bad.md")).unwrap(),
            b"\xff\xfe\x00"
        );
    }

    #[test]
    fn untitled_post_indexed_by_filename() {
        let site = TestSite::new();
        site.write_post("posts", "notes.md", "plain text\n");

        process_directory(site.root(), Path::new("posts"), &site.settings, &clock()).unwrap();

        assert!(site.read("posts/README.md").contains("* ### [notes.md](notes.md)\n"));
    }

    #[test]
    fn missing_directory_aborts() {
        let site = TestSite::new();
        let result = process_directory(site.root(), Path::new("nope"), &site.settings, &clock());
        assert!(matches!(result, Err(PipelineError::Scan { .. })));
    }

    #[test]
    fn sweep_deletes_matching_sources_only() {
        let site = TestSite::new();
        site.source_image(4);
        fs::write(site.root().join("shots/keep.png"), "x").unwrap();

        let sweep = sweep_source_images(site.root(), &site.settings).unwrap();

        assert_eq!(sweep.deleted, vec![PathBuf::from("shots/Screenshot_4.png")]);
        assert!(!site.exists("shots/Screenshot_4.png"));
        assert!(site.exists("shots/keep.png"));
    }

    #[test]
    fn sweep_without_source_dir_is_empty() {
        let site = TestSite::new();
        fs::remove_dir(site.root().join("shots")).unwrap();
        let sweep = sweep_source_images(site.root(), &site.settings).unwrap();
        assert!(sweep.deleted.is_empty());
    }

    #[test]
    fn plan_changes_nothing() {
        let site = TestSite::new();
        three_posts(&site);
        site.write_post("posts", "4_img.md", "# Img\naddimage 9\naddimage 5\n");
        site.source_image(9);

        let plans = plan(site.root(), &site.settings, &clock()).unwrap();

        let report = &plans[0];
        assert_eq!(
            report_files(report),
            vec!["1_post.md", "2_post.md", "4_img.md", "post.md"]
        );
        let img = find_post(report, "4_img.md");
        assert!(img.images[0].error.is_none());
        assert!(img.images[1].error.is_some());
        assert_eq!(
            find_post(report, "2_post.md").links.as_ref().unwrap().next.as_deref(),
            Some("4_img.md")
        );
        assert_eq!(site.read("posts/1_post.md"), "# Title 1\nbody one\n");
        assert!(site.exists("shots/Screenshot_9.png"));
        assert!(!site.exists("posts/README.md"));
    }

    #[test]
    fn run_processes_all_dirs_then_sweeps() {
        let site = TestSite::new();
        three_posts(&site);
        site.write_post("posts", "5_img.md", "# Img\naddimage 3\n");
        site.source_image(3);
        site.source_image(8);

        let report = run(site.root(), &site.settings, &clock()).unwrap();

        assert_eq!(report.directories.len(), 1);
        assert_eq!(report.error_count(), 0);
        assert!(site.exists(&format!("images/5_img_{TEST_TIMESTAMP}_3.png")));
        assert_eq!(
            report.sweep.deleted,
            vec![PathBuf::from("shots/Screenshot_8.png")]
        );
    }

    #[test]
    fn run_from_config_on_disk() {
        let site = TestSite::new();
        site.write_post("posts", "1_a.md", "# A\n");
        let settings = crate::config::load_settings(&site.write_config()).unwrap();

        let report = run(site.root(), &settings, &clock()).unwrap();

        assert_eq!(report_files(&report.directories[0]), vec!["1_a.md"]);
        assert_eq!(
            report.directories[0].index,
            Some(PathBuf::from("posts/README.md"))
        );
    }
}
