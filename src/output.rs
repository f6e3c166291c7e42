//! CLI output formatting for runs and plans.
//!
//! # Information-First Display
//!
//! Each post is shown by its positional index and title, with the filename
//! and what happened to it as indented context lines:
//!
//! ```text
//! linux (3 posts)
//! 001 Installing Arch
//!     Source: 1_install.md
//!     Image 7 → ../images/1_install_202401311542_7.png
//!     Next: 2_xorg.md
//! 002 (notes.md)
//!     Source: notes.md
//!     Previous: 1_install.md
//! Index → linux/README.md
//!
//! Sweep
//!     Deleted: shots/Screenshot_8.png
//!
//! Processed 1 directory, 3 posts, 1 image, 0 errors
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and are pure; `print_*`
//! wrappers write them to stdout.

use crate::pipeline::{DirectoryReport, PostReport, RunReport, SweepReport};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Header line for a post: titled posts show their title, untitled ones
/// their filename in parens.
///
/// ```text
/// 001 Installing Arch
/// 002 (notes.md)
/// ```
fn post_header(index: usize, post: &PostReport) -> String {
    match &post.title {
        Some(t) if !t.is_empty() => format!("{} {}", format_index(index), t),
        _ => format!("{} ({})", format_index(index), post.file),
    }
}

fn post_lines(index: usize, post: &PostReport) -> Vec<String> {
    let ctx = indent(1);
    let mut lines = vec![post_header(index, post)];
    lines.push(format!("{ctx}Source: {}", post.file));

    for image in &post.images {
        match (&image.link, &image.error) {
            (Some(link), _) => lines.push(format!("{ctx}Image {} \u{2192} {link}", image.number)),
            (None, Some(e)) => lines.push(format!("{ctx}Image {}: {e}", image.number)),
            (None, None) => lines.push(format!("{ctx}Image {}", image.number)),
        }
    }
    if let Some(line) = post.truncated_at {
        lines.push(format!("{ctx}Cut at line {line}"));
    }
    if let Some(links) = &post.links {
        if let Some(prev) = &links.prev {
            lines.push(format!("{ctx}Previous: {prev}"));
        }
        if let Some(next) = &links.next {
            lines.push(format!("{ctx}Next: {next}"));
        }
    }
    for e in &post.errors {
        lines.push(format!("{ctx}Error: {e}"));
    }
    lines
}

// ============================================================================
// Directories
// ============================================================================

/// Format one directory: header, posts in processing order, index.
pub fn format_directory(report: &DirectoryReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        report.dir.display(),
        plural(report.posts.len(), "post", "posts")
    )];
    for (i, post) in report.posts.iter().enumerate() {
        lines.extend(post_lines(i + 1, post));
    }
    if let Some(index) = &report.index {
        lines.push(format!("Index \u{2192} {}", index.display()));
    }
    for e in &report.errors {
        lines.push(format!("Error: {e}"));
    }
    lines
}

fn format_sweep(sweep: &SweepReport) -> Vec<String> {
    if sweep.deleted.is_empty() && sweep.failed.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Sweep".to_string()];
    for path in &sweep.deleted {
        lines.push(format!("{}Deleted: {}", indent(1), path.display()));
    }
    for e in &sweep.failed {
        lines.push(format!("{}Error: {e}", indent(1)));
    }
    lines
}

// ============================================================================
// Run and plan
// ============================================================================

/// Format a full run: every directory, the sweep, and a summary line.
pub fn format_run_output(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();
    for dir in &report.directories {
        lines.extend(format_directory(dir));
        lines.push(String::new());
    }
    let sweep = format_sweep(&report.sweep);
    if !sweep.is_empty() {
        lines.extend(sweep);
        lines.push(String::new());
    }

    let posts: usize = report.directories.iter().map(|d| d.posts.len()).sum();
    let images: usize = report
        .directories
        .iter()
        .flat_map(|d| &d.posts)
        .map(|p| p.images.iter().filter(|i| i.link.is_some()).count())
        .sum();
    lines.push(format!(
        "Processed {}, {}, {}, {}",
        plural(report.directories.len(), "directory", "directories"),
        plural(posts, "post", "posts"),
        plural(images, "image", "images"),
        plural(report.error_count(), "error", "errors"),
    ));
    lines
}

/// Print run output to stdout.
pub fn print_run_output(report: &RunReport) {
    for line in format_run_output(report) {
        println!("{}", line);
    }
}

/// Format a dry-run plan.
pub fn format_plan_output(plans: &[DirectoryReport]) -> Vec<String> {
    let mut lines = Vec::new();
    for plan in plans {
        lines.extend(format_directory(plan));
        lines.push(String::new());
    }
    let posts: usize = plans.iter().map(|d| d.posts.len()).sum();
    lines.push(format!(
        "Would process {}, {}",
        plural(plans.len(), "directory", "directories"),
        plural(posts, "post", "posts")
    ));
    lines
}

/// Print plan output to stdout.
pub fn print_plan_output(plans: &[DirectoryReport]) {
    for line in format_plan_output(plans) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
