//! Shared test utilities for the postchain test suite.
//!
//! Provides a throwaway site layout (run root, posts directories, numbered
//! source images) and lookup helpers over [`TitleMap`] and reports.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::new();
//! site.write_post("posts", "1_a.md", "# A\n");
//! site.source_image(7);
//!
//! let report = process_directory(site.root(), Path::new("posts"), &site.settings, &clock());
//! assert_eq!(report_files(&report), vec!["1_a.md"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{Settings, parse_settings};
use crate::images::FixedClock;
use crate::pipeline::{DirectoryReport, PostReport};
use crate::types::TitleMap;

// =========================================================================
// Fixture setup
// =========================================================================

/// Config used by every fixture: one `posts` directory, images under `shots`.
pub const TEST_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <include_dir>
    <item>posts</item>
  </include_dir>
  <img>
    <img_src_dir>shots</img_src_dir>
    <img_src_prefix>Screenshot_</img_src_prefix>
    <img_src_suffix>.png</img_src_suffix>
    <delete_ori_img_regex>Screenshot_\d+</delete_ori_img_regex>
  </img>
</config>
"#;

/// Timestamp every fixture clock reports.
pub const TEST_TIMESTAMP: &str = "202401311542";

pub fn test_settings() -> Settings {
    parse_settings(TEST_CONFIG).unwrap()
}

pub fn clock() -> FixedClock {
    FixedClock(TEST_TIMESTAMP.to_string())
}

/// A run root in a temp directory, with settings from [`TEST_CONFIG`].
pub struct TestSite {
    tmp: TempDir,
    pub settings: Settings,
}

impl TestSite {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("shots")).unwrap();
        Self {
            tmp,
            settings: test_settings(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Create (if needed) and return a posts directory.
    pub fn posts_dir(&self, dir: &str) -> PathBuf {
        let path = self.root().join(dir);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write_post(&self, dir: &str, name: &str, content: &str) -> PathBuf {
        let path = self.posts_dir(dir).join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Create numbered source image `shots/Screenshot_<n>.png`.
    pub fn source_image(&self, number: u32) -> PathBuf {
        let path = self
            .root()
            .join("shots")
            .join(format!("Screenshot_{number}.png"));
        fs::write(&path, format!("image {number}")).unwrap();
        path
    }

    pub fn write_config(&self) -> PathBuf {
        let path = self.root().join("config.xml");
        fs::write(&path, TEST_CONFIG).unwrap();
        path
    }

    /// Read a file relative to the run root. Panics with the path on failure.
    pub fn read(&self, rel: &str) -> String {
        let path = self.root().join(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }
}

// =========================================================================
// Lookups and extractors
// =========================================================================

/// Filenames in title map order.
pub fn map_files(map: &TitleMap) -> Vec<&str> {
    map.iter().map(|(f, _)| f).collect()
}

/// Display titles in title map order.
pub fn map_titles(map: &TitleMap) -> Vec<&str> {
    map.iter().map(|(_, t)| t).collect()
}

/// Filenames in a directory report, in processing order.
pub fn report_files(report: &DirectoryReport) -> Vec<&str> {
    report.posts.iter().map(|p| p.file.as_str()).collect()
}

/// Find a post in a directory report. Panics if not found.
pub fn find_post<'a>(report: &'a DirectoryReport, file: &str) -> &'a PostReport {
    report
        .posts
        .iter()
        .find(|p| p.file == file)
        .unwrap_or_else(|| {
            let files = report_files(report);
            panic!("post '{file}' not found. Available: {files:?}")
        })
}
