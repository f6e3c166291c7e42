//! # postchain
//!
//! Turns directories of markdown blog posts into a linked, navigable set.
//! Posts are ordered by numeric filename prefix, their screenshots are moved
//! into a shared `images/` directory under stable names, each post gets
//! previous/next links, and each directory gets an index page.
//!
//! # Architecture: Two Passes Per Directory
//!
//! ```text
//! config.xml ─▶ Settings
//!
//! for each include_dir:
//!   list      1_intro.md, 2_setup.md, notes.md      (numeric-prefix order)
//!   pass 1    rewrite every post                    → TitleMap
//!   pass 2    append prev/next links to every post  ← TitleMap
//!   index     README.md listing every post          ← TitleMap
//!
//! sweep leftover source images
//! ```
//!
//! Links can only be written once every post in the directory has been
//! rewritten, because a post's neighbours and their titles come from the
//! complete [`types::TitleMap`]. The map lives for one directory only.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | XML config loading into immutable [`config::Settings`] |
//! | [`naming`] | `NNN_name` numeric-prefix ordering |
//! | [`scan`] | Directory listing in processing order |
//! | [`images`] | Numbered image relocation and timestamp clocks |
//! | [`rewrite`] | Pass 1: title capture, image substitution, footer stripping |
//! | [`nav`] | Pass 2: previous/next links |
//! | [`index`] | Per-directory index page |
//! | [`pipeline`] | Orchestration, dry-run planning, run reports |
//! | [`output`] | CLI output formatting of reports |
//! | [`types`] | [`types::TitleMap`], shared across passes |
//!
//! # Re-runs
//!
//! The footer appended in pass 2 starts with the parent marker (`[上一级]`),
//! and pass 1 cuts a post at that marker. Running twice over the same tree
//! therefore replaces the links instead of stacking them, and a newly added
//! post shows up in its neighbours' links on the next run.
//!
//! # Failure Isolation
//!
//! A missing screenshot leaves its line untouched, an unreadable post is
//! skipped along with its links, and neither stops the rest of the
//! directory. Posts are replaced through a temp file and rename, so an
//! interrupted run never leaves a post half-written. Only configuration and
//! directory listing errors end a run early.

pub mod atomic;
pub mod config;
pub mod images;
pub mod index;
pub mod nav;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
