//! Shared types used across the rewrite, linking, and index stages.

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered mapping from post filename to its captured title.
///
/// Insertion order is processing order, which is the directory listing order.
/// One map is built per directory and dropped once its index is written.
/// Posts whose title could not be captured are recorded with `None` so that
/// linking and indexing still cover them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TitleMap {
    entries: IndexMap<String, Option<String>>,
}

impl TitleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a post. Re-inserting an existing filename updates its title
    /// without moving it.
    pub fn insert(&mut self, file: impl Into<String>, title: Option<String>) {
        self.entries.insert(file.into(), title);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.entries.contains_key(file)
    }

    /// Position of `file` in processing order.
    pub fn position(&self, file: &str) -> Option<usize> {
        self.entries.get_index_of(file)
    }

    /// Filename at a processing position.
    pub fn file_at(&self, index: usize) -> Option<&str> {
        self.entries.get_index(index).map(|(file, _)| file.as_str())
    }

    /// Captured title, if any.
    pub fn title(&self, file: &str) -> Option<&str> {
        self.entries.get(file).and_then(|t| t.as_deref())
    }

    /// Title to show for a post: the captured title, or the filename when
    /// none was captured (or it is blank).
    pub fn display_title<'a>(&'a self, file: &'a str) -> &'a str {
        match self.title(file) {
            Some(t) if !t.trim().is_empty() => t,
            _ => file,
        }
    }

    /// `(filename, display title)` pairs in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .keys()
            .map(|file| (file.as_str(), self.display_title(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{map_files, map_titles};

    #[test]
    fn keeps_insertion_order() {
        let mut map = TitleMap::new();
        map.insert("2_b.md", Some("B".into()));
        map.insert("1_a.md", Some("A".into()));
        assert_eq!(map_files(&map), vec!["2_b.md", "1_a.md"]);
        assert_eq!(map.position("1_a.md"), Some(1));
        assert_eq!(map.file_at(0), Some("2_b.md"));
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut map = TitleMap::new();
        map.insert("a.md", None);
        map.insert("b.md", None);
        map.insert("a.md", Some("Alpha".into()));
        assert_eq!(map.len(), 2);
        assert_eq!(map.position("a.md"), Some(0));
        assert_eq!(map.title("a.md"), Some("Alpha"));
    }

    #[test]
    fn display_title_falls_back_to_filename() {
        let mut map = TitleMap::new();
        map.insert("untitled.md", None);
        map.insert("blank.md", Some("   ".into()));
        map.insert("titled.md", Some("Hello".into()));
        assert_eq!(map.display_title("untitled.md"), "untitled.md");
        assert_eq!(map.display_title("blank.md"), "blank.md");
        assert_eq!(map.display_title("titled.md"), "Hello");
        assert_eq!(map_titles(&map), vec!["untitled.md", "blank.md", "Hello"]);
    }
}
