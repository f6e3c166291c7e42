//! Run configuration module.
//!
//! Handles loading and validating the XML config file that drives a run. The
//! file is read once into a flat key/value map plus an ordered list of include
//! directories, then resolved into an immutable [`Settings`] value that every
//! stage receives explicitly.
//!
//! ## Config File Format
//!
//! ```xml
//! <config>
//!   <include_dir>
//!     <item>linux</item>          <!-- posts directory, relative to the root -->
//!     <item>rust</item>
//!   </include_dir>
//!   <img>
//!     <img_src_dir>shots</img_src_dir>
//!     <img_src_prefix>Screenshot_</img_src_prefix>
//!     <img_src_suffix>.png</img_src_suffix>
//!     <delete_ori_img_regex>Screenshot_\d+</delete_ori_img_regex>
//!   </img>
//!   <regex>                        <!-- optional pattern overrides -->
//!     <image_embed>.*addimage.*\d+</image_embed>
//!   </regex>
//!   <output>                       <!-- optional output overrides -->
//!     <index_file>README.md</index_file>
//!   </output>
//! </config>
//! ```
//!
//! ## Sections
//!
//! - `include_dir/item`: directories to process, in order.
//! - `img`: where numbered source images live and which leftovers to delete.
//!   All four keys are required.
//! - `regex`: `heading`, `title`, `image_embed`, `image_number`.
//! - `output`: `index_file`, `home_link`, `parent_text`, `prev_text`,
//!   `next_text`, `end_of_line_seq`, `category_label`, `index_footer`.
//!
//! Keys are merged into one flat map in document order (`img`, then `regex`,
//! then `output`), so a later section overrides an earlier one.
//!
//! ## Pattern Semantics
//!
//! `heading`, `image_embed` and `delete_ori_img_regex` must match at the start
//! of the text they test. `title` and `image_number` are searched anywhere in
//! the line.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Missing required config key: {0}")]
    Missing(&'static str),
    #[error("Invalid regex for {key}: {source}")]
    Regex { key: String, source: regex::Error },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Config filename looked up in the run root when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.xml";

const REQUIRED_IMAGE_KEYS: [&str; 4] = [
    "img_src_dir",
    "img_src_prefix",
    "img_src_suffix",
    "delete_ori_img_regex",
];

/// Every key the `img`, `regex` and `output` sections understand.
const KNOWN_KEYS: [&str; 16] = [
    "img_src_dir",
    "img_src_prefix",
    "img_src_suffix",
    "delete_ori_img_regex",
    "heading",
    "title",
    "image_embed",
    "image_number",
    "index_file",
    "home_link",
    "parent_text",
    "prev_text",
    "next_text",
    "end_of_line_seq",
    "category_label",
    "index_footer",
];

/// Config file contents before validation: include dirs and the flat
/// key/value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    pub include_dirs: Vec<PathBuf>,
    pub values: BTreeMap<String, String>,
}

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directories to process, relative to the run root, in config order.
    pub include_dirs: Vec<PathBuf>,
    /// Every key/value read from the file, including unrecognised ones.
    pub values: BTreeMap<String, String>,
    pub images: ImageSettings,
    pub patterns: Patterns,
    pub output: OutputSettings,
}

/// Source image location and naming.
#[derive(Debug, Clone)]
pub struct ImageSettings {
    /// Directory holding numbered source images, relative to the run root.
    pub src_dir: PathBuf,
    pub prefix: String,
    /// Extension including the dot, e.g. `.png`. Reused for relocated names.
    pub suffix: String,
    /// Source images to delete after all directories are processed.
    pub delete_pattern: Regex,
}

/// Line patterns used by the post rewriter.
#[derive(Debug, Clone)]
pub struct Patterns {
    /// A first line matching this is a heading.
    pub heading: Regex,
    /// Title text inside a heading line.
    pub title: Regex,
    /// A line matching this embeds a numbered image.
    pub image_embed: Regex,
    /// The image number inside an embed line (first match wins).
    pub image_number: Regex,
}

/// Text of generated links and index pages.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Index page filename; also excluded from directory listings.
    pub index_file: String,
    /// Link target of the index page's "home" entry.
    pub home_link: String,
    pub parent_text: String,
    pub prev_text: String,
    pub next_text: String,
    pub end_of_line: String,
    /// Index heading label; the include-dir path when unset.
    pub category_label: Option<String>,
    /// Trailing text written after the index entries.
    pub index_footer: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            index_file: "README.md".to_string(),
            home_link: "../README.md".to_string(),
            parent_text: "上一级".to_string(),
            prev_text: "上一篇".to_string(),
            next_text: "下一篇".to_string(),
            end_of_line: "\n".to_string(),
            category_label: None,
            index_footer: None,
        }
    }
}

impl OutputSettings {
    /// Marker that ends a post body: the text of the parent link appended by
    /// a previous run.
    pub fn parent_marker(&self) -> String {
        format!("[{}]", self.parent_text)
    }
}

impl Settings {
    /// Resolve typed settings from a raw config, compiling every pattern.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let values = raw.values;
        for key in REQUIRED_IMAGE_KEYS {
            if !values.contains_key(key) {
                return Err(ConfigError::Missing(key));
            }
        }
        let get = |key: &str| values.get(key).cloned().unwrap_or_default();

        let src_dir = get("img_src_dir");
        if src_dir.is_empty() {
            return Err(ConfigError::Validation(
                "img_src_dir must not be empty".into(),
            ));
        }

        let images = ImageSettings {
            src_dir: PathBuf::from(src_dir),
            prefix: get("img_src_prefix"),
            suffix: get("img_src_suffix"),
            delete_pattern: anchored(&values, "delete_ori_img_regex", "")?,
        };

        let patterns = Patterns {
            heading: anchored(&values, "heading", r".*#")?,
            title: unanchored(&values, "title", r"[^#\s].*")?,
            image_embed: anchored(&values, "image_embed", r".*addimage.*\d+")?,
            image_number: unanchored(&values, "image_number", r"\d+")?,
        };

        let defaults = OutputSettings::default();
        let or_default = |key: &str, default: String| values.get(key).cloned().unwrap_or(default);
        let output = OutputSettings {
            index_file: or_default("index_file", defaults.index_file),
            home_link: or_default("home_link", defaults.home_link),
            parent_text: or_default("parent_text", defaults.parent_text),
            prev_text: or_default("prev_text", defaults.prev_text),
            next_text: or_default("next_text", defaults.next_text),
            end_of_line: values
                .get("end_of_line_seq")
                .map(|s| unescape(s))
                .unwrap_or(defaults.end_of_line),
            category_label: values.get("category_label").cloned(),
            index_footer: values.get("index_footer").map(|s| unescape(s)),
        };

        let settings = Settings {
            include_dirs: raw.include_dirs,
            values,
            images,
            patterns,
            output,
        };
        settings.validate()?;
        for key in settings.unknown_keys() {
            warn!(key, operation = "load_config", "ignoring unknown config key");
        }
        Ok(settings)
    }

    /// Validate values that compiled fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.index_file.is_empty() || self.output.index_file.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "index_file must be a plain filename".into(),
            ));
        }
        if self.output.parent_text.is_empty() {
            return Err(ConfigError::Validation(
                "parent_text must not be empty".into(),
            ));
        }
        if self.output.end_of_line.is_empty() {
            return Err(ConfigError::Validation(
                "end_of_line_seq must not be empty".into(),
            ));
        }
        if self.include_dirs.iter().any(|d| d.as_os_str().is_empty()) {
            return Err(ConfigError::Validation(
                "include_dir items must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Keys read from the file that no setting uses, usually typos.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect()
    }

    /// Label for a directory's index heading.
    pub fn category_label(&self, dir: &Path) -> String {
        self.output
            .category_label
            .clone()
            .unwrap_or_else(|| dir.to_string_lossy().to_string())
    }
}

fn pattern_source<'a>(values: &'a BTreeMap<String, String>, key: &str, default: &'a str) -> &'a str {
    values.get(key).map(String::as_str).unwrap_or(default)
}

fn anchored(
    values: &BTreeMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Regex, ConfigError> {
    let source = pattern_source(values, key, default);
    compile(key, &format!("^(?:{source})"))
}

fn unanchored(
    values: &BTreeMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Regex, ConfigError> {
    compile(key, pattern_source(values, key, default))
}

fn compile(key: &str, source: &str) -> Result<Regex, ConfigError> {
    Regex::new(source).map_err(|source| ConfigError::Regex {
        key: key.to_string(),
        source,
    })
}

/// Turn `\n`, `\r` and `\t` escapes into the characters they name. XML text
/// cannot carry a bare line break without it being mangled by formatting.
fn unescape(value: &str) -> String {
    value
        .replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Parse config XML into include dirs and the flat key/value map.
pub fn parse_raw(xml: &str) -> Result<RawConfig, ConfigError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    let mut raw = RawConfig::default();

    for section in root.children().filter(|n| n.is_element()) {
        match section.tag_name().name() {
            "include_dir" => {
                for item in section
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "item")
                {
                    let dir = item.text().unwrap_or_default().trim();
                    raw.include_dirs.push(PathBuf::from(dir));
                }
            }
            "img" | "regex" | "output" => {
                for entry in section.children().filter(|n| n.is_element()) {
                    let value = entry.text().unwrap_or_default().trim().to_string();
                    raw.values.insert(entry.tag_name().name().to_string(), value);
                }
            }
            _ => {}
        }
    }

    if !root.children().any(|n| n.has_tag_name("img")) {
        return Err(ConfigError::Missing("img"));
    }
    Ok(raw)
}

/// Parse and resolve config XML.
pub fn parse_settings(xml: &str) -> Result<Settings, ConfigError> {
    Settings::from_raw(parse_raw(xml)?)
}

/// Load settings from a config file on disk.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let xml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&xml)
}

/// Returns a fully-commented stock `config.xml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_xml() -> &'static str {
    r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- postchain configuration.
     Paths are relative to the directory the tool runs in. -->
<config>
  <!-- Posts directories, processed in this order. Each one gets its posts
       rewritten and linked, plus an index page. -->
  <include_dir>
    <item>posts</item>
  </include_dir>

  <!-- Numbered source images. A post line such as "addimage 7" moves
       <img_src_dir>/<img_src_prefix>7<img_src_suffix> to
       ../images/<post>_<yyyymmddHHMM>_7<img_src_suffix>. -->
  <img>
    <img_src_dir>screenshots</img_src_dir>
    <img_src_prefix>Screenshot_</img_src_prefix>
    <img_src_suffix>.png</img_src_suffix>
    <!-- Source images matching this are deleted once every directory is done. -->
    <delete_ori_img_regex>Screenshot_\d+</delete_ori_img_regex>
  </img>

  <!-- Line patterns. Defaults shown. -->
  <regex>
    <heading>.*#</heading>
    <title>[^#\s].*</title>
    <image_embed>.*addimage.*\d+</image_embed>
    <image_number>\d+</image_number>
  </regex>

  <!-- Generated text. Defaults shown. category_label and index_footer are
       unset by default; the label falls back to the include_dir path. -->
  <output>
    <index_file>README.md</index_file>
    <home_link>../README.md</home_link>
    <parent_text>上一级</parent_text>
    <prev_text>上一篇</prev_text>
    <next_text>下一篇</next_text>
    <end_of_line_seq>\n</end_of_line_seq>
  </output>
</config>
"##
}
