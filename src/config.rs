//! Book configuration: the declarative chapter map driving a cleaning run.
//!
//! Each book is described by one JSON file in the config directory:
//!
//! ```json
//! {
//!   "metadata": { "title": "Christianity and Migration",
//!                 "author": "Peter C. Phan",
//!                 "filename_pattern": "Christianity and Migration" },
//!   "settings": { "toc_end_page": 8 },
//!   "chapters": [
//!     { "part": "Front",  "num": "0", "title": "Preface", "special_type": "preface" },
//!     { "part": "Part 1", "num": "1", "title": "CHRISTIAN THEOLOGY IN THE AGE OF MIGRATION" }
//!   ]
//! }
//! ```
//!
//! Configs are matched to input files by substring
//! (`metadata.filename_pattern` against the PDF file name) so one config
//! directory can serve a whole shelf of differently-suffixed scans. A file
//! with no matching config falls back to [`BookConfig::template`], which
//! carries defaults but no chapters; cleaning such a file fails per-file
//! with a warning rather than aborting the batch.

use crate::error::BookCleanError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Title/author metadata plus the filename pattern used for config resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    /// Substring matched against input file names. Empty never matches.
    #[serde(default)]
    pub filename_pattern: String,
}

/// Page-geometry and scan heuristics.
///
/// Values are in PDF points (1/72 inch). The defaults come from the books
/// this tool was built against: Oxford-style academic hardbacks with
/// running headers around 50 pt from the page edge and footnotes set two
/// points smaller than body text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pages before this index are original front matter (cover, copyright,
    /// printed TOC) and are never searched for chapter markers.
    pub toc_end_page: usize,
    /// Lines whose top edge is within this distance of the page top are
    /// marginal (running headers, printed page numbers).
    pub header_margin: f32,
    /// Same, measured from the page bottom.
    pub footer_margin: f32,
    /// Lines with an average glyph height below this are footnote text.
    pub footnote_size_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toc_end_page: 8,
            header_margin: 60.0,
            footer_margin: 60.0,
            footnote_size_threshold: 9.0,
        }
    }
}

/// One configured chapter: where it starts (by title text) and how its
/// heading and table-of-contents line should read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterEntry {
    #[serde(default)]
    pub part: String,
    pub num: String,
    /// The chapter marker: matched as a substring against page text.
    pub title: String,
    /// `"preface"` marks an optional front chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_type: Option<String>,
}

impl ChapterEntry {
    pub fn is_preface(&self) -> bool {
        self.special_type.as_deref() == Some("preface")
    }

    /// The heading emitted for this chapter and its TOC line.
    ///
    /// A preface renders as its bare title; everything else as
    /// `"{part} - {num}. {title}"`.
    pub fn display_header(&self) -> String {
        if self.is_preface() || self.part.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}. {}", self.part, self.num, self.title)
        }
    }
}

/// The declarative description of one book. Immutable for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    pub metadata: BookMetadata,
    #[serde(default)]
    pub settings: Settings,
    pub chapters: Vec<ChapterEntry>,
}

impl BookConfig {
    /// Fallback config used when no file in the config directory matches an
    /// input: sensible defaults, no chapters.
    pub fn template() -> Self {
        Self {
            metadata: BookMetadata {
                title: "Untitled Book".to_string(),
                author: "Unknown".to_string(),
                filename_pattern: String::new(),
            },
            settings: Settings::default(),
            chapters: Vec::new(),
        }
    }

    /// Load and validate a single config file.
    pub fn from_json_file(path: &Path) -> Result<Self, BookCleanError> {
        let raw = std::fs::read_to_string(path).map_err(|e| BookCleanError::ConfigInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let config: BookConfig =
            serde_json::from_str(&raw).map_err(|e| BookCleanError::ConfigInvalid {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        config
            .validate()
            .map_err(|detail| BookCleanError::ConfigInvalid {
                path: path.to_path_buf(),
                detail,
            })?;
        Ok(config)
    }

    /// Check the fields the pipeline cannot work without.
    pub fn validate(&self) -> Result<(), String> {
        if self.metadata.title.trim().is_empty() {
            return Err("metadata.title is empty".to_string());
        }
        for (i, chapter) in self.chapters.iter().enumerate() {
            if chapter.title.trim().is_empty() {
                return Err(format!("chapter {} has an empty title", i + 1));
            }
            if chapter.num.trim().is_empty() && !chapter.is_preface() {
                return Err(format!("chapter '{}' has no number", chapter.title));
            }
        }
        Ok(())
    }

    /// Substring match of `filename_pattern` against an input file name.
    pub fn matches_filename(&self, file_name: &str) -> bool {
        let pattern = self.metadata.filename_pattern.trim();
        !pattern.is_empty() && file_name.contains(pattern)
    }
}

/// All configs loaded from a config directory, in file-name order.
///
/// Malformed files are logged and skipped so one bad config never takes
/// down the batch.
#[derive(Debug, Default)]
pub struct ConfigStore {
    configs: Vec<(PathBuf, BookConfig)>,
}

impl ConfigStore {
    /// Load every `*.json` in `dir`. A missing directory yields an empty
    /// store (every file then falls back to the template).
    pub fn load_dir(dir: &Path) -> Self {
        let mut configs = Vec::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Config directory '{}' not readable: {}", dir.display(), e);
                return Self { configs };
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            match BookConfig::from_json_file(&path) {
                Ok(config) => {
                    debug!(
                        "Loaded config '{}' ({} chapters)",
                        path.display(),
                        config.chapters.len()
                    );
                    configs.push((path, config));
                }
                Err(e) => warn!("Skipping config: {}", e),
            }
        }

        Self { configs }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// First config (in file-name order) whose pattern matches `file_name`.
    pub fn resolve(&self, file_name: &str) -> Option<&BookConfig> {
        self.configs
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.matches_filename(file_name))
    }

    /// Like [`resolve`](Self::resolve) but falling back to the template.
    pub fn resolve_or_template(&self, file_name: &str) -> BookConfig {
        match self.resolve(file_name) {
            Some(config) => config.clone(),
            None => {
                warn!("No config matches '{}'; using template defaults", file_name);
                BookConfig::template()
            }
        }
    }
}

/// Runtime options for a cleaning run, as opposed to the per-book
/// [`BookConfig`] loaded from JSON.
#[derive(Clone)]
pub struct CleanOptions {
    /// PDF user password for encrypted sources.
    pub password: Option<String>,
    /// Also write the `_cleaned.txt` / `_cleaned.json` sidecars consumed by
    /// downstream audiobook tooling.
    pub write_sidecars: bool,
    /// Optional per-book/per-page progress events.
    pub progress: Option<ProgressCallback>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            password: None,
            write_sidecars: true,
            progress: None,
        }
    }
}

impl fmt::Debug for CleanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("write_sidecars", &self.write_sidecars)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl CleanOptions {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn write_sidecars(mut self, v: bool) -> Self {
        self.write_sidecars = v;
        self
    }

    pub fn progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}
