//! CLI output formatting.
//!
//! Each command has a `format_*` function returning lines (pure, testable)
//! and the binary prints them. Picture ids are always shown in full since
//! they are what users copy into the next command.
//!
//! # Output Format
//!
//! ## Import
//!
//! ```text
//! stored   5f2c…e1a0  holidays/001-beach.jpg
//! FAILED   holidays/notes.png: failed to decode upload: ...
//! Imported 1 picture, 1 failed
//! ```
//!
//! ## Recent
//!
//! ```text
//! 001 Beach at dusk
//!     Id: 5f2c…e1a0
//!     Alt: orange sky over water
//! 002 (untitled)
//!     Id: 9b11…04cd
//! ```

use crate::hash::PictureId;
use crate::types::Picture;
use std::fmt;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Result of ingesting one file during `import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Stored(PictureId),
    /// The store refused the write after the id was known.
    StoreFailed(PictureId, String),
    Failed(String),
}

/// Running totals for an `import`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub stored: u32,
    pub failed: u32,
}

impl ImportStats {
    pub fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Stored(_) => self.stored += 1,
            ImportOutcome::StoreFailed(..) | ImportOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.stored == 1 { "picture" } else { "pictures" };
        if self.failed > 0 {
            write!(f, "Imported {} {}, {} failed", self.stored, noun, self.failed)
        } else {
            write!(f, "Imported {} {}", self.stored, noun)
        }
    }
}

/// One line per imported file.
pub fn format_import_line(path: &Path, outcome: &ImportOutcome) -> String {
    match outcome {
        ImportOutcome::Stored(id) => format!("stored   {}  {}", id, path.display()),
        ImportOutcome::StoreFailed(id, err) => {
            format!("FAILED   {}  {}: {}", id, path.display(), err)
        }
        ImportOutcome::Failed(err) => format!("FAILED   {}: {}", path.display(), err),
    }
}

/// Listing of recent pictures, newest first.
pub fn format_recent(pictures: &[Picture]) -> Vec<String> {
    if pictures.is_empty() {
        return vec!["No pictures yet".to_string()];
    }
    let mut lines = Vec::new();
    for (i, picture) in pictures.iter().enumerate() {
        let title = if picture.title.is_empty() {
            "(untitled)".to_string()
        } else {
            truncate(&picture.title, 60)
        };
        lines.push(format!("{} {}", format_index(i + 1), title));
        lines.push(format!("{}Id: {}", indent(1), picture.id));
        if !picture.alt_text.is_empty() {
            lines.push(format!("{}Alt: {}", indent(1), truncate(&picture.alt_text, 60)));
        }
    }
    lines
}

/// Metadata of one picture as pretty JSON.
pub fn format_metadata(picture: &Picture) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(picture)
}
