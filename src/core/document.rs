// LogFold - core/document.rs
//
// The abstract document capability the engine works against, plus an
// in-memory implementation with cheap copy-on-write snapshots.
// Core layer: no knowledge of editors, files or rendering.

use std::borrow::Cow;
use std::sync::Arc;

/// Read-only view of a line-oriented text buffer.
///
/// `version` must change whenever the text changes; the visibility layer
/// uses it to recognise results computed against stale text.
pub trait Document {
    /// Number of physical lines.
    fn line_count(&self) -> usize;

    /// Text of line `index` without its terminator, or `None` past the end.
    fn line(&self, index: usize) -> Option<Cow<'_, str>>;

    /// Token identifying the current text.
    fn version(&self) -> u64;
}

/// Plain line slices are documents with a fixed version of 0.
impl<S: AsRef<str>> Document for [S] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> Option<Cow<'_, str>> {
        self.get(index).map(|s| Cow::Borrowed(s.as_ref()))
    }

    fn version(&self) -> u64 {
        0
    }
}

/// Split text into physical lines. Accepts `\n` and `\r\n`; a trailing
/// terminator does not produce an extra empty line, and empty text has
/// zero lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

// =============================================================================
// TextDocument
// =============================================================================

/// Mutable in-memory document. Every edit bumps the version.
///
/// Lines sit behind an `Arc` so `snapshot()` is O(1); an edit made while a
/// snapshot is alive copies the line vector once.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    lines: Arc<Vec<String>>,
    version: u64,
}

impl TextDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: Arc::new(split_lines(text)),
            version: 1,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Arc::new(lines.into_iter().map(Into::into).collect()),
            version: 1,
        }
    }

    /// Replace the whole text.
    pub fn set_text(&mut self, text: &str) {
        self.lines = Arc::new(split_lines(text));
        self.bump();
    }

    /// Append text to the end of the document (e.g. a tailed log growing).
    /// The appended text always starts on a new line.
    pub fn append_text(&mut self, text: &str) {
        let new_lines = split_lines(text);
        if new_lines.is_empty() {
            return;
        }
        Arc::make_mut(&mut self.lines).extend(new_lines);
        self.bump();
    }

    /// Replace line `index`. Returns false if the line does not exist.
    pub fn replace_line(&mut self, index: usize, text: &str) -> bool {
        match Arc::make_mut(&mut self.lines).get_mut(index) {
            Some(line) => {
                *line = text.to_owned();
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Insert a line before `index` (`index == line_count` appends).
    pub fn insert_line(&mut self, index: usize, text: &str) -> bool {
        if index > self.lines.len() {
            return false;
        }
        Arc::make_mut(&mut self.lines).insert(index, text.to_owned());
        self.bump();
        true
    }

    /// Remove line `index`, returning its text.
    pub fn remove_line(&mut self, index: usize) -> Option<String> {
        if index >= self.lines.len() {
            return None;
        }
        let removed = Arc::make_mut(&mut self.lines).remove(index);
        self.bump();
        Some(removed)
    }

    /// Immutable view of the current text, safe to send to another thread.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            lines: Arc::clone(&self.lines),
            version: self.version,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<Cow<'_, str>> {
        self.lines.get(index).map(|s| Cow::Borrowed(s.as_str()))
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// =============================================================================
// DocumentSnapshot
// =============================================================================

/// Frozen copy of a `TextDocument` at one version.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    lines: Arc<Vec<String>>,
    version: u64,
}

impl Document for DocumentSnapshot {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<Cow<'_, str>> {
        self.lines.get(index).map(|s| Cow::Borrowed(s.as_str()))
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_handles_crlf_and_trailing_newline() {
        assert_eq!(split_lines("a\r\nb\n"), vec!["a", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_edits_bump_version() {
        let mut doc = TextDocument::from_text("one\ntwo");
        let v0 = doc.version();
        assert!(doc.replace_line(1, "TWO"));
        assert!(doc.version() > v0);
        assert!(!doc.replace_line(5, "nope"));
        let v1 = doc.version();
        doc.append_text("three\n");
        assert_eq!(doc.line_count(), 3);
        assert!(doc.version() > v1);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let mut doc = TextDocument::from_text("one\ntwo");
        let snap = doc.snapshot();
        doc.replace_line(0, "changed");
        assert_eq!(snap.line(0).as_deref(), Some("one"));
        assert_eq!(doc.line(0).as_deref(), Some("changed"));
        assert_ne!(snap.version(), doc.version());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc = TextDocument::from_lines(["a", "c"]);
        assert!(doc.insert_line(1, "b"));
        assert_eq!(doc.lines(), ["a", "b", "c"]);
        assert_eq!(doc.remove_line(0).as_deref(), Some("a"));
        assert_eq!(doc.remove_line(9), None);
        assert!(!doc.insert_line(9, "x"));
    }

    #[test]
    fn test_slice_document() {
        let lines = ["x", "y"];
        assert_eq!(lines[..].line_count(), 2);
        assert_eq!(lines[..].line(1).as_deref(), Some("y"));
        assert!(lines[..].line(2).is_none());
    }
}
