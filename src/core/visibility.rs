// LogFold - core/visibility.rs
//
// Line visibility from a set of hidden substrings.
// Core layer: pure, cancellable computation over a document snapshot.
//
// A line is hidden iff its own text contains at least one hidden substring
// (literal, case-sensitive, unanchored). Events play no part here: a
// continuation line is hidden only by what is written on it.

use crate::core::document::Document;
use crate::core::model::VisibilityResult;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Hidden-substring store
// =============================================================================

/// Set of literal substrings whose lines are hidden. Owned per document.
///
/// Ordered so that iteration, export and tests are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSubstrings {
    entries: BTreeSet<String>,
}

impl HiddenSubstrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a substring. Returns false if it was empty or already present.
    /// The empty string is refused since it would hide every line.
    pub fn add(&mut self, substring: impl Into<String>) -> bool {
        let substring = substring.into();
        if substring.is_empty() {
            return false;
        }
        self.entries.insert(substring)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `self` contains every entry of `other`.
    pub fn is_superset_of(&self, other: &HiddenSubstrings) -> bool {
        self.entries.is_superset(&other.entries)
    }

    /// Entries of `self` missing from `other`.
    pub fn difference(&self, other: &HiddenSubstrings) -> HiddenSubstrings {
        HiddenSubstrings {
            entries: self.entries.difference(&other.entries).cloned().collect(),
        }
    }

    /// Whether `line` contains any hidden substring.
    pub fn hides(&self, line: &str) -> bool {
        self.entries.iter().any(|s| line.contains(s.as_str()))
    }
}

impl<S: Into<String>> FromIterator<S> for HiddenSubstrings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut store = HiddenSubstrings::new();
        for s in iter {
            store.add(s);
        }
        store
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Compute the hidden flag of every line of `document`.
///
/// `cancel` is checked once per line; a cancelled run returns `None` and
/// never a partial result. Snapshots with more than `parallel_threshold`
/// lines are scanned on the rayon pool; output order and content are the
/// same either way.
pub fn compute_visibility<D>(
    document: &D,
    substrings: &HiddenSubstrings,
    generation: u64,
    cancel: &AtomicBool,
    parallel_threshold: usize,
) -> Option<VisibilityResult>
where
    D: Document + Sync + ?Sized,
{
    let line_count = document.line_count();
    if substrings.is_empty() {
        return (!cancel.load(Ordering::Relaxed)).then(|| {
            VisibilityResult::all_visible(generation, document.version(), line_count)
        });
    }

    let hidden = scan(document, line_count, parallel_threshold, cancel, |_, line| {
        substrings.hides(line)
    })?;

    Some(VisibilityResult::new(
        generation,
        document.version(),
        hidden,
    ))
}

/// Recompute after substrings were only added.
///
/// Lines already hidden in `previous` stay hidden (adding never reveals), so
/// only visible lines are tested, and only against the new entries. Returns
/// `None` when cancelled or when `previous` was computed against a different
/// document version; callers then fall back to `compute_visibility`.
pub fn refine_visibility<D>(
    document: &D,
    previous: &VisibilityResult,
    added: &HiddenSubstrings,
    generation: u64,
    cancel: &AtomicBool,
    parallel_threshold: usize,
) -> Option<VisibilityResult>
where
    D: Document + Sync + ?Sized,
{
    let line_count = document.line_count();
    if previous.document_version != document.version() || previous.line_count() != line_count {
        return None;
    }

    let hidden = scan(document, line_count, parallel_threshold, cancel, |i, line| {
        previous.is_hidden(i) || added.hides(line)
    })?;

    Some(VisibilityResult::new(
        generation,
        document.version(),
        hidden,
    ))
}

fn scan<D, F>(
    document: &D,
    line_count: usize,
    parallel_threshold: usize,
    cancel: &AtomicBool,
    is_hidden: F,
) -> Option<Vec<bool>>
where
    D: Document + Sync + ?Sized,
    F: Fn(usize, &str) -> bool + Sync,
{
    let check = |i: usize| -> Option<bool> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        Some(document.line(i).is_some_and(|line| is_hidden(i, &line)))
    };

    if line_count > parallel_threshold {
        tracing::trace!(line_count, "Visibility scan on rayon pool");
        (0..line_count).into_par_iter().map(check).collect()
    } else {
        (0..line_count).map(check).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::{Document, TextDocument};
    use std::borrow::Cow;
    use std::sync::atomic::AtomicUsize;

    const LINES: [&str; 3] = ["2024-01-01 ERROR boom", "  at foo()", "2024-01-01 INFO ok"];

    fn run(lines: &[&str], hidden: &[&str]) -> Vec<bool> {
        let store: HiddenSubstrings = hidden.iter().copied().collect();
        compute_visibility(lines, &store, 1, &AtomicBool::new(false), usize::MAX)
            .unwrap()
            .hidden_flags()
            .to_vec()
    }

    /// Raises `cancel` when line `trip_at` is read.
    struct TrippingDocument<'a> {
        lines: Vec<String>,
        trip_at: usize,
        cancel: &'a AtomicBool,
        reads: AtomicUsize,
    }

    impl Document for TrippingDocument<'_> {
        fn line_count(&self) -> usize {
            self.lines.len()
        }

        fn line(&self, index: usize) -> Option<Cow<'_, str>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if index == self.trip_at {
                self.cancel.store(true, Ordering::SeqCst);
            }
            self.lines.get(index).map(|s| Cow::Borrowed(s.as_str()))
        }

        fn version(&self) -> u64 {
            1
        }
    }

    #[test]
    fn test_hides_only_lines_containing_substring() {
        assert_eq!(run(&LINES, &["boom"]), vec![true, false, false]);
    }

    #[test]
    fn test_continuation_line_hidden_only_by_own_text() {
        assert_eq!(run(&LINES, &["foo"]), vec![false, true, false]);
    }

    #[test]
    fn test_empty_store_hides_nothing() {
        assert_eq!(run(&LINES, &[]), vec![false, false, false]);
    }

    #[test]
    fn test_match_is_case_sensitive_and_literal() {
        assert_eq!(run(&LINES, &["BOOM"]), vec![false, false, false]);
        assert_eq!(run(&["a.b", "axb"], &["a.b"]), vec![true, false]);
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(run(&LINES, &["INFO"]), run(&LINES, &["INFO"]));
    }

    #[test]
    fn test_adding_substring_never_reveals() {
        let before = run(&LINES, &["boom"]);
        let after = run(&LINES, &["boom", "ok"]);
        for (b, a) in before.iter().zip(&after) {
            assert!(!*b || *a);
        }
        assert_eq!(after, vec![true, false, true]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let lines: Vec<String> = (0..500)
            .map(|i| match i % 7 {
                0 => format!("line {i} noise"),
                _ => format!("line {i} signal"),
            })
            .collect();
        let store: HiddenSubstrings = ["noise"].into_iter().collect();
        let cancel = AtomicBool::new(false);
        let seq = compute_visibility(&lines[..], &store, 1, &cancel, usize::MAX).unwrap();
        let par = compute_visibility(&lines[..], &store, 1, &cancel, 10).unwrap();
        assert_eq!(seq.hidden_flags(), par.hidden_flags());
        assert_eq!(par.hidden_count(), (0..500).filter(|i| i % 7 == 0).count());
    }

    #[test]
    fn test_cancelled_run_yields_nothing() {
        let store: HiddenSubstrings = ["boom"].into_iter().collect();
        let cancel = AtomicBool::new(true);
        let sequential = compute_visibility(&LINES[..], &store, 1, &cancel, usize::MAX);
        assert!(sequential.is_none());
        let parallel = compute_visibility(&LINES[..], &store, 1, &cancel, 0);
        assert!(parallel.is_none());
    }

    #[test]
    fn test_refine_matches_full_recompute() {
        let doc = TextDocument::from_lines(LINES);
        let cancel = AtomicBool::new(false);
        let old: HiddenSubstrings = ["boom"].into_iter().collect();
        let mut new = old.clone();
        new.add("foo");

        let previous = compute_visibility(&doc, &old, 1, &cancel, usize::MAX).unwrap();
        let added = new.difference(&old);
        let refined =
            refine_visibility(&doc, &previous, &added, 2, &cancel, usize::MAX).unwrap();
        let full = compute_visibility(&doc, &new, 2, &cancel, usize::MAX).unwrap();
        assert_eq!(refined, full);
    }

    #[test]
    fn test_refine_rejects_stale_previous() {
        let mut doc = TextDocument::from_lines(LINES);
        let cancel = AtomicBool::new(false);
        let store: HiddenSubstrings = ["boom"].into_iter().collect();
        let previous = compute_visibility(&doc, &store, 1, &cancel, usize::MAX).unwrap();
        doc.replace_line(1, "boom again");
        let refined = refine_visibility(&doc, &previous, &store, 2, &cancel, usize::MAX);
        assert!(refined.is_none());
    }

    #[test]
    fn test_store_rejects_empty_and_duplicates() {
        let mut store = HiddenSubstrings::new();
        assert!(!store.add(""));
        assert!(store.add("x"));
        assert!(!store.add("x"));
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancel_raised_mid_scan_yields_nothing() {
        let cancel = AtomicBool::new(false);
        let doc = TrippingDocument {
            lines: (0..100).map(|i| format!("line {i}")).collect(),
            trip_at: 10,
            cancel: &cancel,
            reads: AtomicUsize::new(0),
        };
        let store: HiddenSubstrings = ["line"].into_iter().collect();
        let result = compute_visibility(&doc, &store, 1, &cancel, usize::MAX);
        assert!(result.is_none());
        assert_eq!(doc.reads.load(Ordering::SeqCst), 11);
    }
}
