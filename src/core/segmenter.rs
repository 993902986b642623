// LogFold - core/segmenter.rs
//
// Partitions a document's physical lines into events.
// Core layer: pure logic over the `Document` trait.
//
// Boundary detection is the first half of a two-pattern state machine: the
// line-start pattern decides where events begin, and the full-event pattern
// (core::extractor) decides what they contain. Segmentation is lazy; a
// consumer that stops early never reads the rest of the document.

use crate::core::document::Document;
use crate::core::model::Event;
use crate::core::profile::CompiledProfile;
use crate::util::error::ProfileError;
use std::iter::FusedIterator;

/// Lazily segment `document` into events using `profile`'s line-start rule.
///
/// Line 0 always begins event 0. Each later line begins a new event when it
/// matches the line-start pattern at offset 0; otherwise it is appended to the
/// current event. With an empty (or uncompilable) line-start pattern every
/// line is its own event.
pub fn segment<'a, D>(document: &'a D, profile: &'a CompiledProfile) -> Segments<'a, D>
where
    D: Document + ?Sized,
{
    Segments {
        document,
        profile,
        next_line: 0,
        next_index: 0,
    }
}

/// Iterator over the events of a document. Restartable: calling `segment`
/// again yields the same sequence for the same document version.
pub struct Segments<'a, D: Document + ?Sized> {
    document: &'a D,
    profile: &'a CompiledProfile,
    next_line: usize,
    next_index: usize,
}

impl<'a, D: Document + ?Sized> Segments<'a, D> {
    /// The line-start compile error that forced one-event-per-line mode.
    /// Reported once for the whole pass rather than per line.
    pub fn pattern_error(&self) -> Option<&'a ProfileError> {
        self.profile.line_start_error()
    }

    /// First physical line not yet consumed.
    pub fn position(&self) -> usize {
        self.next_line
    }
}

impl<D: Document + ?Sized> Iterator for Segments<'_, D> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let line_count = self.document.line_count();
        let start = self.next_line;
        let first = self.document.line(start)?.into_owned();

        let mut lines = vec![first];
        let mut cursor = start + 1;
        while cursor < line_count {
            let Some(text) = self.document.line(cursor) else {
                break;
            };
            if self.profile.starts_event(&text) {
                break;
            }
            lines.push(text.into_owned());
            cursor += 1;
        }

        let event = Event {
            index: self.next_index,
            start,
            end: cursor,
            lines,
        };
        self.next_line = cursor;
        self.next_index += 1;
        Some(event)
    }
}

impl<D: Document + ?Sized> FusedIterator for Segments<'_, D> {}

/// The event containing physical line `line`, found without segmenting the
/// whole document: walk back to the nearest boundary, then forward to the
/// next one. `Event::index` is not known in this mode and is set to 0.
pub fn event_containing<D>(document: &D, profile: &CompiledProfile, line: usize) -> Option<Event>
where
    D: Document + ?Sized,
{
    let line_count = document.line_count();
    if line >= line_count {
        return None;
    }

    let mut start = line;
    while start > 0 {
        match document.line(start) {
            Some(text) if profile.starts_event(&text) => break,
            Some(_) => start -= 1,
            None => return None,
        }
    }

    let mut walker = Segments {
        document,
        profile,
        next_line: start,
        next_index: 0,
    };
    walker.next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::PatternProfile;

    fn profile(line_start: &str) -> CompiledProfile {
        CompiledProfile::compile(&PatternProfile {
            id: "test".to_string(),
            name: "Test".to_string(),
            full_event_pattern: "(.*)".to_string(),
            line_start_pattern: line_start.to_string(),
            ..Default::default()
        })
    }

    fn ranges<D: Document + ?Sized>(doc: &D, p: &CompiledProfile) -> Vec<(usize, usize)> {
        segment(doc, p).map(|e| (e.start, e.end)).collect()
    }

    #[test]
    fn test_stack_trace_grouped_with_its_header() {
        let lines = ["2024-01-01 ERROR boom", "  at foo()", "2024-01-01 INFO ok"];
        let p = profile(r"^\d{4}-\d{2}-\d{2}");
        let events: Vec<_> = segment(&lines[..], &p).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].line_range(), 0..2);
        assert_eq!(events[0].text(), "2024-01-01 ERROR boom\n  at foo()");
        assert_eq!(events[1].line_range(), 2..3);
        assert_eq!(events[1].index, 1);
    }

    #[test]
    fn test_empty_document_yields_no_events() {
        let lines: [&str; 0] = [];
        assert_eq!(segment(&lines[..], &profile(r"^\d")).count(), 0);
        assert_eq!(segment(&lines[..], &profile("")).count(), 0);
    }

    #[test]
    fn test_never_matching_pattern_yields_single_event() {
        let lines = ["a", "b", "c", "d"];
        let p = profile("^NEVER");
        assert_eq!(ranges(&lines[..], &p), vec![(0, 4)]);
    }

    #[test]
    fn test_empty_pattern_partitions_one_event_per_line() {
        let lines = ["a", "  b", "", "d"];
        let p = profile("");
        assert_eq!(ranges(&lines[..], &p), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn test_line_zero_starts_event_even_without_match() {
        let lines = ["continuation", "2024 start", "more"];
        let p = profile(r"^\d{4}");
        assert_eq!(ranges(&lines[..], &p), vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn test_invalid_pattern_falls_back_and_reports_once() {
        let lines = ["a", "b", "c"];
        let p = profile("(unclosed");
        let segments = segment(&lines[..], &p);
        assert!(segments.pattern_error().is_some());
        assert_eq!(segments.count(), 3);
        assert_eq!(p.diagnostics().len(), 1);
    }

    #[test]
    fn test_consumer_can_stop_early() {
        let lines = ["x1", "x2", "x3", "x4"];
        let p = profile("^x");
        let mut segments = segment(&lines[..], &p);
        let first = segments.next().unwrap();
        assert_eq!(first.line_range(), 0..1);
        assert_eq!(segments.position(), 1);
    }

    #[test]
    fn test_event_containing_walks_to_boundaries() {
        let lines = ["2024 a", "  at 1", "  at 2", "2024 b", "  at 3"];
        let p = profile(r"^\d{4}");
        let event = event_containing(&lines[..], &p, 2).unwrap();
        assert_eq!(event.line_range(), 0..3);
        let event = event_containing(&lines[..], &p, 4).unwrap();
        assert_eq!(event.line_range(), 3..5);
        assert!(event_containing(&lines[..], &p, 5).is_none());
    }
}
