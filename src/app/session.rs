// LogFold - app/session.rs
//
// Per-document session: owns the text, its hidden-substring store, the
// compiled profile and the background fold calculator, and holds the most
// recently delivered visibility result.
//
// Design principles:
// - Every change to the text or to the store starts a new computation; the
//   previous one is cancelled.
// - A result is accepted only if its generation is newer than the one
//   already delivered, so a stale run can never overwrite a newer result.
// - Until the first result arrives every line is visible.

use crate::app::fold::{FoldBase, FoldCalculator, FoldProgress};
use crate::core::document::{Document, TextDocument};
use crate::core::extractor;
use crate::core::model::{Event, ExtractedFields, ParsedEvent, VisibilityResult};
use crate::core::profile::CompiledProfile;
use crate::core::segmenter::{self, Segments};
use crate::core::selection;
use crate::core::visibility::HiddenSubstrings;
use crate::util::error::SelectionUnavailable;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct DocumentSession {
    document: TextDocument,
    profile: Arc<CompiledProfile>,
    hidden: HiddenSubstrings,
    calculator: FoldCalculator,

    /// Latest delivered result and the store it was computed from.
    visibility: Option<VisibilityResult>,
    visibility_substrings: HiddenSubstrings,

    /// Store snapshot sent with the run currently in flight.
    pending: Option<(u64, HiddenSubstrings)>,
}

impl DocumentSession {
    pub fn new(document: TextDocument, profile: Arc<CompiledProfile>) -> Self {
        Self::with_calculator(document, profile, FoldCalculator::new())
    }

    pub fn with_calculator(
        document: TextDocument,
        profile: Arc<CompiledProfile>,
        calculator: FoldCalculator,
    ) -> Self {
        tracing::debug!(
            profile = %profile.id(),
            lines = document.line_count(),
            "Document session opened"
        );
        Self {
            document,
            profile,
            hidden: HiddenSubstrings::new(),
            calculator,
            visibility: None,
            visibility_substrings: HiddenSubstrings::new(),
            pending: None,
        }
    }

    pub fn document(&self) -> &TextDocument {
        &self.document
    }

    pub fn profile(&self) -> &CompiledProfile {
        &self.profile
    }

    pub fn hidden_substrings(&self) -> &HiddenSubstrings {
        &self.hidden
    }

    // -------------------------------------------------------------------------
    // Store mutation
    // -------------------------------------------------------------------------

    /// Add `text` to the store and recompute. Returns false (and starts
    /// nothing) if it was empty or already present.
    pub fn add_hidden_substring(&mut self, text: &str) -> bool {
        if !self.hidden.add(text) {
            return false;
        }
        tracing::info!(
            substring = crate::util::logging::preview(text),
            total = self.hidden.len(),
            "Hidden substring added"
        );
        self.recompute();
        true
    }

    /// Empty the store and recompute.
    pub fn clear_hidden_substrings(&mut self) {
        self.hidden.clear();
        tracing::info!("Hidden substrings cleared");
        self.recompute();
    }

    /// Derive a substring from a caret or selection on `line` and hide it.
    /// Returns the substring that was added.
    pub fn hide_selection(
        &mut self,
        line: usize,
        selection: Range<usize>,
    ) -> Result<String, SelectionUnavailable> {
        let substring = match self.document.line(line) {
            Some(text) => selection::derive_hidden_substring(&text, selection)?,
            None => {
                return Err(SelectionUnavailable::OutOfBounds {
                    start: selection.start,
                    end: selection.end,
                    len: 0,
                })
            }
        };
        self.add_hidden_substring(&substring);
        Ok(substring)
    }

    /// Label for the hide action at a caret or selection, or `None` when the
    /// action is unavailable there.
    pub fn hide_action_label(&self, line: usize, selection: Range<usize>) -> Option<String> {
        let text = self.document.line(line)?;
        selection::derive_hidden_substring(&text, selection)
            .ok()
            .map(|s| selection::hide_action_label(&s))
    }

    // -------------------------------------------------------------------------
    // Document edits
    // -------------------------------------------------------------------------

    pub fn set_text(&mut self, text: &str) {
        self.document.set_text(text);
        self.recompute();
    }

    pub fn append_text(&mut self, text: &str) {
        let before = self.document.version();
        self.document.append_text(text);
        if self.document.version() != before {
            self.recompute();
        }
    }

    pub fn replace_line(&mut self, index: usize, text: &str) -> bool {
        let changed = self.document.replace_line(index, text);
        if changed {
            self.recompute();
        }
        changed
    }

    pub fn insert_line(&mut self, index: usize, text: &str) -> bool {
        let changed = self.document.insert_line(index, text);
        if changed {
            self.recompute();
        }
        changed
    }

    pub fn remove_line(&mut self, index: usize) -> Option<String> {
        let removed = self.document.remove_line(index);
        if removed.is_some() {
            self.recompute();
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// Start a computation for the current text and store. Extends the
    /// delivered result when the store only grew and the text is unchanged.
    pub fn recompute(&mut self) {
        let base = self.visibility.as_ref().and_then(|v| {
            (v.document_version == self.document.version()
                && self.hidden.is_superset_of(&self.visibility_substrings))
            .then(|| FoldBase {
                previous: v.clone(),
                added: self.hidden.difference(&self.visibility_substrings),
            })
        });
        let generation = self
            .calculator
            .start(self.document.snapshot(), self.hidden.clone(), base);
        self.pending = Some((generation, self.hidden.clone()));
    }

    /// Drain finished computations. Returns true if a newer result was
    /// delivered.
    pub fn poll(&mut self) -> bool {
        let mut delivered = false;
        for msg in self.calculator.poll_progress() {
            delivered |= self.accept(msg);
        }
        delivered
    }

    /// Block until the latest computation has been delivered, or `timeout`
    /// elapses. Returns true when the delivered result is current.
    pub fn wait_for_visibility(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.calculator.wait(remaining) {
                Some(msg) => {
                    self.accept(msg);
                }
                None => break,
            }
        }
        self.is_up_to_date()
    }

    fn accept(&mut self, msg: FoldProgress) -> bool {
        match msg {
            FoldProgress::Completed(result) => {
                let generation = result.generation;
                self.calculator.finish(generation);
                let newer = self
                    .visibility
                    .as_ref()
                    .map_or(true, |v| generation > v.generation);
                if !newer {
                    tracing::debug!(generation, "Discarding stale visibility result");
                    return false;
                }
                if let Some((pending_gen, substrings)) = self.pending.take() {
                    if pending_gen == generation {
                        self.visibility_substrings = substrings;
                    } else {
                        self.pending = Some((pending_gen, substrings));
                    }
                }
                self.visibility = Some(result);
                true
            }
            FoldProgress::Cancelled { generation } => {
                tracing::trace!(generation, "Visibility run cancelled");
                false
            }
        }
    }

    /// Latest delivered result, if any computation has completed.
    pub fn visibility(&self) -> Option<&VisibilityResult> {
        self.visibility.as_ref()
    }

    /// Whether the delivered result reflects the current text and store.
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_none()
            && self
                .visibility
                .as_ref()
                .is_some_and(|v| v.document_version == self.document.version())
    }

    /// Whether `line` is hidden according to the latest delivered result.
    pub fn is_line_hidden(&self, line: usize) -> bool {
        self.visibility
            .as_ref()
            .is_some_and(|v| v.is_hidden(line))
    }

    /// Fold regions of the latest delivered result.
    pub fn hidden_ranges(&self) -> Vec<Range<usize>> {
        self.visibility
            .as_ref()
            .map(VisibilityResult::hidden_ranges)
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Events and fields
    // -------------------------------------------------------------------------

    /// Lazily segment the current text.
    pub fn events(&self) -> Segments<'_, TextDocument> {
        segmenter::segment(&self.document, &self.profile)
    }

    /// The event containing `line`.
    pub fn event_at_line(&self, line: usize) -> Option<Event> {
        segmenter::event_containing(&self.document, &self.profile, line)
    }

    pub fn fields_for_event(&self, event: &Event) -> ExtractedFields {
        extractor::extract(event, &self.profile)
    }

    /// Every event with its fields.
    pub fn parsed_events(&self) -> Vec<ParsedEvent> {
        extractor::parse_document(&self.document, &self.profile)
    }
}
