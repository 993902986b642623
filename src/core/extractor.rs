// LogFold - core/extractor.rs
//
// Structured field extraction for segmented events.
// Core layer: pure logic, no I/O.
//
// Each field fails independently. A time capture that does not parse leaves
// severity and category intact, and a pattern that does not match at all
// yields an unstructured record whose raw text is the whole event.

use crate::core::document::Document;
use crate::core::model::{Event, ExtractedFields, ParsedEvent, PatternProfile, TimeValue};
use crate::core::profile::CompiledProfile;
use crate::core::segmenter;
use crate::util::error::FieldParseError;
use chrono::format::{self, Parsed, StrftimeItems};
use regex::Captures;

/// Fields of one event plus the recoverable problems met on the way.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub fields: ExtractedFields,
    pub errors: Vec<FieldParseError>,
}

/// Extract the structured fields of `event`.
pub fn extract(event: &Event, profile: &CompiledProfile) -> ExtractedFields {
    extract_with_diagnostics(event, profile).fields
}

/// Extract the structured fields of `event`, keeping field parse errors.
///
/// In whole-event mode the full-event pattern is matched once against the
/// joined event text. In every-line mode it is matched against each physical
/// line, and each field takes its value from the last line that supplied a
/// non-empty (and, for time, parseable) capture; raw groups and the message
/// come from the last matching line.
pub fn extract_with_diagnostics(event: &Event, profile: &CompiledProfile) -> Extraction {
    let raw = event.text();

    let Some(re) = profile.full_event() else {
        return Extraction {
            fields: ExtractedFields::unstructured(raw),
            errors: Vec::new(),
        };
    };

    let mut acc = Accumulator::new(profile);

    if profile.profile().match_full_event_against_every_line {
        let mut offset = 0;
        for (i, line) in event.lines.iter().enumerate() {
            if let Some(caps) = re.captures(line) {
                acc.absorb(&caps, event.start + i, offset);
            }
            offset += line.len() + 1;
        }
    } else if let Some(caps) = re.captures(&raw) {
        let before = caps.get(0).map_or(0, |m| m.start());
        let line = event.start + raw[..before].matches('\n').count();
        acc.absorb(&caps, line, 0);
    }

    acc.finish(raw)
}

/// Segment `document` and extract every event. Convenience for exporters and
/// batch consumers; interactive callers should pull events lazily instead.
pub fn parse_document<D>(document: &D, profile: &CompiledProfile) -> Vec<ParsedEvent>
where
    D: Document + ?Sized,
{
    let mut unstructured = 0usize;
    let events: Vec<ParsedEvent> = segmenter::segment(document, profile)
        .map(|event| {
            let fields = extract(&event, profile);
            if !fields.matched {
                unstructured += 1;
            }
            ParsedEvent { event, fields }
        })
        .collect();

    tracing::debug!(
        profile = %profile.id(),
        lines = document.line_count(),
        events = events.len(),
        unstructured,
        "Extraction complete"
    );

    events
}

// =============================================================================
// Per-event accumulation
// =============================================================================

struct Accumulator<'p> {
    profile: &'p CompiledProfile,
    fields: ExtractedFields,
    message_from: Option<usize>,
    errors: Vec<FieldParseError>,
}

impl<'p> Accumulator<'p> {
    fn new(profile: &'p CompiledProfile) -> Self {
        Self {
            profile,
            fields: ExtractedFields::unstructured(String::new()),
            message_from: None,
            errors: Vec::new(),
        }
    }

    /// Fold one successful match into the record. `base` is the byte offset
    /// of the matched haystack inside the joined event text.
    fn absorb(&mut self, caps: &Captures<'_>, line: usize, base: usize) {
        let p = self.profile.profile();
        self.fields.matched = true;
        self.fields.groups = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();

        if let (Some(m), Some(fmt)) = (group(caps, p.time_group), self.profile.time_format()) {
            match parse_time(m.as_str(), fmt) {
                Ok(t) => self.fields.time = Some(t),
                Err(reason) => {
                    tracing::trace!(
                        line,
                        raw = m.as_str(),
                        format = fmt,
                        "Time capture did not parse"
                    );
                    self.errors.push(FieldParseError::Time {
                        line,
                        group: p.time_group,
                        raw: m.as_str().to_string(),
                        format: fmt.to_string(),
                        reason,
                    });
                }
            }
        }
        if let Some(m) = group(caps, p.severity_group) {
            self.fields.severity = Some(m.as_str().trim().to_string());
        }
        if let Some(m) = group(caps, p.category_group) {
            self.fields.category = Some(m.as_str().trim().to_string());
        }

        self.message_from = Some(base + message_start(caps, p));
    }

    fn finish(mut self, raw: String) -> Extraction {
        if !self.fields.matched {
            return Extraction {
                fields: ExtractedFields::unstructured(raw),
                errors: self.errors,
            };
        }
        let from = self.message_from.unwrap_or(0).min(raw.len());
        self.fields.message = raw
            .get(from..)
            .unwrap_or(raw.as_str())
            .trim_start_matches(|c: char| {
                c.is_whitespace() || matches!(c, '-' | ':' | '|' | ']' | ')' | '>')
            })
            .to_string();
        self.fields.raw = raw;
        Extraction {
            fields: self.fields,
            errors: self.errors,
        }
    }
}

/// Offset in the matched haystack where the message begins.
///
/// With no field captured the message is the whole text. Otherwise it is the
/// last participating group that starts at or after the furthest field
/// capture, or failing that the end of that capture.
fn message_start(caps: &Captures<'_>, p: &PatternProfile) -> usize {
    let field_end = [p.time_group, p.severity_group, p.category_group]
        .into_iter()
        .filter_map(|i| group(caps, i))
        .map(|m| m.end())
        .max();
    let Some(end) = field_end else {
        return 0;
    };
    caps.iter()
        .skip(1)
        .flatten()
        .filter(|m| m.start() >= end)
        .last()
        .map_or(end, |m| m.start())
}

/// Capture group `index` (1-based) if enabled, present and non-blank.
fn group<'t>(caps: &Captures<'t>, index: usize) -> Option<regex::Match<'t>> {
    if index == 0 {
        return None;
    }
    caps.get(index).filter(|m| !m.as_str().trim().is_empty())
}

// =============================================================================
// Time parsing
// =============================================================================

/// Parse `raw` with a chrono strftime-style `format`.
///
/// The result keeps exactly the precision the format encodes: an offset
/// yields `Zoned`, date and time yield `Local`, date alone yields `Date`,
/// and a time without a full date (including year-less formats such as
/// `%b %e %H:%M:%S`) yields `TimeOfDay`. No year or timezone is inferred.
pub fn parse_time(raw: &str, format: &str) -> Result<TimeValue, String> {
    let trimmed = raw.trim();
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, trimmed, StrftimeItems::new(format))
        .map_err(|e| format!("cannot parse '{trimmed}' with format '{format}': {e}"))?;

    if parsed.offset.is_some() {
        if let Ok(dt) = parsed.to_datetime() {
            return Ok(TimeValue::Zoned(dt));
        }
    }
    if let Ok(ndt) = parsed.to_naive_datetime_with_offset(0) {
        return Ok(TimeValue::Local(ndt));
    }
    if let Ok(date) = parsed.to_naive_date() {
        return Ok(TimeValue::Date(date));
    }
    if let Ok(time) = parsed.to_naive_time() {
        return Ok(TimeValue::TimeOfDay(time));
    }

    Err(format!(
        "'{trimmed}' parsed with format '{format}' does not determine a date or time"
    ))
}
