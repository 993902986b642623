// LogFold - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

// =============================================================================
// Pattern profile (user-editable parsing configuration)
// =============================================================================

/// A named parsing configuration as supplied by the settings layer.
///
/// This is the uncompiled, persisted shape. Nothing here is trusted: the
/// patterns and time format may be malformed, and the engine re-validates
/// them when compiling (see `core::profile::CompiledProfile`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PatternProfile {
    /// Stable identifier used for lookup and user overrides.
    pub id: String,

    /// Display name only.
    pub name: String,

    /// Free-text description shown in profile listings.
    #[serde(default)]
    pub description: String,

    /// Regex applied to an event (or to each of its lines) to pull out fields.
    pub full_event_pattern: String,

    /// Regex that, matching at the start of a line, begins a new event.
    /// Empty means every line is its own event.
    #[serde(default)]
    pub line_start_pattern: String,

    /// chrono strftime-style format used to parse the time capture.
    #[serde(default)]
    pub time_format: String,

    /// 1-based capture group holding the time; 0 disables the field.
    #[serde(default)]
    pub time_group: usize,

    /// 1-based capture group holding the severity; 0 disables the field.
    #[serde(default)]
    pub severity_group: usize,

    /// 1-based capture group holding the category; 0 disables the field.
    #[serde(default)]
    pub category_group: usize,

    /// Apply `full_event_pattern` to every physical line of an event rather
    /// than once to the joined event text.
    #[serde(default)]
    pub match_full_event_against_every_line: bool,
}

impl PatternProfile {
    /// Fingerprint of every field that affects parsing. Two profiles with the
    /// same fingerprint compile to the same engine state.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

// =============================================================================
// Event (output of segmentation)
// =============================================================================

/// One logical log entry: a contiguous half-open range of physical lines.
///
/// Events are snapshots. A new document version yields new events; existing
/// ones are never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Ordinal of the event within the segmentation pass.
    pub index: usize,

    /// First physical line (inclusive).
    pub start: usize,

    /// One past the last physical line.
    pub end: usize,

    /// Text of each physical line, without line terminators.
    pub lines: Vec<String>,
}

impl Event {
    pub fn line_range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start
    }

    /// Whether the physical line `line` belongs to this event.
    pub fn contains_line(&self, line: usize) -> bool {
        self.line_range().contains(&line)
    }

    /// The event text with lines joined by `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Normalised severity levels, ordered from most to least severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    #[default]
    Unknown,
}

impl Severity {
    /// Map a captured severity string to a level. Case-insensitive; accepts
    /// the usual single-letter and long spellings.
    pub fn from_raw(raw: &str) -> Severity {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fatal" | "critical" | "crit" | "severe" | "emerg" | "emergency" | "alert"
            | "f" | "c" | "a" => Severity::Critical,
            "error" | "err" | "e" => Severity::Error,
            "warning" | "warn" | "w" => Severity::Warning,
            "info" | "information" | "notice" | "i" | "n" => Severity::Info,
            "debug" | "dbg" | "trace" | "verbose" | "fine" | "finer" | "finest" | "d" | "t"
            | "v" => Severity::Debug,
            _ => Severity::Unknown,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
            Severity::Debug => "Debug",
            Severity::Unknown => "Unknown",
        }
    }

    /// Short label for compact display.
    pub fn short_label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRIT",
            Severity::Error => "ERR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
            Severity::Debug => "DBG",
            Severity::Unknown => "???",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Time value
// =============================================================================

/// A parsed time capture, kept at the precision the format string encodes.
///
/// No timezone is assumed and no year is inferred: a format without an
/// offset yields `Local`, a format without a date yields `TimeOfDay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TimeValue {
    /// Date, time and UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Date and time with no offset.
    Local(NaiveDateTime),
    /// Date only.
    Date(NaiveDate),
    /// Time of day only (including year-less date formats).
    TimeOfDay(NaiveTime),
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Zoned(dt) => f.write_str(&dt.to_rfc3339()),
            TimeValue::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            TimeValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TimeValue::TimeOfDay(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
        }
    }
}

// =============================================================================
// Extracted fields (output of extraction)
// =============================================================================

/// Structured view of one event.
///
/// Every field is independently optional: a failed time parse leaves
/// severity and category untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedFields {
    /// Parsed time capture, if enabled, present and parseable.
    pub time: Option<TimeValue>,

    /// Severity capture text.
    pub severity: Option<String>,

    /// Category capture text.
    pub category: Option<String>,

    /// Free-text remainder after the last enabled field capture, or the whole
    /// raw text when the pattern did not match.
    pub message: String,

    /// Positional capture groups (group 1 first) of the winning match.
    pub groups: Vec<Option<String>>,

    /// The event text this record was extracted from.
    pub raw: String,

    /// Whether the full-event pattern matched at all.
    pub matched: bool,
}

impl ExtractedFields {
    /// A record with every field absent, for events the pattern did not match.
    pub fn unstructured(raw: String) -> Self {
        Self {
            time: None,
            severity: None,
            category: None,
            message: raw.clone(),
            groups: Vec::new(),
            raw,
            matched: false,
        }
    }

    /// Normalised severity of the captured severity text.
    pub fn level(&self) -> Severity {
        self.severity
            .as_deref()
            .map(Severity::from_raw)
            .unwrap_or_default()
    }

    /// True when no field was recovered.
    pub fn is_unstructured(&self) -> bool {
        self.time.is_none() && self.severity.is_none() && self.category.is_none()
    }
}

/// An event paired with its extracted fields, as handed to exporters.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub fields: ExtractedFields,
}

// =============================================================================
// Visibility result
// =============================================================================

/// Which physical lines are hidden, computed wholesale for one document
/// version and one hidden-substring set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityResult {
    /// Sequence number of the computation that produced this result.
    pub generation: u64,

    /// Version of the document the result was computed against.
    pub document_version: u64,

    hidden: Vec<bool>,
}

impl VisibilityResult {
    pub fn new(generation: u64, document_version: u64, hidden: Vec<bool>) -> Self {
        Self {
            generation,
            document_version,
            hidden,
        }
    }

    /// Result with every line visible.
    pub fn all_visible(generation: u64, document_version: u64, line_count: usize) -> Self {
        Self::new(generation, document_version, vec![false; line_count])
    }

    /// Whether `line` is hidden. Lines outside the computed range are visible.
    pub fn is_hidden(&self, line: usize) -> bool {
        self.hidden.get(line).copied().unwrap_or(false)
    }

    pub fn line_count(&self) -> usize {
        self.hidden.len()
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.iter().filter(|h| **h).count()
    }

    /// Per-line hidden flags, indexed by physical line.
    pub fn hidden_flags(&self) -> &[bool] {
        &self.hidden
    }

    /// Maximal runs of hidden lines as half-open ranges, i.e. fold regions.
    pub fn hidden_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start: Option<usize> = None;
        for (i, hidden) in self.hidden.iter().enumerate() {
            match (hidden, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    ranges.push(s..i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            ranges.push(s..self.hidden.len());
        }
        ranges
    }
}
