// LogFold - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.
//
// Severity policy:
//   - ProfileError: surfaced once per profile compile/validation; the engine
//     degrades to a safe fallback instead of aborting.
//   - FieldParseError: always recovered locally (one field becomes absent).
//   - SelectionUnavailable: a normal negative result, not a fault.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal errors surfaced by the command-line host. Engine problems are
/// recovered where they occur and reported through the narrower types below.
#[derive(Debug)]
pub enum LogFoldError {
    /// Export operation failed.
    Export(ExportError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogFoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogFoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Export(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

/// Errors related to pattern profile loading, compilation and validation.
#[derive(Debug)]
pub enum ProfileError {
    /// The profile file is not valid TOML.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The profile file is larger than `MAX_PROFILE_FILE_SIZE`.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// `id`, `name` or `full_event_pattern` is empty or absent.
    MissingField {
        profile_id: String,
        field: &'static str,
    },

    /// A regex pattern in the profile does not compile.
    InvalidRegex {
        profile_id: String,
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// A pattern is longer than `MAX_REGEX_PATTERN_LENGTH` bytes.
    RegexTooLong {
        profile_id: String,
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    /// The time format string is not a valid chrono format.
    InvalidTimeFormat {
        profile_id: String,
        format: String,
        reason: String,
    },

    /// A capture-group index is outside the supported range.
    GroupOutOfRange {
        profile_id: String,
        field: &'static str,
        index: usize,
        max: usize,
    },

    /// More than `MAX_PROFILES` profiles were found.
    TooManyProfiles { count: usize, max: usize },

    /// A profile file or directory could not be read.
    Io { path: PathBuf, source: io::Error },
}

impl ProfileError {
    /// The profile field this error is reported against, when it has one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field, .. }
            | Self::InvalidRegex { field, .. }
            | Self::RegexTooLong { field, .. }
            | Self::GroupOutOfRange { field, .. } => Some(field),
            Self::InvalidTimeFormat { .. } => Some("time_format"),
            _ => None,
        }
    }

    /// True for malformed or oversized regular expressions.
    pub fn is_pattern_compile_error(&self) -> bool {
        matches!(self, Self::InvalidRegex { .. } | Self::RegexTooLong { .. })
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => write!(
                f,
                "profile file '{}' is not valid TOML: {source}",
                path.display()
            ),
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "profile file '{}' is {size} bytes (limit {max_size})",
                path.display()
            ),
            Self::MissingField { profile_id, field } => {
                write!(f, "profile '{profile_id}' has no value for '{field}'")
            }
            Self::InvalidRegex {
                profile_id,
                field,
                pattern,
                source,
            } => write!(
                f,
                "profile '{profile_id}': {field} /{pattern}/ does not compile: {source}"
            ),
            Self::RegexTooLong {
                profile_id,
                field,
                length,
                max_length,
            } => write!(
                f,
                "profile '{profile_id}': {field} is {length} bytes long \
                 (limit {max_length})"
            ),
            Self::InvalidTimeFormat {
                profile_id,
                format,
                reason,
            } => write!(
                f,
                "profile '{profile_id}': time format '{format}' rejected: {reason}"
            ),
            Self::GroupOutOfRange {
                profile_id,
                field,
                index,
                max,
            } => write!(
                f,
                "profile '{profile_id}': {field} = {index} \
                 is not a usable group index (0-{max})"
            ),
            Self::TooManyProfiles { count, max } => write!(
                f,
                "{count} profiles available, only the first {max} are kept"
            ),
            Self::Io { path, source } => {
                write!(f, "cannot read profile '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Field parse errors
// ---------------------------------------------------------------------------

/// A captured field could not be turned into a structured value.
/// Recovered locally: the field is reported as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldParseError {
    /// The time capture did not parse with the profile's time format.
    Time {
        line: usize,
        group: usize,
        raw: String,
        format: String,
        reason: String,
    },
}

impl fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time {
                line,
                group,
                raw,
                format,
                reason,
            } => write!(
                f,
                "line {line}: group {group} value '{raw}' does not match \
                 time format '{format}': {reason}"
            ),
        }
    }
}

impl std::error::Error for FieldParseError {}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Why no hidden substring could be derived from a caret or selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionUnavailable {
    /// The (expanded) span is empty, e.g. the caret sits between spaces.
    Empty,

    /// The span is longer than the allowed maximum.
    TooLong { length: usize, max_length: usize },

    /// The selection does not address valid text in the line.
    OutOfBounds { start: usize, end: usize, len: usize },
}

impl fmt::Display for SelectionUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("nothing selected at the caret"),
            Self::TooLong { length, max_length } => write!(
                f,
                "selection is {length} characters, exceeds maximum of {max_length}"
            ),
            Self::OutOfBounds { start, end, len } => write!(
                f,
                "selection {start}..{end} is outside the line (length {len})"
            ),
        }
    }
}

impl std::error::Error for SelectionUnavailable {}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Failures while writing parsed events out.
#[derive(Debug)]
pub enum ExportError {
    /// The destination could not be written.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Export would exceed maximum event count.
    TooManyEvents { count: usize, max: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot write export '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV encoding failed for '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON encoding failed for '{}': {source}", path.display())
            }
            Self::TooManyEvents { count, max } => write!(
                f,
                "Export of {count} events exceeds maximum of {max}"
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for LogFoldError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Problems found while loading config.toml. All are non-fatal.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A value is outside its accepted set or range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => write!(
                f,
                "config file '{}' is not valid TOML: {source}",
                path.display()
            ),
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "config value {field} = '{value}' ignored, expected {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "cannot read config file '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for LogFold results.
pub type Result<T> = std::result::Result<T, LogFoldError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_profile_error_reports_field() {
        let err = ProfileError::InvalidTimeFormat {
            profile_id: "p".to_string(),
            format: "%Q".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(err.field(), Some("time_format"));
        assert!(!err.is_pattern_compile_error());
    }

    #[test]
    fn test_invalid_regex_keeps_source_chain() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ProfileError::InvalidRegex {
            profile_id: "p".to_string(),
            field: "line_start_pattern",
            pattern: "(".to_string(),
            source,
        };
        assert!(err.source().is_some(), "regex error must be chained");
        assert!(err.is_pattern_compile_error());
        assert!(err.to_string().contains("line_start_pattern"));
    }

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err = LogFoldError::Io {
            path: PathBuf::from("/var/log/app.log"),
            operation: "read log file",
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let text = err.to_string();
        assert!(text.contains("read log file"));
        assert!(text.contains("/var/log/app.log"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_selection_unavailable_display() {
        let err = SelectionUnavailable::TooLong {
            length: 150,
            max_length: 100,
        };
        assert!(err.to_string().contains("150"));
    }
}
