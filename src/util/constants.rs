// LogFold - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogFold";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogFold";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Profile limits
// =============================================================================

/// Maximum number of pattern profiles that can be loaded (built-in + user).
pub const MAX_PROFILES: usize = 100;

/// Maximum size of a profile TOML file in bytes.
pub const MAX_PROFILE_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Maximum regex pattern length. Longer patterns are rejected at compile
/// time and the engine falls back as if the pattern were malformed.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Compiled-size ceiling handed to `regex::RegexBuilder::size_limit`.
/// Keeps a hostile pattern from blowing up the compiled automaton.
pub const MAX_REGEX_COMPILED_SIZE: usize = 2 * 1024 * 1024;

/// Highest capture-group index a profile may reference.
pub const MAX_CAPTURE_GROUP_INDEX: usize = 100;

// =============================================================================
// Auto-detection
// =============================================================================

/// Number of lines sampled from the start of a document for profile detection.
pub const DEFAULT_DETECTION_SAMPLE_LINES: usize = 25;

/// Minimum fraction (0.0-1.0) of sampled lines a profile's full-event
/// pattern must match for detection to accept it.
pub const AUTO_DETECT_MIN_CONFIDENCE: f64 = 0.3;

// =============================================================================
// Visibility
// =============================================================================

/// Longest substring (in characters) that may be derived from a caret or
/// selection and added to the hidden set.
pub const MAX_HIDDEN_SUBSTRING_CHARS: usize = 100;

/// Number of characters of a hidden substring shown in an action label
/// before it is elided with "...".
pub const HIDE_ACTION_LABEL_CHARS: usize = 25;

/// Line count above which the visibility pass is split across the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD_LINES: usize = 10_000;

/// Bounds for the user-configurable parallel threshold.
pub const MIN_PARALLEL_THRESHOLD_LINES: usize = 100;
pub const MAX_PARALLEL_THRESHOLD_LINES: usize = 10_000_000;

/// How long the CLI waits for a background visibility pass before giving up.
pub const VISIBILITY_WAIT_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Export
// =============================================================================

/// Maximum number of events that can be exported in a single operation.
pub const MAX_EXPORT_EVENTS: usize = 5_000_000;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User profiles subdirectory name.
pub const PROFILES_DIR_NAME: &str = "profiles";

/// Id of the built-in profile used when nothing else matches.
pub const FALLBACK_PROFILE_ID: &str = "plain-lines";
