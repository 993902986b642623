// LogFold - core/profile.rs
//
// Pattern profile loading, validation, compilation and auto-detection.
// Core layer: accepts TOML strings and line samples, never touches the
// filesystem. I/O is handled by app::profile_mgr which feeds content here.
//
// Profiles come from persisted, untrusted state. Compilation therefore never
// fails outright: a bad line-start pattern degrades to one-event-per-line, a
// bad full-event pattern degrades to unstructured events, and a bad time
// format disables time extraction. Each problem is reported once, through
// `CompiledProfile::diagnostics`.

use crate::core::model::PatternProfile;
use crate::util::constants;
use crate::util::error::ProfileError;
use chrono::format::{Item, StrftimeItems};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw TOML profile definition as deserialized from a .toml file.
#[derive(Debug, Deserialize)]
pub struct ProfileDefinition {
    pub profile: ProfileMeta,
    pub parsing: ParsingDef,
    #[serde(default)]
    pub groups: GroupsDef,
}

#[derive(Debug, Deserialize)]
pub struct ProfileMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ParsingDef {
    pub full_event_pattern: String,
    #[serde(default)]
    pub line_start_pattern: String,
    #[serde(default)]
    pub time_format: String,
    #[serde(default)]
    pub match_full_event_against_every_line: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct GroupsDef {
    #[serde(default)]
    pub time: usize,
    #[serde(default)]
    pub severity: usize,
    #[serde(default)]
    pub category: usize,
}

/// Parse a TOML string into a `ProfileDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_profile_toml(
    toml_content: &str,
    source_path: &Path,
) -> Result<ProfileDefinition, ProfileError> {
    toml::from_str(toml_content).map_err(|e| ProfileError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Check required fields and turn a definition into a `PatternProfile`.
///
/// Pattern syntax is *not* checked here; see `validate` and
/// `CompiledProfile::compile`.
pub fn into_profile(def: ProfileDefinition) -> Result<PatternProfile, ProfileError> {
    let id = def.profile.id;

    if id.is_empty() {
        return Err(ProfileError::MissingField {
            profile_id: "(empty)".to_string(),
            field: "profile.id",
        });
    }
    if def.profile.name.is_empty() {
        return Err(ProfileError::MissingField {
            profile_id: id,
            field: "profile.name",
        });
    }
    if def.parsing.full_event_pattern.is_empty() {
        return Err(ProfileError::MissingField {
            profile_id: id,
            field: "parsing.full_event_pattern",
        });
    }

    for (field, index) in [
        ("groups.time", def.groups.time),
        ("groups.severity", def.groups.severity),
        ("groups.category", def.groups.category),
    ] {
        if index > constants::MAX_CAPTURE_GROUP_INDEX {
            return Err(ProfileError::GroupOutOfRange {
                profile_id: id,
                field,
                index,
                max: constants::MAX_CAPTURE_GROUP_INDEX,
            });
        }
    }

    Ok(PatternProfile {
        id,
        name: def.profile.name,
        description: def.profile.description,
        full_event_pattern: def.parsing.full_event_pattern,
        line_start_pattern: def.parsing.line_start_pattern,
        time_format: def.parsing.time_format,
        time_group: def.groups.time,
        severity_group: def.groups.severity,
        category_group: def.groups.category,
        match_full_event_against_every_line: def.parsing.match_full_event_against_every_line,
    })
}

// =============================================================================
// Validation
// =============================================================================

/// One validation finding, reported against a single profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

/// Check both patterns and the time format of `profile`.
///
/// Every check runs independently, so a bad time format does not hide a bad
/// regex. Never mutates the profile and never fails; an empty list means the
/// profile is usable as-is.
pub fn validate(profile: &PatternProfile) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Err(e) = compile_full_event(profile) {
        issues.push(issue_from(&e));
    }
    if let Err(e) = compile_line_start(profile) {
        issues.push(issue_from(&e));
    }
    if let Err(e) = check_time_format(&profile.id, &profile.time_format) {
        issues.push(issue_from(&e));
    }

    issues
}

fn issue_from(err: &ProfileError) -> ValidationIssue {
    let message = match err {
        ProfileError::InvalidRegex { source, .. } => source.to_string(),
        ProfileError::InvalidTimeFormat { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    ValidationIssue {
        field: err.field().unwrap_or("profile"),
        message,
    }
}

/// Compile a regex pattern with length and compiled-size limits.
fn compile_regex(
    profile_id: &str,
    field: &'static str,
    pattern: &str,
    multi_line: bool,
) -> Result<Regex, ProfileError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(ProfileError::RegexTooLong {
            profile_id: profile_id.to_string(),
            field,
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    RegexBuilder::new(pattern)
        .multi_line(multi_line)
        .size_limit(constants::MAX_REGEX_COMPILED_SIZE)
        .build()
        .map_err(|e| ProfileError::InvalidRegex {
            profile_id: profile_id.to_string(),
            field,
            pattern: pattern.to_string(),
            source: e,
        })
}

/// The full-event pattern runs in multi-line mode so `^` and `$` anchor at
/// physical line boundaries when it is applied to a joined event.
fn compile_full_event(profile: &PatternProfile) -> Result<Regex, ProfileError> {
    compile_regex(
        &profile.id,
        "full_event_pattern",
        &profile.full_event_pattern,
        true,
    )
}

/// `Ok(None)` when the line-start pattern is empty (grouping disabled).
fn compile_line_start(profile: &PatternProfile) -> Result<Option<Regex>, ProfileError> {
    if profile.line_start_pattern.is_empty() {
        return Ok(None);
    }
    compile_regex(
        &profile.id,
        "line_start_pattern",
        &profile.line_start_pattern,
        false,
    )
    .map(Some)
}

/// Reject format strings chrono cannot interpret (unknown or truncated
/// `%` specifiers).
pub fn check_time_format(profile_id: &str, format: &str) -> Result<(), ProfileError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ProfileError::InvalidTimeFormat {
            profile_id: profile_id.to_string(),
            format: format.to_string(),
            reason: "unrecognised or incomplete '%' specifier".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Compiled profile
// =============================================================================

/// How event boundaries are detected.
#[derive(Debug, Clone)]
pub enum LineStart {
    /// Every physical line begins a new event.
    EveryLine,
    /// A line begins a new event when this pattern matches at offset 0.
    Pattern(Regex),
}

/// Runtime form of a `PatternProfile`: regexes compiled once, fallbacks
/// chosen for anything malformed.
#[derive(Debug)]
pub struct CompiledProfile {
    profile: PatternProfile,
    fingerprint: u64,
    full_event: Option<Regex>,
    line_start: LineStart,
    line_start_error: Option<usize>,
    time_format: Option<String>,
    diagnostics: Vec<ProfileError>,
}

impl CompiledProfile {
    /// Compile `profile`. Never fails; problems land in `diagnostics()` and
    /// the affected step runs in its fallback mode.
    pub fn compile(profile: &PatternProfile) -> Self {
        let mut diagnostics = Vec::new();

        let full_event = match compile_full_event(profile) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    error = %e,
                    "Full-event pattern unusable; events will be unstructured"
                );
                diagnostics.push(e);
                None
            }
        };

        let mut line_start_error = None;
        let line_start = match compile_line_start(profile) {
            Ok(Some(re)) => LineStart::Pattern(re),
            Ok(None) => LineStart::EveryLine,
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    error = %e,
                    "Line-start pattern unusable; falling back to one event per line"
                );
                line_start_error = Some(diagnostics.len());
                diagnostics.push(e);
                LineStart::EveryLine
            }
        };

        let time_format = match check_time_format(&profile.id, &profile.time_format) {
            Ok(()) => Some(profile.time_format.clone()),
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    error = %e,
                    "Time format unusable; time extraction disabled"
                );
                diagnostics.push(e);
                None
            }
        };

        // A group past the end of the pattern is legal but can never match.
        if let Some(re) = &full_event {
            let available = re.captures_len().saturating_sub(1);
            for (field, index) in [
                ("time_group", profile.time_group),
                ("severity_group", profile.severity_group),
                ("category_group", profile.category_group),
            ] {
                if index > available {
                    tracing::debug!(
                        profile_id = %profile.id,
                        field,
                        index,
                        available,
                        "Capture group index exceeds pattern groups; field will be absent"
                    );
                }
            }
        }

        tracing::debug!(
            profile_id = %profile.id,
            degraded = !diagnostics.is_empty(),
            "Profile compiled"
        );

        Self {
            fingerprint: profile.fingerprint(),
            profile: profile.clone(),
            full_event,
            line_start,
            line_start_error,
            time_format,
            diagnostics,
        }
    }

    pub fn profile(&self) -> &PatternProfile {
        &self.profile
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Compiled full-event pattern, or `None` when it failed to compile.
    pub fn full_event(&self) -> Option<&Regex> {
        self.full_event.as_ref()
    }

    pub fn line_start(&self) -> &LineStart {
        &self.line_start
    }

    /// The compile error of the line-start pattern, if segmentation is
    /// running in its fallback mode because of one.
    pub fn line_start_error(&self) -> Option<&ProfileError> {
        self.line_start_error.and_then(|i| self.diagnostics.get(i))
    }

    /// Validated time format, or `None` when it was rejected.
    pub fn time_format(&self) -> Option<&str> {
        self.time_format.as_deref()
    }

    /// Every compile-time problem found, each reported once.
    pub fn diagnostics(&self) -> &[ProfileError] {
        &self.diagnostics
    }

    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Whether `line` begins a new event.
    pub fn starts_event(&self, line: &str) -> bool {
        match &self.line_start {
            LineStart::EveryLine => true,
            LineStart::Pattern(re) => re.find(line).is_some_and(|m| m.start() == 0),
        }
    }
}

// =============================================================================
// Compiled-profile cache
// =============================================================================

/// Compiled profiles keyed by id, recompiled only when the profile's
/// fingerprint changes.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<String, Arc<CompiledProfile>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled form of `profile`, compiling on first use or
    /// after the profile was edited.
    pub fn get_or_compile(&mut self, profile: &PatternProfile) -> Arc<CompiledProfile> {
        let fingerprint = profile.fingerprint();
        if let Some(hit) = self.entries.get(&profile.id) {
            if hit.fingerprint() == fingerprint {
                return Arc::clone(hit);
            }
        }
        let compiled = Arc::new(CompiledProfile::compile(profile));
        self.entries.insert(profile.id.clone(), Arc::clone(&compiled));
        compiled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Auto-detection
// =============================================================================

/// Result of attempting to auto-detect a document's profile.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Id of the best matching profile.
    pub profile_id: String,
    /// Fraction (0.0 - 1.0) of non-blank sample lines its pattern matched.
    pub confidence: f64,
}

/// Pick the profile whose full-event pattern matches the most sample lines.
///
/// The fallback profile is skipped (it matches everything), as are profiles
/// whose full-event pattern does not compile. Returns `None` when no profile
/// reaches `AUTO_DETECT_MIN_CONFIDENCE`. Ties go to the earlier profile.
pub fn detect_profile<S: AsRef<str>>(
    sample_lines: &[S],
    profiles: &[PatternProfile],
) -> Option<DetectionResult> {
    let samples: Vec<&str> = sample_lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|l| !l.trim().is_empty())
        .collect();

    if samples.is_empty() || profiles.is_empty() {
        return None;
    }

    let mut best: Option<DetectionResult> = None;

    for profile in profiles {
        if profile.id == constants::FALLBACK_PROFILE_ID {
            continue;
        }
        let Ok(re) = compile_full_event(profile) else {
            continue;
        };

        let matches = samples.iter().filter(|line| re.is_match(line)).count();
        let confidence = matches as f64 / samples.len() as f64;

        if confidence >= constants::AUTO_DETECT_MIN_CONFIDENCE
            && best.as_ref().map_or(true, |b| confidence > b.confidence)
        {
            best = Some(DetectionResult {
                profile_id: profile.id.clone(),
                confidence,
            });
        }
    }

    tracing::debug!(result = ?best, samples = samples.len(), "Auto-detection complete");

    best
}

// =============================================================================
// Built-in profiles (embedded at compile time)
// =============================================================================

/// Embedded TOML content for built-in profiles.
/// Each tuple is (filename, TOML content).
pub fn builtin_profile_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "intellij_idea.toml",
            include_str!("../../profiles/intellij_idea.toml"),
        ),
        (
            "log4j_default.toml",
            include_str!("../../profiles/log4j_default.toml"),
        ),
        (
            "iso_timestamp.toml",
            include_str!("../../profiles/iso_timestamp.toml"),
        ),
        (
            "syslog_rfc3164.toml",
            include_str!("../../profiles/syslog_rfc3164.toml"),
        ),
        (
            "plain_lines.toml",
            include_str!("../../profiles/plain_lines.toml"),
        ),
    ]
}

/// Load all built-in profiles.
///
/// Unreadable definitions are logged and skipped (non-fatal).
pub fn load_builtin_profiles() -> Vec<PatternProfile> {
    let mut profiles = Vec::new();

    for (filename, content) in builtin_profile_sources() {
        let path = Path::new("<builtin>").join(filename);
        match parse_profile_toml(content, &path).and_then(into_profile) {
            Ok(profile) => {
                tracing::debug!(profile_id = %profile.id, "Loaded built-in profile");
                profiles.push(profile);
            }
            Err(e) => {
                tracing::error!(file = filename, error = %e, "Failed to load built-in profile");
            }
        }
    }

    profiles
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_PROFILE_TOML: &str = r#"
[profile]
id = "test-profile"
name = "Test Profile"
description = "A test profile"

[parsing]
full_event_pattern = '^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) (\w+) \[(\w+)\] (.*)$'
line_start_pattern = '^\d{4}-\d{2}-\d{2}'
time_format = "%Y-%m-%d %H:%M:%S"

[groups]
time = 1
severity = 2
category = 3
"#;

    fn valid_profile() -> PatternProfile {
        let path = PathBuf::from("test.toml");
        into_profile(parse_profile_toml(VALID_PROFILE_TOML, &path).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_valid_profile() {
        let profile = valid_profile();
        assert_eq!(profile.id, "test-profile");
        assert_eq!(profile.name, "Test Profile");
        assert_eq!(profile.time_group, 1);
        assert_eq!(profile.category_group, 3);
        assert!(!profile.match_full_event_against_every_line);
    }

    #[test]
    fn test_validate_valid_profile_is_empty() {
        assert!(validate(&valid_profile()).is_empty());
    }

    #[test]
    fn test_validate_reports_each_field_independently() {
        let profile = PatternProfile {
            id: "broken".to_string(),
            full_event_pattern: "([a-z".to_string(),
            line_start_pattern: "(?P<".to_string(),
            time_format: "%Y-%".to_string(),
            ..Default::default()
        };
        let before = profile.clone();
        let issues = validate(&profile);
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec!["full_event_pattern", "line_start_pattern", "time_format"]
        );
        assert!(issues.iter().all(|i| !i.message.is_empty()));
        assert_eq!(profile, before, "validation must not mutate the profile");
    }

    #[test]
    fn test_bad_time_format_does_not_hide_regex_error() {
        let profile = PatternProfile {
            id: "p".to_string(),
            full_event_pattern: "(".to_string(),
            time_format: "%".to_string(),
            ..Default::default()
        };
        assert_eq!(validate(&profile).len(), 2);
    }

    #[test]
    fn test_regex_too_long() {
        let profile = PatternProfile {
            id: "long".to_string(),
            full_event_pattern: "a".repeat(constants::MAX_REGEX_PATTERN_LENGTH + 1),
            ..Default::default()
        };
        let compiled = CompiledProfile::compile(&profile);
        assert!(compiled.full_event().is_none());
        assert!(matches!(
            compiled.diagnostics()[0],
            ProfileError::RegexTooLong { .. }
        ));
    }

    #[test]
    fn test_compile_degrades_bad_line_start_to_every_line() {
        let profile = PatternProfile {
            id: "p".to_string(),
            full_event_pattern: "(.*)".to_string(),
            line_start_pattern: "[unclosed".to_string(),
            ..Default::default()
        };
        let compiled = CompiledProfile::compile(&profile);
        assert!(matches!(compiled.line_start(), LineStart::EveryLine));
        assert!(compiled
            .line_start_error()
            .is_some_and(ProfileError::is_pattern_compile_error));
        assert_eq!(compiled.diagnostics().len(), 1);
        assert!(compiled.starts_event("anything"));
    }

    #[test]
    fn test_starts_event_requires_match_at_line_start() {
        let profile = PatternProfile {
            id: "p".to_string(),
            full_event_pattern: "(.*)".to_string(),
            line_start_pattern: r"\d{4}".to_string(),
            ..Default::default()
        };
        let compiled = CompiledProfile::compile(&profile);
        assert!(compiled.starts_event("2024 ok"));
        assert!(!compiled.starts_event("  at 2024"));
    }

    #[test]
    fn test_missing_required_field() {
        let toml = r#"
[profile]
id = ""
name = "Empty ID"

[parsing]
full_event_pattern = "(.*)"
"#;
        let path = PathBuf::from("bad.toml");
        let def = parse_profile_toml(toml, &path).unwrap();
        match into_profile(def).unwrap_err() {
            ProfileError::MissingField { field, .. } => assert_eq!(field, "profile.id"),
            other => panic!("Expected MissingField, got: {other:?}"),
        }
    }

    #[test]
    fn test_group_index_out_of_range_rejected() {
        let toml = r#"
[profile]
id = "p"
name = "P"

[parsing]
full_event_pattern = "(.*)"

[groups]
time = 1000
"#;
        let def = parse_profile_toml(toml, &PathBuf::from("p.toml")).unwrap();
        assert!(matches!(
            into_profile(def),
            Err(ProfileError::GroupOutOfRange { .. })
        ));
    }

    #[test]
    fn test_cache_recompiles_only_on_change() {
        let mut cache = ProfileCache::new();
        let mut profile = valid_profile();
        let a = cache.get_or_compile(&profile);
        let b = cache.get_or_compile(&profile);
        assert!(Arc::ptr_eq(&a, &b));

        profile.severity_group = 0;
        let c = cache.get_or_compile(&profile);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compiled_profile_is_shared_not_copied() {
        let mut cache = ProfileCache::new();
        let bad = PatternProfile {
            full_event_pattern: "(unclosed".to_string(),
            ..valid_profile()
        };
        let compiled = cache.get_or_compile(&bad);
        let handle = {
            let shared = Arc::clone(&compiled);
            std::thread::spawn(move || shared.diagnostics().len())
        };
        assert_eq!(handle.join().unwrap(), 1);
        assert!(Arc::ptr_eq(&compiled, &cache.get_or_compile(&bad)));
    }

    #[test]
    fn test_detect_profile_picks_best_match() {
        let profiles = load_builtin_profiles();
        let sample = vec![
            "2024-01-15 14:30:22,123 [main] ERROR com.example.App - Connection failed",
            "java.net.ConnectException: refused",
            "2024-01-15 14:30:23,001 [main] INFO com.example.App - Retrying",
        ];
        let result = detect_profile(&sample, &profiles).expect("should detect");
        assert_eq!(result.profile_id, "log4j");
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn test_detect_profile_no_match() {
        let profiles = load_builtin_profiles();
        let sample = vec!["no match here", "also no match", "nothing at all"];
        assert!(detect_profile(&sample, &profiles).is_none());
    }

    #[test]
    fn test_load_builtin_profiles() {
        let profiles = load_builtin_profiles();
        assert_eq!(profiles.len(), builtin_profile_sources().len());
        assert!(profiles
            .iter()
            .any(|p| p.id == constants::FALLBACK_PROFILE_ID));
        for profile in &profiles {
            assert!(
                validate(profile).is_empty(),
                "built-in profile {} should validate",
                profile.id
            );
        }
    }
}
