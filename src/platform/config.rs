// LogFold - platform/config.rs
//
// Platform-specific directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::export::ExportFormat;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogFold configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logfold/)
    pub config_dir: PathBuf,

    /// User profile directory (e.g. ~/.config/logfold/profiles/)
    pub user_profiles_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let user_profiles_dir = config_dir.join(constants::PROFILES_DIR_NAME);

            tracing::debug!(
                config = %config_dir.display(),
                profiles = %user_profiles_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                user_profiles_dir,
            }
        } else {
            tracing::warn!(
                "Could not determine platform directories, using current directory"
            );
            let fallback = PathBuf::from(".");
            Self {
                user_profiles_dir: fallback.join(constants::PROFILES_DIR_NAME),
                config_dir: fallback,
            }
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are ignored so a newer config file still loads.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub logging: LoggingSection,
    pub profiles: ProfilesSection,
    pub visibility: VisibilitySection,
    pub export: ExportSection,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// `[profiles]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProfilesSection {
    /// Directory of user profile TOML files, replacing the platform default.
    pub user_profile_directory: Option<String>,
    /// Profile id used when none is requested and detection fails.
    pub default_profile: Option<String>,
}

/// `[visibility]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct VisibilitySection {
    /// Documents longer than this are scanned on the rayon pool.
    pub parallel_threshold_lines: Option<usize>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// "csv" or "json".
    pub format: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub user_profile_dir: Option<PathBuf>,
    pub default_profile: Option<String>,
    pub parallel_threshold_lines: usize,
    pub export_format: ExportFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            log_file: None,
            user_profile_dir: None,
            default_profile: None,
            parallel_threshold_lines: constants::DEFAULT_PARALLEL_THRESHOLD_LINES,
            export_format: ExportFormat::default(),
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and every non-fatal problem
/// found. A missing file yields defaults with no warnings (first run). An
/// unreadable or unparseable file yields defaults and one warning.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<ConfigError>) {
    let mut warnings: Vec<ConfigError> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Using default configuration");
            warnings.push(err);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Using default configuration");
            warnings.push(err);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, &mut warnings);

    for w in &warnings {
        tracing::warn!(warning = %w, "Config value ignored, using default");
    }

    (config, warnings)
}

/// Check each raw value against its bounds, accumulating every problem.
fn validate(raw: RawConfig, warnings: &mut Vec<ConfigError>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "logging.level".to_string(),
                value: level.clone(),
                expected: "one of error, warn, info, debug, trace".to_string(),
            });
        }
    }

    // -- Logging: file --
    config.log_file = non_empty(raw.logging.file);

    // -- Profiles --
    let profile_dir = non_empty(raw.profiles.user_profile_directory);
    config.user_profile_dir = profile_dir.map(PathBuf::from);
    config.default_profile = non_empty(raw.profiles.default_profile);

    // -- Visibility: parallel_threshold_lines --
    if let Some(lines) = raw.visibility.parallel_threshold_lines {
        let (min, max) = (
            constants::MIN_PARALLEL_THRESHOLD_LINES,
            constants::MAX_PARALLEL_THRESHOLD_LINES,
        );
        if (min..=max).contains(&lines) {
            config.parallel_threshold_lines = lines;
        } else {
            warnings.push(ConfigError::ValueOutOfRange {
                field: "visibility.parallel_threshold_lines".to_string(),
                value: lines.to_string(),
                expected: format!("{min}-{max}"),
            });
        }
    }

    // -- Export: format --
    if let Some(ref format) = raw.export.format {
        match format.parse::<ExportFormat>() {
            Ok(f) => config.export_format = f,
            Err(_) => warnings.push(ConfigError::ValueOutOfRange {
                field: "export.format".to_string(),
                value: format.clone(),
                expected: "csv or json".to_string(),
            }),
        }
    }

    config
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(content: &str) -> (AppConfig, Vec<ConfigError>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        load_config(&path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("absent.toml"));
        assert!(warnings.is_empty());
        assert_eq!(
            config.parallel_threshold_lines,
            constants::DEFAULT_PARALLEL_THRESHOLD_LINES
        );
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, warnings) = load(
            r#"
[logging]
level = "DEBUG"
file = "/tmp/logfold.log"

[profiles]
user_profile_directory = "/opt/profiles"
default_profile = "log4j"

[visibility]
parallel_threshold_lines = 5000

[export]
format = "json"
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file.as_deref(), Some("/tmp/logfold.log"));
        assert_eq!(
            config.user_profile_dir,
            Some(PathBuf::from("/opt/profiles"))
        );
        assert_eq!(config.default_profile.as_deref(), Some("log4j"));
        assert_eq!(config.parallel_threshold_lines, 5000);
        assert_eq!(config.export_format, ExportFormat::Json);
    }

    #[test]
    fn test_invalid_values_warn_and_fall_back() {
        let (config, warnings) = load(
            r#"
[logging]
level = "loud"

[visibility]
parallel_threshold_lines = 1

[export]
format = "xml"
"#,
        );
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, ConfigError::ValueOutOfRange { .. })));
        assert!(config.log_level.is_none());
        assert_eq!(
            config.parallel_threshold_lines,
            constants::DEFAULT_PARALLEL_THRESHOLD_LINES
        );
        assert_eq!(config.export_format, ExportFormat::Csv);
    }

    #[test]
    fn test_unparseable_file_warns() {
        let (_, warnings) = load("[logging\nlevel=");
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_unknown_sections_ignored() {
        let (_, warnings) = load("[future]\nflag = true\n");
        assert!(warnings.is_empty());
    }
}
