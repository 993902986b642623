// LogFold - app/profile_mgr.rs
//
// Loads pattern profiles from the built-in set (embedded in the binary)
// and from user-defined TOML files on disk, and picks the profile to use
// for a document. User profiles override built-in profiles with the same ID.

use crate::core::model::PatternProfile;
use crate::core::profile::{self, DetectionResult};
use crate::util::constants;
use crate::util::error::ProfileError;
use std::path::Path;

/// Load all available profiles: built-in first, then user-defined overrides.
///
/// Files that cannot be read or parsed are skipped and reported. Profiles
/// that load but fail validation are kept (the engine degrades around bad
/// patterns) and their issues are logged.
///
/// Returns the merged list and any non-fatal errors encountered.
pub fn load_all_profiles(
    user_profile_dir: Option<&Path>,
) -> (Vec<PatternProfile>, Vec<ProfileError>) {
    let mut profiles = profile::load_builtin_profiles();
    let mut errors = Vec::new();

    tracing::info!(builtin_count = profiles.len(), "Loaded built-in profiles");

    if let Some(dir) = user_profile_dir {
        if dir.is_dir() {
            let (user_profiles, user_errors) = load_user_profiles(dir);
            errors.extend(user_errors);

            for user_profile in user_profiles {
                if let Some(pos) = profiles.iter().position(|p| p.id == user_profile.id) {
                    tracing::info!(
                        profile_id = %user_profile.id,
                        "User profile overrides built-in"
                    );
                    profiles[pos] = user_profile;
                } else {
                    tracing::info!(
                        profile_id = %user_profile.id,
                        "Loaded user-defined profile"
                    );
                    profiles.push(user_profile);
                }
            }
        } else {
            tracing::debug!(
                dir = %dir.display(),
                "User profile directory does not exist (skipping)"
            );
        }
    }

    if profiles.len() > constants::MAX_PROFILES {
        tracing::warn!(
            count = profiles.len(),
            max = constants::MAX_PROFILES,
            "Too many profiles loaded, truncating"
        );
        errors.push(ProfileError::TooManyProfiles {
            count: profiles.len(),
            max: constants::MAX_PROFILES,
        });
        profiles.truncate(constants::MAX_PROFILES);
    }

    tracing::info!(total = profiles.len(), "Profile loading complete");

    (profiles, errors)
}

/// Load user-defined profiles from a directory, in file-name order.
fn load_user_profiles(dir: &Path) -> (Vec<PatternProfile>, Vec<ProfileError>) {
    let mut profiles = Vec::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(ProfileError::Io {
                path: dir.to_path_buf(),
                source: e,
            });
            return (profiles, errors);
        }
    };

    let mut paths = Vec::new();
    for entry_result in entries {
        match entry_result {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => errors.push(ProfileError::Io {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }
    paths.retain(|p| p.extension().and_then(|e| e.to_str()) == Some("toml"));
    paths.sort();

    for path in paths {
        match load_profile_file(&path) {
            Ok(p) => {
                for issue in profile::validate(&p) {
                    tracing::warn!(
                        profile_id = %p.id,
                        field = issue.field,
                        message = %issue.message,
                        "Profile validation issue"
                    );
                }
                profiles.push(p);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping profile file");
                errors.push(e);
            }
        }
    }

    (profiles, errors)
}

/// Read, size-check and parse one profile file.
pub fn load_profile_file(path: &Path) -> Result<PatternProfile, ProfileError> {
    let metadata = std::fs::metadata(path).map_err(|e| ProfileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > constants::MAX_PROFILE_FILE_SIZE {
        return Err(ProfileError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_PROFILE_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ProfileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    profile::parse_profile_toml(&content, path).and_then(profile::into_profile)
}

/// Pick the profile for a document.
///
/// An explicitly requested ID wins when it exists. Otherwise the sample is
/// auto-detected, and failing that the plain-lines fallback is used. Returns
/// `None` only when `profiles` holds neither a match nor the fallback.
pub fn resolve_profile<'p, S: AsRef<str>>(
    profiles: &'p [PatternProfile],
    requested: Option<&str>,
    sample: &[S],
) -> Option<&'p PatternProfile> {
    if let Some(id) = requested {
        match profiles.iter().find(|p| p.id == id) {
            Some(p) => return Some(p),
            None => tracing::warn!(profile_id = id, "Requested profile not found"),
        }
    }

    if let Some(DetectionResult {
        profile_id,
        confidence,
    }) = profile::detect_profile(sample, profiles)
    {
        tracing::info!(profile_id = %profile_id, confidence, "Auto-detected profile");
        if let Some(p) = profiles.iter().find(|p| p.id == profile_id) {
            return Some(p);
        }
    }

    profiles
        .iter()
        .find(|p| p.id == constants::FALLBACK_PROFILE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: &str = r#"
[profile]
id = "custom"
name = "Custom"

[parsing]
full_event_pattern = '^(\w+): (.*)$'
line_start_pattern = '^\w+:'

[groups]
severity = 1
"#;

    #[test]
    fn test_builtins_load_without_user_dir() {
        let (profiles, errors) = load_all_profiles(None);
        assert!(errors.is_empty());
        assert!(profiles
            .iter()
            .any(|p| p.id == constants::FALLBACK_PROFILE_ID));
    }

    #[test]
    fn test_user_profile_added_and_bad_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.toml"), CUSTOM).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not [valid toml").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (profiles, errors) = load_all_profiles(Some(dir.path()));
        assert!(profiles.iter().any(|p| p.id == "custom"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ProfileError::TomlParse { .. }));
    }

    #[test]
    fn test_user_profile_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let overriding = CUSTOM.replace("\"custom\"", "\"plain-lines\"");
        std::fs::write(dir.path().join("plain.toml"), overriding).unwrap();

        let (profiles, _) = load_all_profiles(Some(dir.path()));
        let plain: Vec<_> = profiles.iter().filter(|p| p.id == "plain-lines").collect();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].name, "Custom");
    }

    #[test]
    fn test_oversized_profile_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        let padding = "#".repeat(constants::MAX_PROFILE_FILE_SIZE as usize + 1);
        std::fs::write(&path, format!("{CUSTOM}\n{padding}")).unwrap();
        assert!(matches!(
            load_profile_file(&path),
            Err(ProfileError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_resolve_prefers_requested_then_detection_then_fallback() {
        let (profiles, _) = load_all_profiles(None);
        let sample = ["2024-01-15 14:30:22,123 [main] ERROR com.example.App - boom"];

        let p = resolve_profile(&profiles, Some("plain-lines"), &sample).unwrap();
        assert_eq!(p.id, "plain-lines");

        let p = resolve_profile(&profiles, None, &sample).unwrap();
        assert_eq!(p.id, "log4j");

        let p = resolve_profile(&profiles, Some("missing"), &["???"]).unwrap();
        assert_eq!(p.id, constants::FALLBACK_PROFILE_ID);
    }
}
