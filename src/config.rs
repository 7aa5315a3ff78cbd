use tracing::warn;

use crate::imaging::ThresholdProfile;

/// Application-level constants
pub const APP_NAME: &str = "Scanlens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the built-in threshold profile.
pub const PROFILE_ENV_VAR: &str = "SCANLENS_PROFILE";

/// Log directive used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "scanlens_lib=info"
}

/// Resolve the active profile from `SCANLENS_PROFILE`.
/// Missing or unrecognized values fall back to the clinical profile.
pub fn profile_from_env() -> ThresholdProfile {
    match std::env::var(PROFILE_ENV_VAR) {
        Ok(name) => resolve_profile_name(&name),
        Err(_) => ThresholdProfile::clinical(),
    }
}

fn resolve_profile_name(name: &str) -> ThresholdProfile {
    ThresholdProfile::from_name(name).unwrap_or_else(|| {
        warn!(profile = name, "Unknown profile name, using clinical");
        ThresholdProfile::clinical()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_scanlens() {
        assert_eq!(APP_NAME, "Scanlens");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn log_filter_targets_library() {
        assert!(default_log_filter().starts_with("scanlens_lib"));
    }

    #[test]
    fn known_names_resolve() {
        assert_eq!(resolve_profile_name("perfect"), ThresholdProfile::perfect());
        assert_eq!(resolve_profile_name("CLINICAL"), ThresholdProfile::clinical());
    }

    #[test]
    fn unknown_name_falls_back_to_clinical() {
        assert_eq!(resolve_profile_name("experimental"), ThresholdProfile::clinical());
        assert_eq!(resolve_profile_name(""), ThresholdProfile::clinical());
    }
}
