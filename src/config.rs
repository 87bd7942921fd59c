//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::tour::catalog::KnownTour;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Settings owner. The client is single-user, so this is almost always
    /// the default.
    pub user_id: String,
    /// Tour started when `start` is called without a name.
    pub default_tour: String,
    /// libSQL file for durable settings. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// Whether progress messages are pushed to the assistant widget.
    pub notify_assistant: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_id: "default".to_string(),
            default_tour: KnownTour::Main.as_str().to_string(),
            db_path: None,
            notify_assistant: true,
        }
    }
}

impl EngineConfig {
    /// Build a config from `TOUR_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let user_id = std::env::var("TOUR_USER_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.user_id);

        let default_tour = std::env::var("TOUR_DEFAULT_TOUR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_tour);

        let db_path = std::env::var("TOUR_DB_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let notify_assistant = match std::env::var("TOUR_ASSISTANT_NOTIFY") {
            Ok(raw) => parse_flag("TOUR_ASSISTANT_NOTIFY", &raw)?,
            Err(_) => defaults.notify_assistant,
        };

        Ok(Self {
            user_id,
            default_tour,
            db_path,
            notify_assistant,
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.user_id, "default");
        assert_eq!(config.default_tour, "main");
        assert!(config.db_path.is_none());
        assert!(config.notify_assistant);
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert!(parse_flag("K", "true").unwrap());
        assert!(parse_flag("K", " ON ").unwrap());
        assert!(!parse_flag("K", "0").unwrap());
        assert!(!parse_flag("K", "no").unwrap());
    }

    #[test]
    fn parse_flag_rejects_garbage() {
        let err = parse_flag("TOUR_ASSISTANT_NOTIFY", "maybe").unwrap_err();
        assert!(err.to_string().contains("TOUR_ASSISTANT_NOTIFY"));
        assert!(err.to_string().contains("maybe"));
    }
}
