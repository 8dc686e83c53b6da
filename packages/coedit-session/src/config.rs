use std::str::FromStr;

use serde::{Deserialize, Serialize};

use coedit_core::DiffOptions;

use crate::error::{Result, SessionError};

/// Runtime settings for a [`SessionHub`](crate::SessionHub). Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of each room's command inbox.
    pub inbox_capacity: usize,
    /// Keep a room's task running after its last participant leaves.
    pub keep_dormant_rooms: bool,
    /// Language assigned to rooms that have not picked one.
    pub default_language: String,
    pub myers_threshold: usize,
    pub max_edit_distance: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let diff = DiffOptions::default();
        Self {
            inbox_capacity: 256,
            keep_dormant_rooms: false,
            default_language: "plaintext".into(),
            myers_threshold: diff.myers_threshold,
            max_edit_distance: diff.max_edit_distance,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `COEDIT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        override_from(&lookup, "COEDIT_INBOX_CAPACITY", &mut config.inbox_capacity)?;
        override_from(&lookup, "COEDIT_KEEP_DORMANT_ROOMS", &mut config.keep_dormant_rooms)?;
        override_from(&lookup, "COEDIT_DEFAULT_LANGUAGE", &mut config.default_language)?;
        override_from(&lookup, "COEDIT_MYERS_THRESHOLD", &mut config.myers_threshold)?;
        override_from(&lookup, "COEDIT_MAX_EDIT_DISTANCE", &mut config.max_edit_distance)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inbox_capacity == 0 {
            return Err(SessionError::Config("inbox_capacity must be non-zero".into()));
        }
        if self.default_language.trim().is_empty() {
            return Err(SessionError::Config("default_language must not be empty".into()));
        }
        Ok(())
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            myers_threshold: self.myers_threshold,
            max_edit_distance: self.max_edit_distance,
        }
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| SessionError::Config(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = SessionConfig::from_toml_str("keep_dormant_rooms = true\nmyers_threshold = 8\n")
            .unwrap();
        assert!(config.keep_dormant_rooms);
        assert_eq!(config.myers_threshold, 8);
        assert_eq!(config.inbox_capacity, 256);
        assert_eq!(config.default_language, "plaintext");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SessionConfig::from_toml_str("inbox_capacity = 0"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COEDIT_INBOX_CAPACITY", "16"),
            ("COEDIT_KEEP_DORMANT_ROOMS", "true"),
            ("COEDIT_MAX_EDIT_DISTANCE", " 32 "),
        ]
        .into_iter()
        .collect();
        let config =
            SessionConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.inbox_capacity, 16);
        assert!(config.keep_dormant_rooms);
        assert_eq!(config.diff_options().max_edit_distance, 32);

        let err = SessionConfig::from_lookup(|key| {
            (key == "COEDIT_MYERS_THRESHOLD").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("COEDIT_MYERS_THRESHOLD"));
    }
}
