//! Persisted settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::exec::ConflictPolicy;
use crate::plan::NameCase;
use crate::rule::RuleSet;

/// Configuration for the sidecar handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarConfig {
    /// Ordered, validated sidecar rules
    #[serde(default)]
    pub rules: RuleSet,
    /// Applied when a destination already exists and no per-event override is given
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Case semantics used when checking destination patterns for collisions
    #[serde(default)]
    pub name_case: NameCase,
    /// Execute the entries of one event on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::defaults(),
            conflict_policy: ConflictPolicy::default(),
            name_case: NameCase::platform_default(),
            parallel: false,
        }
    }
}

impl SidecarConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sidecar-handler").join("config.json"))
    }

    /// Load config from disk, falling back to defaults if missing or invalid
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable config: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Config("no config directory on this platform".to_string()))?;
        self.save_to(&path)
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace the rule set with the baseline rules
    pub fn restore_defaults(&mut self) {
        self.rules = RuleSet::defaults();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SidecarRule;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let config = SidecarConfig {
            rules: RuleSet::new(vec![SidecarRule::external("lyrics", "{base}.lrc")]).unwrap(),
            conflict_policy: ConflictPolicy::Skip,
            name_case: NameCase::Insensitive,
            parallel: true,
        };
        config.save_to(&path).unwrap();

        assert_eq!(SidecarConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"conflict_policy":"overwrite"}"#).unwrap();

        let config = SidecarConfig::load_from(&path).unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::Overwrite);
        assert_eq!(config.rules, RuleSet::defaults());
        assert!(!config.parallel);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"rules":[{"type_label":"lyrics","filemask":"track.lrc"}]}"#,
        )
        .unwrap();

        let err = SidecarConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("{base}"), "{}", err);

        std::fs::write(&path, r#"{"rules":[]}"#).unwrap();
        assert!(SidecarConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_restore_defaults() {
        let mut config = SidecarConfig {
            rules: RuleSet::new(vec![SidecarRule::external("x", "{base}.x")]).unwrap(),
            ..Default::default()
        };
        config.restore_defaults();
        assert_eq!(config.rules, RuleSet::defaults());
    }
}
