//! Sidecar rule data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::utils::normalize_separators;

/// Placeholder substituted with the audio file's base name
pub const PLACEHOLDER: &str = "{base}";

/// Trailing token that turns a filemask into a whole-directory rule
pub const TREE_SUFFIX: &str = "/**";

/// Whether a sidecar is moved or duplicated next to the audio file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveMode {
    /// Remove the source after a successful transfer
    #[default]
    Move,
    /// Leave the source in place
    Copy,
}

impl MoveMode {
    /// Verb used in log lines and error messages
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for MoveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for MoveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            _ => Err(format!("Invalid move mode '{}'. Use: move or copy", s)),
        }
    }
}

/// The two shapes a rule can take
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Only checks that a tag is present in the audio file's metadata
    Embedded { tag: String },
    /// Matches files or a directory next to the audio file
    External { filemask: String },
}

/// One user-declared sidecar association.
///
/// Serialized through [`RuleRecord`], so the persisted form stays the flat
/// `type_label / embedded / embedded_tag / filemask / enabled / move_mode`
/// object while the in-memory form cannot carry both a tag and a filemask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord", into = "RuleRecord")]
pub struct SidecarRule {
    /// Free-text identifier used in logs and the settings table
    pub type_label: String,
    /// Disabled rules are excluded from planning entirely
    pub enabled: bool,
    /// Applies to both file and tree matches of an external rule
    pub move_mode: MoveMode,
    pub kind: RuleKind,
}

impl SidecarRule {
    /// Create an enabled external rule
    pub fn external(type_label: impl Into<String>, filemask: impl Into<String>) -> Self {
        Self {
            type_label: type_label.into(),
            enabled: true,
            move_mode: MoveMode::Move,
            kind: RuleKind::External {
                filemask: filemask.into(),
            },
        }
    }

    /// Create an enabled embedded rule
    pub fn embedded(type_label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            type_label: type_label.into(),
            enabled: true,
            move_mode: MoveMode::Move,
            kind: RuleKind::Embedded { tag: tag.into() },
        }
    }

    pub fn with_move_mode(mut self, mode: MoveMode) -> Self {
        self.move_mode = mode;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, RuleKind::Embedded { .. })
    }

    /// The filemask of an external rule
    pub fn filemask(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::External { filemask } => Some(filemask),
            RuleKind::Embedded { .. } => None,
        }
    }

    /// The tag of an embedded rule
    pub fn embedded_tag(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Embedded { tag } => Some(tag),
            RuleKind::External { .. } => None,
        }
    }

    /// Returns true if the filemask denotes a whole directory (`.../**`).
    ///
    /// Derived from the unexpanded filemask, never stored.
    pub fn is_tree(&self) -> bool {
        self.filemask()
            .map(|mask| normalize_separators(mask).ends_with(TREE_SUFFIX))
            .unwrap_or(false)
    }

    /// Check the rule's required fields and filemask shape
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::validate::validate_rule(self)
    }
}

fn default_true() -> bool {
    true
}

/// Flat, persisted form of a [`SidecarRule`].
///
/// This is what a rule set looks like on disk; it can represent invalid
/// combinations, which [`RuleRecord::validate`] rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(default)]
    pub type_label: String,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default)]
    pub embedded_tag: String,
    #[serde(default)]
    pub filemask: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub move_mode: MoveMode,
}

impl RuleRecord {
    /// Check the embedded/external discriminant and required fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::validate::validate_record(self)
    }
}

impl TryFrom<RuleRecord> for SidecarRule {
    type Error = ValidationError;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        record.validate()?;

        let kind = if record.embedded {
            RuleKind::Embedded {
                tag: record.embedded_tag.trim().to_string(),
            }
        } else {
            RuleKind::External {
                filemask: record.filemask.trim().to_string(),
            }
        };

        Ok(Self {
            type_label: record.type_label.trim().to_string(),
            enabled: record.enabled,
            move_mode: record.move_mode,
            kind,
        })
    }
}

impl From<SidecarRule> for RuleRecord {
    fn from(rule: SidecarRule) -> Self {
        let (embedded, embedded_tag, filemask) = match rule.kind {
            RuleKind::Embedded { tag } => (true, tag, String::new()),
            RuleKind::External { filemask } => (false, String::new(), filemask),
        };

        Self {
            type_label: rule.type_label,
            embedded,
            embedded_tag,
            filemask,
            enabled: rule.enabled,
            move_mode: rule.move_mode,
        }
    }
}
