//! Validated, ordered rule sets

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, ValidationError};
use crate::plan::{normalize_pattern, NameCase};

use super::defaults::default_rules;
use super::model::SidecarRule;

/// A non-empty, validated, ordered sequence of rules.
///
/// This is the shape a rule set must have before it is persisted: every rule
/// passes [`SidecarRule::validate`] and no two enabled external rules share a
/// filemask template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SidecarRule>", into = "Vec<SidecarRule>")]
pub struct RuleSet {
    rules: Vec<SidecarRule>,
}

impl RuleSet {
    /// Validate and wrap a rule list
    pub fn new(rules: Vec<SidecarRule>) -> std::result::Result<Self, ValidationError> {
        validate_rules_static(&rules)?;
        Ok(Self { rules })
    }

    /// The baseline rule set
    pub fn defaults() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn rules(&self) -> &[SidecarRule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<SidecarRule> {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Enabled rules in declaration order
    pub fn enabled(&self) -> impl Iterator<Item = &SidecarRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Parse a persisted rule list
    pub fn from_json(raw: &str) -> Result<Self> {
        let rules: Vec<SidecarRule> = serde_json::from_str(raw)?;
        Ok(Self::new(rules)?)
    }

    /// Serialize to the compact persisted form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rules)?)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TryFrom<Vec<SidecarRule>> for RuleSet {
    type Error = ValidationError;

    fn try_from(rules: Vec<SidecarRule>) -> std::result::Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<RuleSet> for Vec<SidecarRule> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

/// Check a rule list independently of any audio file.
///
/// Rejects empty lists, invalid rules and duplicated templates among enabled
/// external rules.
pub fn validate_rules_static(rules: &[SidecarRule]) -> std::result::Result<(), ValidationError> {
    if rules.is_empty() {
        return Err(ValidationError::EmptyRuleSet);
    }

    let mut seen: HashMap<String, &str> = HashMap::new();
    for rule in rules {
        rule.validate()?;

        let Some(mask) = rule.filemask().filter(|_| rule.enabled) else {
            continue;
        };
        let normalized = normalize_pattern(mask.trim(), NameCase::Sensitive);
        if let Some(first) = seen.insert(normalized.clone(), rule.type_label.as_str()) {
            return Err(ValidationError::DuplicateMask {
                pattern: normalized,
                rules: vec![first.to_string(), rule.type_label.clone()],
            });
        }
    }

    Ok(())
}
