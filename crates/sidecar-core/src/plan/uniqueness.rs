//! Destination-pattern uniqueness check

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::utils::normalize_separators;

use super::mask::ExpandedMask;

/// Case semantics of the destination filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCase {
    Sensitive,
    Insensitive,
}

impl NameCase {
    /// Case-insensitive on Windows and macOS, sensitive elsewhere
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "windows", target_os = "macos")) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }
}

impl Default for NameCase {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for NameCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensitive => write!(f, "sensitive"),
            Self::Insensitive => write!(f, "insensitive"),
        }
    }
}

impl FromStr for NameCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sensitive" => Ok(Self::Sensitive),
            "insensitive" => Ok(Self::Insensitive),
            _ => Err(format!(
                "Invalid name case '{}'. Use: sensitive or insensitive",
                s
            )),
        }
    }
}

/// Normalize a pattern for comparison: `/` separators, no repeated or
/// trailing separators, case folded when the filesystem ignores case.
pub fn normalize_pattern(pattern: &str, case: NameCase) -> String {
    let unified = normalize_separators(pattern);
    let mut out = String::with_capacity(unified.len());
    let mut prev_sep = false;

    for c in unified.chars() {
        if c == '/' {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }

    match case {
        NameCase::Sensitive => out,
        NameCase::Insensitive => out.to_lowercase(),
    }
}

/// Fail with [`ValidationError::DuplicateMask`] if two expanded masks share
/// a normalised destination pattern.
///
/// Pure function of the masks; touches no filesystem. The first colliding
/// pattern (in rule order) is reported with every rule that produced it.
pub fn check_unique(masks: &[ExpandedMask], case: NameCase) -> Result<(), ValidationError> {
    let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for mask in masks {
        let key = normalize_pattern(&mask.dest_pattern, case);
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(&mask.type_label);
    }

    for key in order {
        if let Some(rules) = groups.get(&key).filter(|r| r.len() > 1) {
            return Err(ValidationError::DuplicateMask {
                rules: rules.iter().map(|r| r.to_string()).collect(),
                pattern: key,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(label: &str, dest: &str) -> ExpandedMask {
        ExpandedMask {
            rule_index: 0,
            type_label: label.to_string(),
            template: String::new(),
            is_tree: false,
            source_pattern: String::new(),
            dest_pattern: dest.to_string(),
        }
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(
            normalize_pattern("a\\\\b//c/", NameCase::Sensitive),
            "a/b/c"
        );
        assert_eq!(normalize_pattern("Front.JPG", NameCase::Insensitive), "front.jpg");
        assert_eq!(normalize_pattern("Front.JPG", NameCase::Sensitive), "Front.JPG");
    }

    #[test]
    fn test_distinct_masks_pass() {
        let masks = vec![mask("A", "new.lrc"), mask("B", "new.cue")];
        assert!(check_unique(&masks, NameCase::Sensitive).is_ok());
        assert!(check_unique(&[], NameCase::Sensitive).is_ok());
    }

    #[test]
    fn test_duplicate_lists_all_colliding_rules() {
        let masks = vec![
            mask("A", "new-front.jpg"),
            mask("X", "new.lrc"),
            mask("B", "new-front.jpg"),
            mask("C", "new-front.jpg"),
        ];
        assert_eq!(
            check_unique(&masks, NameCase::Sensitive),
            Err(ValidationError::DuplicateMask {
                pattern: "new-front.jpg".to_string(),
                rules: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            })
        );
    }

    #[test]
    fn test_case_folding_follows_filesystem() {
        let masks = vec![mask("A", "new.LRC"), mask("B", "new.lrc")];
        assert!(check_unique(&masks, NameCase::Sensitive).is_ok());
        assert!(check_unique(&masks, NameCase::Insensitive).is_err());
    }

    #[test]
    fn test_separator_variants_collide() {
        let masks = vec![mask("A", "new.extras//x"), mask("B", "new.extras\\x")];
        assert!(check_unique(&masks, NameCase::Sensitive).is_err());
    }

    #[test]
    fn test_name_case_from_str() {
        assert_eq!("Insensitive".parse::<NameCase>(), Ok(NameCase::Insensitive));
        assert!("maybe".parse::<NameCase>().is_err());
    }
}
