//! Rule validation

use crate::error::ValidationError;
use crate::utils::normalize_separators;

use super::model::{RuleKind, RuleRecord, SidecarRule, PLACEHOLDER, TREE_SUFFIX};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(
    present: bool,
    rule: &str,
    field: &'static str,
) -> Result<(), ValidationError> {
    if present {
        Ok(())
    } else {
        Err(ValidationError::MissingField {
            rule: rule.to_string(),
            field,
        })
    }
}

fn forbid(
    present: bool,
    rule: &str,
    field: &'static str,
) -> Result<(), ValidationError> {
    if present {
        Err(ValidationError::ForbiddenField {
            rule: rule.to_string(),
            field,
        })
    } else {
        Ok(())
    }
}

/// Check the shape of a filemask.
///
/// The mask must contain the placeholder, must carry text besides the
/// placeholder and tree suffix, and a file-mode mask must stay within a
/// single path segment.
pub fn check_filemask(rule: &str, filemask: &str) -> Result<(), ValidationError> {
    let mask = normalize_separators(filemask.trim());

    if !mask.contains(PLACEHOLDER) {
        return Err(ValidationError::MissingPlaceholder {
            rule: rule.to_string(),
        });
    }

    let is_tree = mask.ends_with(TREE_SUFFIX);
    let body = if is_tree {
        &mask[..mask.len() - TREE_SUFFIX.len()]
    } else {
        mask.as_str()
    };

    if is_blank(&body.replace(PLACEHOLDER, "")) {
        return Err(ValidationError::InvalidPattern {
            rule: rule.to_string(),
            reason: "filemask must contain text besides '{base}'".to_string(),
        });
    }

    if !is_tree && body.contains('/') {
        return Err(ValidationError::InvalidPattern {
            rule: rule.to_string(),
            reason: "file filemask must not contain a path separator".to_string(),
        });
    }

    Ok(())
}

/// Validate a typed rule
pub fn validate_rule(rule: &SidecarRule) -> Result<(), ValidationError> {
    let label = rule.type_label.as_str();
    require(!is_blank(label), label, "type_label")?;

    match &rule.kind {
        RuleKind::Embedded { tag } => require(!is_blank(tag), label, "embedded_tag"),
        RuleKind::External { filemask } => {
            require(!is_blank(filemask), label, "filemask")?;
            check_filemask(label, filemask)
        }
    }
}

/// Validate a persisted rule, including the embedded/external discriminant
pub fn validate_record(record: &RuleRecord) -> Result<(), ValidationError> {
    let label = record.type_label.as_str();
    require(!is_blank(label), label, "type_label")?;

    if record.embedded {
        require(!is_blank(&record.embedded_tag), label, "embedded_tag")?;
        forbid(!is_blank(&record.filemask), label, "filemask")
    } else {
        require(!is_blank(&record.filemask), label, "filemask")?;
        forbid(!is_blank(&record.embedded_tag), label, "embedded_tag")?;
        check_filemask(label, &record.filemask)
    }
}
