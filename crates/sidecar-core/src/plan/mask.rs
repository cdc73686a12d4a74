//! Placeholder substitution

use crate::rule::{SidecarRule, PLACEHOLDER, TREE_SUFFIX};
use crate::utils::normalize_separators;

use super::context::ResolutionContext;

/// One enabled external rule bound to a [`ResolutionContext`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedMask {
    /// Position of the rule in the rule list
    pub rule_index: usize,
    pub type_label: String,
    /// The unexpanded, separator-normalised filemask without the tree suffix
    pub template: String,
    pub is_tree: bool,
    /// Template with the placeholder replaced by the source base
    pub source_pattern: String,
    /// Template with the placeholder replaced by the destination base
    pub dest_pattern: String,
}

impl ExpandedMask {
    /// Expand a single rule. Returns `None` for disabled or embedded rules.
    pub fn expand(rule_index: usize, rule: &SidecarRule, ctx: &ResolutionContext) -> Option<Self> {
        if !rule.enabled {
            return None;
        }
        let mask = normalize_separators(rule.filemask()?.trim());

        // The suffix is stripped before substitution so a base can never alter it.
        let is_tree = mask.ends_with(TREE_SUFFIX);
        let template = if is_tree {
            mask[..mask.len() - TREE_SUFFIX.len()].to_string()
        } else {
            mask
        };

        Some(Self {
            rule_index,
            type_label: rule.type_label.clone(),
            source_pattern: template.replace(PLACEHOLDER, &ctx.src_base),
            dest_pattern: template.replace(PLACEHOLDER, &ctx.dst_base),
            template,
            is_tree,
        })
    }
}

/// Expand every enabled external rule, preserving rule order
pub fn expand_all(rules: &[SidecarRule], ctx: &ResolutionContext) -> Vec<ExpandedMask> {
    rules
        .iter()
        .enumerate()
        .filter_map(|(idx, rule)| ExpandedMask::expand(idx, rule, ctx))
        .collect()
}
