//! Event planning: resolve, expand, validate, match and check

mod context;
mod glob;
mod mask;
mod matcher;
mod safety;
mod uniqueness;

pub use context::ResolutionContext;
pub use glob::MaskPattern;
pub use mask::{expand_all, ExpandedMask};
pub use matcher::{
    check_embedded, find_matches, EmbeddedCheck, EntryKind, Metadata, OperationPlanEntry,
    TagPresence,
};
pub use safety::{check_containment, partition_safe, RefusedEntry};
pub use uniqueness::{check_unique, normalize_pattern, NameCase};

use crate::error::Result;
use crate::rule::SidecarRule;

/// Everything decided for one event before any mutation
#[derive(Debug)]
pub struct Plan {
    pub context: ResolutionContext,
    /// Entries safe to execute, in rule order
    pub entries: Vec<OperationPlanEntry>,
    pub embedded_checks: Vec<EmbeddedCheck>,
    /// Tree entries excluded by the containment check
    pub refused: Vec<RefusedEntry>,
}

impl Plan {
    /// Returns true if nothing would be transferred
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the plan for one event without touching the filesystem beyond
/// listing the source directory.
///
/// Rule and uniqueness violations are returned as [`crate::Error::Validation`]
/// before the source directory is read.
pub fn build_plan(
    rules: &[SidecarRule],
    ctx: ResolutionContext,
    metadata: Option<&Metadata>,
    name_case: NameCase,
) -> Result<Plan> {
    for rule in rules {
        rule.validate()?;
    }

    let masks = expand_all(rules, &ctx);
    check_unique(&masks, name_case)?;

    let embedded_checks = check_embedded(rules, metadata);
    let matched = find_matches(&masks, rules, &ctx)?;
    let (entries, refused) = partition_safe(matched, &ctx.src_dir);

    tracing::debug!(
        src = %ctx.src_audio.display(),
        dst = %ctx.dst_audio.display(),
        entries = entries.len(),
        refused = refused.len(),
        "Planned sidecar operations"
    );

    Ok(Plan {
        context: ctx,
        entries,
        embedded_checks,
        refused,
    })
}
