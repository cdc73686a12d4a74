//! Sidecar rule model, defaults and validation

mod defaults;
mod model;
mod set;
pub mod validate;

pub use defaults::default_rules;
pub use model::{MoveMode, RuleKind, RuleRecord, SidecarRule, PLACEHOLDER, TREE_SUFFIX};
pub use set::{validate_rules_static, RuleSet};
