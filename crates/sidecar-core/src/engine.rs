//! Event-level orchestration

use std::path::Path;

use crate::config::SidecarConfig;
use crate::error::{Error, Result, ValidationError};
use crate::exec::{preview, ConflictPolicy, DryRunResult, EntryState, Executor, OperationOutcome};
use crate::plan::{
    build_plan, EmbeddedCheck, Metadata, NameCase, Plan, RefusedEntry, ResolutionContext,
};
use crate::rule::SidecarRule;

/// Everything that happened for one primary-artifact event
#[derive(Debug, Default)]
pub struct EventResult {
    /// One outcome per executed entry, in plan order
    pub operations: Vec<OperationOutcome>,
    pub embedded_checks: Vec<EmbeddedCheck>,
    /// Tree entries excluded by the containment check
    pub refused: Vec<RefusedEntry>,
    /// Set when the rule set was rejected; nothing was touched in that case
    pub validation_error: Option<ValidationError>,
}

impl EventResult {
    fn rejected(error: ValidationError) -> Self {
        Self {
            validation_error: Some(error),
            ..Default::default()
        }
    }

    fn count(&self, state: EntryState) -> usize {
        self.operations.iter().filter(|o| o.state == state).count()
    }

    /// Entries written to their planned destination
    pub fn transferred(&self) -> usize {
        self.count(EntryState::Overwritten)
    }

    pub fn skipped(&self) -> usize {
        self.count(EntryState::Skipped)
    }

    pub fn renamed(&self) -> usize {
        self.count(EntryState::Renamed)
    }

    pub fn failed(&self) -> usize {
        self.count(EntryState::Failed)
    }

    /// Check if the event completed without validation errors, failures or
    /// refused entries
    pub fn is_success(&self) -> bool {
        self.validation_error.is_none() && self.refused.is_empty() && self.failed() == 0
    }

    /// Returns true if no operation was attempted
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty() && self.refused.is_empty()
    }
}

/// Plans and executes sidecar relocations for single events.
///
/// Holds configuration only; every call is independent.
#[derive(Debug, Clone)]
pub struct SidecarEngine {
    rules: Vec<SidecarRule>,
    conflict_policy: ConflictPolicy,
    name_case: NameCase,
    parallel: bool,
}

impl SidecarEngine {
    /// Create a new engine with the default policy and platform name case
    pub fn new(rules: Vec<SidecarRule>) -> Self {
        Self {
            rules,
            conflict_policy: ConflictPolicy::default(),
            name_case: NameCase::platform_default(),
            parallel: false,
        }
    }

    /// Create an engine from persisted settings
    pub fn from_config(config: &SidecarConfig) -> Self {
        Self::new(config.rules.rules().to_vec())
            .with_conflict_policy(config.conflict_policy)
            .with_name_case(config.name_case)
            .with_parallel(config.parallel)
    }

    /// Set the default conflict policy
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_name_case(mut self, name_case: NameCase) -> Self {
        self.name_case = name_case;
        self
    }

    /// Execute the entries of one event concurrently
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn rules(&self) -> &[SidecarRule] {
        &self.rules
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    /// Plan one event without mutating anything
    pub fn plan(
        &self,
        src_audio: &Path,
        dst_audio: &Path,
        metadata: Option<&Metadata>,
    ) -> Result<Plan> {
        let ctx = ResolutionContext::resolve(src_audio, dst_audio)?;
        build_plan(&self.rules, ctx, metadata, self.name_case)
    }

    /// Predict the outcome of one event
    pub fn dry_run(
        &self,
        src_audio: &Path,
        dst_audio: &Path,
        metadata: Option<&Metadata>,
        policy: Option<ConflictPolicy>,
    ) -> Result<DryRunResult> {
        let plan = self.plan(src_audio, dst_audio, metadata)?;
        Ok(preview(&plan.entries, policy.unwrap_or(self.conflict_policy)))
    }

    /// Plan and execute one event.
    ///
    /// `policy` overrides the configured conflict policy for this event, for
    /// hosts that expose the decision they made for the audio file itself.
    /// Returns `Err` only for invalid event paths or an unreadable source
    /// directory; rule problems are reported in
    /// [`EventResult::validation_error`] with nothing touched.
    pub fn plan_and_execute(
        &self,
        src_audio: &Path,
        dst_audio: &Path,
        metadata: Option<&Metadata>,
        policy: Option<ConflictPolicy>,
    ) -> Result<EventResult> {
        let plan = match self.plan(src_audio, dst_audio, metadata) {
            Ok(plan) => plan,
            Err(Error::Validation(e)) => {
                tracing::error!(src = %src_audio.display(), "Sidecar rules rejected: {}", e);
                return Ok(EventResult::rejected(e));
            }
            Err(e) => return Err(e),
        };

        let executor =
            Executor::new(policy.unwrap_or(self.conflict_policy)).with_parallel(self.parallel);
        let operations = executor.execute(plan.entries);

        let result = EventResult {
            operations,
            embedded_checks: plan.embedded_checks,
            refused: plan.refused,
            validation_error: None,
        };

        if result.is_noop() {
            tracing::debug!(src = %src_audio.display(), "No sidecars to relocate");
        } else {
            tracing::info!(
                src = %src_audio.display(),
                dst = %dst_audio.display(),
                transferred = result.transferred(),
                renamed = result.renamed(),
                skipped = result.skipped(),
                failed = result.failed(),
                refused = result.refused.len(),
                "Sidecar relocation finished"
            );
        }

        Ok(result)
    }
}

/// Builder for creating a SidecarEngine with options
#[derive(Debug, Default)]
pub struct SidecarEngineBuilder {
    rules: Option<Vec<SidecarRule>>,
    conflict_policy: ConflictPolicy,
    name_case: Option<NameCase>,
    parallel: bool,
}

impl SidecarEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rules
    pub fn rules(mut self, rules: Vec<SidecarRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set the default conflict policy
    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the destination filesystem's case semantics
    pub fn name_case(mut self, name_case: NameCase) -> Self {
        self.name_case = Some(name_case);
        self
    }

    /// Enable parallel execution
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SidecarEngine> {
        let rules = self
            .rules
            .ok_or_else(|| Error::Config("rules are required".to_string()))?;

        Ok(SidecarEngine::new(rules)
            .with_conflict_policy(self.conflict_policy)
            .with_name_case(self.name_case.unwrap_or_else(NameCase::platform_default))
            .with_parallel(self.parallel))
    }
}

/// Relocate the sidecars of one audio file.
///
/// Stateless entry point for hosts: builds a throwaway engine and runs one
/// event with the given policy.
pub fn plan_and_execute(
    rules: &[SidecarRule],
    src_audio: &Path,
    dst_audio: &Path,
    metadata: Option<&Metadata>,
    policy: ConflictPolicy,
) -> Result<EventResult> {
    SidecarEngine::new(rules.to_vec()).plan_and_execute(
        src_audio,
        dst_audio,
        metadata,
        Some(policy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builder_requires_rules() {
        let err = SidecarEngineBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let engine = SidecarEngineBuilder::new()
            .rules(vec![SidecarRule::external("lyrics", "{base}.lrc")])
            .conflict_policy(ConflictPolicy::Skip)
            .build()
            .unwrap();
        assert_eq!(engine.conflict_policy(), ConflictPolicy::Skip);
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = SidecarConfig {
            conflict_policy: ConflictPolicy::Overwrite,
            ..Default::default()
        };
        let engine = SidecarEngine::from_config(&config);
        assert_eq!(engine.conflict_policy(), ConflictPolicy::Overwrite);
        assert_eq!(engine.rules(), config.rules.rules());
    }

    #[test]
    fn test_invalid_path_is_an_error() {
        let engine = SidecarEngine::new(vec![SidecarRule::external("lyrics", "{base}.lrc")]);
        let result =
            engine.plan_and_execute(Path::new("relative.flac"), Path::new("x.flac"), None, None);
        assert!(matches!(result, Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_invalid_rule_reported_in_result() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("track.lrc"), "x").unwrap();
        let engine = SidecarEngine::new(vec![SidecarRule::external("bad", "track.lrc")]);

        let result = engine
            .plan_and_execute(
                &temp.path().join("track.flac"),
                &temp.path().join("out").join("new.flac"),
                None,
                None,
            )
            .unwrap();

        assert!(matches!(
            result.validation_error,
            Some(ValidationError::MissingPlaceholder { .. })
        ));
        assert!(result.is_noop());
        assert!(!result.is_success());
        assert!(temp.path().join("track.lrc").exists());
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("track.lrc"), "x").unwrap();
        let engine = SidecarEngine::new(vec![SidecarRule::external("lyrics", "{base}.lrc")]);

        let preview = engine
            .dry_run(
                &temp.path().join("track.flac"),
                &temp.path().join("out").join("new.flac"),
                None,
                None,
            )
            .unwrap();

        assert_eq!(preview.total_transfer, 1);
        assert!(temp.path().join("track.lrc").exists());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_event_result_counters() {
        let result = EventResult::default();
        assert!(result.is_noop());
        assert!(result.is_success());
        assert_eq!(result.transferred(), 0);
    }
}
