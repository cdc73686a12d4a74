//! Per-entry conflict resolution and execution

use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::Error;
use crate::plan::OperationPlanEntry;
use crate::rule::MoveMode;

use super::conflict::{ConflictDecision, ConflictPolicy, NameClaims};
use super::transfer::transfer;

/// Lifecycle of one plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Pending,
    Skipped,
    /// Written to the planned destination, whether or not something was replaced
    Overwritten,
    Renamed,
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Skipped => write!(f, "skipped"),
            Self::Overwritten => write!(f, "written"),
            Self::Renamed => write!(f, "renamed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final state of one executed entry
#[derive(Debug)]
pub struct OperationOutcome {
    pub entry: OperationPlanEntry,
    pub state: EntryState,
    /// Where the sidecar ended up, if it was transferred
    pub final_path: Option<PathBuf>,
    pub error: Option<Error>,
}

impl OperationOutcome {
    fn new(entry: OperationPlanEntry) -> Self {
        Self {
            entry,
            state: EntryState::Pending,
            final_path: None,
            error: None,
        }
    }

    fn finish(mut self, state: EntryState, final_path: Option<PathBuf>) -> Self {
        self.state = state;
        self.final_path = final_path;
        self
    }

    fn fail(mut self, error: Error) -> Self {
        self.state = EntryState::Failed;
        self.error = Some(error);
        self
    }

    /// Returns true if the sidecar now exists at a destination
    pub fn is_transferred(&self) -> bool {
        matches!(self.state, EntryState::Overwritten | EntryState::Renamed)
    }
}

/// Applies a conflict policy to plan entries and performs the transfers
pub struct Executor {
    policy: ConflictPolicy,
    parallel: bool,
    claims: NameClaims,
}

impl Executor {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            parallel: false,
            claims: NameClaims::new(),
        }
    }

    /// Execute entries on the rayon pool.
    ///
    /// Entries only serialise while picking a destination name; transfers
    /// into the same directory run concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Execute every entry. Failures are recorded per entry and never stop
    /// the remaining entries. Outcomes keep plan order.
    pub fn execute(&self, entries: Vec<OperationPlanEntry>) -> Vec<OperationOutcome> {
        if self.parallel && entries.len() > 1 {
            entries
                .into_par_iter()
                .map(|entry| self.execute_one(entry))
                .collect()
        } else {
            entries
                .into_iter()
                .map(|entry| self.execute_one(entry))
                .collect()
        }
    }

    /// Run one entry through the state machine
    pub fn execute_one(&self, entry: OperationPlanEntry) -> OperationOutcome {
        let outcome = OperationOutcome::new(entry);
        let entry = &outcome.entry;

        let decision = match self.claims.resolve(&entry.dest_path, self.policy) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(rule = %entry.type_label, to = %entry.dest_path.display(), "{}", e);
                return outcome.fail(e);
            }
        };

        let (target, state, replace) = match decision {
            ConflictDecision::Skip => {
                tracing::warn!(
                    rule = %entry.type_label,
                    from = %entry.source_path.display(),
                    to = %entry.dest_path.display(),
                    "Destination exists, skipping"
                );
                return outcome.finish(EntryState::Skipped, None);
            }
            ConflictDecision::Proceed => (entry.dest_path.clone(), EntryState::Overwritten, true),
            ConflictDecision::Renamed(path) => (path, EntryState::Renamed, false),
        };

        let result = transfer(entry.kind, &entry.source_path, &target, entry.mode, replace);
        self.claims.release(&target);

        let verb = match entry.mode {
            MoveMode::Move => "Moved",
            MoveMode::Copy => "Copied",
        };
        match result {
            Ok(()) if state == EntryState::Renamed => {
                tracing::warn!(
                    rule = %entry.type_label,
                    kind = %entry.kind,
                    from = %entry.source_path.display(),
                    to = %entry.dest_path.display(),
                    renamed = %target.display(),
                    "{} sidecar under a new name, destination exists",
                    verb
                );
                outcome.finish(state, Some(target))
            }
            Ok(()) => {
                tracing::info!(
                    rule = %entry.type_label,
                    kind = %entry.kind,
                    from = %entry.source_path.display(),
                    to = %target.display(),
                    "{} sidecar",
                    verb
                );
                outcome.finish(state, Some(target))
            }
            Err(cause) => {
                let error = Error::Transfer {
                    action: entry.mode.verb(),
                    from: entry.source_path.clone(),
                    to: target,
                    cause,
                };
                tracing::error!(rule = %entry.type_label, "{}", error);
                outcome.fail(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::EntryKind;
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// Records the level of every event it sees
    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<tracing::Level>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Levels {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn file_entry(from: &Path, to: &Path) -> OperationPlanEntry {
        OperationPlanEntry {
            kind: EntryKind::File,
            rule_index: 0,
            type_label: "lyrics".to_string(),
            source_path: from.to_path_buf(),
            dest_path: to.to_path_buf(),
            mode: MoveMode::Move,
        }
    }

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("track.lrc");
        let to = temp.path().join("renamed.lrc");
        fs::write(&from, "new").unwrap();
        (temp, from, to)
    }

    #[test]
    fn test_free_destination_is_written() {
        let (_temp, from, to) = fixture();
        let outcome = Executor::new(ConflictPolicy::Skip).execute_one(file_entry(&from, &to));

        assert_eq!(outcome.state, EntryState::Overwritten);
        assert_eq!(outcome.final_path.as_deref(), Some(to.as_path()));
        assert!(outcome.is_transferred());
        assert!(!from.exists());
    }

    #[test]
    fn test_skip_leaves_everything() {
        let (_temp, from, to) = fixture();
        fs::write(&to, "old").unwrap();

        let outcome = Executor::new(ConflictPolicy::Skip).execute_one(file_entry(&from, &to));

        assert_eq!(outcome.state, EntryState::Skipped);
        assert!(outcome.final_path.is_none());
        assert_eq!(fs::read_to_string(&to).unwrap(), "old");
        assert!(from.exists());
    }

    #[test]
    fn test_overwrite_replaces() {
        let (_temp, from, to) = fixture();
        fs::write(&to, "old").unwrap();

        let outcome = Executor::new(ConflictPolicy::Overwrite).execute_one(file_entry(&from, &to));

        assert_eq!(outcome.state, EntryState::Overwritten);
        assert_eq!(fs::read_to_string(&to).unwrap(), "new");
    }

    #[test]
    fn test_rename_picks_numbered_name() {
        let (temp, from, to) = fixture();
        fs::write(&to, "old").unwrap();

        let outcome = Executor::new(ConflictPolicy::Rename).execute_one(file_entry(&from, &to));

        let renamed = temp.path().join("renamed (1).lrc");
        assert_eq!(outcome.state, EntryState::Renamed);
        assert_eq!(outcome.final_path.as_deref(), Some(renamed.as_path()));
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "new");
        assert_eq!(fs::read_to_string(&to).unwrap(), "old");
    }

    #[test]
    fn test_rename_logs_one_warning() {
        let (temp, from, to) = fixture();
        fs::write(&to, "old").unwrap();
        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());

        let outcome = tracing::subscriber::with_default(subscriber, || {
            Executor::new(ConflictPolicy::Rename).execute_one(file_entry(&from, &to))
        });

        assert_eq!(outcome.state, EntryState::Renamed);
        assert_eq!(
            outcome.final_path.as_deref(),
            Some(temp.path().join("renamed (1).lrc").as_path())
        );
        let logged: Vec<_> = levels
            .0
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|level| *level <= tracing::Level::INFO)
            .collect();
        assert_eq!(logged, vec![tracing::Level::WARN]);
    }

    #[test]
    fn test_failure_does_not_stop_siblings() {
        let (temp, from, to) = fixture();
        let missing = file_entry(&temp.path().join("gone.lrc"), &temp.path().join("gone2.lrc"));

        let outcomes =
            Executor::new(ConflictPolicy::Rename).execute(vec![missing, file_entry(&from, &to)]);

        assert_eq!(outcomes[0].state, EntryState::Failed);
        assert!(matches!(outcomes[0].error, Some(Error::Transfer { .. })));
        assert_eq!(outcomes[1].state, EntryState::Overwritten);
    }

    #[test]
    fn test_parallel_renames_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let done = temp.path().join("done");
        fs::create_dir(&done).unwrap();
        fs::write(done.join("x.txt"), "old").unwrap();

        let entries: Vec<_> = (0..8)
            .map(|i| {
                let from = temp.path().join(format!("src{}.txt", i));
                fs::write(&from, i.to_string()).unwrap();
                file_entry(&from, &done.join("x.txt"))
            })
            .collect();

        let outcomes = Executor::new(ConflictPolicy::Rename)
            .with_parallel(true)
            .execute(entries);

        let mut finals: Vec<_> = outcomes
            .iter()
            .map(|o| o.final_path.clone().unwrap())
            .collect();
        finals.sort();
        finals.dedup();
        assert_eq!(finals.len(), 8);
        assert!(outcomes.iter().all(|o| o.state == EntryState::Renamed));
    }
}
