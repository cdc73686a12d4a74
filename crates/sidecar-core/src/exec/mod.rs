//! Conflict resolution, transfers and dry runs

mod conflict;
mod dry_run;
mod executor;
pub mod transfer;

pub use conflict::{
    first_free_name, rename_candidate, resolve_conflict, resolve_conflict_with, ConflictDecision,
    ConflictPolicy, NameClaims, MAX_RENAME_ATTEMPTS,
};
pub use dry_run::{preview, DryRunAction, DryRunItem, DryRunResult};
pub use executor::{EntryState, Executor, OperationOutcome};
