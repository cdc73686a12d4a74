//! # sidecar-core
//!
//! Core library for keeping sidecar files next to audio files that get
//! renamed or moved.
//!
//! This crate provides the foundational functionality for:
//! - Declaring sidecar rules (file masks, whole directories, embedded tags)
//! - Resolving an audio move into per-sidecar operations
//! - Rejecting rule sets whose destinations would collide
//! - Refusing directory sidecars that escape the album folder
//! - Moving or copying sidecars with a skip/overwrite/rename conflict policy
//! - Attaching lyrics and covers in place through links
//!
//! ## Modules
//!
//! - [`rule`] - Rule model, validation and defaults
//! - [`plan`] - Path resolution, mask expansion, matching and safety checks
//! - [`exec`] - Conflict resolution, staged transfers and dry runs
//! - [`engine`] - Event-level orchestration
//! - [`config`] - Persisted settings
//! - [`links`] - Attach and clean up sidecar links
//! - [`error`] - Error types and Result alias
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use sidecar_core::{ConflictPolicy, SidecarEngine, SidecarRule};
//!
//! let engine = SidecarEngine::new(vec![
//!     SidecarRule::external("lyrics", "{base}.lrc"),
//!     SidecarRule::external("extras", "{base}.extras/**"),
//! ])
//! .with_conflict_policy(ConflictPolicy::Rename);
//!
//! let result = engine
//!     .plan_and_execute(
//!         Path::new("/music/inbox/track.flac"),
//!         Path::new("/music/library/Artist/01 Title.flac"),
//!         None,
//!         None,
//!     )
//!     .expect("invalid event paths");
//! println!("{} sidecars moved", result.transferred() + result.renamed());
//! ```

// Module declarations
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod links;
pub mod plan;
pub mod rule;
pub mod utils;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result, ValidationError};

// Rules
pub use rule::{default_rules, MoveMode, RuleKind, RuleRecord, RuleSet, SidecarRule};

// Planning
pub use plan::{
    EmbeddedCheck, EntryKind, Metadata, NameCase, OperationPlanEntry, Plan, RefusedEntry,
    ResolutionContext, TagPresence,
};

// Execution
pub use exec::{
    ConflictDecision, ConflictPolicy, DryRunAction, DryRunItem, DryRunResult, EntryState,
    OperationOutcome,
};

// Engine
pub use engine::{plan_and_execute, EventResult, SidecarEngine, SidecarEngineBuilder};

// Configuration
pub use config::SidecarConfig;

// Links
pub use links::{
    attach_sidecars, cleanup_broken_links, AttachOptions, AttachStats, CleanupOptions,
    CleanupStats, LinkStrategy,
};
