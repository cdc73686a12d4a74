//! Destination conflict handling

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::utils::path_occupied;

/// Highest numeric suffix tried before giving up on a free name
pub const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// What to do when a destination path already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave both source and destination untouched
    Skip,
    /// Replace the destination
    Overwrite,
    /// Pick the first free `name (n).ext`
    #[default]
    Rename,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Overwrite => write!(f, "overwrite"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" | "replace" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            _ => Err(format!(
                "Invalid conflict policy '{}'. Use: skip, overwrite, or rename",
                s
            )),
        }
    }
}

/// Outcome of resolving a destination collision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Write to the planned destination, replacing anything there
    Proceed,
    Skip,
    Renamed(PathBuf),
}

/// Build the `n`-th alternative for `path`.
///
/// Files with an extension become `stem (n).ext`; directories and names
/// without an extension become `name (n)`.
pub fn rename_candidate(path: &Path, n: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = path.file_stem().map(|s| s.to_string_lossy());
    let ext = path.extension().map(|s| s.to_string_lossy());

    let candidate = match (stem, ext) {
        (Some(stem), Some(ext)) if !path.is_dir() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    };

    path.with_file_name(candidate)
}

/// Find the first free rename candidate for `path`
pub fn first_free_name(path: &Path) -> Result<PathBuf> {
    first_free_name_with(path, |_| false)
}

fn first_free_name_with(path: &Path, claimed: impl Fn(&Path) -> bool) -> Result<PathBuf> {
    (1..=MAX_RENAME_ATTEMPTS)
        .map(|n| rename_candidate(path, n))
        .find(|candidate| !path_occupied(candidate) && !claimed(candidate))
        .ok_or_else(|| Error::NoFreeName {
            path: path.to_path_buf(),
        })
}

/// Decide what to do with `dest` under `policy`.
///
/// A missing destination always proceeds. An existing destination includes
/// a dangling symbolic link.
pub fn resolve_conflict(dest: &Path, policy: ConflictPolicy) -> Result<ConflictDecision> {
    resolve_conflict_with(dest, policy, |_| false)
}

/// Like [`resolve_conflict`], but paths for which `claimed` returns true count
/// as occupied even if nothing is on disk yet.
pub fn resolve_conflict_with(
    dest: &Path,
    policy: ConflictPolicy,
    claimed: impl Fn(&Path) -> bool,
) -> Result<ConflictDecision> {
    if !path_occupied(dest) && !claimed(dest) {
        return Ok(ConflictDecision::Proceed);
    }

    match policy {
        ConflictPolicy::Skip => Ok(ConflictDecision::Skip),
        ConflictPolicy::Overwrite => Ok(ConflictDecision::Proceed),
        ConflictPolicy::Rename => {
            first_free_name_with(dest, &claimed).map(ConflictDecision::Renamed)
        }
    }
}

/// Destination names handed out to in-flight transfers.
///
/// Resolution and claiming happen under one short lock; the transfer itself
/// runs unlocked. A claim must be released once the transfer has finished,
/// successful or not, after which the installed path speaks for itself.
#[derive(Debug, Default)]
pub struct NameClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl NameClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `dest` under `policy` and claim the chosen path
    pub fn resolve(&self, dest: &Path, policy: ConflictPolicy) -> Result<ConflictDecision> {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let decision = resolve_conflict_with(dest, policy, |p| claimed.contains(p))?;

        match &decision {
            ConflictDecision::Proceed => {
                claimed.insert(dest.to_path_buf());
            }
            ConflictDecision::Renamed(path) => {
                claimed.insert(path.clone());
            }
            ConflictDecision::Skip => {}
        }

        Ok(decision)
    }

    /// Give up the claim on `path`
    pub fn release(&self, path: &Path) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }
}
