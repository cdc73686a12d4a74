//! Dry run mode for previewing sidecar operations without making changes

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::plan::{EntryKind, OperationPlanEntry};
use crate::utils::{format_bytes, path_occupied};

use super::conflict::{resolve_conflict_with, ConflictDecision, ConflictPolicy};

/// Action that would be taken for a plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "action", content = "target")]
pub enum DryRunAction {
    /// Destination is free
    Transfer,
    /// Destination exists and would be replaced
    Overwrite,
    /// Destination exists; the sidecar would be written to the given path
    Rename(PathBuf),
    /// Destination exists and would be left alone
    Skip,
    /// No free rename candidate is left
    Fail,
}

impl std::fmt::Display for DryRunAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transfer => write!(f, "Transfer"),
            Self::Overwrite => write!(f, "Overwrite"),
            Self::Rename(path) => write!(f, "Rename -> {}", path.display()),
            Self::Skip => write!(f, "Skip"),
            Self::Fail => write!(f, "Fail"),
        }
    }
}

/// A single item in the dry run preview
#[derive(Debug, Clone, Serialize)]
pub struct DryRunItem {
    pub entry: OperationPlanEntry,
    pub action: DryRunAction,
    /// Size of the file, or of every file in the tree
    pub size_bytes: u64,
}

impl DryRunItem {
    /// Get a display name for the item
    pub fn display_name(&self) -> String {
        format!(
            "[{}] {} -> {}",
            self.entry.type_label,
            self.entry.source_path.display(),
            self.entry.dest_path.display()
        )
    }
}

/// Result of a dry run analysis
#[derive(Debug, Clone, Default, Serialize)]
pub struct DryRunResult {
    pub items: Vec<DryRunItem>,
    pub total_transfer: usize,
    pub total_overwrite: usize,
    pub total_rename: usize,
    pub total_skip: usize,
    pub total_fail: usize,
    /// Bytes that would be written
    pub total_size_bytes: u64,
}

impl DryRunResult {
    /// Create a new empty dry run result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the result
    pub fn add_item(&mut self, item: DryRunItem) {
        match item.action {
            DryRunAction::Transfer => self.total_transfer += 1,
            DryRunAction::Overwrite => self.total_overwrite += 1,
            DryRunAction::Rename(_) => self.total_rename += 1,
            DryRunAction::Skip => self.total_skip += 1,
            DryRunAction::Fail => self.total_fail += 1,
        }
        if !matches!(item.action, DryRunAction::Skip | DryRunAction::Fail) {
            self.total_size_bytes += item.size_bytes;
        }
        self.items.push(item);
    }

    /// Get total number of items
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    /// Number of items that would write something
    pub fn total_writes(&self) -> usize {
        self.total_transfer + self.total_overwrite + self.total_rename
    }

    /// Check if there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.total_writes() == 0
    }

    /// Get human-readable size string
    pub fn size_display(&self) -> String {
        format_bytes(self.total_size_bytes)
    }
}

fn taken(path: &Path, claimed: &HashSet<PathBuf>) -> bool {
    path_occupied(path) || claimed.contains(path)
}

/// Predict what the executor would do for each entry under `policy`.
///
/// Destinations claimed by earlier entries count as occupied, so predicted
/// rename targets never collide with one another.
pub fn preview(entries: &[OperationPlanEntry], policy: ConflictPolicy) -> DryRunResult {
    let mut result = DryRunResult::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for entry in entries {
        let decision = resolve_conflict_with(&entry.dest_path, policy, |p| claimed.contains(p));
        let action = match decision {
            Ok(ConflictDecision::Proceed) => {
                let action = if taken(&entry.dest_path, &claimed) {
                    DryRunAction::Overwrite
                } else {
                    DryRunAction::Transfer
                };
                claimed.insert(entry.dest_path.clone());
                action
            }
            Ok(ConflictDecision::Skip) => DryRunAction::Skip,
            Ok(ConflictDecision::Renamed(path)) => {
                claimed.insert(path.clone());
                DryRunAction::Rename(path)
            }
            Err(_) => DryRunAction::Fail,
        };

        result.add_item(DryRunItem {
            size_bytes: entry_size(entry),
            entry: entry.clone(),
            action,
        });
    }

    result
}

fn entry_size(entry: &OperationPlanEntry) -> u64 {
    match entry.kind {
        EntryKind::File => entry
            .source_path
            .metadata()
            .map(|m| m.len())
            .unwrap_or(0),
        EntryKind::Tree => WalkDir::new(&entry.source_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum(),
    }
}
