//! Tree containment check

use std::path::Path;

use crate::error::{Error, Result};

use super::matcher::{EntryKind, OperationPlanEntry};

/// A planned entry excluded before execution
#[derive(Debug)]
pub struct RefusedEntry {
    pub entry: OperationPlanEntry,
    pub error: Error,
}

/// Verify a tree entry's canonical source is strictly inside the canonical
/// source directory. File entries always pass.
pub fn check_containment(entry: &OperationPlanEntry, src_dir: &Path) -> Result<()> {
    if entry.kind != EntryKind::Tree {
        return Ok(());
    }

    let root = src_dir.canonicalize()?;
    let resolved = entry.source_path.canonicalize()?;

    if resolved != root && resolved.starts_with(&root) {
        Ok(())
    } else {
        Err(Error::UnsafeTreeEscape {
            path: resolved,
            root,
        })
    }
}

/// Split entries into those safe to execute and those refused
pub fn partition_safe(
    entries: Vec<OperationPlanEntry>,
    src_dir: &Path,
) -> (Vec<OperationPlanEntry>, Vec<RefusedEntry>) {
    let mut safe = Vec::with_capacity(entries.len());
    let mut refused = Vec::new();

    for entry in entries {
        match check_containment(&entry, src_dir) {
            Ok(()) => safe.push(entry),
            Err(error) => {
                tracing::error!(
                    rule = %entry.type_label,
                    path = %entry.source_path.display(),
                    "Refusing tree sidecar: {}",
                    error
                );
                refused.push(RefusedEntry { entry, error });
            }
        }
    }

    (safe, refused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MoveMode;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tree_entry(source: PathBuf) -> OperationPlanEntry {
        OperationPlanEntry {
            kind: EntryKind::Tree,
            rule_index: 0,
            type_label: "extras".to_string(),
            dest_path: source.with_extension("moved"),
            source_path: source,
            mode: MoveMode::Move,
        }
    }

    #[test]
    fn test_inside_directory_passes() {
        let temp = TempDir::new().unwrap();
        let extras = temp.path().join("track.extras");
        fs::create_dir(&extras).unwrap();

        assert!(check_containment(&tree_entry(extras), temp.path()).is_ok());
    }

    #[test]
    fn test_parent_segments_escape() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        fs::create_dir_all(temp.path().join("outside")).unwrap();
        fs::create_dir(&album).unwrap();

        let entry = tree_entry(album.join("..").join("outside"));
        let (safe, refused) = partition_safe(vec![entry], &album);
        assert!(safe.is_empty());
        assert!(matches!(refused[0].error, Error::UnsafeTreeEscape { .. }));
    }

    #[test]
    fn test_source_dir_itself_is_refused() {
        let temp = TempDir::new().unwrap();
        let entry = tree_entry(temp.path().join("."));
        assert!(check_containment(&entry, temp.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_refused() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        let outside = temp.path().join("secret");
        fs::create_dir(&album).unwrap();
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, album.join("track.extras")).unwrap();

        let err = check_containment(&tree_entry(album.join("track.extras")), &album).unwrap_err();
        assert!(matches!(err, Error::UnsafeTreeEscape { .. }), "{}", err);
    }

    #[test]
    fn test_file_entries_skip_check() {
        let mut entry = tree_entry(PathBuf::from("/nowhere/x.lrc"));
        entry.kind = EntryKind::File;
        assert!(check_containment(&entry, Path::new("/also-nowhere")).is_ok());
    }
}
