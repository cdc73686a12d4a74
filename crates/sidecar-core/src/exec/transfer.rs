//! Staged file and tree transfers.
//!
//! Every transfer is assembled inside a temporary directory created next to
//! the destination and installed with a single rename, so a failure never
//! leaves a partial file or tree at the destination. When replacing, the old
//! destination is moved into the staging area first and put back if the
//! installation fails.

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::plan::EntryKind;
use crate::rule::MoveMode;
use crate::utils::path_occupied;

const STAGE_PREFIX: &str = ".sidecar-";

/// Transfer `from` to `to`.
///
/// With `replace` set, an existing destination is replaced; otherwise the
/// caller guarantees `to` is free.
pub fn transfer(
    kind: EntryKind,
    from: &Path,
    to: &Path,
    mode: MoveMode,
    replace: bool,
) -> io::Result<()> {
    let parent = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let stage = tempfile::Builder::new()
        .prefix(STAGE_PREFIX)
        .tempdir_in(parent)?;

    if mode == MoveMode::Move {
        match install(from, to, stage.path(), replace) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    from = %from.display(),
                    to = %to.display(),
                    "Rename failed ({}), falling back to copy",
                    e
                );
            }
        }
    }

    let payload = stage.path().join("payload");
    let modes = copy_any(kind, from, &payload)?;
    install(&payload, to, stage.path(), replace)?;
    apply_modes(to, &modes)?;

    if mode == MoveMode::Move {
        remove_path(kind, from)?;
    }

    Ok(())
}

/// Rename `ready` into `to`, displacing any existing destination into `stage`
fn install(ready: &Path, to: &Path, stage: &Path, replace: bool) -> io::Result<()> {
    let displaced = if replace && path_occupied(to) {
        let aside = stage.join("displaced");
        fs::rename(to, &aside)?;
        Some(aside)
    } else {
        None
    };

    if let Err(e) = fs::rename(ready, to) {
        if let Some(aside) = displaced {
            if let Err(restore) = fs::rename(&aside, to) {
                tracing::error!(
                    path = %to.display(),
                    "Failed to restore replaced destination: {}",
                    restore
                );
            }
        }
        return Err(e);
    }

    Ok(())
}

/// Directory permissions recorded during a tree copy, keyed by path
/// relative to the tree root
type DirModes = Vec<(PathBuf, fs::Permissions)>;

fn copy_any(kind: EntryKind, from: &Path, to: &Path) -> io::Result<DirModes> {
    match kind {
        EntryKind::File => copy_file(from, to).map(|()| Vec::new()),
        EntryKind::Tree => {
            let mut modes = Vec::new();
            copy_dir_contents(from, to, Path::new(""), &mut modes)?;
            Ok(modes)
        }
    }
}

/// Restore directory permissions once the tree sits at its final path.
///
/// A read-only directory cannot be renamed into another parent, and its
/// staged copy could not be cleaned up after a failure.
fn apply_modes(root: &Path, modes: &DirModes) -> io::Result<()> {
    for (relative, perms) in modes.iter().rev() {
        fs::set_permissions(root.join(relative), perms.clone())?;
    }
    Ok(())
}

/// Copy a file, keeping its permissions and modification time
pub fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    let meta = fs::metadata(from)?;
    filetime::set_file_mtime(to, FileTime::from_last_modification_time(&meta))
}

/// Recursively copies a directory and its contents.
///
/// Symbolic links are recreated as links on Unix rather than followed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    let mut modes = Vec::new();
    copy_dir_contents(src, dst, Path::new(""), &mut modes)?;
    apply_modes(dst, &modes)
}

fn copy_dir_contents(
    src: &Path,
    dst: &Path,
    relative: &Path,
    modes: &mut DirModes,
) -> io::Result<()> {
    fs::create_dir(dst)?;
    modes.push((relative.to_path_buf(), fs::metadata(src)?.permissions()));

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if ty.is_dir() {
            copy_dir_contents(&src_path, &dst_path, &relative.join(entry.file_name()), modes)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        copy_file(src, dst)
    }
}

/// Remove a file or a whole tree
pub fn remove_path(kind: EntryKind, path: &Path) -> io::Result<()> {
    match kind {
        EntryKind::File => fs::remove_file(path),
        EntryKind::Tree => fs::remove_dir_all(path),
    }
}
