//! Link-or-copy helpers for attaching sidecars in place.
//!
//! Unlike relocation, attaching never moves anything: the sidecar found
//! elsewhere is exposed next to the audio file through a symbolic link, a
//! hard link or a copy.
//!
//! # Link Strategy
//!
//! `auto` tries a symbolic link first, then a hard link (same filesystem
//! only), then falls back to copying the file.

mod attach;
mod cleanup;

pub use attach::{attach_sidecars, AttachOptions, AttachStats};
pub use cleanup::{cleanup_broken_links, CleanupOptions, CleanupStats};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::Result;
use crate::exec::transfer::copy_file;
use crate::exec::{resolve_conflict, ConflictDecision, ConflictPolicy};
use crate::utils::path_occupied;

/// How an attached sidecar should be materialised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// Symbolic link, then hard link, then copy
    #[default]
    Auto,
    Symlink,
    Hardlink,
    Copy,
}

impl std::fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Symlink => write!(f, "symlink"),
            Self::Hardlink => write!(f, "hardlink"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

impl FromStr for LinkStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "symlink" => Ok(Self::Symlink),
            "hardlink" => Ok(Self::Hardlink),
            "copy" => Ok(Self::Copy),
            _ => Err(format!(
                "Invalid link type '{}'. Use: auto, symlink, hardlink, or copy",
                s
            )),
        }
    }
}

/// The type of filesystem entry that was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Symlink,
    Hardlink,
    Copy,
}

/// Information about a created link.
#[derive(Debug, Clone)]
pub struct LinkInfo {
    /// The file the link points at.
    pub target: PathBuf,
    /// The link path (the symlink, hard link, or copy).
    pub link: PathBuf,
    pub link_type: LinkType,
}

impl LinkInfo {
    /// Returns `true` if this is a real link (not a copy).
    pub fn is_real_link(&self) -> bool {
        !matches!(self.link_type, LinkType::Copy)
    }
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(windows, unix)))]
fn symlink_file(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Links not supported on this platform",
    ))
}

fn remove_existing(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Expose `target` at `dst` using `strategy`, resolving an occupied `dst`
/// with `policy`.
///
/// Returns `None` when the conflict policy skipped the destination.
pub fn create_link_or_copy(
    target: &Path,
    dst: &Path,
    strategy: LinkStrategy,
    policy: ConflictPolicy,
) -> Result<Option<LinkInfo>> {
    let target = target.canonicalize()?;

    let dst = match resolve_conflict(dst, policy)? {
        ConflictDecision::Skip => {
            debug!("Conflict: skip {}", dst.display());
            return Ok(None);
        }
        ConflictDecision::Proceed => {
            if path_occupied(dst) {
                remove_existing(dst)?;
            }
            dst.to_path_buf()
        }
        ConflictDecision::Renamed(path) => path,
    };

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    let link_type = match strategy {
        LinkStrategy::Symlink => {
            symlink_file(&target, &dst)?;
            LinkType::Symlink
        }
        LinkStrategy::Hardlink => {
            fs::hard_link(&target, &dst)?;
            LinkType::Hardlink
        }
        LinkStrategy::Copy => {
            copy_file(&target, &dst)?;
            LinkType::Copy
        }
        LinkStrategy::Auto => link_auto(&target, &dst)?,
    };

    Ok(Some(LinkInfo {
        target,
        link: dst,
        link_type,
    }))
}

fn link_auto(target: &Path, dst: &Path) -> io::Result<LinkType> {
    match symlink_file(target, dst) {
        Ok(()) => return Ok(LinkType::Symlink),
        Err(e) => debug!("Symlink failed ({}); trying hardlink/copy", e),
    }

    match fs::hard_link(target, dst) {
        Ok(()) => return Ok(LinkType::Hardlink),
        Err(e) => debug!("Hardlink failed ({}); falling back to copy", e),
    }

    copy_file(target, dst)?;
    Ok(LinkType::Copy)
}
