//! Removal of dangling sidecar links

use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::utils::is_broken_symlink;

/// Options for [`cleanup_broken_links`]
#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    /// Remove dangling `*.lrc` links
    pub remove_lyrics: bool,
    /// Remove dangling `cover.jpg` / `cover.png` links
    pub remove_cover: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_lyrics: true,
            remove_cover: true,
        }
    }
}

/// Counters reported by [`cleanup_broken_links`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub removed_broken_links: usize,
    /// Dangling links that are not sidecars
    pub skipped: usize,
    pub errors: usize,
}

/// Remove dangling sidecar links under `root`. Links that still resolve are
/// never touched.
pub fn cleanup_broken_links(root: &Path, options: CleanupOptions) -> CleanupStats {
    let mut stats = CleanupStats::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                stats.errors += 1;
                tracing::error!("Failed walking {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.path_is_symlink() || !is_broken_symlink(path) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        let is_lyrics = options.remove_lyrics && name.ends_with(".lrc");
        let is_cover = options.remove_cover && (name == "cover.jpg" || name == "cover.png");
        if !(is_lyrics || is_cover) {
            stats.skipped += 1;
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => {
                stats.removed_broken_links += 1;
                tracing::info!("Removed broken sidecar link: {}", path.display());
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!("Failed removing broken link {}: {}", path.display(), e);
            }
        }
    }

    stats
}
