//! Utility functions shared across modules.

use std::path::Path;

/// Normalize a filemask so it only uses `/` as separator.
///
/// # Examples
///
/// ```
/// use sidecar_core::utils::normalize_separators;
///
/// assert_eq!(normalize_separators("{base}.extras\\**"), "{base}.extras/**");
/// assert_eq!(normalize_separators("{base}.lrc"), "{base}.lrc");
/// ```
pub fn normalize_separators(mask: &str) -> String {
    mask.replace('\\', "/")
}

/// Returns `true` if anything occupies `path`, including a dangling symbolic link.
pub fn path_occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Returns `true` if `path` is a symbolic link whose target does not exist.
pub fn is_broken_symlink(path: &Path) -> bool {
    let is_link = path
        .symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    is_link && !path.exists()
}

/// Split a file name into its base, dropping the text after the last `.`.
///
/// A leading dot does not start an extension, so `.hidden` keeps its full name.
pub fn split_base(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// Format bytes into a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
