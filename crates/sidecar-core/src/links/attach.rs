//! Attach existing lyrics and covers next to audio files

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::exec::ConflictPolicy;

use super::{create_link_or_copy, LinkStrategy};

/// Audio extensions recognised by default
pub const AUDIO_EXTS_DEFAULT: &[&str] = &[
    ".flac", ".mp3", ".m4a", ".ogg", ".opus", ".wav", ".aiff", ".ape", ".wv",
];

/// Folder cover file names, in order of preference
pub const COVER_CANDIDATES_DEFAULT: &[&str] = &[
    "cover.jpg",
    "cover.png",
    "folder.jpg",
    "folder.png",
    "front.jpg",
    "front.png",
];

/// Options for [`attach_sidecars`]
#[derive(Debug, Clone)]
pub struct AttachOptions {
    pub link_strategy: LinkStrategy,
    pub conflict: ConflictPolicy,
    /// Extensions with or without the leading dot, compared case-insensitively
    pub audio_exts: Vec<String>,
    pub cover_candidates: Vec<String>,
    pub attach_lyrics: bool,
    pub attach_cover: bool,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            link_strategy: LinkStrategy::Auto,
            conflict: ConflictPolicy::Skip,
            audio_exts: AUDIO_EXTS_DEFAULT.iter().map(|s| s.to_string()).collect(),
            cover_candidates: COVER_CANDIDATES_DEFAULT.iter().map(|s| s.to_string()).collect(),
            attach_lyrics: true,
            attach_cover: true,
        }
    }
}

/// Counters reported by [`attach_sidecars`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttachStats {
    pub processed_audio: usize,
    pub created_lyrics: usize,
    pub created_covers: usize,
    pub skipped: usize,
    pub errors: usize,
}

fn normalize_ext(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

fn dotted_ext(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

fn lower_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Regular files under `root`, following links to files, in name order
fn walk_files(root: &Path, errors: &mut usize) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.path().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                *errors += 1;
                tracing::error!("Failed walking {}: {}", root.display(), e);
            }
        }
    }
    files
}

/// Index `.lrc` files by lowercase stem
fn index_lyrics(files: &[PathBuf]) -> HashMap<String, Vec<PathBuf>> {
    let mut index: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for path in files {
        if dotted_ext(path).as_deref() != Some(".lrc") {
            continue;
        }
        if let Some(stem) = lower_stem(path) {
            index.entry(stem).or_default().push(path.clone());
        }
    }
    index
}

/// A lyrics file already next to the audio wins; otherwise a unique stem
/// match anywhere under the root.
fn find_lyrics(audio: &Path, index: &HashMap<String, Vec<PathBuf>>) -> Option<PathBuf> {
    let local = audio.with_extension("lrc");
    if local.exists() {
        return Some(local);
    }
    match index.get(&lower_stem(audio)?) {
        Some(matches) if matches.len() == 1 => Some(matches[0].clone()),
        _ => None,
    }
}

fn find_cover(folder: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| folder.join(name))
        .find(|p| p.is_file())
}

enum Attached {
    Created,
    AlreadyPresent,
    Skipped,
}

fn attach_one(target: &Path, dst: &Path, options: &AttachOptions) -> Result<Attached> {
    if same_file(dst, target) {
        return Ok(Attached::AlreadyPresent);
    }
    match create_link_or_copy(target, dst, options.link_strategy, options.conflict)? {
        Some(info) => {
            tracing::info!("Attached {} -> {}", info.link.display(), info.target.display());
            Ok(Attached::Created)
        }
        None => Ok(Attached::Skipped),
    }
}

/// Walk `root` and attach lyrics and folder covers to every audio file.
///
/// Per-item failures are counted and logged; the walk always completes.
pub fn attach_sidecars(root: &Path, options: &AttachOptions) -> AttachStats {
    let mut stats = AttachStats::default();
    let exts: HashSet<String> = options.audio_exts.iter().map(|e| normalize_ext(e)).collect();

    let files = walk_files(root, &mut stats.errors);
    let lyrics_index = if options.attach_lyrics {
        index_lyrics(&files)
    } else {
        HashMap::new()
    };
    let mut cover_done: HashSet<PathBuf> = HashSet::new();

    let audio_files = files
        .iter()
        .filter(|p| dotted_ext(p).is_some_and(|e| exts.contains(&e)));

    for audio in audio_files {
        stats.processed_audio += 1;

        if options.attach_lyrics {
            match find_lyrics(audio, &lyrics_index) {
                None => tracing::debug!("No lyrics for {}", audio.display()),
                Some(src) => match attach_one(&src, &audio.with_extension("lrc"), options) {
                    Ok(Attached::Created) => stats.created_lyrics += 1,
                    Ok(Attached::AlreadyPresent) => {
                        tracing::debug!("Lyrics already attached for {}", audio.display())
                    }
                    Ok(Attached::Skipped) => stats.skipped += 1,
                    Err(e) => {
                        stats.errors += 1;
                        tracing::error!("Failed attaching lyrics for {}: {}", audio.display(), e);
                    }
                },
            }
        }

        if !options.attach_cover {
            continue;
        }
        let Some(folder) = audio.parent() else {
            continue;
        };
        if !cover_done.insert(folder.to_path_buf()) {
            continue;
        }

        let Some(src) = find_cover(folder, &options.cover_candidates) else {
            tracing::debug!("No cover candidates in {}", folder.display());
            continue;
        };
        let ext = dotted_ext(&src).unwrap_or_default();
        match attach_one(&src, &folder.join(format!("cover{}", ext)), options) {
            Ok(Attached::Created) => stats.created_covers += 1,
            Ok(Attached::AlreadyPresent) => {
                tracing::debug!("Cover already present in {}", folder.display())
            }
            Ok(Attached::Skipped) => stats.skipped += 1,
            Err(e) => {
                stats.errors += 1;
                tracing::error!("Failed attaching cover in {}: {}", folder.display(), e);
            }
        }
    }

    stats
}
