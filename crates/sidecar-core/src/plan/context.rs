//! Path fragments derived from one relocation event

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::split_base;

/// The directory and base name on each side of a primary-artifact move.
///
/// Built once per event and discarded after the plan runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub src_audio: PathBuf,
    pub dst_audio: PathBuf,
    pub src_dir: PathBuf,
    pub src_base: String,
    pub dst_dir: PathBuf,
    pub dst_base: String,
}

impl ResolutionContext {
    /// Derive the context from the audio file's previous and final paths.
    ///
    /// Both paths must be absolute, non-empty and have a non-empty parent.
    pub fn resolve(src_audio: impl AsRef<Path>, dst_audio: impl AsRef<Path>) -> Result<Self> {
        let src_audio = src_audio.as_ref();
        let dst_audio = dst_audio.as_ref();

        let (src_dir, src_base) = split_audio_path(src_audio)?;
        let (dst_dir, dst_base) = split_audio_path(dst_audio)?;

        Ok(Self {
            src_audio: src_audio.to_path_buf(),
            dst_audio: dst_audio.to_path_buf(),
            src_dir,
            src_base,
            dst_dir,
            dst_base,
        })
    }

    /// Returns true if the primary artifact did not change directory or base
    pub fn is_identity(&self) -> bool {
        self.src_dir == self.dst_dir && self.src_base == self.dst_base
    }
}

fn split_audio_path(path: &Path) -> Result<(PathBuf, String)> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }
    if !path.is_absolute() {
        return Err(Error::invalid_path(path, "path must be absolute"));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(Error::invalid_path(path, "path has no parent directory")),
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_path(path, "path has no file name"))?
        .to_str()
        .ok_or_else(|| Error::invalid_path(path, "file name is not valid UTF-8"))?;

    Ok((parent.to_path_buf(), split_base(file_name).to_string()))
}
