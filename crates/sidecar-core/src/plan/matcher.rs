//! Match engine: turns expanded masks into concrete plan entries

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, ValidationError};
use crate::rule::{MoveMode, RuleKind, SidecarRule};

use super::context::ResolutionContext;
use super::glob::MaskPattern;
use super::mask::ExpandedMask;

/// Tag snapshot supplied by the caller for one event
pub type Metadata = HashMap<String, String>;

/// Whether an entry transfers one file or a whole directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Tree,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// One concrete filesystem action. Never mutated after planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationPlanEntry {
    pub kind: EntryKind,
    /// Position of the originating rule in the rule list
    pub rule_index: usize,
    pub type_label: String,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub mode: MoveMode,
}

/// Result of checking an embedded rule's tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPresence {
    Present,
    Missing,
    /// No metadata snapshot was available for the event
    Unverified,
}

impl TagPresence {
    /// `Some(true/false)` when verified, `None` when unknown
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Present => Some(true),
            Self::Missing => Some(false),
            Self::Unverified => None,
        }
    }
}

impl fmt::Display for TagPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Missing => write!(f, "missing"),
            Self::Unverified => write!(f, "unverified"),
        }
    }
}

/// Outcome of one embedded rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedCheck {
    pub rule_index: usize,
    pub type_label: String,
    pub tag: String,
    pub presence: TagPresence,
}

/// Check every enabled embedded rule against the metadata snapshot
pub fn check_embedded(rules: &[SidecarRule], metadata: Option<&Metadata>) -> Vec<EmbeddedCheck> {
    let mut checks = Vec::new();

    for (rule_index, rule) in rules.iter().enumerate() {
        let RuleKind::Embedded { tag } = &rule.kind else {
            continue;
        };
        if !rule.enabled {
            continue;
        }

        let presence = match metadata {
            None => TagPresence::Unverified,
            Some(tags) if tags.get(tag).is_some_and(|v| !v.is_empty()) => TagPresence::Present,
            Some(_) => TagPresence::Missing,
        };
        tracing::debug!(rule = %rule.type_label, tag = %tag, %presence, "Embedded tag check");

        checks.push(EmbeddedCheck {
            rule_index,
            type_label: rule.type_label.clone(),
            tag: tag.clone(),
            presence,
        });
    }

    checks
}

struct DirListing {
    /// Sorted names of non-directory entries
    files: Vec<String>,
}

impl DirListing {
    fn read(dir: &Path) -> io::Result<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "Source directory is gone, nothing to match");
                return Ok(Self { files: Vec::new() });
            }
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push(name),
                Err(name) => {
                    tracing::debug!(name = ?name, "Skipping non UTF-8 file name");
                }
            }
        }
        files.sort();

        Ok(Self { files })
    }
}

/// Enumerate the filesystem entries each mask matches.
///
/// The source directory is listed once. A missing source directory yields no
/// entries; any other listing failure is returned. A source matched by more
/// than one rule is rejected with [`ValidationError::OverlappingMatch`].
pub fn find_matches(
    masks: &[ExpandedMask],
    rules: &[SidecarRule],
    ctx: &ResolutionContext,
) -> Result<Vec<OperationPlanEntry>> {
    let mut entries = Vec::new();
    let mut listing: Option<DirListing> = None;

    for mask in masks {
        let mode = rules
            .get(mask.rule_index)
            .map(|r| r.move_mode)
            .unwrap_or_default();

        if mask.is_tree {
            let source_path = ctx.src_dir.join(&mask.source_pattern);
            if !source_path.is_dir() {
                tracing::debug!(rule = %mask.type_label, path = %source_path.display(), "No tree match");
                continue;
            }
            push_entry(
                &mut entries,
                ctx,
                OperationPlanEntry {
                    kind: EntryKind::Tree,
                    rule_index: mask.rule_index,
                    type_label: mask.type_label.clone(),
                    dest_path: ctx.dst_dir.join(&mask.dest_pattern),
                    source_path,
                    mode,
                },
            );
            continue;
        }

        if listing.is_none() {
            listing = Some(DirListing::read(&ctx.src_dir)?);
        }
        let files = listing
            .as_ref()
            .map(|l| l.files.as_slice())
            .unwrap_or_default();

        let pattern = MaskPattern::compile(&mask.template, &ctx.src_base).map_err(|e| {
            ValidationError::InvalidPattern {
                rule: mask.type_label.clone(),
                reason: e.to_string(),
            }
        })?;
        let mut matched = 0usize;
        for name in files {
            let Some(dest_name) = pattern.rewrite(name, &ctx.dst_base) else {
                continue;
            };
            matched += 1;
            push_entry(
                &mut entries,
                ctx,
                OperationPlanEntry {
                    kind: EntryKind::File,
                    rule_index: mask.rule_index,
                    type_label: mask.type_label.clone(),
                    source_path: ctx.src_dir.join(name),
                    dest_path: ctx.dst_dir.join(dest_name),
                    mode,
                },
            );
        }
        if matched == 0 {
            tracing::debug!(rule = %mask.type_label, pattern = %mask.source_pattern, "No file match");
        }
    }

    check_overlaps(&entries)?;
    Ok(entries)
}

/// Fail if two entries would transfer the same source. The first such source
/// (in plan order) is reported with every rule that matched it.
fn check_overlaps(entries: &[OperationPlanEntry]) -> std::result::Result<(), ValidationError> {
    let mut owners: HashMap<&Path, Vec<&str>> = HashMap::new();
    let mut order: Vec<&Path> = Vec::new();

    for entry in entries {
        let group = owners.entry(entry.source_path.as_path()).or_default();
        if group.is_empty() {
            order.push(&entry.source_path);
        }
        group.push(&entry.type_label);
    }

    for path in order {
        if let Some(rules) = owners.get(path).filter(|r| r.len() > 1) {
            return Err(ValidationError::OverlappingMatch {
                path: path.to_path_buf(),
                rules: rules.iter().map(|r| r.to_string()).collect(),
            });
        }
    }

    Ok(())
}

fn push_entry(entries: &mut Vec<OperationPlanEntry>, ctx: &ResolutionContext, entry: OperationPlanEntry) {
    if entry.source_path == ctx.src_audio || entry.source_path == ctx.dst_audio {
        tracing::debug!(rule = %entry.type_label, path = %entry.source_path.display(), "Match is the audio file itself, ignoring");
        return;
    }
    if entry.source_path == entry.dest_path {
        tracing::debug!(rule = %entry.type_label, path = %entry.source_path.display(), "Sidecar already in place");
        return;
    }
    entries.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::mask::expand_all;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, ResolutionContext) {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        fs::create_dir_all(&album).unwrap();
        for f in files {
            let p = album.join(f);
            if let Some(dir) = f.strip_suffix('/') {
                fs::create_dir_all(album.join(dir)).unwrap();
            } else {
                fs::write(p, f.as_bytes()).unwrap();
            }
        }
        let ctx = ResolutionContext::resolve(
            album.join("track.flac"),
            temp.path().join("done").join("renamed.flac"),
        )
        .unwrap();
        (temp, ctx)
    }

    fn plan(rules: &[SidecarRule], ctx: &ResolutionContext) -> Vec<OperationPlanEntry> {
        find_matches(&expand_all(rules, ctx), rules, ctx).unwrap()
    }

    #[test]
    fn test_file_match() {
        let (_temp, ctx) = setup(&["track.flac", "track.lrc", "other.lrc"]);
        let rules = vec![SidecarRule::external("lyrics", "{base}.lrc")];
        let entries = plan(&rules, &ctx);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].source_path, ctx.src_dir.join("track.lrc"));
        assert_eq!(entries[0].dest_path, ctx.dst_dir.join("renamed.lrc"));
        assert_eq!(entries[0].mode, MoveMode::Move);
    }

    #[test]
    fn test_wildcard_yields_independent_entries() {
        let (_temp, ctx) = setup(&["track-back.jpg", "track-front.jpg", "x-front.jpg"]);
        let rules = vec![SidecarRule::external("art", "{base}-*.jpg")];
        let entries = plan(&rules, &ctx);

        let dests: Vec<_> = entries.iter().map(|e| e.dest_path.clone()).collect();
        assert_eq!(
            dests,
            vec![
                ctx.dst_dir.join("renamed-back.jpg"),
                ctx.dst_dir.join("renamed-front.jpg"),
            ]
        );
    }

    #[test]
    fn test_audio_file_itself_is_never_planned() {
        let (_temp, ctx) = setup(&["track.flac", "track.lrc"]);
        let rules = vec![SidecarRule::external("all", "{base}.*")];
        let entries = plan(&rules, &ctx);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_path, ctx.src_dir.join("track.lrc"));
    }

    #[test]
    fn test_source_matched_by_two_rules_is_rejected() {
        let (_temp, ctx) = setup(&["track.lrc", "track.cue"]);
        let rules = vec![
            SidecarRule::external("lyrics", "{base}.lrc"),
            SidecarRule::external("all", "{base}.*"),
        ];

        let err = find_matches(&expand_all(&rules, &ctx), &rules, &ctx).unwrap_err();
        match err.as_validation() {
            Some(ValidationError::OverlappingMatch { path, rules }) => {
                assert_eq!(path, &ctx.src_dir.join("track.lrc"));
                assert_eq!(rules, &vec!["lyrics".to_string(), "all".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_directories_do_not_match_file_masks() {
        let (_temp, ctx) = setup(&["track.lrc/"]);
        let rules = vec![SidecarRule::external("lyrics", "{base}.lrc")];
        assert!(plan(&rules, &ctx).is_empty());
    }

    #[test]
    fn test_tree_match() {
        let (_temp, ctx) = setup(&["track.extras/", "track.extras/a.txt"]);
        let rules = vec![
            SidecarRule::external("extras", "{base}.extras/**").with_move_mode(MoveMode::Copy),
        ];
        let entries = plan(&rules, &ctx);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Tree);
        assert_eq!(entries[0].source_path, ctx.src_dir.join("track.extras"));
        assert_eq!(entries[0].dest_path, ctx.dst_dir.join("renamed.extras"));
        assert_eq!(entries[0].mode, MoveMode::Copy);
    }

    #[test]
    fn test_missing_tree_and_missing_dir_are_noops() {
        let (temp, ctx) = setup(&[]);
        let rules = vec![
            SidecarRule::external("extras", "{base}.extras/**"),
            SidecarRule::external("lyrics", "{base}.lrc"),
        ];
        assert!(plan(&rules, &ctx).is_empty());

        fs::remove_dir_all(temp.path().join("album")).unwrap();
        assert!(plan(&rules, &ctx).is_empty());
    }

    #[test]
    fn test_same_source_and_destination_is_noop() {
        let (_temp, ctx) = setup(&["track.lrc"]);
        let ctx = ResolutionContext::resolve(&ctx.src_audio, ctx.src_dir.join("track.mp3")).unwrap();
        let rules = vec![SidecarRule::external("lyrics", "{base}.lrc")];
        assert!(plan(&rules, &ctx).is_empty());
    }

    #[test]
    fn test_embedded_checks() {
        let rules = vec![
            SidecarRule::embedded("cover", "coverart"),
            SidecarRule::embedded("lyrics_tag", "lyrics"),
            SidecarRule::embedded("off", "x").with_enabled(false),
            SidecarRule::external("lyrics", "{base}.lrc"),
        ];
        let mut tags = Metadata::new();
        tags.insert("coverart".to_string(), "image/jpeg".to_string());
        tags.insert("lyrics".to_string(), String::new());

        let checks = check_embedded(&rules, Some(&tags));
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].presence, TagPresence::Present);
        assert_eq!(checks[0].presence.as_bool(), Some(true));
        assert_eq!(checks[1].presence, TagPresence::Missing);

        let checks = check_embedded(&rules, None);
        assert!(checks.iter().all(|c| c.presence == TagPresence::Unverified));
    }
}
