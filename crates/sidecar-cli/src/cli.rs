//! Command definitions and headless runners
//!
//! Usage:
//!   sidecar relocate <FROM> <TO>     Move sidecars after an audio move
//!   sidecar preview <FROM> <TO>      Show what relocate would do
//!   sidecar rules                    Show the active rule set
//!   sidecar rules validate <FILE>    Check a rules file
//!   sidecar attach <ROOT>            Link lyrics and covers in place
//!   sidecar cleanup <ROOT>           Remove dangling sidecar links
//!
//! Options:
//!   --json             Output in JSON format

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use sidecar_core::{
    attach_sidecars, cleanup_broken_links, AttachOptions, CleanupOptions, ConflictPolicy,
    DryRunResult, Error, EventResult, LinkStrategy, Metadata, RuleSet,
    SidecarConfig, SidecarEngine, SidecarRule,
};

/// Keep sidecar files next to renamed or moved audio files
#[derive(Parser, Debug)]
#[command(name = "sidecar")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, env = "SIDECAR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relocate the sidecars of one audio file that moved from FROM to TO
    Relocate(EventArgs),
    /// Preview a relocation without touching anything
    Preview(EventArgs),
    /// Show the active or default rule set
    Rules(RulesArgs),
    /// Attach lyrics and folder covers next to audio files under ROOT
    Attach(AttachArgs),
    /// Remove dangling lyrics and cover links under ROOT
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Previous path of the audio file
    pub from: PathBuf,
    /// Final path of the audio file
    pub to: PathBuf,
    /// Conflict policy for this event (skip, overwrite, rename)
    #[arg(long)]
    pub conflict: Option<ConflictPolicy>,
    /// JSON rules file to use instead of the configured rules
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Metadata tag known for the audio file (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
    /// Execute entries in parallel
    #[arg(long)]
    pub parallel: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: Option<RulesAction>,
    /// Show the baseline rules instead of the configured ones
    #[arg(long)]
    pub defaults: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// Validate a JSON rules file
    Validate { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    pub root: PathBuf,
    /// auto, symlink, hardlink or copy
    #[arg(long, default_value = "auto")]
    pub link_type: LinkStrategy,
    #[arg(long, default_value = "skip")]
    pub conflict: ConflictPolicy,
    #[arg(long)]
    pub no_lyrics: bool,
    #[arg(long)]
    pub no_cover: bool,
    /// Audio extension to look for (repeatable, replaces the defaults)
    #[arg(long = "audio-ext")]
    pub audio_exts: Vec<String>,
    /// Cover file name to look for (repeatable, replaces the defaults)
    #[arg(long = "cover-candidate")]
    pub cover_candidates: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    pub root: PathBuf,
    #[arg(long)]
    pub no_lyrics: bool,
    #[arg(long)]
    pub no_cover: bool,
    #[arg(long)]
    pub json: bool,
}

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Validation errors, failed or refused entries, counted errors
    Failed,
    /// The root directory given to attach/cleanup does not exist
    MissingRoot,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::MissingRoot => 2,
        }
    }
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid tag '{}': expected KEY=VALUE", s))?;
    if key.trim().is_empty() {
        return Err(format!("invalid tag '{}': empty key", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Run the parsed command
pub fn run(cli: Cli) -> anyhow::Result<Status> {
    match cli.command {
        Command::Relocate(args) => run_relocate(cli.config.as_deref(), args),
        Command::Preview(args) => run_preview(cli.config.as_deref(), args),
        Command::Rules(args) => run_rules(cli.config.as_deref(), args),
        Command::Attach(args) => run_attach(args),
        Command::Cleanup(args) => run_cleanup(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SidecarConfig> {
    match path {
        Some(path) => SidecarConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(SidecarConfig::load()),
    }
}

/// Rules from a file are only checked rule by rule here, so set-level
/// problems surface through the event result like configured rules would.
fn load_rules_file(path: &Path) -> anyhow::Result<Vec<SidecarRule>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid rules file {}", path.display()))
}

fn build_engine(config_path: Option<&Path>, args: &EventArgs) -> anyhow::Result<SidecarEngine> {
    let config = load_config(config_path)?;
    let mut engine = SidecarEngine::from_config(&config);
    if let Some(path) = &args.rules {
        engine = SidecarEngine::new(load_rules_file(path)?)
            .with_conflict_policy(config.conflict_policy)
            .with_name_case(config.name_case);
    }
    Ok(engine.with_parallel(args.parallel || config.parallel))
}

fn metadata(args: &EventArgs) -> Option<Metadata> {
    if args.tags.is_empty() {
        None
    } else {
        Some(args.tags.iter().cloned().collect())
    }
}

fn run_relocate(config_path: Option<&Path>, args: EventArgs) -> anyhow::Result<Status> {
    let engine = build_engine(config_path, &args)?;
    let metadata = metadata(&args);

    let result = engine
        .plan_and_execute(&args.from, &args.to, metadata.as_ref(), args.conflict)
        .context("Relocation failed")?;

    print_event_result(&result, args.json);

    Ok(if result.is_success() {
        Status::Success
    } else {
        Status::Failed
    })
}

fn run_preview(config_path: Option<&Path>, args: EventArgs) -> anyhow::Result<Status> {
    let engine = build_engine(config_path, &args)?;
    let metadata = metadata(&args);

    match engine.dry_run(&args.from, &args.to, metadata.as_ref(), args.conflict) {
        Ok(result) => {
            print_dry_run_result(&result, args.json);
            Ok(Status::Success)
        }
        Err(Error::Validation(e)) => {
            if args.json {
                println!("{}", serde_json::json!({ "validation_error": e.to_string() }));
            } else {
                println!("Rules rejected: {}", e);
            }
            Ok(Status::Failed)
        }
        Err(e) => Err(e).context("Preview failed"),
    }
}

fn run_rules(config_path: Option<&Path>, args: RulesArgs) -> anyhow::Result<Status> {
    if let Some(RulesAction::Validate { file }) = args.action {
        let raw = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read rules file {}", file.display()))?;
        return Ok(match RuleSet::from_json(&raw) {
            Ok(set) => {
                if args.json {
                    println!("{}", serde_json::json!({ "valid": true, "rules": set.len() }));
                } else {
                    println!("{}: {} rules, OK", file.display(), set.len());
                }
                Status::Success
            }
            Err(e) => {
                if args.json {
                    println!("{}", serde_json::json!({ "valid": false, "error": e.to_string() }));
                } else {
                    println!("{}: {}", file.display(), e);
                }
                Status::Failed
            }
        });
    }

    let rules = if args.defaults {
        RuleSet::defaults()
    } else {
        load_config(config_path)?.rules
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        println!("Rules ({}):", rules.len());
        for rule in rules.rules() {
            let target = match rule.embedded_tag() {
                Some(tag) => format!("tag:{}", tag),
                None => rule.filemask().unwrap_or_default().to_string(),
            };
            println!(
                "  [{}] {:<16} {:<24} {}",
                if rule.enabled { "x" } else { " " },
                rule.type_label,
                target,
                rule.move_mode
            );
        }
    }

    Ok(Status::Success)
}

fn run_attach(args: AttachArgs) -> anyhow::Result<Status> {
    if !args.root.is_dir() {
        eprintln!("Error: root does not exist: {}", args.root.display());
        return Ok(Status::MissingRoot);
    }

    let mut options = AttachOptions {
        link_strategy: args.link_type,
        conflict: args.conflict,
        attach_lyrics: !args.no_lyrics,
        attach_cover: !args.no_cover,
        ..Default::default()
    };
    if !args.audio_exts.is_empty() {
        options.audio_exts = args.audio_exts;
    }
    if !args.cover_candidates.is_empty() {
        options.cover_candidates = args.cover_candidates;
    }

    let stats = attach_sidecars(&args.root, &options);

    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("Attach Complete:");
        println!("  Audio files:    {}", stats.processed_audio);
        println!("  Lyrics created: {}", stats.created_lyrics);
        println!("  Covers created: {}", stats.created_covers);
        println!("  Skipped:        {}", stats.skipped);
        println!("  Errors:         {}", stats.errors);
    }

    Ok(if stats.errors == 0 {
        Status::Success
    } else {
        Status::Failed
    })
}

fn run_cleanup(args: CleanupArgs) -> anyhow::Result<Status> {
    if !args.root.is_dir() {
        eprintln!("Error: root does not exist: {}", args.root.display());
        return Ok(Status::MissingRoot);
    }

    let stats = cleanup_broken_links(
        &args.root,
        CleanupOptions {
            remove_lyrics: !args.no_lyrics,
            remove_cover: !args.no_cover,
        },
    );

    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!("Cleanup Complete:");
        println!("  Removed: {}", stats.removed_broken_links);
        println!("  Skipped: {}", stats.skipped);
        println!("  Errors:  {}", stats.errors);
    }

    Ok(if stats.errors == 0 {
        Status::Success
    } else {
        Status::Failed
    })
}

fn print_event_result(result: &EventResult, json: bool) {
    if json {
        let operations: Vec<_> = result
            .operations
            .iter()
            .map(|op| {
                serde_json::json!({
                    "rule": op.entry.type_label,
                    "kind": op.entry.kind,
                    "mode": op.entry.mode,
                    "source": op.entry.source_path.to_string_lossy(),
                    "dest": op.entry.dest_path.to_string_lossy(),
                    "final_path": op.final_path.as_ref().map(|p| p.to_string_lossy()),
                    "state": op.state,
                    "error": op.error.as_ref().map(|e| e.to_string()),
                })
            })
            .collect();
        let embedded: Vec<_> = result
            .embedded_checks
            .iter()
            .map(|check| {
                serde_json::json!({
                    "rule": check.type_label,
                    "tag": check.tag,
                    "tag_present": check.presence.as_bool(),
                })
            })
            .collect();
        let refused: Vec<_> = result
            .refused
            .iter()
            .map(|r| {
                serde_json::json!({
                    "rule": r.entry.type_label,
                    "source": r.entry.source_path.to_string_lossy(),
                    "error": r.error.to_string(),
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "summary": {
                    "transferred": result.transferred(),
                    "renamed": result.renamed(),
                    "skipped": result.skipped(),
                    "failed": result.failed(),
                    "refused": result.refused.len(),
                },
                "validation_error": result.validation_error.as_ref().map(|e| e.to_string()),
                "operations": operations,
                "embedded_checks": embedded,
                "refused": refused,
            })
        );
        return;
    }

    if let Some(e) = &result.validation_error {
        println!("Rules rejected: {}", e);
        return;
    }

    println!("Relocation Complete:");
    println!("  Transferred: {}", result.transferred());
    println!("  Renamed:     {}", result.renamed());
    println!("  Skipped:     {}", result.skipped());
    println!("  Failed:      {}", result.failed());
    println!("  Refused:     {}", result.refused.len());

    if !result.operations.is_empty() {
        println!();
        for op in &result.operations {
            let target = op.final_path.as_ref().unwrap_or(&op.entry.dest_path);
            println!(
                "  [{}] {} {} -> {}",
                op.state,
                op.entry.type_label,
                op.entry.source_path.display(),
                target.display()
            );
            if let Some(e) = &op.error {
                println!("      {}", e);
            }
        }
    }

    for refused in &result.refused {
        println!("  [refused] {}: {}", refused.entry.type_label, refused.error);
    }

    for check in &result.embedded_checks {
        println!("  [tag] {} ({}): {}", check.type_label, check.tag, check.presence);
    }
}

fn print_dry_run_result(result: &DryRunResult, json: bool) {
    if json {
        let items: Vec<_> = result
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "rule": item.entry.type_label,
                    "kind": item.entry.kind,
                    "source": item.entry.source_path.to_string_lossy(),
                    "dest": item.entry.dest_path.to_string_lossy(),
                    "action": item.action,
                    "size_bytes": item.size_bytes,
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "summary": {
                    "total": result.total_items(),
                    "transfer": result.total_transfer,
                    "overwrite": result.total_overwrite,
                    "rename": result.total_rename,
                    "skip": result.total_skip,
                    "fail": result.total_fail,
                    "size_bytes": result.total_size_bytes,
                },
                "items": items
            })
        );
        return;
    }

    println!("Dry Run Results:");
    println!("  Total:     {}", result.total_items());
    println!("  Transfer:  {}", result.total_transfer);
    println!("  Overwrite: {}", result.total_overwrite);
    println!("  Rename:    {}", result.total_rename);
    println!("  Skip:      {}", result.total_skip);
    println!("  Size:      {}", result.size_display());

    if !result.items.is_empty() {
        println!();
        for item in &result.items {
            println!("  {} ({})", item.display_name(), item.action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("coverart=yes"),
            Ok(("coverart".to_string(), "yes".to_string()))
        );
        assert_eq!(parse_tag("a=b=c"), Ok(("a".to_string(), "b=c".to_string())));
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
    }

    #[test]
    fn test_parse_relocate() {
        let cli = Cli::try_parse_from([
            "sidecar",
            "-vv",
            "relocate",
            "/a/track.flac",
            "/b/new.flac",
            "--conflict",
            "skip",
            "--tag",
            "coverart=1",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Relocate(args) => {
                assert_eq!(args.from, PathBuf::from("/a/track.flac"));
                assert_eq!(args.conflict, Some(ConflictPolicy::Skip));
                assert_eq!(args.tags, vec![("coverart".to_string(), "1".to_string())]);
                assert!(args.json);
                assert!(!args.parallel);
            }
            other => panic!("Expected Relocate command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_policy() {
        let result = Cli::try_parse_from(["sidecar", "relocate", "/a.flac", "/b.flac", "--conflict", "merge"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rules_validate() {
        let cli = Cli::try_parse_from(["sidecar", "rules", "validate", "rules.json"]).unwrap();
        match cli.command {
            Command::Rules(RulesArgs {
                action: Some(RulesAction::Validate { file }),
                ..
            }) => assert_eq!(file, PathBuf::from("rules.json")),
            other => panic!("Expected rules validate, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_attach_defaults() {
        let cli = Cli::try_parse_from(["sidecar", "attach", "/music", "--no-cover"]).unwrap();
        match cli.command {
            Command::Attach(args) => {
                assert_eq!(args.link_type, LinkStrategy::Auto);
                assert_eq!(args.conflict, ConflictPolicy::Skip);
                assert!(args.no_cover);
                assert!(!args.no_lyrics);
                assert!(args.audio_exts.is_empty());
            }
            other => panic!("Expected Attach command, got {:?}", other),
        }
    }

    #[test]
    fn test_relocate_with_rules_file() {
        let temp = TempDir::new().unwrap();
        let album = temp.path().join("album");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("track.flac"), b"").unwrap();
        fs::write(album.join("track.lrc"), "lyrics").unwrap();
        let rules = temp.path().join("rules.json");
        fs::write(&rules, r#"[{"type_label":"lyrics","filemask":"{base}.lrc"}]"#).unwrap();
        let config = temp.path().join("config.json");
        SidecarConfig::default().save_to(&config).unwrap();

        let args = EventArgs {
            from: album.join("track.flac"),
            to: temp.path().join("done").join("new.flac"),
            conflict: None,
            rules: Some(rules),
            tags: Vec::new(),
            parallel: false,
            json: true,
        };

        let status = run_relocate(Some(&config), args).unwrap();
        assert_eq!(status, Status::Success);
        assert!(temp.path().join("done").join("new.lrc").exists());
    }

    #[test]
    fn test_relocate_duplicate_rules_fails() {
        let temp = TempDir::new().unwrap();
        let rules = temp.path().join("rules.json");
        fs::write(
            &rules,
            r#"[{"type_label":"A","filemask":"{base}.jpg"},{"type_label":"B","filemask":"{base}.jpg"}]"#,
        )
        .unwrap();
        let config = temp.path().join("config.json");
        SidecarConfig::default().save_to(&config).unwrap();

        let args = EventArgs {
            from: temp.path().join("track.flac"),
            to: temp.path().join("new.flac"),
            conflict: None,
            rules: Some(rules),
            tags: Vec::new(),
            parallel: false,
            json: false,
        };

        assert_eq!(run_relocate(Some(&config), args).unwrap(), Status::Failed);
    }

    #[test]
    fn test_cleanup_missing_root() {
        let temp = TempDir::new().unwrap();
        let args = CleanupArgs {
            root: temp.path().join("nope"),
            no_lyrics: false,
            no_cover: false,
            json: false,
        };
        assert_eq!(run_cleanup(args).unwrap(), Status::MissingRoot);
        assert_eq!(Status::MissingRoot.code(), 2);
    }
}
