//! Baseline rule set

use super::model::SidecarRule;

/// The fixed baseline rules used when no configuration exists or on reset.
///
/// Order only matters for deterministic iteration in logs and tests.
pub fn default_rules() -> Vec<SidecarRule> {
    vec![
        SidecarRule::external("lyrics", "{base}.lrc"),
        SidecarRule::external("cue", "{base}.cue"),
        SidecarRule::external("nfo", "{base}.nfo"),
        SidecarRule::external("xml", "{base}.xml"),
        SidecarRule::external("log", "{base}.log"),
        SidecarRule::external("playlist", "{base}.m3u"),
        SidecarRule::external("booklet", "{base}.pdf"),
        SidecarRule::external("checksums_sfv", "{base}.sfv"),
        SidecarRule::external("checksums_md5", "{base}.md5").with_enabled(false),
        SidecarRule::embedded("cover_embedded", "coverart").with_enabled(false),
    ]
}
