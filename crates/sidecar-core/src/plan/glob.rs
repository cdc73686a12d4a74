//! Minimal single-segment glob over an expanded filemask.
//!
//! Only `*` (any run of characters) and `?` (one character) are wildcards.
//! The substituted base is always matched literally, so an audio file named
//! `what?.flac` does not turn its base into a wildcard.

use regex::Regex;

use crate::rule::PLACEHOLDER;

/// A compiled file-mode pattern bound to one base name.
///
/// Every placeholder occurrence becomes its own capture group so a matching
/// name can be rewritten for the destination base.
#[derive(Debug, Clone)]
pub struct MaskPattern {
    regex: Regex,
    literal: bool,
}

impl MaskPattern {
    /// Compile a filemask template for the given base
    pub fn compile(template: &str, base: &str) -> Result<Self, regex::Error> {
        let base = format!("({})", regex::escape(base));
        let mut pattern = String::from("(?s)^");
        let mut literal = true;
        let mut rest = template;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(PLACEHOLDER) {
                pattern.push_str(&base);
                rest = after;
                continue;
            }
            let mut chars = rest.chars();
            let Some(c) = chars.next() else { break };
            match c {
                '*' => {
                    literal = false;
                    pattern.push_str(".*");
                }
                '?' => {
                    literal = false;
                    pattern.push('.');
                }
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
            rest = chars.as_str();
        }
        pattern.push('$');

        Ok(Self {
            regex: Regex::new(&pattern)?,
            literal,
        })
    }

    /// Returns true if the pattern contains no wildcard
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Returns true if `name` matches the whole pattern
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Rewrite a matching name, replacing the spans matched by the base with
    /// `new_base` and keeping everything matched by wildcards.
    ///
    /// Returns `None` if `name` does not match.
    pub fn rewrite(&self, name: &str, new_base: &str) -> Option<String> {
        let caps = self.regex.captures(name)?;
        let mut out = String::with_capacity(name.len() + new_base.len());
        let mut pos = 0;

        for span in caps.iter().skip(1).flatten() {
            out.push_str(&name[pos..span.start()]);
            out.push_str(new_base);
            pos = span.end();
        }
        out.push_str(&name[pos..]);

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str, base: &str) -> MaskPattern {
        MaskPattern::compile(template, base).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let p = compile("{base}.lrc", "track");
        assert!(p.is_literal());
        assert!(p.is_match("track.lrc"));
        assert!(!p.is_match("track.lrc.bak"));
        assert!(!p.is_match("Track.lrc"));
        assert!(!p.is_match("trackXlrc"));
    }

    #[test]
    fn test_wildcards() {
        let p = compile("{base}-*.jpg", "track");
        assert!(!p.is_literal());
        assert!(p.is_match("track-front.jpg"));
        assert!(p.is_match("track-.jpg"));
        assert!(!p.is_match("track.jpg"));

        let p = compile("{base}.?", "track");
        assert!(p.is_match("track.a"));
        assert!(!p.is_match("track.ab"));
    }

    #[test]
    fn test_base_is_matched_literally() {
        let p = compile("{base}.lrc", "what?");
        assert!(p.is_match("what?.lrc"));
        assert!(!p.is_match("whatX.lrc"));

        let p = compile("{base}.lrc", "a*b (live) [1]");
        assert!(p.is_match("a*b (live) [1].lrc"));
        assert!(!p.is_match("aXXb (live) [1].lrc"));
    }

    #[test]
    fn test_rewrite_replaces_only_base() {
        let p = compile("{base}-*.jpg", "track");
        assert_eq!(
            p.rewrite("track-front.jpg", "renamed").as_deref(),
            Some("renamed-front.jpg")
        );

        // Wildcard text that happens to equal the base is preserved.
        let p = compile("*{base}.txt", "x");
        assert_eq!(p.rewrite("xx.txt", "y").as_deref(), Some("xy.txt"));
    }

    #[test]
    fn test_rewrite_multiple_placeholders() {
        let p = compile("{base}_{base}.txt", "a");
        assert_eq!(p.rewrite("a_a.txt", "bb").as_deref(), Some("bb_bb.txt"));
        assert_eq!(p.rewrite("a_b.txt", "bb"), None);
    }

    #[test]
    fn test_unicode_names() {
        let p = compile("{base} ?.lrc", "café");
        assert_eq!(
            p.rewrite("café é.lrc", "thé").as_deref(),
            Some("thé é.lrc")
        );
    }
}
