//! Cue-based subtitle (WebVTT-style) to plain text conversion.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Lines starting with any of these are track headers or metadata, not spoken text.
const HEADER_PREFIXES: [&str; 4] = ["WEBVTT", "Kind:", "Language:", "Style:"];

const TIMING_ARROW: &str = "-->";

fn markup_tag() -> &'static Regex {
    static MARKUP_TAG: OnceLock<Regex> = OnceLock::new();
    MARKUP_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex is valid"))
}

/// Convert a raw subtitle track into plain, deduplicated text.
///
/// Drops blank lines, cue timings, numeric cue indices and header lines, strips inline
/// markup, and keeps only the first occurrence of each cleaned line. Auto-generated
/// tracks repeat the same line across overlapping cues, so deduplication is by exact
/// cleaned text rather than by adjacency. Never fails: malformed input yields partial
/// or empty output.
pub fn parse(raw: &str) -> String {
    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if is_structural(line) {
            continue;
        }

        let cleaned = markup_tag().replace_all(line, "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() && seen.insert(cleaned.to_string()) {
            kept.push(cleaned.to_string());
        }
    }

    kept.join(" ").trim().to_string()
}

fn is_structural(line: &str) -> bool {
    line.is_empty()
        || line.contains(TIMING_ARROW)
        || line.bytes().all(|b| b.is_ascii_digit())
        || HEADER_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
}
