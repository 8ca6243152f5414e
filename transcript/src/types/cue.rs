//! Time-aligned caption fragments.

use serde::{Deserialize, Serialize};

/// A single caption fragment with its timing, in seconds.
///
/// Both the in-process caption library and the interpreter script produce lists of
/// cues. Only `text` contributes to the resolved transcript; timing is kept so callers
/// of the lower-level fetchers can still align text to playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "offset")]
    pub start: f64,
    #[serde(default, alias = "dur")]
    pub duration: f64,
}

impl Cue {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_interpreter_cue_with_timing() {
        let cue: Cue =
            serde_json::from_str(r#"{"text":"Hello","start":1.5,"duration":2.0}"#).unwrap();
        assert_eq!(cue, Cue::new("Hello", 1.5, 2.0));
    }

    #[test]
    fn test_deserialize_cue_with_only_text() {
        let cue: Cue = serde_json::from_str(r#"{"text":"world"}"#).unwrap();
        assert_eq!(cue.text, "world");
        assert_eq!(cue.start, 0.0);
        assert_eq!(cue.duration, 0.0);
    }
}
