//! Affect rendering: map a reply's emotion tag to a presentation state.
//!
//! The backend's tag vocabulary is open; anything unrecognized renders as
//! `Neutral` so a new backend tag can never break the mascot.

use serde::{Deserialize, Serialize};

/// Known emotion vocabulary for the mascot face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Thinking,
    Explaining,
    Confused,
    Sad,
}

impl Emotion {
    /// Parse an optional tag, falling back to `Neutral` for unknown or
    /// missing values. Case-insensitive.
    pub fn parse(tag: Option<&str>) -> Self {
        let tag = match tag.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Emotion::Neutral,
        };
        if tag.eq_ignore_ascii_case("happy") {
            Emotion::Happy
        } else if tag.eq_ignore_ascii_case("thinking") {
            Emotion::Thinking
        } else if tag.eq_ignore_ascii_case("explaining") {
            Emotion::Explaining
        } else if tag.eq_ignore_ascii_case("confused") {
            Emotion::Confused
        } else if tag.eq_ignore_ascii_case("sad") {
            Emotion::Sad
        } else if tag.eq_ignore_ascii_case("neutral") {
            Emotion::Neutral
        } else {
            Emotion::Neutral
        }
    }

    /// Stable presentation label for the display layer (CSS-class style).
    pub fn presentation(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Thinking => "thinking",
            Emotion::Explaining => "explaining",
            Emotion::Confused => "confused",
            Emotion::Sad => "sad",
        }
    }
}

/// Holds the current presentation state for the mascot. Pure, synchronous,
/// idempotent: applying the same tag twice yields the same observable state.
#[derive(Debug, Default)]
pub struct AffectRenderer {
    current: Emotion,
}

impl AffectRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an emotion tag and return the resulting presentation state.
    pub fn apply(&mut self, tag: Option<&str>) -> Emotion {
        self.current = Emotion::parse(tag);
        self.current
    }

    pub fn current(&self) -> Emotion {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse() {
        assert_eq!(Emotion::parse(Some("happy")), Emotion::Happy);
        assert_eq!(Emotion::parse(Some("Thinking")), Emotion::Thinking);
        assert_eq!(Emotion::parse(Some("EXPLAINING")), Emotion::Explaining);
        assert_eq!(Emotion::parse(Some(" sad ")), Emotion::Sad);
    }

    #[test]
    fn unknown_or_missing_tags_fall_back_to_neutral() {
        assert_eq!(Emotion::parse(Some("curious")), Emotion::Neutral);
        assert_eq!(Emotion::parse(Some("")), Emotion::Neutral);
        assert_eq!(Emotion::parse(None), Emotion::Neutral);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut renderer = AffectRenderer::new();
        assert_eq!(renderer.current(), Emotion::Neutral);
        let first = renderer.apply(Some("happy"));
        let second = renderer.apply(Some("happy"));
        assert_eq!(first, second);
        assert_eq!(renderer.current(), Emotion::Happy);
    }

    #[test]
    fn presentation_labels_are_stable() {
        assert_eq!(Emotion::Neutral.presentation(), "neutral");
        assert_eq!(Emotion::Happy.presentation(), "happy");
        assert_eq!(Emotion::parse(Some("curious")).presentation(), "neutral");
    }
}
