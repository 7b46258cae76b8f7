//! Affinitas score and the per-turn sentiment judgment.
//!
//! Affinitas is the trust/rapport meter between the player and one NPC.
//! It is an integer in [0, 100]; every mutation goes through [`Affinitas::apply`]
//! so the clamp cannot be bypassed. The sentiment categories form a closed
//! set with a fixed delta mapping - the mapping is a lookup table, never
//! tuned per NPC.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Lowest possible affinitas score (utter disdain).
pub const AFFINITAS_MIN: i32 = 0;
/// Highest possible affinitas score (deep trust).
pub const AFFINITAS_MAX: i32 = 100;

/// Trust/rapport score between the player and one NPC, clamped to [0, 100].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(try_from = "i32", into = "i32")]
pub struct Affinitas(i32);

impl Affinitas {
    /// Create a score, clamping into the valid range.
    pub fn new(value: i32) -> Self {
        Self(value.clamp(AFFINITAS_MIN, AFFINITAS_MAX))
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// Apply a signed delta, clamping the result to [0, 100].
    #[must_use]
    pub fn apply(self, delta: i32) -> Self {
        Self((self.0 + delta).clamp(AFFINITAS_MIN, AFFINITAS_MAX))
    }
}

impl TryFrom<i32> for Affinitas {
    type Error = DomainError;

    // Deserialization is strict: an out-of-range score in a stored document
    // is corrupted data, not something to silently clamp.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (AFFINITAS_MIN..=AFFINITAS_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::integrity(format!(
                "affinitas {value} outside [{AFFINITAS_MIN}, {AFFINITAS_MAX}]"
            )))
        }
    }
}

impl From<Affinitas> for i32 {
    fn from(value: Affinitas) -> Self {
        value.0
    }
}

impl fmt::Display for Affinitas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categorical sentiment verdict for one conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "very positive")]
    VeryPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "very negative")]
    VeryNegative,
}

impl Sentiment {
    /// Fixed sentiment -> affinitas delta lookup table.
    pub fn delta(&self) -> i32 {
        match self {
            Self::VeryPositive => 5,
            Self::Positive => 2,
            Self::Neutral => 0,
            Self::Negative => -2,
            Self::VeryNegative => -5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_on_construction() {
        assert_eq!(Affinitas::new(-10).value(), 0);
        assert_eq!(Affinitas::new(250).value(), 100);
        assert_eq!(Affinitas::new(42).value(), 42);
    }

    #[test]
    fn apply_stays_in_range_for_any_delta_sequence() {
        let deltas = [5, 5, -200, 2, 300, -2, -5, 17, -1];
        let mut score = Affinitas::new(50);
        for d in deltas {
            score = score.apply(d);
            assert!((0..=100).contains(&score.value()));
        }
    }

    #[test]
    fn apply_boundary_clamp() {
        assert_eq!(Affinitas::new(99).apply(5).value(), 100);
        assert_eq!(Affinitas::new(1).apply(-5).value(), 0);
        assert_eq!(Affinitas::new(50).apply(2).value(), 52);
    }

    #[test]
    fn rejects_out_of_range_on_deserialize() {
        assert!(serde_json::from_str::<Affinitas>("101").is_err());
        assert!(serde_json::from_str::<Affinitas>("-1").is_err());
        let ok: Affinitas = serde_json::from_str("100").expect("in range");
        assert_eq!(ok.value(), 100);
    }

    #[test]
    fn sentiment_delta_table() {
        assert_eq!(Sentiment::VeryPositive.delta(), 5);
        assert_eq!(Sentiment::Positive.delta(), 2);
        assert_eq!(Sentiment::Neutral.delta(), 0);
        assert_eq!(Sentiment::Negative.delta(), -2);
        assert_eq!(Sentiment::VeryNegative.delta(), -5);
    }

    #[test]
    fn sentiment_wire_format_uses_spaces() {
        let s: Sentiment = serde_json::from_str(r#""very positive""#).expect("valid category");
        assert_eq!(s, Sentiment::VeryPositive);
        assert!(serde_json::from_str::<Sentiment>(r#""ecstatic""#).is_err());
    }
}
