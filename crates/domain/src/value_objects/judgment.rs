//! Structured output of the judgment function.
//!
//! The judgment function is an opaque collaborator: rendered persona and
//! trimmed history go in, this structure comes out. It is schema-validated
//! on receipt - malformed output is a processing failure, never coerced.

use serde::{Deserialize, Serialize};

use crate::ids::QuestId;
use crate::value_objects::affinitas::Sentiment;

/// Proposed trait changes for one NPC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcDelta {
    /// Only honored while the NPC's occupation is still unset
    /// (first-write-wins).
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

/// Complete verdict for one conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcJudgment {
    /// Free-text reply, in the NPC's voice.
    pub response: String,
    /// Categorical sentiment of the player's latest message.
    #[serde(default = "neutral")]
    pub affinitas_change: Sentiment,
    /// Proposed trait changes.
    #[serde(default)]
    pub delta: NpcDelta,
    /// Quest ids the judgment considers completed by this turn.
    /// May reference quests owned by any NPC.
    #[serde(default)]
    pub completed_quests: Vec<QuestId>,
}

fn neutral() -> Sentiment {
    Sentiment::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_judgment() {
        let raw = r#"{
            "response": "Fresh bread, still warm!",
            "affinitas_change": "positive",
            "delta": {"occupation": "Baker", "likes": ["bread"], "dislikes": []},
            "completed_quests": ["find-the-flour"]
        }"#;
        let judgment: NpcJudgment = serde_json::from_str(raw).expect("valid shape");
        assert_eq!(judgment.affinitas_change, Sentiment::Positive);
        assert_eq!(judgment.delta.occupation.as_deref(), Some("Baker"));
        assert_eq!(judgment.completed_quests, vec![QuestId::from("find-the-flour")]);
    }

    #[test]
    fn optional_fields_default() {
        let judgment: NpcJudgment =
            serde_json::from_str(r#"{"response": "Hm."}"#).expect("minimal shape");
        assert_eq!(judgment.affinitas_change, Sentiment::Neutral);
        assert!(judgment.delta.likes.is_empty());
        assert!(judgment.completed_quests.is_empty());
    }

    #[test]
    fn missing_response_is_invalid() {
        assert!(serde_json::from_str::<NpcJudgment>(r#"{"affinitas_change": "neutral"}"#).is_err());
    }
}
