//! Static NPC configuration - authored content, read-only at runtime.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{NpcId, QuestId};

/// How readily an NPC's affinitas moves in one direction.
///
/// Either a volatility scalar in [0, 1] (closer to 1 = more emotionally
/// volatile) or a list of trigger phrases that sway feelings when they
/// come up in conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TuningKey {
    Volatility(f64),
    Triggers(Vec<String>),
}

impl TuningKey {
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Volatility(v) if !(0.0..=1.0).contains(v) => Err(DomainError::validation(
                format!("affinitas tuning scalar {v} must be within [0, 1]"),
            )),
            _ => Ok(()),
        }
    }
}

/// Affinitas tuning parameters for one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinitasTuning {
    /// Starting score for new sessions.
    pub initial: i32,
    pub increase: TuningKey,
    pub decrease: TuningKey,
}

impl AffinitasTuning {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.increase.validate()?;
        self.decrease.validate()
    }
}

/// One quest in an NPC's authored catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestConfig {
    pub id: QuestId,
    pub name: String,
    pub description: String,
    pub affinitas_reward: i32,
    /// Quest is completed through conversation with this other NPC.
    #[serde(default)]
    pub linked_npc: Option<NpcId>,
    /// Phrases that signal quest completion in conversation.
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// Static NPC configuration. Owned by content authors; shared read-only
/// across all sessions referencing the NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcConfig {
    pub id: NpcId,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub occupation: Option<String>,
    pub backstory: String,
    #[serde(default)]
    pub personality: Vec<String>,
    #[serde(default)]
    pub motivations: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    pub affinitas: AffinitasTuning,
    /// Whether this NPC's end-state feeds the game ending.
    #[serde(default)]
    pub global_influence: bool,
    /// Ending descriptions keyed to affinitas thresholds.
    #[serde(default)]
    pub endings: Vec<String>,
    /// Secrets / topics revealed at higher trust.
    #[serde(default)]
    pub dialogue_unlocks: Vec<String>,
    #[serde(default)]
    pub quests: Vec<QuestConfig>,
    /// Display ordering in session payloads.
    #[serde(default)]
    pub order_no: i32,
}

impl NpcConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("NPC name cannot be empty"));
        }
        self.affinitas.validate()?;
        Ok(())
    }

    /// Look up a quest in this NPC's catalog.
    pub fn quest(&self, id: &QuestId) -> Option<&QuestConfig> {
        self.quests.iter().find(|q| &q.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuning_key_parses_scalar_or_triggers() {
        let scalar: TuningKey = serde_json::from_str("0.7").expect("scalar");
        assert_eq!(scalar, TuningKey::Volatility(0.7));

        let triggers: TuningKey =
            serde_json::from_str(r#"["kindness", "fresh bread"]"#).expect("triggers");
        assert_eq!(
            triggers,
            TuningKey::Triggers(vec!["kindness".into(), "fresh bread".into()])
        );
    }

    #[test]
    fn tuning_scalar_must_be_unit_interval() {
        assert!(TuningKey::Volatility(1.5).validate().is_err());
        assert!(TuningKey::Volatility(-0.1).validate().is_err());
        assert!(TuningKey::Volatility(0.0).validate().is_ok());
        assert!(TuningKey::Volatility(1.0).validate().is_ok());
        assert!(TuningKey::Triggers(vec![]).validate().is_ok());
    }
}
