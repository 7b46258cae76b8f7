//! Read models merging static NPC configuration with dynamic per-session
//! state. Built by the merge engine; validated unconditionally at the
//! merge boundary (not a debug-only aid).

use serde::{Deserialize, Serialize};

use crate::entities::npc::AffinitasTuning;
use crate::error::DomainError;
use crate::ids::{NpcId, QuestId};
use crate::value_objects::{Affinitas, ChatEntry, QuestStatus};

/// Quest save record combined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestView {
    pub quest_id: QuestId,
    pub name: String,
    pub description: String,
    pub affinitas_reward: i32,
    #[serde(default)]
    pub linked_npc: Option<NpcId>,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub status: QuestStatus,
}

/// Static-only configuration fields, included in the view on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcPersona {
    pub age: u32,
    pub backstory: String,
    pub personality: Vec<String>,
    pub motivations: Vec<String>,
    pub dialogue_unlocks: Vec<String>,
    pub endings: Vec<String>,
    pub tuning: AffinitasTuning,
    pub global_influence: bool,
}

/// The NPC runtime view: merged read model for one NPC within one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcView {
    pub npc_id: NpcId,
    pub name: String,
    pub affinitas: Affinitas,
    #[serde(default)]
    pub occupation: Option<String>,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub quests: Vec<QuestView>,
    pub completed_quests: Vec<QuestId>,
    /// `None` when history was not requested (resuming with cached turn
    /// context), `Some` otherwise.
    #[serde(default)]
    pub chat_history: Option<Vec<ChatEntry>>,
    /// `None` when static-only fields were not requested.
    #[serde(default)]
    pub persona: Option<NpcPersona>,
}

impl NpcView {
    /// Structural invariants enforced in all environments.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("merged NPC view has empty name"));
        }
        for (i, quest) in self.quests.iter().enumerate() {
            if quest.name.trim().is_empty() {
                return Err(DomainError::integrity(format!(
                    "quest {} has no catalog name",
                    quest.quest_id
                )));
            }
            if self.quests[..i].iter().any(|q| q.quest_id == quest.quest_id) {
                return Err(DomainError::integrity(format!(
                    "duplicate quest id {} in merged view",
                    quest.quest_id
                )));
            }
        }
        if let Some(persona) = &self.persona {
            persona.tuning.validate()?;
        }
        Ok(())
    }
}

/// Session payload returned by new/load: NPCs with merged quest text but
/// stripped of likes/dislikes/occupation (those stay server-side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionNpcView {
    pub npc_id: NpcId,
    pub name: String,
    pub affinitas: Affinitas,
    pub quests: Vec<QuestView>,
    pub chat_history: Vec<ChatEntry>,
}

/// Merged session read model for session new/load responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub day_no: u32,
    pub remaining_ap: i32,
    pub journal: serde_json::Value,
    pub items: Vec<crate::entities::save::ItemEntry>,
    pub npcs: Vec<SessionNpcView>,
}
