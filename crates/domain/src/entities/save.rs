//! Save documents: the mutable shadow save (session), immutable named
//! saves, and the default new-game template. All three share the same
//! structural body, [`GameState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClientId, NpcId, QuestId, SaveId, SessionId};
use crate::value_objects::{Affinitas, ChatEntry, NpcDelta, QuestStatus};

/// Per-session progress of one quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSaveRecord {
    pub quest_id: QuestId,
    #[serde(default)]
    pub status: QuestStatus,
}

/// One inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// Per-session dynamic state for one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSaveRecord {
    pub npc_id: NpcId,
    pub affinitas: Affinitas,
    #[serde(default)]
    pub occupation: Option<String>,
    /// Accumulated likes/dislikes. Set semantics: case-sensitive exact
    /// string de-duplication, insertion order preserved.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatEntry>,
    #[serde(default)]
    pub quests: Vec<QuestSaveRecord>,
    /// Completed-quest ids. Session-global in meaning: may contain quests
    /// owned by any NPC, not only this one.
    #[serde(default)]
    pub completed_quests: Vec<QuestId>,
}

impl NpcSaveRecord {
    /// Apply one turn's state delta.
    ///
    /// * affinitas: add then clamp to [0, 100]
    /// * occupation: first-write-wins, never overwritten afterward
    /// * likes/dislikes: set union, exact-string dedup
    /// * completed quests: set union
    ///
    /// Returns the quest ids that are newly completed by this delta.
    pub fn apply_turn(
        &mut self,
        affinitas_delta: i32,
        delta: &NpcDelta,
        completed_quests: &[QuestId],
    ) -> Vec<QuestId> {
        self.affinitas = self.affinitas.apply(affinitas_delta);

        if self.occupation.is_none() {
            if let Some(occupation) = &delta.occupation {
                self.occupation = Some(occupation.clone());
            }
        }

        union_into(&mut self.likes, &delta.likes);
        union_into(&mut self.dislikes, &delta.dislikes);

        let newly_completed: Vec<QuestId> = completed_quests
            .iter()
            .filter(|id| !self.completed_quests.contains(id))
            .cloned()
            .collect();
        self.completed_quests.extend(newly_completed.iter().cloned());

        newly_completed
    }

    pub fn quest(&self, id: &QuestId) -> Option<&QuestSaveRecord> {
        self.quests.iter().find(|q| &q.quest_id == id)
    }
}

fn union_into(existing: &mut Vec<String>, additions: &[String]) {
    for addition in additions {
        if !existing.contains(addition) {
            existing.push(addition.clone());
        }
    }
}

/// Shared structural body of all save documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub day_no: u32,
    pub remaining_ap: i32,
    /// Derived narrative summary, owned by the client. Carried opaquely;
    /// the server never interprets it.
    #[serde(default)]
    pub journal: serde_json::Value,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    pub npcs: Vec<NpcSaveRecord>,
}

impl GameState {
    pub fn npc(&self, id: &NpcId) -> Option<&NpcSaveRecord> {
        self.npcs.iter().find(|n| &n.npc_id == id)
    }

    pub fn npc_mut(&mut self, id: &NpcId) -> Option<&mut NpcSaveRecord> {
        self.npcs.iter_mut().find(|n| &n.npc_id == id)
    }
}

/// The single mutable, in-progress play state for one client.
///
/// Invariant: at most one active session per client identity, enforced by
/// a uniqueness constraint in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowSave {
    pub id: SessionId,
    pub client_id: ClientId,
    #[serde(flatten)]
    pub state: GameState,
}

impl ShadowSave {
    pub fn new(client_id: ClientId, state: GameState) -> Self {
        Self {
            id: SessionId::new(),
            client_id,
            state,
        }
    }
}

/// A named, timestamped, immutable-once-written snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Save {
    pub id: SaveId,
    pub client_id: ClientId,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: GameState,
}

impl Save {
    /// Promote a live session to a point-in-time snapshot.
    pub fn from_session(session: &ShadowSave, name: String, saved_at: DateTime<Utc>) -> Self {
        Self {
            id: SaveId::new(),
            client_id: session.client_id,
            name,
            saved_at,
            state: session.state.clone(),
        }
    }
}

/// Listing projection of a [`Save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub save_id: SaveId,
    pub name: String,
    pub saved_at: DateTime<Utc>,
}

/// New-game template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSave {
    pub version: i32,
    #[serde(flatten)]
    pub state: GameState,
}

/// Authored content bundle: the NPC catalog plus the default save it seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub npcs: Vec<crate::entities::npc::NpcConfig>,
    pub default_save: DefaultSave,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::NpcDelta;

    fn record() -> NpcSaveRecord {
        NpcSaveRecord {
            npc_id: NpcId::from("gus"),
            affinitas: Affinitas::new(50),
            occupation: None,
            likes: vec!["bread".to_string()],
            dislikes: vec![],
            chat_history: vec![],
            quests: vec![],
            completed_quests: vec![],
        }
    }

    #[test]
    fn occupation_first_write_wins() {
        let mut npc = record();
        npc.apply_turn(
            0,
            &NpcDelta {
                occupation: Some("Baker".to_string()),
                ..Default::default()
            },
            &[],
        );
        assert_eq!(npc.occupation.as_deref(), Some("Baker"));

        npc.apply_turn(
            0,
            &NpcDelta {
                occupation: Some("Knight".to_string()),
                ..Default::default()
            },
            &[],
        );
        assert_eq!(npc.occupation.as_deref(), Some("Baker"));
    }

    #[test]
    fn like_union_is_idempotent() {
        let mut npc = record();
        npc.apply_turn(
            0,
            &NpcDelta {
                likes: vec!["bread".to_string()],
                ..Default::default()
            },
            &[],
        );
        assert_eq!(npc.likes, vec!["bread".to_string()]);

        npc.apply_turn(
            0,
            &NpcDelta {
                likes: vec!["bread".to_string(), "honey".to_string()],
                ..Default::default()
            },
            &[],
        );
        assert_eq!(npc.likes, vec!["bread".to_string(), "honey".to_string()]);
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let mut npc = record();
        npc.apply_turn(
            0,
            &NpcDelta {
                likes: vec!["Bread".to_string()],
                ..Default::default()
            },
            &[],
        );
        assert_eq!(npc.likes, vec!["bread".to_string(), "Bread".to_string()]);
    }

    #[test]
    fn completed_quests_union_reports_only_new() {
        let mut npc = record();
        let first = npc.apply_turn(0, &NpcDelta::default(), &[QuestId::from("q1")]);
        assert_eq!(first, vec![QuestId::from("q1")]);

        let second = npc.apply_turn(
            0,
            &NpcDelta::default(),
            &[QuestId::from("q1"), QuestId::from("q2")],
        );
        assert_eq!(second, vec![QuestId::from("q2")]);
        assert_eq!(
            npc.completed_quests,
            vec![QuestId::from("q1"), QuestId::from("q2")]
        );
    }

    #[test]
    fn affinitas_clamped_through_apply_turn() {
        let mut npc = record();
        npc.affinitas = Affinitas::new(99);
        npc.apply_turn(5, &NpcDelta::default(), &[]);
        assert_eq!(npc.affinitas.value(), 100);
    }
}
