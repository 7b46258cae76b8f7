//! In-memory document store adapter.
//!
//! Backs every store port with `DashMap`. Each document mutation runs
//! while holding the map entry's lock, which provides the single-document
//! atomic array-scoped update semantics the use cases rely on (the
//! completion guard is a compare-and-swap under that lock). The session
//! uniqueness invariant is enforced through a client index map whose
//! entry API makes check-and-insert atomic.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use affinitas_domain::{
    Affinitas, ChatEntry, ClientId, ContentBundle, DefaultSave, ItemEntry, NpcConfig, NpcId,
    QuestId, QuestStatus, Save, SaveId, SaveSummary, SessionId, ShadowSave,
};

use crate::infrastructure::ports::{
    DefaultSaveRepo, NpcConfigRepo, RepoError, SaveRepo, SessionRepo, TurnUpdate,
};

/// Concurrent in-memory collections for all four document types.
#[derive(Default)]
pub struct MemoryStore {
    npcs: DashMap<NpcId, NpcConfig>,
    defaults: DashMap<i32, DefaultSave>,
    sessions: DashMap<SessionId, ShadowSave>,
    /// Uniqueness constraint: at most one session per client.
    client_index: DashMap<ClientId, SessionId>,
    saves: DashMap<SaveId, Save>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct session read for test assertions. The repo traits each
    /// expose a `get`, so trait-method calls on the concrete store need
    /// qualification; assertions go through this instead.
    #[cfg(test)]
    pub(crate) fn session(&self, id: SessionId) -> Option<ShadowSave> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Load an authored content bundle. Configs are validated here so a
    /// bad bundle fails at startup, not mid-session.
    pub fn seed(&self, bundle: ContentBundle) -> Result<(), RepoError> {
        for npc in bundle.npcs {
            npc.validate()
                .map_err(|e| RepoError::Integrity(e.to_string()))?;
            self.npcs.insert(npc.id.clone(), npc);
        }
        self.defaults
            .insert(bundle.default_save.version, bundle.default_save);
        Ok(())
    }
}

#[async_trait]
impl NpcConfigRepo for MemoryStore {
    async fn get(&self, id: &NpcId) -> Result<Option<NpcConfig>, RepoError> {
        Ok(self.npcs.get(id).map(|npc| npc.clone()))
    }

    async fn list(&self) -> Result<Vec<NpcConfig>, RepoError> {
        let mut npcs: Vec<NpcConfig> = self.npcs.iter().map(|e| e.value().clone()).collect();
        npcs.sort_by_key(|n| n.order_no);
        Ok(npcs)
    }
}

#[async_trait]
impl DefaultSaveRepo for MemoryStore {
    async fn get(&self) -> Result<Option<DefaultSave>, RepoError> {
        // Highest version wins when several templates are loaded.
        Ok(self
            .defaults
            .iter()
            .max_by_key(|e| *e.key())
            .map(|e| e.value().clone()))
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn insert_unique(&self, session: ShadowSave) -> Result<SessionId, RepoError> {
        match self.client_index.entry(session.client_id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(
                "a session for this client already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                let id = session.id;
                slot.insert(id);
                self.sessions.insert(id, session);
                Ok(id)
            }
        }
    }

    async fn get(&self, id: SessionId) -> Result<Option<ShadowSave>, RepoError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn get_for_client(
        &self,
        id: SessionId,
        client: ClientId,
    ) -> Result<Option<ShadowSave>, RepoError> {
        Ok(self
            .sessions
            .get(&id)
            .filter(|s| s.client_id == client)
            .map(|s| s.clone()))
    }

    async fn delete(&self, id: SessionId) -> Result<bool, RepoError> {
        match self.sessions.remove(&id) {
            Some((_, session)) => {
                self.client_index
                    .remove_if(&session.client_id, |_, held| *held == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_for_client(&self, client: ClientId) -> Result<u64, RepoError> {
        match self.client_index.remove(&client) {
            Some((_, id)) => {
                self.sessions.remove(&id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn set_action_points(
        &self,
        id: SessionId,
        client: ClientId,
        action_points: i32,
    ) -> Result<bool, RepoError> {
        match self.sessions.get_mut(&id) {
            Some(mut session) if session.client_id == client => {
                session.state.remaining_ap = action_points;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn push_item(
        &self,
        id: SessionId,
        client: ClientId,
        item: ItemEntry,
    ) -> Result<bool, RepoError> {
        match self.sessions.get_mut(&id) {
            Some(mut session) if session.client_id == client => {
                session.state.items.push(item);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_turn_update(
        &self,
        id: SessionId,
        npc: &NpcId,
        update: TurnUpdate,
    ) -> Result<bool, RepoError> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        let Some(record) = session.state.npc_mut(npc) else {
            return Ok(false);
        };

        record.affinitas = update.affinitas;
        record.occupation = update.occupation;
        record.likes = update.likes;
        record.dislikes = update.dislikes;
        for quest_id in update.push_completed {
            if !record.completed_quests.contains(&quest_id) {
                record.completed_quests.push(quest_id);
            }
        }
        record.chat_history.extend(update.push_history);
        Ok(true)
    }

    async fn push_history(
        &self,
        id: SessionId,
        npc: &NpcId,
        entries: Vec<ChatEntry>,
    ) -> Result<bool, RepoError> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        let Some(record) = session.state.npc_mut(npc) else {
            return Ok(false);
        };
        record.chat_history.extend(entries);
        Ok(true)
    }

    async fn activate_quests(&self, id: SessionId, npc: &NpcId) -> Result<bool, RepoError> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        let Some(record) = session.state.npc_mut(npc) else {
            return Ok(false);
        };
        for quest in &mut record.quests {
            // Batch idempotent activation. Completed stays completed so a
            // later completion attempt cannot re-arm the reward guard.
            if quest.status != QuestStatus::Completed {
                quest.status = QuestStatus::Active;
            }
        }
        Ok(true)
    }

    async fn complete_quest(
        &self,
        id: SessionId,
        npc: &NpcId,
        quest: &QuestId,
        reward: i32,
        log: ChatEntry,
    ) -> Result<Option<Affinitas>, RepoError> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(None);
        };
        let Some(record) = session.state.npc_mut(npc) else {
            return Ok(None);
        };
        // CAS guard: only an active quest can complete. Everything below
        // happens under the document lock, so a concurrent attempt sees
        // either `active` (and wins) or `completed` (and misses).
        let Some(slot) = record
            .quests
            .iter_mut()
            .find(|q| &q.quest_id == quest && q.status == QuestStatus::Active)
        else {
            return Ok(None);
        };
        slot.status = QuestStatus::Completed;
        record.affinitas = record.affinitas.apply(reward);
        if !record.completed_quests.contains(quest) {
            record.completed_quests.push(quest.clone());
        }
        record.chat_history.push(log);
        Ok(Some(record.affinitas))
    }
}

#[async_trait]
impl SaveRepo for MemoryStore {
    async fn insert(&self, save: Save) -> Result<SaveId, RepoError> {
        let id = save.id;
        self.saves.insert(id, save);
        Ok(id)
    }

    async fn get(&self, id: SaveId) -> Result<Option<Save>, RepoError> {
        Ok(self.saves.get(&id).map(|s| s.clone()))
    }

    async fn list_for_client(&self, client: ClientId) -> Result<Vec<SaveSummary>, RepoError> {
        let mut summaries: Vec<SaveSummary> = self
            .saves
            .iter()
            .filter(|e| e.value().client_id == client)
            .map(|e| SaveSummary {
                save_id: e.value().id,
                name: e.value().name.clone(),
                saved_at: e.value().saved_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    async fn delete(&self, id: SaveId, client: ClientId) -> Result<bool, RepoError> {
        Ok(self
            .saves
            .remove_if(&id, |_, save| save.client_id == client)
            .is_some())
    }
}
