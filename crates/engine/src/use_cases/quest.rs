//! Quest activation and guarded completion.
//!
//! Activation marks every quest of an NPC `active`, conditions linked
//! NPCs with a system message carrying the completion triggers, and has
//! the narrator paraphrase each quest in the owner's voice. Completion
//! goes through the store's compare-and-swap so the reward applies at
//! most once.

use std::sync::Arc;

use affinitas_domain::{Affinitas, ChatEntry, NpcId, QuestId, SessionId};
use serde::Serialize;

use crate::infrastructure::ports::{
    LlmError, NarratorPort, NpcConfigRepo, RepoError, SessionRepo,
};
use crate::prompt_templates::{
    quest_accepted_message, quest_completed_message, quest_paraphrase_prompt,
};
use crate::use_cases::merge::{merge_npc_view, MergeError, MergeOptions};

#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("session not found")]
    SessionNotFound,
    #[error("NPC not found")]
    NpcNotFound,
    /// No matching quest, or the quest is not in a completable state.
    #[error("active quest not found")]
    QuestNotFound,
    #[error("data integrity failure: {0}")]
    Integrity(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Narrator(#[from] LlmError),
}

impl From<MergeError> for QuestError {
    fn from(e: MergeError) -> Self {
        QuestError::Integrity(e.to_string())
    }
}

/// One activated quest, paraphrased in the owning NPC's voice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestText {
    pub quest_id: QuestId,
    pub response: String,
}

pub struct QuestOrchestrator {
    sessions: Arc<dyn SessionRepo>,
    npcs: Arc<dyn NpcConfigRepo>,
    narrator: Arc<dyn NarratorPort>,
}

impl QuestOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        npcs: Arc<dyn NpcConfigRepo>,
        narrator: Arc<dyn NarratorPort>,
    ) -> Self {
        Self {
            sessions,
            npcs,
            narrator,
        }
    }

    /// Activate every quest attached to `npc_id` and return each one
    /// paraphrased in the NPC's voice. Quests completing through another
    /// NPC get their trigger briefing injected into that NPC's history
    /// without invoking the judge.
    pub async fn activate(
        &self,
        session_id: SessionId,
        npc_id: &NpcId,
    ) -> Result<Vec<QuestText>, QuestError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(QuestError::SessionNotFound)?;
        let record = session.state.npc(npc_id).ok_or(QuestError::NpcNotFound)?;
        let config = self.npcs.get(npc_id).await?.ok_or_else(|| {
            QuestError::Integrity(format!("NPC {npc_id} has a save record but no configuration"))
        })?;

        let options = MergeOptions {
            include_chat_history: false,
            include_static: true,
        };
        let view = merge_npc_view(record, &config, options)?;
        let persona = view
            .persona
            .as_ref()
            .ok_or_else(|| QuestError::Integrity("merged view is missing static NPC data".to_string()))?;

        if !self.sessions.activate_quests(session_id, npc_id).await? {
            return Err(QuestError::NpcNotFound);
        }

        let mut texts = Vec::with_capacity(view.quests.len());
        for quest in &view.quests {
            if let Some(linked) = &quest.linked_npc {
                if linked != npc_id {
                    let briefing = ChatEntry::system(quest_accepted_message(quest));
                    if !self
                        .sessions
                        .push_history(session_id, linked, vec![briefing])
                        .await?
                    {
                        return Err(QuestError::Integrity(format!(
                            "quest {} links to NPC {linked} absent from the session",
                            quest.quest_id
                        )));
                    }
                }
            }

            let paraphrase = self
                .narrator
                .narrate(quest_paraphrase_prompt(&view, persona, &quest.description))
                .await?;
            self.sessions
                .push_history(session_id, npc_id, vec![ChatEntry::ai(paraphrase.clone())])
                .await?;
            texts.push(QuestText {
                quest_id: quest.quest_id.clone(),
                response: paraphrase,
            });
        }
        Ok(texts)
    }

    /// Complete a quest out-of-band (scripted events, direct hand-ins).
    /// Returns the NPC's new affinitas after the reward.
    pub async fn complete(
        &self,
        session_id: SessionId,
        npc_id: &NpcId,
        quest_id: &QuestId,
    ) -> Result<Affinitas, QuestError> {
        if self.sessions.get(session_id).await?.is_none() {
            return Err(QuestError::SessionNotFound);
        }
        let config = self
            .npcs
            .get(npc_id)
            .await?
            .ok_or(QuestError::NpcNotFound)?;
        let reward = config
            .quest(quest_id)
            .ok_or(QuestError::QuestNotFound)?
            .affinitas_reward;

        let log = ChatEntry::system(quest_completed_message(quest_id));
        self.sessions
            .complete_quest(session_id, npc_id, quest_id, reward, log)
            .await?
            .ok_or(QuestError::QuestNotFound)
    }
}
