//! State merge engine.
//!
//! Builds the NPC runtime view by joining static configuration with the
//! dynamic NPC save record. The join is an explicit function over domain
//! types - independent of any store query language and unit-testable
//! without a live database. Views are validated unconditionally at this
//! boundary.

use std::sync::Arc;

use affinitas_domain::{
    GameState, NpcConfig, NpcId, NpcPersona, NpcSaveRecord, NpcView, QuestSaveRecord, QuestView,
    SessionId, SessionNpcView, SessionView,
};

use crate::infrastructure::ports::{NpcConfigRepo, RepoError, SessionRepo};

/// Which parts of the view to materialize.
///
/// History is only needed when resuming a session with no cached turn
/// context; static-only fields are only needed when rendering a persona.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub include_chat_history: bool,
    pub include_static: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            include_chat_history: true,
            include_static: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A save record references a quest id absent from the catalog.
    /// Corrupted content - surfaced loudly, never silently dropped.
    #[error("quest {0} referenced by save record is missing from the NPC catalog")]
    QuestCatalog(affinitas_domain::QuestId),
    #[error(transparent)]
    Invalid(#[from] affinitas_domain::DomainError),
}

/// Join quest save records with their catalog entries (one-to-one by id).
pub fn merge_quests(
    records: &[QuestSaveRecord],
    config: &NpcConfig,
) -> Result<Vec<QuestView>, MergeError> {
    records
        .iter()
        .map(|record| {
            let catalog = config
                .quest(&record.quest_id)
                .ok_or_else(|| MergeError::QuestCatalog(record.quest_id.clone()))?;
            Ok(QuestView {
                quest_id: record.quest_id.clone(),
                name: catalog.name.clone(),
                description: catalog.description.clone(),
                affinitas_reward: catalog.affinitas_reward,
                linked_npc: catalog.linked_npc.clone(),
                triggers: catalog.triggers.clone(),
                status: record.status,
            })
        })
        .collect()
}

/// Build the merged runtime view for one NPC.
pub fn merge_npc_view(
    record: &NpcSaveRecord,
    config: &NpcConfig,
    options: MergeOptions,
) -> Result<NpcView, MergeError> {
    let view = NpcView {
        npc_id: record.npc_id.clone(),
        name: config.name.clone(),
        affinitas: record.affinitas,
        occupation: record.occupation.clone(),
        likes: record.likes.clone(),
        dislikes: record.dislikes.clone(),
        quests: merge_quests(&record.quests, config)?,
        completed_quests: record.completed_quests.clone(),
        chat_history: options
            .include_chat_history
            .then(|| record.chat_history.clone()),
        persona: options.include_static.then(|| NpcPersona {
            age: config.age,
            backstory: config.backstory.clone(),
            personality: config.personality.clone(),
            motivations: config.motivations.clone(),
            dialogue_unlocks: config.dialogue_unlocks.clone(),
            endings: config.endings.clone(),
            tuning: config.affinitas.clone(),
            global_influence: config.global_influence,
        }),
    };
    view.validate()?;
    Ok(view)
}

/// Build the merged session payload for new/load responses. NPCs are
/// ordered by their authored `order_no`.
pub fn merge_session(state: &GameState, configs: &[NpcConfig]) -> Result<SessionView, MergeError> {
    let mut ordered: Vec<(&NpcSaveRecord, &NpcConfig)> = state
        .npcs
        .iter()
        .map(|record| {
            configs
                .iter()
                .find(|c| c.id == record.npc_id)
                .map(|config| (record, config))
                .ok_or_else(|| {
                    MergeError::Invalid(affinitas_domain::DomainError::integrity(format!(
                        "NPC {} referenced by save is missing from the catalog",
                        record.npc_id
                    )))
                })
        })
        .collect::<Result<_, _>>()?;
    ordered.sort_by_key(|(_, config)| config.order_no);

    let npcs = ordered
        .into_iter()
        .map(|(record, config)| {
            Ok(SessionNpcView {
                npc_id: record.npc_id.clone(),
                name: config.name.clone(),
                affinitas: record.affinitas,
                quests: merge_quests(&record.quests, config)?,
                chat_history: record.chat_history.clone(),
            })
        })
        .collect::<Result<Vec<_>, MergeError>>()?;

    Ok(SessionView {
        day_no: state.day_no,
        remaining_ap: state.remaining_ap,
        journal: state.journal.clone(),
        items: state.items.clone(),
        npcs,
    })
}

// =============================================================================
// Store-backed loader
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("session not found")]
    SessionNotFound,
    #[error("NPC not found in session")]
    NpcNotFound,
    /// The session references configuration that no longer exists.
    #[error("data integrity failure: {0}")]
    Integrity(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<MergeError> for ViewError {
    fn from(e: MergeError) -> Self {
        ViewError::Integrity(e.to_string())
    }
}

/// Load a session's NPC record and merge it with static configuration.
///
/// Absence of the session or of the NPC in its list is a hard
/// precondition failure for every dependent operation - no silent
/// defaulting.
pub struct LoadNpcView {
    sessions: Arc<dyn SessionRepo>,
    npcs: Arc<dyn NpcConfigRepo>,
}

impl LoadNpcView {
    pub fn new(sessions: Arc<dyn SessionRepo>, npcs: Arc<dyn NpcConfigRepo>) -> Self {
        Self { sessions, npcs }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        npc_id: &NpcId,
        options: MergeOptions,
    ) -> Result<NpcView, ViewError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(ViewError::SessionNotFound)?;
        let record = session.state.npc(npc_id).ok_or(ViewError::NpcNotFound)?;
        let config = self
            .npcs
            .get(npc_id)
            .await?
            .ok_or_else(|| {
                ViewError::Integrity(format!("NPC {npc_id} has a save record but no configuration"))
            })?;
        Ok(merge_npc_view(record, &config, options)?)
    }
}
