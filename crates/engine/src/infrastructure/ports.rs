//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is
//! concrete types. Ports exist for:
//! - The document store (could swap the in-memory adapter for MongoDB)
//! - The judgment functions (could swap OpenAI-compatible -> anything)
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use affinitas_domain::{
    Affinitas, ChatEntry, ClientId, DefaultSave, ItemEntry, NpcConfig, NpcId, NpcJudgment,
    QuestId, Save, SaveId, SaveSummary, SessionId, ShadowSave,
};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The addressed document (or the addressed array element) is absent.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    /// Uniqueness constraint violation, distinct from generic failure.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A save references content absent from the static catalog.
    #[error("Data integrity failure: {0}")]
    Integrity(String),
    #[error("Store error: {0}")]
    Storage(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Judgment request failed: {0}")]
    RequestFailed(String),
    /// Output did not match the required structured shape. Never coerced.
    #[error("Invalid judgment response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Document Store Ports (one per collection)
// =============================================================================

#[async_trait]
pub trait NpcConfigRepo: Send + Sync {
    async fn get(&self, id: &NpcId) -> Result<Option<NpcConfig>, RepoError>;
    async fn list(&self) -> Result<Vec<NpcConfig>, RepoError>;
}

#[async_trait]
pub trait DefaultSaveRepo: Send + Sync {
    /// The configured new-game template.
    async fn get(&self) -> Result<Option<DefaultSave>, RepoError>;
}

/// One turn's computed NPC state, persisted as a single atomic update.
///
/// Affinitas/occupation/likes/dislikes are pre-computed replacement values
/// (compute-then-write: callers must serialize turns per (session, NPC));
/// completed quests and history entries are appended.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnUpdate {
    pub affinitas: Affinitas,
    pub occupation: Option<String>,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub push_completed: Vec<QuestId>,
    pub push_history: Vec<ChatEntry>,
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Insert a new session. Surfaces [`RepoError::Conflict`] when the
    /// client already has an active session.
    async fn insert_unique(&self, session: ShadowSave) -> Result<SessionId, RepoError>;

    async fn get(&self, id: SessionId) -> Result<Option<ShadowSave>, RepoError>;

    /// Fetch only when the session belongs to the given client.
    async fn get_for_client(
        &self,
        id: SessionId,
        client: ClientId,
    ) -> Result<Option<ShadowSave>, RepoError>;

    /// Returns `false` when no such session existed.
    async fn delete(&self, id: SessionId) -> Result<bool, RepoError>;

    /// Delete whatever session the client currently holds (last-load-wins).
    /// Returns the number of sessions removed (0 or 1).
    async fn delete_for_client(&self, client: ClientId) -> Result<u64, RepoError>;

    async fn set_action_points(
        &self,
        id: SessionId,
        client: ClientId,
        action_points: i32,
    ) -> Result<bool, RepoError>;

    async fn push_item(
        &self,
        id: SessionId,
        client: ClientId,
        item: ItemEntry,
    ) -> Result<bool, RepoError>;

    /// Atomic, array-scoped update of one NPC save record.
    /// Returns `false` when the session or the NPC record is absent.
    async fn apply_turn_update(
        &self,
        id: SessionId,
        npc: &NpcId,
        update: TurnUpdate,
    ) -> Result<bool, RepoError>;

    /// Append history entries to one NPC record without touching state.
    async fn push_history(
        &self,
        id: SessionId,
        npc: &NpcId,
        entries: Vec<ChatEntry>,
    ) -> Result<bool, RepoError>;

    /// Batch-set every quest of the NPC to `active` (idempotent).
    async fn activate_quests(&self, id: SessionId, npc: &NpcId) -> Result<bool, RepoError>;

    /// Guarded completion: in one atomic update, set the quest's status to
    /// `completed` only if it is currently `active`, increment the NPC's
    /// affinitas by `reward`, and append `log` to the chat history.
    ///
    /// Returns the new affinitas on success, `None` when the guard did not
    /// match (no active quest with that id). Concurrent completion attempts
    /// apply the reward at most once.
    async fn complete_quest(
        &self,
        id: SessionId,
        npc: &NpcId,
        quest: &QuestId,
        reward: i32,
        log: ChatEntry,
    ) -> Result<Option<Affinitas>, RepoError>;
}

#[async_trait]
pub trait SaveRepo: Send + Sync {
    async fn insert(&self, save: Save) -> Result<SaveId, RepoError>;
    async fn get(&self, id: SaveId) -> Result<Option<Save>, RepoError>;
    /// Most recent first.
    async fn list_for_client(&self, client: ClientId) -> Result<Vec<SaveSummary>, RepoError>;
    async fn delete(&self, id: SaveId, client: ClientId) -> Result<bool, RepoError>;
}

// =============================================================================
// Judgment Function Ports
// =============================================================================

/// Input to the primary judgment function.
#[derive(Debug, Clone)]
pub struct JudgmentRequest {
    /// Rendered persona instruction block. Always retained regardless of
    /// history trimming.
    pub persona: String,
    /// Trimmed conversation history, most recent last.
    pub history: Vec<ChatEntry>,
}

/// Primary judgment function ("NPC"): structured verdict per turn.
#[async_trait]
pub trait JudgePort: Send + Sync {
    async fn judge(&self, request: JudgmentRequest) -> Result<NpcJudgment, LlmError>;
}

/// Secondary judgment function ("narrator"): free text only, no structure.
#[async_trait]
pub trait NarratorPort: Send + Sync {
    async fn narrate(&self, prompt: String) -> Result<String, LlmError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
