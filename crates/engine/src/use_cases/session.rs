//! Session lifecycle: the shadow save model.
//!
//! One mutable session per client. New game instantiates the default
//! template; loading a save discards whatever session the client holds
//! and replaces it (last-load-wins); saving promotes the session to an
//! immutable named snapshot without ending it.

use std::sync::Arc;

use affinitas_domain::{
    ClientId, ItemEntry, Save, SaveId, SaveSummary, SessionId, SessionView, ShadowSave,
};
use serde::Serialize;

use crate::infrastructure::ports::{
    ClockPort, DefaultSaveRepo, LlmError, NarratorPort, NpcConfigRepo, RepoError, SaveRepo,
    SessionRepo,
};
use crate::prompt_templates::ending_prompt;
use crate::use_cases::merge::{merge_npc_view, merge_session, MergeError, MergeOptions};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client already holds an active session.
    #[error("an active session already exists for this client")]
    Conflict,
    #[error("session not found")]
    SessionNotFound,
    #[error("save not found")]
    SaveNotFound,
    #[error("data integrity failure: {0}")]
    Integrity(String),
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Narrator(#[from] LlmError),
}

impl From<RepoError> for SessionError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(_) => SessionError::Conflict,
            RepoError::Integrity(msg) => SessionError::Integrity(msg),
            other => SessionError::Repo(other),
        }
    }
}

impl From<MergeError> for SessionError {
    fn from(e: MergeError) -> Self {
        SessionError::Integrity(e.to_string())
    }
}

/// A freshly created (or loaded) session, merged for the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub data: SessionView,
}

pub struct SessionLifecycle {
    sessions: Arc<dyn SessionRepo>,
    saves: Arc<dyn SaveRepo>,
    defaults: Arc<dyn DefaultSaveRepo>,
    npcs: Arc<dyn NpcConfigRepo>,
    narrator: Arc<dyn NarratorPort>,
    clock: Arc<dyn ClockPort>,
}

impl SessionLifecycle {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        saves: Arc<dyn SaveRepo>,
        defaults: Arc<dyn DefaultSaveRepo>,
        npcs: Arc<dyn NpcConfigRepo>,
        narrator: Arc<dyn NarratorPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            sessions,
            saves,
            defaults,
            npcs,
            narrator,
            clock,
        }
    }

    /// Start a new game from the default template. Fails with
    /// [`SessionError::Conflict`] when the client already has a session;
    /// the client must quit (or save and quit) first.
    pub async fn new_game(&self, client: ClientId) -> Result<NewSession, SessionError> {
        let template = self
            .defaults
            .get()
            .await?
            .ok_or_else(|| SessionError::Integrity("no default save configured".to_string()))?;

        let session = ShadowSave::new(client, template.state);
        self.merged(session).await
    }

    /// Load a named save, discarding whatever session the client holds.
    pub async fn load_game(
        &self,
        client: ClientId,
        save_id: SaveId,
    ) -> Result<NewSession, SessionError> {
        let save = self
            .saves
            .get(save_id)
            .await?
            .filter(|s| s.client_id == client)
            .ok_or(SessionError::SaveNotFound)?;

        self.sessions.delete_for_client(client).await?;
        let session = ShadowSave::new(client, save.state);
        self.merged(session).await
    }

    async fn merged(&self, session: ShadowSave) -> Result<NewSession, SessionError> {
        let configs = self.npcs.list().await?;
        let data = merge_session(&session.state, &configs)?;
        let session_id = self.sessions.insert_unique(session).await?;
        Ok(NewSession { session_id, data })
    }

    /// Promote the session to a named snapshot. The session keeps running.
    pub async fn save_game(
        &self,
        client: ClientId,
        session_id: SessionId,
        name: String,
    ) -> Result<SaveSummary, SessionError> {
        let session = self
            .sessions
            .get_for_client(session_id, client)
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        let save = Save::from_session(&session, name, self.clock.now());
        let summary = SaveSummary {
            save_id: save.id,
            name: save.name.clone(),
            saved_at: save.saved_at,
        };
        self.saves.insert(save).await?;
        Ok(summary)
    }

    /// End the session without saving. Unsaved progress is gone.
    pub async fn quit(&self, session_id: SessionId) -> Result<(), SessionError> {
        if self.sessions.delete(session_id).await? {
            Ok(())
        } else {
            Err(SessionError::SessionNotFound)
        }
    }

    pub async fn set_action_points(
        &self,
        client: ClientId,
        session_id: SessionId,
        action_points: i32,
    ) -> Result<(), SessionError> {
        if self
            .sessions
            .set_action_points(session_id, client, action_points)
            .await?
        {
            Ok(())
        } else {
            Err(SessionError::SessionNotFound)
        }
    }

    /// Record a session-level item pickup.
    pub async fn give_item(
        &self,
        client: ClientId,
        session_id: SessionId,
        name: String,
    ) -> Result<(), SessionError> {
        let item = ItemEntry { name, active: true };
        if self.sessions.push_item(session_id, client, item).await? {
            Ok(())
        } else {
            Err(SessionError::SessionNotFound)
        }
    }

    pub async fn list_saves(&self, client: ClientId) -> Result<Vec<SaveSummary>, SessionError> {
        Ok(self.saves.list_for_client(client).await?)
    }

    pub async fn delete_save(
        &self,
        client: ClientId,
        save_id: SaveId,
    ) -> Result<(), SessionError> {
        if self.saves.delete(save_id, client).await? {
            Ok(())
        } else {
            Err(SessionError::SaveNotFound)
        }
    }

    /// Narrate the game ending from the end-states of every NPC with
    /// global influence.
    pub async fn generate_ending(
        &self,
        client: ClientId,
        session_id: SessionId,
    ) -> Result<String, SessionError> {
        let session = self
            .sessions
            .get_for_client(session_id, client)
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        let options = MergeOptions {
            include_chat_history: false,
            include_static: true,
        };
        let mut end_states = Vec::new();
        for record in &session.state.npcs {
            let config = self.npcs.get(&record.npc_id).await?.ok_or_else(|| {
                SessionError::Integrity(format!(
                    "NPC {} referenced by session is missing from the catalog",
                    record.npc_id
                ))
            })?;
            if !config.global_influence {
                continue;
            }
            let view = merge_npc_view(record, &config, options)?;
            end_states.push(serde_json::json!({
                "name": view.name,
                "affinitas": view.affinitas,
                "occupation": view.occupation,
                "likes": view.likes,
                "dislikes": view.dislikes,
                "completed_quests": view.completed_quests,
                "endings": config.endings,
            }));
        }

        let payload = serde_json::to_string(&end_states)
            .map_err(|e| SessionError::Integrity(e.to_string()))?;
        Ok(self.narrator.narrate(ending_prompt(&payload)).await?)
    }
}
