//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::ports::{
    ClockPort, DefaultSaveRepo, JudgePort, NarratorPort, NpcConfigRepo, SaveRepo, SessionRepo,
};
use crate::use_cases::{
    ConversationTurnProcessor, LoadNpcView, QuestOrchestrator, SessionLifecycle,
};

/// Store ports consumed by the use cases. A single adapter usually backs
/// all four.
pub struct Repos {
    pub sessions: Arc<dyn SessionRepo>,
    pub saves: Arc<dyn SaveRepo>,
    pub defaults: Arc<dyn DefaultSaveRepo>,
    pub npcs: Arc<dyn NpcConfigRepo>,
}

/// Main application state.
///
/// Holds all use cases. Passed to HTTP handlers via Axum state.
pub struct App {
    pub session: SessionLifecycle,
    pub chat: ConversationTurnProcessor,
    pub quest: QuestOrchestrator,
}

impl App {
    /// Wire up all dependencies.
    pub fn new(
        repos: Repos,
        judge: Arc<dyn JudgePort>,
        narrator: Arc<dyn NarratorPort>,
        clock: Arc<dyn ClockPort>,
        token_budget: usize,
    ) -> Self {
        let views = Arc::new(LoadNpcView::new(
            repos.sessions.clone(),
            repos.npcs.clone(),
        ));

        Self {
            session: SessionLifecycle::new(
                repos.sessions.clone(),
                repos.saves,
                repos.defaults,
                repos.npcs.clone(),
                narrator.clone(),
                clock,
            ),
            chat: ConversationTurnProcessor::new(
                repos.sessions.clone(),
                views,
                judge,
                token_budget,
            ),
            quest: QuestOrchestrator::new(repos.sessions, repos.npcs, narrator),
        }
    }
}
