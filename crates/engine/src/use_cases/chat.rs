//! Conversation turn processor.
//!
//! One turn: load the merged NPC view, trim history to the token budget,
//! render the persona, obtain the judge's structured verdict, apply the
//! state delta, and persist the whole turn as a single atomic update.
//! Persistence runs on a background task so the reply is not delayed by
//! the store write; the task handle is returned for callers that need to
//! observe completion.

use std::sync::Arc;

use affinitas_domain::{Affinitas, ChatEntry, ChatRole, NpcId, QuestId, SessionId};
use tokio::task::JoinHandle;

use crate::infrastructure::ports::{JudgePort, JudgmentRequest, LlmError, SessionRepo, TurnUpdate};
use crate::prompt_templates::render_persona;
use crate::use_cases::merge::{LoadNpcView, MergeOptions, ViewError};

/// Approximate token budget for judged conversation context.
pub const DEFAULT_TOKEN_BUDGET: usize = 30_000;

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    View(#[from] ViewError),
    /// The judge failed or returned malformed output. The turn is not
    /// committed: no state change, no history write.
    #[error(transparent)]
    Judgment(#[from] LlmError),
}

/// What the caller gets back from a judged turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub affinitas: Affinitas,
    /// Quests newly completed by this turn (conversational completion).
    pub completed_quests: Vec<QuestId>,
}

/// A processed turn. `outcome` is `None` for non-judged turns (system
/// messages recorded without invoking the judge).
#[derive(Debug)]
pub struct ProcessedTurn {
    pub outcome: Option<TurnOutcome>,
    /// Background persistence task. Await it to observe the store write.
    pub persistence: JoinHandle<()>,
}

pub struct ConversationTurnProcessor {
    sessions: Arc<dyn SessionRepo>,
    views: Arc<LoadNpcView>,
    judge: Arc<dyn JudgePort>,
    token_budget: usize,
}

impl ConversationTurnProcessor {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        views: Arc<LoadNpcView>,
        judge: Arc<dyn JudgePort>,
        token_budget: usize,
    ) -> Self {
        Self {
            sessions,
            views,
            judge,
            token_budget,
        }
    }

    /// Process one inbound entry for `(session, npc)`.
    ///
    /// Player (`user`) entries always invoke the judge. System entries are
    /// recorded silently unless `force_invoke` is set (item hand-overs and
    /// similar, where an in-character reaction is wanted).
    ///
    /// Callers must serialize turns per (session, NPC): state is computed
    /// from a read then written whole.
    pub async fn process(
        &self,
        session_id: SessionId,
        npc_id: &NpcId,
        entry: ChatEntry,
        force_invoke: bool,
    ) -> Result<ProcessedTurn, TurnError> {
        let view = self
            .views
            .execute(session_id, npc_id, MergeOptions::default())
            .await?;

        if entry.role() != ChatRole::User && !force_invoke {
            let sessions = Arc::clone(&self.sessions);
            let npc_id = npc_id.clone();
            let persistence = tokio::spawn(async move {
                persist_history(sessions, session_id, npc_id, vec![entry]).await;
            });
            return Ok(ProcessedTurn {
                outcome: None,
                persistence,
            });
        }

        let persona = render_persona(
            &view,
            view.persona.as_ref().ok_or_else(|| {
                ViewError::Integrity("merged view is missing static NPC data".to_string())
            })?,
        );

        let mut history = view.chat_history.clone().unwrap_or_default();
        history.push(entry.clone());
        let history = trim_history(&history, self.token_budget);

        let judgment = self
            .judge
            .judge(JudgmentRequest {
                persona,
                history: history.to_vec(),
            })
            .await?;

        // Compute the post-turn record from the merged snapshot, then write
        // it back whole in one atomic update.
        let mut record = affinitas_domain::NpcSaveRecord {
            npc_id: npc_id.clone(),
            affinitas: view.affinitas,
            occupation: view.occupation.clone(),
            likes: view.likes.clone(),
            dislikes: view.dislikes.clone(),
            chat_history: vec![],
            quests: vec![],
            completed_quests: view.completed_quests.clone(),
        };
        let newly_completed = record.apply_turn(
            judgment.affinitas_change.delta(),
            &judgment.delta,
            &judgment.completed_quests,
        );

        let outcome = TurnOutcome {
            reply: judgment.response.clone(),
            affinitas: record.affinitas,
            completed_quests: newly_completed.clone(),
        };

        let update = TurnUpdate {
            affinitas: record.affinitas,
            occupation: record.occupation,
            likes: record.likes,
            dislikes: record.dislikes,
            push_completed: newly_completed,
            push_history: vec![entry, ChatEntry::ai(judgment.response)],
        };

        let sessions = Arc::clone(&self.sessions);
        let npc_id = npc_id.clone();
        let persistence = tokio::spawn(async move {
            match sessions.apply_turn_update(session_id, &npc_id, update).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::error!(%session_id, %npc_id, "turn update lost: record vanished")
                }
                Err(error) => tracing::error!(%session_id, %npc_id, %error, "turn update failed"),
            }
        });

        Ok(ProcessedTurn {
            outcome: Some(outcome),
            persistence,
        })
    }
}

async fn persist_history(
    sessions: Arc<dyn SessionRepo>,
    session_id: SessionId,
    npc_id: NpcId,
    entries: Vec<ChatEntry>,
) {
    match sessions.push_history(session_id, &npc_id, entries).await {
        Ok(true) => {}
        Ok(false) => tracing::error!(%session_id, %npc_id, "history write lost: record vanished"),
        Err(error) => tracing::error!(%session_id, %npc_id, %error, "history write failed"),
    }
}

/// Rough token count: four characters per token plus a few per message
/// for role overhead.
fn approx_tokens(entry: &ChatEntry) -> usize {
    entry.content().chars().count() / 4 + 4
}

/// Trim history to the token budget, keeping the most recent entries.
///
/// A truncated window is re-anchored on a `user` turn when it would
/// otherwise open on the NPC's own reply, so the judge never sees a
/// conversation starting mid-exchange. A window opening on a system
/// entry (quest briefings, item hand-overs) keeps it: those carry the
/// completion triggers. An untrimmed history is returned whole. The
/// persona block is sent separately and is never trimmed.
fn trim_history(entries: &[ChatEntry], budget: usize) -> &[ChatEntry] {
    let mut start = entries.len();
    let mut used = 0;
    while start > 0 {
        let cost = approx_tokens(&entries[start - 1]);
        if used + cost > budget && start < entries.len() {
            break;
        }
        used += cost;
        start -= 1;
    }

    if start > 0 && entries[start].role() == ChatRole::Ai {
        if let Some(offset) = entries[start..]
            .iter()
            .position(|e| e.role() == ChatRole::User)
        {
            start += offset;
        }
    }
    &entries[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryStore;
    use crate::infrastructure::ports::NpcConfigRepo;
    use crate::test_fixtures::{judgment, sample_bundle, session_with_quest, ScriptedJudge};
    use affinitas_domain::{QuestStatus, Sentiment};

    fn processor(
        store: Arc<MemoryStore>,
        judge: Arc<ScriptedJudge>,
    ) -> ConversationTurnProcessor {
        let sessions: Arc<dyn SessionRepo> = store.clone();
        let npcs: Arc<dyn NpcConfigRepo> = store;
        ConversationTurnProcessor::new(
            sessions.clone(),
            Arc::new(LoadNpcView::new(sessions, npcs)),
            judge,
            DEFAULT_TOKEN_BUDGET,
        )
    }

    async fn seeded_store(affinitas: i32) -> (Arc<MemoryStore>, SessionId, NpcId) {
        let store = Arc::new(MemoryStore::new());
        store.seed(sample_bundle()).expect("seed");
        let session = session_with_quest(QuestStatus::Pending, affinitas);
        let session_id = session.id;
        let npc_id = session.state.npcs[0].npc_id.clone();
        store.insert_unique(session).await.expect("insert");
        (store, session_id, npc_id)
    }

    #[tokio::test]
    async fn positive_turn_moves_affinitas_and_persists() {
        let (store, session_id, npc_id) = seeded_store(50).await;
        let judge = Arc::new(ScriptedJudge::returning(judgment(
            "Good of you to ask.",
            Sentiment::Positive,
        )));
        let processor = processor(store.clone(), judge.clone());

        let turn = processor
            .process(session_id, &npc_id, ChatEntry::user("How is the oven?"), false)
            .await
            .expect("turn");
        let outcome = turn.outcome.expect("judged turn");
        assert_eq!(outcome.reply, "Good of you to ask.");
        assert_eq!(outcome.affinitas.value(), 52);

        turn.persistence.await.expect("persistence task");
        let stored = store.session(session_id).expect("session");
        let record = &stored.state.npcs[0];
        assert_eq!(record.affinitas.value(), 52);
        // Inbound entry plus the NPC reply, after the two fixture entries.
        assert_eq!(record.chat_history.len(), 4);
        assert_eq!(record.chat_history[3].content(), "Good of you to ask.");

        // The judge saw the persona and the full short history.
        let requests = judge.requests.lock().expect("lock poisoned");
        assert!(requests[0].persona.contains("Gus"));
        assert_eq!(requests[0].history.len(), 3);
    }

    #[tokio::test]
    async fn affinitas_clamps_at_ceiling() {
        let (store, session_id, npc_id) = seeded_store(99).await;
        let judge = Arc::new(ScriptedJudge::returning(judgment(
            "You honour me.",
            Sentiment::VeryPositive,
        )));
        let processor = processor(store, judge);

        let turn = processor
            .process(session_id, &npc_id, ChatEntry::user("I saved your bakery."), false)
            .await
            .expect("turn");
        assert_eq!(turn.outcome.expect("judged").affinitas.value(), 100);
    }

    #[tokio::test]
    async fn system_entry_is_recorded_without_judging() {
        let (store, session_id, npc_id) = seeded_store(50).await;
        let judge = Arc::new(ScriptedJudge::returning(judgment("x", Sentiment::Neutral)));
        let processor = processor(store.clone(), judge.clone());

        let turn = processor
            .process(
                session_id,
                &npc_id,
                ChatEntry::system("The player has accepted this quest: ..."),
                false,
            )
            .await
            .expect("turn");
        assert!(turn.outcome.is_none());

        turn.persistence.await.expect("persistence task");
        let stored = store.session(session_id).expect("session");
        assert_eq!(stored.state.npcs[0].chat_history.len(), 3);
        assert!(judge.requests.lock().expect("lock poisoned").is_empty());
    }

    #[tokio::test]
    async fn force_invoke_judges_a_system_entry() {
        let (store, session_id, npc_id) = seeded_store(50).await;
        let judge = Arc::new(ScriptedJudge::returning(judgment(
            "A gift? For me?",
            Sentiment::Positive,
        )));
        let processor = processor(store, judge);

        let turn = processor
            .process(
                session_id,
                &npc_id,
                ChatEntry::system("The player gave you an item: \"rose\"."),
                true,
            )
            .await
            .expect("turn");
        assert_eq!(turn.outcome.expect("judged").reply, "A gift? For me?");
    }

    #[tokio::test]
    async fn judge_failure_leaves_state_untouched() {
        let (store, session_id, npc_id) = seeded_store(50).await;
        let judge = Arc::new(ScriptedJudge::failing(LlmError::InvalidResponse(
            "not json".to_string(),
        )));
        let processor = processor(store.clone(), judge);

        let err = processor
            .process(session_id, &npc_id, ChatEntry::user("hello"), false)
            .await
            .expect_err("judgment failure");
        assert!(matches!(err, TurnError::Judgment(_)));

        let stored = store.session(session_id).expect("session");
        assert_eq!(stored.state.npcs[0].affinitas.value(), 50);
        assert_eq!(stored.state.npcs[0].chat_history.len(), 2);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        store.seed(sample_bundle()).expect("seed");
        let judge = Arc::new(ScriptedJudge::returning(judgment("x", Sentiment::Neutral)));
        let processor = processor(store, judge);

        let err = processor
            .process(SessionId::new(), &NpcId::from("gus"), ChatEntry::user("hi"), false)
            .await
            .expect_err("no session");
        assert!(matches!(err, TurnError::View(ViewError::SessionNotFound)));
    }

    #[test]
    fn trim_keeps_everything_under_budget() {
        let history = vec![
            ChatEntry::system("persona follow-up"),
            ChatEntry::user("one"),
            ChatEntry::ai("two"),
            ChatEntry::user("three"),
        ];
        assert_eq!(trim_history(&history, 30_000), &history[..]);
    }

    #[test]
    fn trim_anchors_window_on_a_user_turn() {
        let long = "x".repeat(400); // ~104 tokens per entry
        let history = vec![
            ChatEntry::user(&long),
            ChatEntry::ai(&long),
            ChatEntry::user(&long),
            ChatEntry::ai(&long),
            ChatEntry::user("latest"),
        ];
        // Budget fits roughly the last three entries; the window must then
        // open on the user turn, dropping the leading reply.
        let trimmed = trim_history(&history, 250);
        assert_eq!(trimmed.first().map(|e| e.role()), Some(ChatRole::User));
        assert_eq!(trimmed.last().map(|e| e.content()), Some("latest"));
        assert!(trimmed.len() < history.len());
    }

    #[test]
    fn trim_retains_a_leading_quest_briefing_under_budget() {
        // A linked NPC's history opens with the injected trigger briefing.
        // The first player turn after it must not push the briefing out of
        // the judged window while the history fits the budget.
        let history = vec![
            ChatEntry::system("The player has accepted this quest: ..."),
            ChatEntry::user("I brought the sack from the mill."),
        ];
        assert_eq!(trim_history(&history, 30_000), &history[..]);
    }

    #[test]
    fn trim_keeps_a_system_entry_opening_a_truncated_window() {
        let long = "x".repeat(400); // ~104 tokens per entry
        let history = vec![
            ChatEntry::user(&long),
            ChatEntry::ai(&long),
            ChatEntry::system("quest briefing"),
            ChatEntry::user(&long),
            ChatEntry::user("latest"),
        ];
        let trimmed = trim_history(&history, 150);
        assert_eq!(trimmed.first().map(|e| e.content()), Some("quest briefing"));
        assert_eq!(trimmed.len(), 3);
    }

    #[test]
    fn trim_never_drops_the_latest_entry() {
        let history = vec![ChatEntry::user(&"x".repeat(100_000))];
        assert_eq!(trim_history(&history, 10).len(), 1);
    }
}
