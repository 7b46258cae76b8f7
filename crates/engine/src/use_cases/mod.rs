//! Use cases - orchestration of the core pipeline.
//!
//! - `merge` - the state merge engine (NPC runtime views)
//! - `chat` - the conversation turn processor
//! - `session` - session lifecycle (shadow save model)
//! - `quest` - quest activation and guarded completion

pub mod chat;
pub mod merge;
pub mod quest;
pub mod session;

pub use chat::{ConversationTurnProcessor, ProcessedTurn, TurnError, TurnOutcome};
pub use merge::{merge_npc_view, merge_session, LoadNpcView, MergeError, MergeOptions, ViewError};
pub use quest::{QuestError, QuestOrchestrator, QuestText};
pub use session::{NewSession, SessionError, SessionLifecycle};
