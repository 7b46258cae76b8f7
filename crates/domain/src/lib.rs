pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;
pub mod views;

pub use entities::{
    AffinitasTuning, ContentBundle, DefaultSave, GameState, ItemEntry, NpcConfig, NpcSaveRecord,
    QuestConfig, QuestSaveRecord, Save, SaveSummary, ShadowSave, TuningKey,
};
pub use error::DomainError;
pub use ids::{ClientId, NpcId, QuestId, SaveId, SessionId};
pub use value_objects::{
    Affinitas, ChatEntry, ChatRole, NpcDelta, NpcJudgment, QuestStatus, Sentiment,
};
pub use views::{NpcPersona, NpcView, QuestView, SessionNpcView, SessionView};
