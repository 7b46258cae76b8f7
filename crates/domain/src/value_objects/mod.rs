pub mod affinitas;
pub mod chat;
pub mod judgment;
pub mod quest_status;

pub use affinitas::{Affinitas, Sentiment};
pub use chat::{ChatEntry, ChatRole};
pub use judgment::{NpcDelta, NpcJudgment};
pub use quest_status::QuestStatus;
