pub mod npc;
pub mod save;

pub use npc::{AffinitasTuning, NpcConfig, QuestConfig, TuningKey};
pub use save::{
    ContentBundle, DefaultSave, GameState, ItemEntry, NpcSaveRecord, QuestSaveRecord, Save,
    SaveSummary, ShadowSave,
};
