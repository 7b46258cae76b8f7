//! Shared fixtures for engine tests: a small authored world (one baker,
//! one quest) plus scripted judgment fakes that record what they were
//! asked.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use affinitas_domain::{
    Affinitas, AffinitasTuning, ChatEntry, ClientId, ContentBundle, DefaultSave, GameState,
    NpcConfig, NpcDelta, NpcId, NpcJudgment, NpcSaveRecord, QuestConfig, QuestId, QuestSaveRecord,
    QuestStatus, Sentiment, ShadowSave, TuningKey,
};

use crate::infrastructure::ports::{JudgePort, JudgmentRequest, LlmError, NarratorPort};

pub fn gus_config() -> NpcConfig {
    NpcConfig {
        id: NpcId::from("gus"),
        name: "Gus".to_string(),
        age: 54,
        occupation: Some("Baker".to_string()),
        backstory: "Keeps the village bakery going through lean winters.".to_string(),
        personality: vec!["gruff".to_string(), "honest".to_string()],
        motivations: vec!["feed the town".to_string()],
        likes: vec!["fresh bread".to_string()],
        dislikes: vec!["thieves".to_string()],
        affinitas: AffinitasTuning {
            initial: 50,
            increase: TuningKey::Volatility(0.5),
            decrease: TuningKey::Triggers(vec!["waste".to_string(), "lies".to_string()]),
        },
        global_influence: true,
        endings: vec!["Gus hands the bakery keys to the player.".to_string()],
        dialogue_unlocks: vec!["the old mill debt".to_string()],
        quests: vec![QuestConfig {
            id: QuestId::from("find-the-flour"),
            name: "Find the Flour".to_string(),
            description: "Fetch a sack of flour from the mill.".to_string(),
            affinitas_reward: 10,
            linked_npc: None,
            triggers: vec!["flour".to_string()],
        }],
        order_no: 1,
    }
}

pub fn gus_record(affinitas: i32) -> NpcSaveRecord {
    NpcSaveRecord {
        npc_id: NpcId::from("gus"),
        affinitas: Affinitas::new(affinitas),
        occupation: None,
        likes: vec![],
        dislikes: vec![],
        chat_history: vec![
            ChatEntry::user("Morning, Gus."),
            ChatEntry::ai("Hmph. Early for you."),
        ],
        quests: vec![QuestSaveRecord {
            quest_id: QuestId::from("find-the-flour"),
            status: QuestStatus::Pending,
        }],
        completed_quests: vec![],
    }
}

pub fn game_state(npcs: Vec<NpcSaveRecord>) -> GameState {
    GameState {
        day_no: 1,
        remaining_ap: 10,
        journal: serde_json::Value::Null,
        items: vec![],
        npcs,
    }
}

pub fn sample_bundle() -> ContentBundle {
    ContentBundle {
        npcs: vec![gus_config()],
        default_save: DefaultSave {
            version: 1,
            state: game_state(vec![gus_record(50)]),
        },
    }
}

pub fn session_with_quest(status: QuestStatus, affinitas: i32) -> ShadowSave {
    let mut record = gus_record(affinitas);
    record.quests[0].status = status;
    ShadowSave::new(ClientId::new(), game_state(vec![record]))
}

pub fn judgment(response: &str, sentiment: Sentiment) -> NpcJudgment {
    NpcJudgment {
        response: response.to_string(),
        affinitas_change: sentiment,
        delta: NpcDelta::default(),
        completed_quests: vec![],
    }
}

/// Scripted judge: pops pre-canned verdicts and records every request.
pub struct ScriptedJudge {
    verdicts: Mutex<VecDeque<Result<NpcJudgment, LlmError>>>,
    pub requests: Mutex<Vec<JudgmentRequest>>,
}

impl ScriptedJudge {
    pub fn returning(verdict: NpcJudgment) -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::from([Ok(verdict)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl JudgePort for ScriptedJudge {
    async fn judge(&self, request: JudgmentRequest) -> Result<NpcJudgment, LlmError> {
        self.requests.lock().expect("lock poisoned").push(request);
        self.verdicts
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .expect("no scripted verdict left")
    }
}

/// Scripted narrator: returns pre-canned lines and records every prompt.
pub struct ScriptedNarrator {
    lines: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedNarrator {
    pub fn returning(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NarratorPort for ScriptedNarrator {
    async fn narrate(&self, prompt: String) -> Result<String, LlmError> {
        self.prompts.lock().expect("lock poisoned").push(prompt);
        Ok(self
            .lines
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .expect("no scripted narration left"))
    }
}
