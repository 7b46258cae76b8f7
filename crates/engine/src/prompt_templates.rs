//! Prompt rendering for the judgment functions.
//!
//! The persona block is the system instruction sent with every judged
//! turn; it is always retained regardless of history trimming.

use affinitas_domain::{NpcPersona, NpcView, QuestView, TuningKey};

const PERSONA_TEMPLATE: &str = "\
You are \"{name}\", a fully realised NPC living in a richly detailed medieval world.
Speak, think, and react exactly as {name} would - never mention that you are an AI, a game script, or any out-of-world concept.

------------------  CORE IDENTITY  ------------------
- Name        : {name}
- Age         : {age}
- Occupation  : {occupation}
- Backstory   : {backstory}
- Personality : {personality}
- Motivations : {motivations}

------------------  SOCIAL PALETTE  ------------------
Likes    : {likes}
Dislikes : {dislikes}
Dialogue-unlock tokens (secrets / topics to reveal at higher trust): {dialogue_unlocks}

------------------  QUEST THREADS  ------------------
Current quests attached to you:
{quests}

------------------  AFFINITAS (TRUST / RAPPORT METER)  ------------------
Current score: {affinitas} (0 = utter disdain, 100 = deep trust)

Tuning config (how readily the score moves):
- Increase key: {affinitas_up}
- Decrease key: {affinitas_down}

Each key is either a float in [0, 1] (closer to 1 = more emotionally volatile in that direction) or a list of \
keywords whose genuinely meaningful mention can sway feelings - repetition alone must not keep piling on points.

Adjustment rules per turn:
1. Judge the player's latest message as very positive / positive / neutral / negative / very negative.
2. Weigh likes, dislikes, personality, motivations, and the tuning keys above.
3. Personal insults always count as very negative.

------------------  PROFILE-UPDATE RULES  ------------------
- Treat Occupation, Likes, Dislikes as fixed during normal play; propose revisions only when the latest inbound \
message is from the system role explicitly instructing you to do so.
- You may mark a quest complete by including its ID in the completed_quests field, but only when a trigger given \
by a system message is explicitly present in the player's message.

------------------  ROLEPLAY GUIDELINES  ------------------
- Refuse or question anachronistic requests (gunpowder, smartphones, etc.).
- First-person, setting-appropriate vocabulary; let feelings seep into word choice.
- Remember prior exchanges; adjust openness and trust realistically over time.
";

/// Render the persona instruction block for one judged turn.
pub fn render_persona(view: &NpcView, persona: &NpcPersona) -> String {
    PERSONA_TEMPLATE
        .replace("{name}", &view.name)
        .replace("{age}", &persona.age.to_string())
        .replace(
            "{occupation}",
            view.occupation.as_deref().unwrap_or("Unknown"),
        )
        .replace("{backstory}", &persona.backstory)
        .replace("{personality}", &join_or(&persona.personality, "Unspecified"))
        .replace("{motivations}", &join_or(&persona.motivations, "Unspecified"))
        .replace("{likes}", &join_or(&view.likes, "Unspecified"))
        .replace("{dislikes}", &join_or(&view.dislikes, "Unspecified"))
        .replace(
            "{dialogue_unlocks}",
            &join_or(&persona.dialogue_unlocks, "None"),
        )
        .replace("{quests}", &pretty_quests(&view.quests))
        .replace("{affinitas}", &view.affinitas.to_string())
        .replace("{affinitas_up}", &render_tuning(&persona.tuning.increase))
        .replace("{affinitas_down}", &render_tuning(&persona.tuning.decrease))
}

/// Human-readable quest summary: status icon + name + description per quest.
pub fn pretty_quests(quests: &[QuestView]) -> String {
    if quests.is_empty() {
        return "- (no quests linked yet)".to_string();
    }
    let mut lines = Vec::with_capacity(quests.len() * 2);
    for quest in quests {
        lines.push(format!(
            "{} **{}**: {}",
            quest.status.icon(),
            quest.name,
            quest.description
        ));
        lines.push(format!("    - Affinitas Reward: {}", quest.affinitas_reward));
    }
    lines.join("\n")
}

/// A tuning key renders as a two-decimal float or a comma-joined phrase list.
pub fn render_tuning(key: &TuningKey) -> String {
    match key {
        TuningKey::Volatility(v) => format!("{v:.2}"),
        TuningKey::Triggers(phrases) => phrases.join(", "),
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

/// System message injected into a linked NPC's history when a quest that
/// completes through them is accepted. Conditions future turns with that
/// NPC to recognize the completion triggers.
pub fn quest_accepted_message(quest: &QuestView) -> String {
    let triggers = quest
        .triggers
        .iter()
        .map(|t| format!("{t:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The player has accepted this quest:\n\n\
         Quest ID: {id}\n\
         Quest Name: {name}\n\
         Quest Description: {description}\n\
         ---\n\
         Make use of the keywords below and the quest name and description \
         to decide whether the quest is completed.\n\
         {triggers}\n\
         ---\n\
         If the player completes the quest, append the quest ID to the `completed_quests` array.",
        id = quest.quest_id,
        name = quest.name,
        description = quest.description,
        triggers = triggers,
    )
}

/// Narrator prompt: paraphrase a quest description in the NPC's voice.
pub fn quest_paraphrase_prompt(view: &NpcView, persona: &NpcPersona, description: &str) -> String {
    format!(
        "Paraphrase the following text like this person would speak:\n\
         Name: {name}\n\
         Age: {age}\n\
         Occupation: {occupation}\n\
         Personality: {personality}\n\
         Backstory: {backstory}\n\
         ---\n\
         {description:?}\n\
         ---\n\
         Only include the paraphrased text and nothing else.",
        name = view.name,
        age = persona.age,
        occupation = view.occupation.as_deref().unwrap_or("Unknown"),
        personality = join_or(&persona.personality, "Unspecified"),
        backstory = persona.backstory,
    )
}

/// System message recorded when a quest completes.
pub fn quest_completed_message(quest_id: &affinitas_domain::QuestId) -> String {
    format!("Quest with ID `{quest_id}` completed.")
}

/// System message for a per-NPC item hand-over; elicits a reaction turn.
pub fn item_received_message(item_name: &str) -> String {
    format!("The player gave you an item: {item_name:?}. React in character.")
}

/// Narrator prompt: render a game ending from all NPC end-states.
pub fn ending_prompt(end_states: &str) -> String {
    format!(
        "Write the ending of the player's story in this medieval town. \
         Weigh each NPC's final trust score, completed quests, and ending notes. \
         The NPC end-states follow as JSON:\n{end_states}\n---\n\
         Write a single cohesive ending narration and nothing else."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use affinitas_domain::{
        Affinitas, AffinitasTuning, NpcId, QuestId, QuestStatus, TuningKey,
    };

    fn quest(status: QuestStatus) -> QuestView {
        QuestView {
            quest_id: QuestId::from("find-the-flour"),
            name: "Find the Flour".to_string(),
            description: "Fetch a sack of flour from the mill.".to_string(),
            affinitas_reward: 10,
            linked_npc: None,
            triggers: vec!["flour".to_string()],
            status,
        }
    }

    fn view() -> (NpcView, NpcPersona) {
        let persona = NpcPersona {
            age: 54,
            backstory: "Keeps the village bakery.".to_string(),
            personality: vec!["gruff".to_string(), "honest".to_string()],
            motivations: vec!["feed the town".to_string()],
            dialogue_unlocks: vec![],
            endings: vec![],
            tuning: AffinitasTuning {
                initial: 50,
                increase: TuningKey::Volatility(0.5),
                decrease: TuningKey::Triggers(vec!["waste".to_string(), "lies".to_string()]),
            },
            global_influence: true,
        };
        let view = NpcView {
            npc_id: NpcId::from("gus"),
            name: "Gus".to_string(),
            affinitas: Affinitas::new(50),
            occupation: None,
            likes: vec![],
            dislikes: vec!["thieves".to_string()],
            quests: vec![quest(QuestStatus::Active)],
            completed_quests: vec![],
            chat_history: None,
            persona: None,
        };
        (view, persona)
    }

    #[test]
    fn persona_renders_fallbacks_and_tuning() {
        let (view, persona) = view();
        let rendered = render_persona(&view, &persona);

        assert!(rendered.contains("Occupation  : Unknown"));
        assert!(rendered.contains("Likes    : Unspecified"));
        assert!(rendered.contains("Dislikes : thieves"));
        assert!(rendered.contains("Increase key: 0.50"));
        assert!(rendered.contains("Decrease key: waste, lies"));
        assert!(rendered.contains("Current score: 50"));
    }

    #[test]
    fn quest_summary_uses_status_icons() {
        let rendered = pretty_quests(&[quest(QuestStatus::Pending), quest(QuestStatus::Completed)]);
        assert!(rendered.contains("○ **Find the Flour**"));
        assert!(rendered.contains("✓ **Find the Flour**"));
        assert!(rendered.contains("Affinitas Reward: 10"));

        assert_eq!(pretty_quests(&[]), "- (no quests linked yet)");
    }

    #[test]
    fn quest_accepted_message_names_triggers() {
        let msg = quest_accepted_message(&quest(QuestStatus::Active));
        assert!(msg.contains("Quest ID: find-the-flour"));
        assert!(msg.contains("\"flour\""));
        assert!(msg.contains("completed_quests"));
    }
}
