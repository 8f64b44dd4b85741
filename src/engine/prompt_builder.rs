use std::fmt::Write as _;

use crate::model::genre::role_starter;
use crate::model::session::{CharacterProfile, NARRATOR_LABEL};
use crate::model::world_state::WorldState;

/// How many of the latest events, consequences and creations are shown.
pub const RECENT_WINDOW: usize = 3;

pub const WORLD_STATE_HEADER: &str = "### Current World State ###";

/// Inputs that ask the narrator to bend the story rather than act within it.
pub const NARRATIVE_TRIGGERS: &[&str] = &[
    "i bend the story to",
    "i reshape reality so that",
    "suddenly,",
    "miraculously,",
    "unexpectedly,",
    "against all odds,",
];

const DM_SYSTEM_PROMPT: &str = "\
You are a masterful Dungeon Master. Your role is to provide IMMEDIATE and PERMANENT consequences for every player action. Follow these rules:

1. ACTION-CONSEQUENCE SYSTEM:
   - EVERY player action MUST have an immediate consequence
   - Consequences must permanently change the game world
   - Describe consequences in the next response without delay
   - Small actions create ripple effects through the narrative

2. RESPONSE STRUCTURE:
   a) Immediate consequence (What happens right now)
   b) New situation (What the player sees now)
   c) Next challenges (What happens next)

3. WORLD EVOLUTION:
   - NPCs remember player choices and react accordingly
   - Environments change permanently based on actions
   - Player choices open/close future narrative paths
   - Resources are gained/lost permanently
";

/// Builds the prompts sent to the text backend.
/// This struct is intentionally dumb: it only formats text.
pub struct PromptBuilder;

impl PromptBuilder {
    /// The fixed instructions, the character framing and the world snapshot.
    pub fn preamble(profile: &CharacterProfile, world: &WorldState) -> String {
        let mut prompt = String::from(DM_SYSTEM_PROMPT);

        if !profile.genre.is_empty() {
            let _ = write!(
                prompt,
                "\nThe player is {} the {}, in a {} adventure.\n",
                profile.name, profile.role, profile.genre
            );
        }

        prompt.push_str("\nCurrent World State:\n");
        prompt.push_str(&render_world_state(world));
        prompt
    }

    /// The setting block that opens every transcript.
    pub fn setting(profile: &CharacterProfile) -> String {
        format!(
            "### Adventure Setting ###\nGenre: {}\nPlayer Character: {} the {}\nStarting Scenario: {}",
            profile.genre,
            profile.name,
            profile.role,
            role_starter(&profile.genre, &profile.role),
        )
    }

    /// Prompt for the very first scene.
    pub fn opening(profile: &CharacterProfile, world: &WorldState) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            Self::preamble(profile, world),
            Self::setting(profile),
            NARRATOR_LABEL,
        )
    }

    pub fn turn(
        profile: &CharacterProfile,
        world: &WorldState,
        transcript: &str,
        player_line: &str,
    ) -> String {
        format!(
            "{}\n\n{}\n{}\n{}",
            Self::preamble(profile, world),
            transcript,
            player_line,
            NARRATOR_LABEL,
        )
    }

    /// Prompt to regenerate a reply; the transcript already ends at the
    /// player's last line.
    pub fn redo(profile: &CharacterProfile, world: &WorldState, transcript: &str) -> String {
        format!(
            "{}\n\n{}\n{}",
            Self::preamble(profile, world),
            transcript,
            NARRATOR_LABEL,
        )
    }
}

pub fn is_narrative_command(input: &str) -> bool {
    let lower = input.trim_start().to_lowercase();
    NARRATIVE_TRIGGERS.iter().any(|t| lower.starts_with(t))
}

/// How the player's input is written into the transcript.
pub fn player_line(input: &str) -> String {
    if is_narrative_command(input) {
        format!("Player (narrative command): {input}")
    } else {
        format!("Player: {input}")
    }
}

/// Renders the world snapshot block. Optional sections are left out
/// entirely when empty.
pub fn render_world_state(world: &WorldState) -> String {
    let mut lines = vec![
        WORLD_STATE_HEADER.to_string(),
        format!("Allies: {}", join_or_none(&world.allies)),
        format!("Enemies: {}", join_or_none(&world.enemies)),
        format!("Reputation: {}", world.reputation),
        format!("Active Quests: {}", join_or_none(&world.active_quests)),
        format!("Completed Quests: {}", join_or_none(&world.completed_quests)),
    ];

    if !world.resources.is_empty() {
        lines.push("Resources:".into());
        for (resource, amount) in &world.resources {
            lines.push(format!("  - {resource}: {amount}"));
        }
    }

    if !world.factions.is_empty() {
        lines.push("Faction Relationships:".into());
        for (faction, level) in &world.factions {
            let sign = if *level > 0 { "+" } else { "" };
            lines.push(format!("  - {faction}: {sign}{level}"));
        }
    }

    push_recent(&mut lines, "Recent World Events:", &world.world_events);
    push_recent(&mut lines, "Recent Consequences:", world.consequences());
    push_recent(&mut lines, "Player Creations:", world.player_creations());

    lines.join("\n")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

fn push_recent(lines: &mut Vec<String>, header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(header.to_string());
    let start = items.len().saturating_sub(RECENT_WINDOW);
    for item in &items[start..] {
        lines.push(format!("  - {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_renders_only_fixed_lines() {
        let block = render_world_state(&WorldState::default());
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], WORLD_STATE_HEADER);
        assert_eq!(
            &lines[1..],
            &[
                "Allies: None",
                "Enemies: None",
                "Reputation: 0",
                "Active Quests: None",
                "Completed Quests: None",
            ]
        );
    }

    #[test]
    fn optional_sections_appear_in_order() {
        let mut world = WorldState::default();
        world.allies = vec!["Garrick".into(), "Lyra".into()];
        world.add_resource("gold", 5);
        world.adjust_faction("Thieves Guild", 2);
        world.adjust_faction("Iron Order", -1);
        world.adjust_faction("Neutral Council", 0);
        for i in 1..=5 {
            world.world_events.push(format!("event {i}"));
        }
        world.record_consequence("first");
        world.record_creation("Ancient Sword (Item)");

        let block = render_world_state(&world);

        assert!(block.contains("Allies: Garrick, Lyra"));
        assert!(block.contains("Resources:\n  - gold: 5"));
        assert!(block.contains("  - Thieves Guild: +2"));
        assert!(block.contains("  - Iron Order: -1"));
        assert!(block.contains("  - Neutral Council: 0"));
        assert!(!block.contains("event 2"));
        assert!(block.contains("  - event 3\n  - event 4\n  - event 5"));

        let order = [
            "Resources:",
            "Faction Relationships:",
            "Recent World Events:",
            "Recent Consequences:",
            "Player Creations:",
        ];
        let positions: Vec<usize> = order.iter().map(|h| block.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut world = WorldState::default();
        world.add_resource("rope", 1);
        world.add_resource("gold", 3);
        assert_eq!(render_world_state(&world), render_world_state(&world.clone()));
    }

    #[test]
    fn narrative_commands_are_labelled() {
        assert_eq!(player_line("open the door"), "Player: open the door");
        assert_eq!(
            player_line("Suddenly, the roof caves in"),
            "Player (narrative command): Suddenly, the roof caves in"
        );
        assert!(is_narrative_command("I bend the story to favour me"));
        assert!(!is_narrative_command("I suddenly run"));
    }

    #[test]
    fn opening_prompt_carries_setting() {
        let profile = CharacterProfile {
            name: "Wren".into(),
            role: "Mage".into(),
            genre: "Fantasy".into(),
        };
        let prompt = PromptBuilder::opening(&profile, &WorldState::default());

        assert!(prompt.starts_with("You are a masterful Dungeon Master."));
        assert!(prompt.contains("Player Character: Wren the Mage"));
        assert!(prompt.contains("Starting Scenario: You're studying ancient tomes"));
        assert!(prompt.contains(WORLD_STATE_HEADER));
        assert!(prompt.ends_with(NARRATOR_LABEL));
    }

    #[test]
    fn turn_prompt_ends_with_player_line_then_narrator() {
        let prompt = PromptBuilder::turn(
            &CharacterProfile::default(),
            &WorldState::default(),
            "earlier",
            "Player: look around",
        );
        assert!(prompt.ends_with("earlier\nPlayer: look around\nDungeon Master:"));
    }
}
