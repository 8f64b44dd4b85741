use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::engine::apply_event::apply_event;
use crate::engine::prompt_builder::is_narrative_command;
use crate::model::event_result::{EventApplication, NarrativeApplyReport};
use crate::model::narrative_event::NarrativeEvent;
use crate::model::world_state::WorldState;

const MAX_REALITY_NOTE_CHARS: usize = 80;

/// One entry of the extraction table: a pattern and how a match becomes an event.
pub struct ExtractionRule {
    pub name: &'static str,
    pattern: Regex,
    build: fn(&Captures) -> Option<NarrativeEvent>,
}

impl ExtractionRule {
    pub fn new(
        name: &'static str,
        pattern: Regex,
        build: fn(&Captures) -> Option<NarrativeEvent>,
    ) -> Self {
        Self {
            name,
            pattern,
            build,
        }
    }

    pub fn events(&self, text: &str) -> Vec<NarrativeEvent> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| (self.build)(&caps))
            .collect()
    }
}

static ALLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Z][a-z]+)\b (?:joins|helps|saves|allies with)")
        .expect("invalid ally regex")
});

static DEFEAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Z][a-z]+)\b (?:dies|killed|falls|perishes)")
        .expect("invalid defeat regex")
});

static RESOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:get|find|acquire|obtain) (\d+) (\w+)").expect("invalid resource regex")
});

static WORLD_EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:The|A) (\w+ \w+) (?:is|has been) (destroyed|created|changed|revealed)")
        .expect("invalid world event regex")
});

static FACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b((?:[A-Z][\w']* )*(?:Guild|Order|Clan|Syndicate|Brotherhood|Empire|Alliance|Council|Legion|Cult|Federation|Corporation|Tribe|Coven))\b (?i:(welcomes|thanks|honors|honours|trusts|rewards|embraces|turns against|betrays|hunts|despises|condemns|attacks) you)\b",
    )
    .expect("invalid faction regex")
});

static DISCOVERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?i:you (?:discover|arrive at|enter|reach|stumble upon|find yourself in)) (?:(?i:the|an|a) )?([A-Z][\w']*(?: [A-Z][\w']*)*)",
    )
    .expect("invalid discovery regex")
});

fn build_ally(caps: &Captures) -> Option<NarrativeEvent> {
    Some(NarrativeEvent::AllyJoined {
        name: caps.get(1)?.as_str().to_string(),
    })
}

fn build_defeat(caps: &Captures) -> Option<NarrativeEvent> {
    Some(NarrativeEvent::CharacterDefeated {
        name: caps.get(1)?.as_str().to_string(),
    })
}

fn build_resource(caps: &Captures) -> Option<NarrativeEvent> {
    let quantity = caps.get(1)?.as_str().parse::<u32>().ok()?;
    Some(NarrativeEvent::ResourceGained {
        resource: caps.get(2)?.as_str().to_lowercase(),
        quantity,
    })
}

fn build_world_event(caps: &Captures) -> Option<NarrativeEvent> {
    Some(NarrativeEvent::WorldChanged {
        location: caps.get(1)?.as_str().to_string(),
        change: caps.get(2)?.as_str().to_string(),
    })
}

fn build_faction(caps: &Captures) -> Option<NarrativeEvent> {
    let raw = caps.get(1)?.as_str();
    let faction = raw.strip_prefix("The ").unwrap_or(raw).to_string();
    let verb = caps.get(2)?.as_str().to_lowercase();

    let delta = match verb.as_str() {
        "turns against" | "betrays" | "hunts" | "despises" | "condemns" | "attacks" => -1,
        _ => 1,
    };

    Some(NarrativeEvent::FactionStanding { faction, delta })
}

fn build_discovery(caps: &Captures) -> Option<NarrativeEvent> {
    Some(NarrativeEvent::LocationDiscovered {
        location: caps.get(1)?.as_str().to_string(),
    })
}

/// Best-effort structured signal from free narration.
///
/// Rules run in table order and every match of every rule is applied, so
/// a later rule wins over an earlier one for the same name (a character
/// who joins and dies in one reply ends up retired).
pub struct NarrativeExtractor {
    rules: Vec<ExtractionRule>,
}

impl Default for NarrativeExtractor {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl NarrativeExtractor {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_default_rules() -> Self {
        let mut extractor = Self::empty();
        extractor.push_rule(ExtractionRule::new("ally", ALLY_RE.clone(), build_ally));
        extractor.push_rule(ExtractionRule::new("defeat", DEFEAT_RE.clone(), build_defeat));
        extractor.push_rule(ExtractionRule::new("resource", RESOURCE_RE.clone(), build_resource));
        extractor.push_rule(ExtractionRule::new(
            "world_event",
            WORLD_EVENT_RE.clone(),
            build_world_event,
        ));
        extractor.push_rule(ExtractionRule::new("faction", FACTION_RE.clone(), build_faction));
        extractor.push_rule(ExtractionRule::new(
            "discovery",
            DISCOVERY_RE.clone(),
            build_discovery,
        ));
        extractor
    }

    pub fn push_rule(&mut self, rule: ExtractionRule) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// All events for one turn, in the order they should be applied.
    pub fn events(&self, action: &str, reply: &str) -> Vec<NarrativeEvent> {
        let mut events = vec![NarrativeEvent::Consequence {
            action: action.to_string(),
            summary: first_sentence(reply),
        }];

        if is_narrative_command(action) {
            events.push(NarrativeEvent::RealityBent {
                description: action.trim().chars().take(MAX_REALITY_NOTE_CHARS).collect(),
            });
        }

        for rule in &self.rules {
            events.extend(rule.events(reply));
        }

        events
    }

    pub fn extract(&self, action: &str, reply: &str, state: &mut WorldState) -> NarrativeApplyReport {
        let applications: Vec<EventApplication> = self
            .events(action, reply)
            .into_iter()
            .map(|event| {
                let outcome = apply_event(state, event.clone());
                EventApplication { event, outcome }
            })
            .collect();

        let report = NarrativeApplyReport { applications };
        tracing::debug!(
            events = report.applications.len(),
            applied = ?report.applied_kinds(),
            "applied narrative events"
        );
        report
    }
}

/// Text up to the first period, used as a one-line consequence.
pub fn first_sentence(reply: &str) -> String {
    reply.split('.').next().unwrap_or("").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(reply: &str, state: &mut WorldState) {
        NarrativeExtractor::default().extract("act", reply, state);
    }

    #[test]
    fn ally_join_then_defeat() {
        let mut state = WorldState::default();

        extract("Garrick joins you in the fight.", &mut state);
        assert_eq!(state.allies, vec!["Garrick"]);

        extract("Garrick dies in battle.", &mut state);
        assert!(state.allies.is_empty());
        assert!(state.enemies.is_empty());
    }

    #[test]
    fn report_names_only_events_that_changed_the_world() {
        let mut state = WorldState::default();
        state.add_ally("Garrick");

        let report = NarrativeExtractor::default().extract(
            "look",
            "Garrick joins you. Mira helps too. You find 3 gold",
            &mut state,
        );

        assert_eq!(report.applications.len(), 4);
        assert_eq!(
            report.applied_kinds(),
            vec!["Consequence", "AllyJoined", "ResourceGained"]
        );
    }

    #[test]
    fn repeated_join_is_idempotent() {
        let mut state = WorldState::default();
        extract("Garrick joins you. Later, Garrick helps the miller.", &mut state);
        extract("Garrick saves the day.", &mut state);
        assert_eq!(state.allies, vec!["Garrick"]);
    }

    #[test]
    fn defeat_rule_wins_within_one_reply() {
        let mut state = WorldState::default();
        extract("Lyra joins the charge, but Lyra falls to an arrow.", &mut state);
        assert!(state.allies.is_empty());
    }

    #[test]
    fn resources_accumulate_lowercased() {
        let mut state = WorldState::default();
        extract("You find 3 gold", &mut state);
        assert_eq!(state.resources.get("gold"), Some(&3));

        extract("You find 2 Gold and obtain 1 map", &mut state);
        assert_eq!(state.resources.get("gold"), Some(&5));
        assert_eq!(state.resources.get("map"), Some(&1));
        assert_eq!(state.resources.len(), 2);
    }

    #[test]
    fn world_changes_are_recorded() {
        let mut state = WorldState::default();
        extract(
            "The old bridge is destroyed. A hidden passage has been revealed.",
            &mut state,
        );
        assert_eq!(
            state.world_events,
            vec!["old bridge destroyed", "hidden passage revealed"]
        );
    }

    #[test]
    fn factions_gain_and_lose_standing() {
        let mut state = WorldState::default();
        extract("The Thieves Guild welcomes you into the fold.", &mut state);
        extract("The Iron Order turns against you.", &mut state);
        extract("The Thieves Guild thanks you again.", &mut state);

        assert_eq!(state.factions.get("Thieves Guild"), Some(&2));
        assert_eq!(state.factions.get("Iron Order"), Some(&-1));
    }

    #[test]
    fn discoveries_are_unique() {
        let mut state = WorldState::default();
        extract("You enter the Sunken Temple of Ash.", &mut state);
        extract("Once more you reach the Sunken Temple.", &mut state);
        extract("you find 3 coins", &mut state);
        assert_eq!(state.discoveries, vec!["Sunken Temple"]);
    }

    #[test]
    fn every_turn_records_a_consequence() {
        let mut state = WorldState::default();
        let extractor = NarrativeExtractor::default();
        for i in 0..7 {
            extractor.extract(&format!("step {i}"), "The wind howls. Nothing else.", &mut state);
        }
        assert_eq!(state.consequences().len(), 5);
        assert_eq!(state.consequences()[4], "After 'step 6': The wind howls");
        assert_eq!(state.consequences()[0], "After 'step 2': The wind howls");
    }

    #[test]
    fn narrative_commands_bend_reality() {
        let mut state = WorldState::default();
        NarrativeExtractor::default().extract(
            "Suddenly, a dragon appears",
            "A shadow sweeps the valley.",
            &mut state,
        );
        assert_eq!(
            state.world_events,
            vec!["Reality reshaped: Suddenly, a dragon appears"]
        );
    }

    #[test]
    fn custom_rules_extend_the_table() {
        static OATH_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?i)swear an oath to (\w+)").unwrap());

        fn build_oath(caps: &Captures) -> Option<NarrativeEvent> {
            Some(NarrativeEvent::AllyJoined {
                name: caps.get(1)?.as_str().to_string(),
            })
        }

        let mut extractor = NarrativeExtractor::empty();
        extractor.push_rule(ExtractionRule::new("oath", OATH_RE.clone(), build_oath));

        let mut state = WorldState::default();
        extractor.extract("kneel", "You swear an oath to Mirelle.", &mut state);
        assert_eq!(state.allies, vec!["Mirelle"]);
        assert_eq!(extractor.rule_names(), vec!["oath"]);
    }
}
