use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many consequences are kept before the oldest is evicted.
pub const MAX_CONSEQUENCES: usize = 5;

/// How many player creations are kept before the oldest is evicted.
pub const MAX_PLAYER_CREATIONS: usize = 5;

/// The mutable world model of one adventure.
///
/// Folded into every prompt and updated from every reply. Only the
/// narrative engine mutates it; everything else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub allies: Vec<String>,
    pub enemies: Vec<String>,
    pub discoveries: Vec<String>,

    /// Reserved: no extraction rule touches it yet.
    pub reputation: i32,

    /// Key = resource name. Quantities only ever grow.
    pub resources: BTreeMap<String, u32>,

    /// Key = faction name, value = signed standing.
    pub factions: BTreeMap<String, i32>,

    pub completed_quests: Vec<String>,
    pub active_quests: Vec<String>,

    pub world_events: Vec<String>,
    consequences: Vec<String>,
    player_creations: Vec<String>,
}

impl WorldState {
    pub fn consequences(&self) -> &[String] {
        &self.consequences
    }

    pub fn player_creations(&self) -> &[String] {
        &self.player_creations
    }

    pub fn record_consequence(&mut self, consequence: impl Into<String>) {
        push_bounded(&mut self.consequences, consequence.into(), MAX_CONSEQUENCES);
    }

    pub fn record_creation(&mut self, creation: impl Into<String>) {
        push_bounded(
            &mut self.player_creations,
            creation.into(),
            MAX_PLAYER_CREATIONS,
        );
    }

    /// Returns false if the name was already an ally.
    pub fn add_ally(&mut self, name: &str) -> bool {
        push_unique(&mut self.allies, name)
    }

    pub fn add_discovery(&mut self, place: &str) -> bool {
        push_unique(&mut self.discoveries, place)
    }

    /// Retires a defeated character from both the ally and enemy lists.
    pub fn retire(&mut self, name: &str) -> bool {
        let before = self.allies.len() + self.enemies.len();
        self.allies.retain(|a| a != name);
        self.enemies.retain(|e| e != name);
        before != self.allies.len() + self.enemies.len()
    }

    pub fn add_resource(&mut self, name: &str, quantity: u32) -> u32 {
        let entry = self.resources.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(quantity);
        *entry
    }

    pub fn adjust_faction(&mut self, name: &str, delta: i32) -> i32 {
        let entry = self.factions.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(delta);
        *entry
    }
}

fn push_bounded(list: &mut Vec<String>, item: String, cap: usize) {
    list.push(item);
    if list.len() > cap {
        let overflow = list.len() - cap;
        list.drain(..overflow);
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) -> bool {
    if list.iter().any(|existing| existing == item) {
        return false;
    }
    list.push(item.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consequences_evict_oldest_first() {
        let mut state = WorldState::default();
        for i in 0..8 {
            state.record_consequence(format!("c{i}"));
            assert!(state.consequences().len() <= MAX_CONSEQUENCES);
        }
        assert_eq!(state.consequences(), &["c3", "c4", "c5", "c6", "c7"]);
    }

    #[test]
    fn creations_are_capped() {
        let mut state = WorldState::default();
        for i in 0..12 {
            state.record_creation(format!("thing {i} (Item)"));
        }
        assert_eq!(state.player_creations().len(), MAX_PLAYER_CREATIONS);
        assert_eq!(state.player_creations()[0], "thing 7 (Item)");
        assert_eq!(state.player_creations()[4], "thing 11 (Item)");
    }

    #[test]
    fn allies_do_not_duplicate() {
        let mut state = WorldState::default();
        assert!(state.add_ally("Garrick"));
        assert!(!state.add_ally("Garrick"));
        assert_eq!(state.allies, vec!["Garrick"]);
    }

    #[test]
    fn retire_removes_from_both_lists() {
        let mut state = WorldState::default();
        state.allies.push("Mira".into());
        state.enemies.push("Mira".into());
        state.enemies.push("Vosk".into());

        assert!(state.retire("Mira"));
        assert!(state.allies.is_empty());
        assert_eq!(state.enemies, vec!["Vosk"]);
        assert!(!state.retire("Nobody"));
    }

    #[test]
    fn resources_accumulate() {
        let mut state = WorldState::default();
        assert_eq!(state.add_resource("gold", 3), 3);
        assert_eq!(state.add_resource("gold", 2), 5);
        assert_eq!(state.resources.get("gold"), Some(&5));
    }
}
