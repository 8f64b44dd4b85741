use crate::engine::commands::{CreateCommand, CreationKind};
use crate::model::event_result::EventApplyOutcome;
use crate::model::narrative_event::NarrativeEvent;
use crate::model::world_state::WorldState;

/// Apply a NarrativeEvent to the WorldState, returning the outcome
pub fn apply_event(state: &mut WorldState, event: NarrativeEvent) -> EventApplyOutcome {
    match event {
        NarrativeEvent::Consequence { action, summary } => {
            state.record_consequence(format!("After '{action}': {summary}"));
            EventApplyOutcome::Applied
        }

        NarrativeEvent::AllyJoined { name } => changed(state.add_ally(&name)),

        NarrativeEvent::CharacterDefeated { name } => changed(state.retire(&name)),

        NarrativeEvent::ResourceGained { resource, quantity } => {
            state.add_resource(&resource, quantity);
            EventApplyOutcome::Applied
        }

        NarrativeEvent::WorldChanged { location, change } => {
            state.world_events.push(format!("{location} {change}"));
            EventApplyOutcome::Applied
        }

        NarrativeEvent::FactionStanding { faction, delta } => {
            state.adjust_faction(&faction, delta);
            EventApplyOutcome::Applied
        }

        NarrativeEvent::LocationDiscovered { location } => changed(state.add_discovery(&location)),

        NarrativeEvent::RealityBent { description } => {
            state.world_events.push(format!("Reality reshaped: {description}"));
            EventApplyOutcome::Applied
        }
    }
}

/// Writes a player-authored entity straight into the world, bypassing the
/// narrator. Returns the creation label, e.g. "Ancient Sword (Item)".
pub fn apply_creation(state: &mut WorldState, create: &CreateCommand) -> String {
    let name = create.name.as_str();

    match create.kind {
        CreationKind::Character => {
            state.add_ally(name);
        }
        CreationKind::Location => {
            state.add_discovery(name);
        }
        CreationKind::Item => {
            state.add_resource(name, 1);
        }
        CreationKind::Faction => {
            state.adjust_faction(name, 0);
        }
    }

    let label = format!("{} ({})", name, create.label);
    state.record_creation(label.clone());
    label
}

fn changed(did_change: bool) -> EventApplyOutcome {
    if did_change {
        EventApplyOutcome::Applied
    } else {
        EventApplyOutcome::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::commands::parse_create;

    #[test]
    fn create_item_adds_one_of_it() {
        let mut state = WorldState::default();
        let cmd = parse_create("create item Ancient Sword").unwrap();

        assert_eq!(apply_creation(&mut state, &cmd), "Ancient Sword (Item)");
        assert_eq!(state.resources.get("Ancient Sword"), Some(&1));
        assert_eq!(
            state.player_creations().last().map(String::as_str),
            Some("Ancient Sword (Item)")
        );
    }

    #[test]
    fn creations_route_by_kind() {
        let mut state = WorldState::default();
        for input in [
            "create npc Old Tom",
            "create place Misty Hollow",
            "create group Ash Circle",
        ] {
            let cmd = parse_create(input).unwrap();
            apply_creation(&mut state, &cmd);
        }

        assert_eq!(state.allies, vec!["Old Tom"]);
        assert_eq!(state.discoveries, vec!["Misty Hollow"]);
        assert_eq!(state.factions.get("Ash Circle"), Some(&0));
        assert_eq!(
            state.player_creations(),
            &["Old Tom (NPC)", "Misty Hollow (Place)", "Ash Circle (Group)"]
        );
    }

    #[test]
    fn known_ally_is_unchanged() {
        let mut state = WorldState::default();
        let join = NarrativeEvent::AllyJoined {
            name: "Garrick".into(),
        };
        assert_eq!(apply_event(&mut state, join.clone()), EventApplyOutcome::Applied);
        assert_eq!(apply_event(&mut state, join), EventApplyOutcome::Unchanged);
    }
}
