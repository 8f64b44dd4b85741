use serde::{Deserialize, Serialize};

/// A fact mined from the player's action or the narrator's reply.
/// This does NOT mutate state directly; see `engine::apply_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NarrativeEvent {
    Consequence {
        action: String,
        summary: String,
    },

    AllyJoined {
        name: String,
    },

    CharacterDefeated {
        name: String,
    },

    ResourceGained {
        resource: String,
        quantity: u32,
    },

    WorldChanged {
        location: String,
        change: String,
    },

    FactionStanding {
        faction: String,
        delta: i32,
    },

    LocationDiscovered {
        location: String,
    },

    RealityBent {
        description: String,
    },
}

impl NarrativeEvent {
    pub fn short_name(&self) -> &'static str {
        match self {
            NarrativeEvent::Consequence { .. } => "Consequence",
            NarrativeEvent::AllyJoined { .. } => "AllyJoined",
            NarrativeEvent::CharacterDefeated { .. } => "CharacterDefeated",
            NarrativeEvent::ResourceGained { .. } => "ResourceGained",
            NarrativeEvent::WorldChanged { .. } => "WorldChanged",
            NarrativeEvent::FactionStanding { .. } => "FactionStanding",
            NarrativeEvent::LocationDiscovered { .. } => "LocationDiscovered",
            NarrativeEvent::RealityBent { .. } => "RealityBent",
        }
    }
}
