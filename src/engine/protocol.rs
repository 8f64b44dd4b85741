use std::path::PathBuf;

use crate::model::message::Message;
use crate::model::session::{CharacterProfile, SessionFlags};
use crate::model::turn::TurnResponse;
use crate::model::world_state::WorldState;

pub enum EngineCommand {
    StartAdventure {
        genre_id: String,
        role: Option<String>,
        character_name: String,
    },
    SubmitPlayerInput(String),
    SelectModel(String),
    SelectVoice(String),
    SetAudioEnabled(bool),
    SetCensored(bool),
    RefreshCatalog,
    ExportAdventure(PathBuf),
    ResetSession,
}

pub enum EngineResponse {
    Turn(TurnResponse),

    FullMessageHistory(Vec<Message>),

    Snapshot {
        world: WorldState,
        rendered: String,
        profile: CharacterProfile,
        adventure_started: bool,
    },

    Flags(SessionFlags),

    Catalog {
        models: Vec<String>,
        voices: Vec<String>,
    },
}
