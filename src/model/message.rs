use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleplaySpeaker {
    Narrator,
    /// Narration produced locally because the backend could not answer.
    Fallback,
}

/// One entry of the on-screen chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    User(String),
    Roleplay {
        speaker: RoleplaySpeaker,
        text: String,
        audio_url: Option<String>,
    },
    System(String),
}
