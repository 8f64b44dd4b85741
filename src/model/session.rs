use serde::{Deserialize, Serialize};

use crate::model::genre::DEFAULT_CHARACTER_NAME;
use crate::model::message::Message;
use crate::model::world_state::WorldState;

/// Speaker label used for every narrator turn in the transcript.
pub const NARRATOR_LABEL: &str = "Dungeon Master:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    pub role: String,
    pub genre: String,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHARACTER_NAME.to_string(),
            role: String::new(),
            genre: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFlags {
    pub censored: bool,
    pub model: String,
    pub voice: String,
    pub audio_enabled: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            censored: false,
            model: String::new(),
            voice: String::new(),
            audio_enabled: true,
        }
    }
}

/// Append-only log of player and narrator turns, sent verbatim as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replaces the whole transcript; used once when the adventure opens.
    pub fn reset_to(&mut self, text: String) {
        self.text = text;
    }

    pub fn push_turn(&mut self, player_line: &str, reply: &str) {
        self.text.push('\n');
        self.text.push_str(player_line);
        self.text.push('\n');
        self.text.push_str(NARRATOR_LABEL);
        self.text.push(' ');
        self.text.push_str(reply);
    }

    pub fn push_reply(&mut self, reply: &str) {
        self.text.push('\n');
        self.text.push_str(NARRATOR_LABEL);
        self.text.push(' ');
        self.text.push_str(reply);
    }

    /// Drops the most recent narrator reply. Returns false if there is none.
    pub fn pop_last_reply(&mut self) -> bool {
        match self.text.rfind(NARRATOR_LABEL) {
            Some(pos) => {
                self.text.truncate(pos);
                let trimmed = self.text.trim_end().len();
                self.text.truncate(trimmed);
                true
            }
            None => false,
        }
    }
}

/// Everything one player owns: profile, world, transcript and flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub profile: CharacterProfile,
    pub world: WorldState,
    pub transcript: Transcript,
    pub last_reply: String,
    pub adventure_started: bool,
    pub flags: SessionFlags,

    /// What the frontend renders; not sent to the backend.
    pub messages: Vec<Message>,
}

impl Session {
    /// Starts over while keeping the chosen model, voice and audio setting.
    pub fn reset(&mut self) {
        let model = std::mem::take(&mut self.flags.model);
        let voice = std::mem::take(&mut self.flags.voice);
        let audio_enabled = self.flags.audio_enabled;
        *self = Session::default();
        self.flags.model = model;
        self.flags.voice = voice;
        self.flags.audio_enabled = audio_enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_last_reply_strips_only_latest_narrator_turn() {
        let mut t = Transcript::default();
        t.reset_to("Intro\n\nDungeon Master: You wake.".into());
        t.push_turn("Player: look", "A cave.");

        assert!(t.pop_last_reply());
        assert_eq!(t.as_str(), "Intro\n\nDungeon Master: You wake.\nPlayer: look");
    }

    #[test]
    fn pop_last_reply_without_narrator() {
        let mut t = Transcript::default();
        t.reset_to("Player: hello".into());
        assert!(!t.pop_last_reply());
        assert_eq!(t.as_str(), "Player: hello");
    }

    #[test]
    fn reset_keeps_model_voice_and_audio_choice() {
        let mut session = Session::default();
        session.flags.model = "mistral".into();
        session.flags.voice = "narrator.wav".into();
        session.flags.audio_enabled = false;
        session.flags.censored = true;
        session.world.add_ally("Garrick");
        session.adventure_started = true;

        session.reset();

        assert_eq!(session.flags.model, "mistral");
        assert_eq!(session.flags.voice, "narrator.wav");
        assert!(!session.flags.audio_enabled);
        assert!(!session.flags.censored);
        assert!(session.world.allies.is_empty());
        assert!(!session.adventure_started);
    }
}
