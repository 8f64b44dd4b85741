use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::AppConfig;
use crate::engine::apply_event::apply_creation;
use crate::engine::commands::{classify, Directive, PlayerInput, HELP_TEXT};
use crate::engine::fallback::fallback_narrative;
use crate::engine::llm_client::{GenerationClient, GenerationFailure, OllamaBackend, TextBackend};
use crate::engine::narrative_parser::{first_sentence, NarrativeExtractor};
use crate::engine::prompt_builder::{player_line, render_world_state, PromptBuilder};
use crate::engine::sanitizer::{BanList, ResponseSanitizer};
use crate::engine::speech::{AllTalkBackend, SpeechBackend, SpeechOutcome, SpeechRequester};
use crate::model::event_result::NarrativeApplyReport;
use crate::model::genre::resolve_setup;
use crate::model::message::{Message, RoleplaySpeaker};
use crate::model::session::{CharacterProfile, Session, NARRATOR_LABEL};
use crate::model::turn::TurnResponse;
use crate::model::world_state::WorldState;

const INTERNAL_ERROR: &str = "Internal server error";

/// A sanitized narrator reply and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub text: String,
    pub used_fallback: bool,
}

impl Narration {
    fn speaker(&self) -> RoleplaySpeaker {
        if self.used_fallback {
            RoleplaySpeaker::Fallback
        } else {
            RoleplaySpeaker::Narrator
        }
    }
}

/// Runs one player turn at a time against a session it is handed.
/// Holds no session state of its own.
pub struct TurnProcessor<B, S> {
    generator: GenerationClient<B>,
    speech: SpeechRequester<S>,
    sanitizer: ResponseSanitizer,
    extractor: NarrativeExtractor,
    default_voice: String,
    save_path: PathBuf,
}

impl<B: TextBackend, S: SpeechBackend> TurnProcessor<B, S> {
    pub fn new(
        generator: GenerationClient<B>,
        speech: SpeechRequester<S>,
        sanitizer: ResponseSanitizer,
        default_voice: impl Into<String>,
        save_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator,
            speech,
            sanitizer,
            extractor: NarrativeExtractor::default(),
            default_voice: default_voice.into(),
            save_path: save_path.into(),
        }
    }

    pub fn with_extractor(mut self, extractor: NarrativeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn generator(&self) -> &GenerationClient<B> {
        &self.generator
    }

    pub fn speech(&self) -> &SpeechRequester<S> {
        &self.speech
    }

    pub fn installed_models(&self) -> Vec<String> {
        self.generator.installed_models()
    }

    pub fn voices(&self) -> Vec<String> {
        self.speech.voices()
    }

    /// Sets up the character, asks for the opening scene and marks the
    /// adventure as started.
    pub fn start_adventure(
        &self,
        session: &mut Session,
        genre_id: &str,
        role: Option<&str>,
        character_name: &str,
    ) -> TurnResponse {
        guard(session, |s| self.try_start(s, genre_id, role, character_name))
    }

    /// Handles one raw line from the player.
    pub fn process_input(&self, session: &mut Session, raw: &str) -> TurnResponse {
        guard(session, |s| self.try_process(s, raw))
    }

    fn try_start(
        &self,
        session: &mut Session,
        genre_id: &str,
        role: Option<&str>,
        character_name: &str,
    ) -> TurnResponse {
        let Some(setup) = resolve_setup(genre_id, role, character_name, &mut rand::thread_rng())
        else {
            return TurnResponse::error("Invalid genre selection");
        };

        if session.flags.model.trim().is_empty() {
            return TurnResponse::error(GenerationFailure::NoModelSelected.sentinel());
        }

        tracing::info!(genre = %setup.genre, role = %setup.role, "starting adventure");

        session.profile = CharacterProfile {
            name: setup.character_name,
            role: setup.role,
            genre: setup.genre,
        };
        session.world = WorldState::default();
        session.transcript = Default::default();
        session.last_reply.clear();
        session.messages.clear();

        let prompt = PromptBuilder::opening(&session.profile, &session.world);
        let narration = match self.narrate(session, &prompt) {
            Ok(n) => n,
            Err(failure) => return TurnResponse::error(failure.sentinel()),
        };

        session.transcript.reset_to(format!(
            "{}\n\n{} {}",
            PromptBuilder::setting(&session.profile),
            NARRATOR_LABEL,
            narration.text
        ));
        session.last_reply = narration.text.clone();
        session
            .world
            .record_consequence(format!("Start: {}", first_sentence(&narration.text)));
        session.adventure_started = true;

        let audio_url = self.voice_over(session, &narration.text);
        session.messages.push(Message::Roleplay {
            speaker: narration.speaker(),
            text: narration.text.clone(),
            audio_url: audio_url.clone(),
        });

        let mut resp = TurnResponse::success(narration.text);
        resp.world_state = Some(render_world_state(&session.world));
        resp.audio_url = audio_url;
        resp
    }

    fn try_process(&self, session: &mut Session, raw: &str) -> TurnResponse {
        let input = classify(raw);

        if input == PlayerInput::Empty {
            return TurnResponse::error("Empty command");
        }
        if !session.adventure_started {
            return TurnResponse::error("Adventure not started");
        }

        session.messages.push(Message::User(raw.trim().to_string()));

        let resp = match input {
            PlayerInput::Empty => TurnResponse::error("Empty command"),
            // A successful redo replaces the narration in the history itself.
            PlayerInput::Directive(Directive::Redo) => match self.redo(session) {
                resp if resp.is_success() => return resp,
                resp => resp,
            },
            PlayerInput::Directive(directive) => self.run_directive(session, directive),
            PlayerInput::Create(cmd) => {
                let label = apply_creation(&mut session.world, &cmd);
                tracing::info!(creation = %label, "player created entity");
                let mut resp = TurnResponse::success(format!("Created {label}."));
                resp.world_state = Some(render_world_state(&session.world));
                resp
            }
            PlayerInput::UnknownCreation { kind } => TurnResponse::info(format!(
                "Nothing was created: unknown kind '{kind}'. Try npc, location, item or faction."
            )),
            PlayerInput::Action(action) => return self.play_action(session, &action),
        };

        session.messages.push(Message::System(resp.message.clone()));
        resp
    }

    fn play_action(&self, session: &mut Session, action: &str) -> TurnResponse {
        let line = player_line(action);
        let prompt = PromptBuilder::turn(
            &session.profile,
            &session.world,
            session.transcript.as_str(),
            &line,
        );

        let narration = match self.narrate(session, &prompt) {
            Ok(n) => n,
            Err(failure) => {
                session.messages.push(Message::System(failure.sentinel().to_string()));
                return TurnResponse::error(failure.sentinel());
            }
        };

        // Nothing is committed to the session until extraction has succeeded.
        let extracted = self.try_extract(action, &narration.text, &session.world);
        let (narration, report, world) = match extracted {
            Some((report, world)) => (narration, report, world),
            None => {
                let fallback = self.fallback_narration(session);
                let mut world = session.world.clone();
                let report = self.extractor.extract(action, &fallback.text, &mut world);
                (fallback, report, world)
            }
        };

        session.transcript.push_turn(&line, &narration.text);
        session.last_reply = narration.text.clone();
        session.world = world;
        tracing::info!(
            applied = report.applied_count(),
            fallback = narration.used_fallback,
            "turn complete"
        );

        let audio_url = self.voice_over(session, &narration.text);
        session.messages.push(Message::Roleplay {
            speaker: narration.speaker(),
            text: narration.text.clone(),
            audio_url: audio_url.clone(),
        });

        let mut resp = TurnResponse::success(narration.text.clone());
        resp.consequence = Some(first_sentence(&narration.text));
        resp.world_state = Some(render_world_state(&session.world));
        resp.audio_url = audio_url;
        resp
    }

    fn run_directive(&self, session: &mut Session, directive: Directive) -> TurnResponse {
        tracing::info!(?directive, "control directive");

        match directive {
            Directive::ToggleCensorship => {
                session.flags.censored = !session.flags.censored;
                let mode = if session.flags.censored {
                    "ON (SFW)"
                } else {
                    "OFF (NSFW)"
                };
                TurnResponse::info(format!("Content filtering {mode}."))
            }

            Directive::ShowConsequences => {
                let consequences = session.world.consequences();
                if consequences.is_empty() {
                    TurnResponse::info("No consequences recorded yet.")
                } else {
                    TurnResponse::info(
                        consequences
                            .iter()
                            .enumerate()
                            .map(|(i, c)| format!("{}. {}", i + 1, c))
                            .collect::<Vec<_>>()
                            .join("\n"),
                    )
                }
            }

            Directive::Redo => self.redo(session),

            Directive::Save => match save_adventure(session, &self.save_path) {
                Ok(()) => TurnResponse::success(format!(
                    "Adventure saved to {}",
                    self.save_path.display()
                )),
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "error saving adventure");
                    TurnResponse::error("Error saving adventure")
                }
            },

            Directive::Debug => TurnResponse::info(self.debug_report(session)),

            Directive::Help => TurnResponse::info(HELP_TEXT),

            Directive::Unknown(cmd) => TurnResponse::info(format!(
                "Unknown command '{cmd}'. Type /help for a list of commands."
            )),
        }
    }

    fn redo(&self, session: &mut Session) -> TurnResponse {
        if session.last_reply.is_empty() || !session.transcript.pop_last_reply() {
            return TurnResponse::error("Nothing to redo");
        }

        let prompt = PromptBuilder::redo(
            &session.profile,
            &session.world,
            session.transcript.as_str(),
        );
        let narration = match self.narrate(session, &prompt) {
            Ok(n) => n,
            Err(failure) => {
                // Keep the transcript whole so a later redo still has a reply to replace.
                session.transcript.push_reply(&session.last_reply);
                return TurnResponse::error(failure.sentinel());
            }
        };

        session.transcript.push_reply(&narration.text);
        session.last_reply = narration.text.clone();

        if let Some(pos) = session
            .messages
            .iter()
            .rposition(|m| matches!(m, Message::Roleplay { .. }))
        {
            session.messages.remove(pos);
        }

        let audio_url = self.voice_over(session, &narration.text);
        session.messages.push(Message::Roleplay {
            speaker: narration.speaker(),
            text: narration.text.clone(),
            audio_url: audio_url.clone(),
        });

        let mut resp = TurnResponse::success(narration.text);
        resp.audio_url = audio_url;
        resp
    }

    /// Generates and sanitizes a reply, falling back to local narration when
    /// the backend fails for any reason other than a missing model.
    pub fn narrate(&self, session: &Session, prompt: &str) -> Result<Narration, GenerationFailure> {
        let censored = session.flags.censored;

        match self.generator.generate(prompt, &session.flags.model, censored) {
            Ok(text) => Ok(Narration {
                text: self.sanitizer.sanitize(&text, censored),
                used_fallback: false,
            }),
            Err(failure) if failure.allows_fallback() => {
                tracing::warn!(%failure, "using fallback narration");
                Ok(self.fallback_narration(session))
            }
            Err(failure) => Err(failure),
        }
    }

    fn fallback_narration(&self, session: &Session) -> Narration {
        let profile = &session.profile;
        let text = fallback_narrative(&profile.genre, &profile.role, &profile.name);
        Narration {
            text: self.sanitizer.sanitize(&text, session.flags.censored),
            used_fallback: true,
        }
    }

    /// Runs extraction against a copy of the world. `None` if a rule panicked.
    fn try_extract(
        &self,
        action: &str,
        reply: &str,
        world: &WorldState,
    ) -> Option<(NarrativeApplyReport, WorldState)> {
        let mut candidate = world.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract(action, reply, &mut candidate)
        }));

        match outcome {
            Ok(report) => Some((report, candidate)),
            Err(_) => {
                tracing::error!("narrative extraction failed, discarding reply");
                None
            }
        }
    }

    /// Narration audio for a reply. A connection failure turns audio off
    /// for the rest of the session.
    fn voice_over(&self, session: &mut Session, text: &str) -> Option<String> {
        if !session.flags.audio_enabled {
            return None;
        }

        let voice = if session.flags.voice.is_empty() {
            self.default_voice.as_str()
        } else {
            session.flags.voice.as_str()
        };

        let outcome = self.speech.speak(text, voice);
        if outcome == SpeechOutcome::Unreachable {
            tracing::info!("disabling narration audio for this session");
            session.flags.audio_enabled = false;
        }
        outcome.audio_url()
    }

    pub fn debug_report(&self, session: &Session) -> String {
        let backend = match self.generator.backend().health() {
            Ok(models) => format!("healthy ({} models: {})", models.len(), models.join(", ")),
            Err(e) => format!("unreachable ({e})"),
        };
        let world = &session.world;

        [
            format!(
                "Model: {}",
                if session.flags.model.is_empty() {
                    "none"
                } else {
                    session.flags.model.as_str()
                }
            ),
            format!("Text backend: {backend}"),
            format!("Content filtering: {}", on_off(session.flags.censored)),
            format!("Narration audio: {}", on_off(session.flags.audio_enabled)),
            format!(
                "Character: {} the {} ({})",
                session.profile.name, session.profile.role, session.profile.genre
            ),
            format!(
                "World: {} allies, {} enemies, {} discoveries, {} resources, {} factions, {} events",
                world.allies.len(),
                world.enemies.len(),
                world.discoveries.len(),
                world.resources.len(),
                world.factions.len(),
                world.world_events.len()
            ),
            format!("Transcript: {} chars", session.transcript.as_str().len()),
        ]
        .join("\n")
    }
}

impl TurnProcessor<OllamaBackend, AllTalkBackend> {
    /// Wires the real HTTP backends from configuration.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let text = OllamaBackend::new(&cfg.ollama_url, cfg.generation_timeout, cfg.health_timeout)
            .context("building text backend client")?;
        let speech = AllTalkBackend::new(&cfg.alltalk_url, cfg.speech_timeout)
            .context("building speech backend client")?;
        let banned = BanList::load(&cfg.banwords_path)?;

        Ok(Self::new(
            GenerationClient::new(text, cfg.retry),
            SpeechRequester::new(speech, &cfg.alltalk_audio_url),
            ResponseSanitizer::new(banned),
            &cfg.default_voice,
            &cfg.save_path,
        ))
    }
}

/// Writes the transcript followed by the current world state.
pub fn save_adventure(session: &Session, path: &Path) -> anyhow::Result<()> {
    let contents = format!(
        "{}\n\n### Persistent World State ###\n{}",
        session.transcript.as_str(),
        render_world_state(&session.world)
    );
    fs::write(path, contents).with_context(|| format!("writing adventure to {}", path.display()))?;
    tracing::info!(path = %path.display(), "adventure saved");
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Keeps a local fault inside one turn from taking down the caller. On a
/// fault the session is rolled back to how it was before the turn.
fn guard(
    session: &mut Session,
    f: impl FnOnce(&mut Session) -> TurnResponse,
) -> TurnResponse {
    let before = session.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| f(session))) {
        Ok(resp) => resp,
        Err(_) => {
            tracing::error!("turn processing panicked, session rolled back");
            *session = before;
            TurnResponse::error(INTERNAL_ERROR)
        }
    }
}
