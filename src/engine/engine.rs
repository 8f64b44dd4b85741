use std::sync::mpsc::{Receiver, Sender};

use crate::engine::llm_client::TextBackend;
use crate::engine::prompt_builder::render_world_state;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::engine::speech::SpeechBackend;
use crate::engine::turn::{save_adventure, TurnProcessor};
use crate::model::session::Session;
use crate::model::turn::TurnResponse;

/// Owns the session and processes commands one at a time on its own thread,
/// so turns for the session are never interleaved.
pub struct Engine<B, S> {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    processor: TurnProcessor<B, S>,
    session: Session,
}

impl<B: TextBackend, S: SpeechBackend> Engine<B, S> {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        processor: TurnProcessor<B, S>,
        session: Session,
    ) -> Self {
        Self {
            rx,
            tx,
            processor,
            session,
        }
    }

    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            let keep_going = self.handle(cmd);
            if !keep_going {
                break;
            }
        }
        tracing::info!("engine stopped");
    }

    /// Returns false once the frontend has gone away.
    fn handle(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::StartAdventure {
                genre_id,
                role,
                character_name,
            } => {
                let resp = self.processor.start_adventure(
                    &mut self.session,
                    &genre_id,
                    role.as_deref(),
                    &character_name,
                );
                self.send_turn(resp)
            }

            EngineCommand::SubmitPlayerInput(text) => {
                let resp = self.processor.process_input(&mut self.session, &text);
                self.send_turn(resp)
            }

            EngineCommand::SelectModel(model) => {
                tracing::info!(%model, "model selected");
                self.session.flags.model = model;
                self.send_flags()
            }

            EngineCommand::SelectVoice(voice) => {
                self.session.flags.voice = voice;
                self.send_flags()
            }

            EngineCommand::SetAudioEnabled(enabled) => {
                self.session.flags.audio_enabled = enabled;
                self.send_flags()
            }

            EngineCommand::SetCensored(censored) => {
                self.session.flags.censored = censored;
                self.send_flags()
            }

            EngineCommand::RefreshCatalog => {
                let models = self.processor.installed_models();
                let voices = self.processor.voices();
                self.send(EngineResponse::Catalog { models, voices })
            }

            EngineCommand::ExportAdventure(path) => {
                let resp = match save_adventure(&self.session, &path) {
                    Ok(()) => TurnResponse::success(format!("Adventure saved to {}", path.display())),
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), "export failed");
                        TurnResponse::error("Error saving adventure")
                    }
                };
                self.send(EngineResponse::Turn(resp))
            }

            EngineCommand::ResetSession => {
                self.session.reset();
                self.send(EngineResponse::FullMessageHistory(Vec::new()))
                    && self.send_snapshot()
                    && self.send_flags()
            }
        }
    }

    fn send_turn(&self, resp: TurnResponse) -> bool {
        self.send(EngineResponse::Turn(resp))
            && self.send(EngineResponse::FullMessageHistory(
                self.session.messages.clone(),
            ))
            && self.send_snapshot()
            && self.send_flags()
    }

    fn send_snapshot(&self) -> bool {
        self.send(EngineResponse::Snapshot {
            world: self.session.world.clone(),
            rendered: render_world_state(&self.session.world),
            profile: self.session.profile.clone(),
            adventure_started: self.session.adventure_started,
        })
    }

    fn send_flags(&self) -> bool {
        self.send(EngineResponse::Flags(self.session.flags.clone()))
    }

    fn send(&self, resp: EngineResponse) -> bool {
        self.tx.send(resp).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::llm_client::{
        BackendError, GenerateRequest, GenerateResponse, GenerationClient, RetryPolicy,
    };
    use crate::engine::sanitizer::ResponseSanitizer;
    use crate::engine::speech::{SpeechRequest, SpeechRequester};
    use std::sync::mpsc;
    use std::thread;

    struct EchoBackend;

    impl TextBackend for EchoBackend {
        fn health(&self) -> Result<Vec<String>, BackendError> {
            Ok(vec!["mistral".into()])
        }

        fn generate(&self, _: &GenerateRequest) -> Result<GenerateResponse, BackendError> {
            Ok(GenerateResponse {
                response: "Garrick joins you at the gate".into(),
            })
        }
    }

    struct MuteSpeech;

    impl SpeechBackend for MuteSpeech {
        fn voices(&self) -> Result<Vec<String>, BackendError> {
            Ok(vec!["narrator.wav".into()])
        }

        fn synthesize(&self, _: &SpeechRequest) -> Result<(), BackendError> {
            Err(BackendError::Connection("refused".into()))
        }
    }

    #[test]
    fn engine_thread_serves_a_full_turn() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let processor = TurnProcessor::new(
            GenerationClient::new(EchoBackend, RetryPolicy::no_delay(1)),
            SpeechRequester::new(MuteSpeech, "http://tts/audio"),
            ResponseSanitizer::default(),
            "narrator.wav",
            "adventure.txt",
        );

        let handle = thread::spawn(move || {
            Engine::new(cmd_rx, resp_tx, processor, Session::default()).run();
        });

        cmd_tx.send(EngineCommand::SelectModel("mistral".into())).unwrap();
        cmd_tx
            .send(EngineCommand::StartAdventure {
                genre_id: "1".into(),
                role: Some("Knight".into()),
                character_name: "Wren".into(),
            })
            .unwrap();
        cmd_tx
            .send(EngineCommand::SubmitPlayerInput("wave".into()))
            .unwrap();
        cmd_tx.send(EngineCommand::RefreshCatalog).unwrap();
        drop(cmd_tx);
        handle.join().unwrap();

        let responses: Vec<EngineResponse> = resp_rx.try_iter().collect();

        let turns: Vec<&TurnResponse> = responses
            .iter()
            .filter_map(|r| match r {
                EngineResponse::Turn(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(turns.len(), 2);
        assert!(turns.iter().all(|t| t.is_success()));
        assert_eq!(turns[1].message, "Garrick joins you at the gate.");

        let last_snapshot = responses.iter().rev().find_map(|r| match r {
            EngineResponse::Snapshot { world, .. } => Some(world),
            _ => None,
        });
        assert_eq!(last_snapshot.unwrap().allies, vec!["Garrick"]);

        let last_flags = responses.iter().rev().find_map(|r| match r {
            EngineResponse::Flags(f) => Some(f),
            _ => None,
        });
        assert!(!last_flags.unwrap().audio_enabled);

        assert!(responses.iter().any(|r| matches!(
            r,
            EngineResponse::Catalog { models, voices }
                if models == &vec!["mistral".to_string()] && voices.len() == 1
        )));
    }
}
