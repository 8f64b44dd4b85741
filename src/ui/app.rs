use eframe::egui;
use egui::Layout;
use std::sync::mpsc;
use std::time::Duration;

use rpg_adventure::engine::engine::Engine;
use rpg_adventure::engine::llm_client::OllamaBackend;
use rpg_adventure::engine::protocol::{EngineCommand, EngineResponse};
use rpg_adventure::engine::speech::AllTalkBackend;
use rpg_adventure::engine::turn::TurnProcessor;
use rpg_adventure::model::genre::GENRES;
use rpg_adventure::model::message::{Message, RoleplaySpeaker};
use rpg_adventure::model::session::{CharacterProfile, Session, SessionFlags};
use rpg_adventure::model::turn::{TurnResponse, TurnStatus};
use rpg_adventure::model::world_state::WorldState;

use super::center_panel::draw_center_panel;
use super::left_panel::draw_left_panel;
use super::right_panel::draw_right_panel;
use super::settings::UiSettings;
use super::settings_io::{load_settings, save_settings};

/* =========================
   Tabs
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RightTab {
    #[default]
    World,
    /// The state block exactly as the narrator sees it.
    Prompt,
}

/* =========================
   UI State
   ========================= */

pub struct UiState {
    pub input_text: String,
    pub rendered_messages: Vec<Message>,

    pub world: WorldState,
    pub rendered_world: String,
    pub profile: CharacterProfile,
    pub adventure_started: bool,
    pub flags: SessionFlags,

    pub models: Vec<String>,
    pub voices: Vec<String>,

    pub setup_genre: String,
    pub setup_role: String,
    pub setup_name: String,

    /// Latest non-narrative outcome (errors, directive output).
    pub status: Option<TurnResponse>,
    /// Commands sent and not yet answered.
    pub pending: usize,

    pub should_auto_scroll: bool,
    pub right_tab: RightTab,
    pub settings: UiSettings,
}

impl UiState {
    fn new(settings: UiSettings, flags: SessionFlags) -> Self {
        Self {
            input_text: String::new(),
            rendered_messages: Vec::new(),
            world: WorldState::default(),
            rendered_world: String::new(),
            profile: CharacterProfile::default(),
            adventure_started: false,
            flags,
            models: Vec::new(),
            voices: Vec::new(),
            setup_genre: GENRES[0].id.to_string(),
            setup_role: String::new(),
            setup_name: String::new(),
            status: None,
            pending: 0,
            should_auto_scroll: false,
            right_tab: RightTab::default(),
            settings,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}

/* =========================
   App
   ========================= */

pub struct MyApp {
    pub ui: UiState,

    cmd_tx: mpsc::Sender<EngineCommand>,
    resp_rx: mpsc::Receiver<EngineResponse>,
}

impl MyApp {
    pub fn new(processor: TurnProcessor<OllamaBackend, AllTalkBackend>) -> Self {
        let settings = load_settings();

        let mut session = Session::default();
        if let Some(model) = &settings.preferred_model {
            session.flags.model = model.clone();
        }
        if let Some(voice) = &settings.preferred_voice {
            session.flags.voice = voice.clone();
        }
        session.flags.audio_enabled = settings.audio_enabled;
        let flags = session.flags.clone();

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut engine = Engine::new(cmd_rx, resp_tx, processor, session);
            engine.run();
        });

        let mut app = Self {
            ui: UiState::new(settings, flags),
            cmd_tx,
            resp_rx,
        };
        app.send_command(EngineCommand::RefreshCatalog);
        app
    }

    pub fn send_command(&mut self, cmd: EngineCommand) {
        // Only commands that produce a turn response count as pending.
        let answers_with_turn = matches!(
            cmd,
            EngineCommand::StartAdventure { .. }
                | EngineCommand::SubmitPlayerInput(_)
                | EngineCommand::ExportAdventure(_)
        );

        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("engine thread is gone");
            self.ui.status = Some(TurnResponse::error("The engine stopped responding."));
            return;
        }
        if answers_with_turn {
            self.ui.pending += 1;
        }
    }

    /// Remembers model, voice and audio choices across launches.
    pub fn persist_preferences(&mut self) {
        let s = &mut self.ui.settings;
        s.preferred_model = Some(self.ui.flags.model.clone()).filter(|m| !m.is_empty());
        s.preferred_voice = Some(self.ui.flags.voice.clone()).filter(|v| !v.is_empty());
        s.audio_enabled = self.ui.flags.audio_enabled;
        save_settings(s);
    }

    fn drain_responses(&mut self) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            match resp {
                EngineResponse::Turn(turn) => {
                    self.ui.pending = self.ui.pending.saturating_sub(1);
                    // Narration already lands in the history; keep the rest visible.
                    self.ui.status = match turn.status {
                        TurnStatus::Success if turn.consequence.is_some() => None,
                        _ => Some(turn),
                    };
                }
                EngineResponse::FullMessageHistory(msgs) => {
                    self.ui.rendered_messages = msgs;
                    self.ui.should_auto_scroll = true;
                }
                EngineResponse::Snapshot {
                    world,
                    rendered,
                    profile,
                    adventure_started,
                } => {
                    self.ui.world = world;
                    self.ui.rendered_world = rendered;
                    self.ui.profile = profile;
                    self.ui.adventure_started = adventure_started;
                }
                EngineResponse::Flags(flags) => {
                    if flags == self.ui.flags {
                        continue;
                    }
                    if self.ui.flags.audio_enabled && !flags.audio_enabled {
                        tracing::info!("narration audio switched off");
                    }
                    self.ui.flags = flags;
                    self.persist_preferences();
                }
                EngineResponse::Catalog { models, voices } => {
                    self.ui.models = models;
                    self.ui.voices = voices;
                    self.adopt_catalog_defaults();
                }
            }
        }
    }

    /// Picks the first installed model/voice when nothing valid is selected.
    fn adopt_catalog_defaults(&mut self) {
        if !self.ui.models.contains(&self.ui.flags.model) {
            if let Some(first) = self.ui.models.first().cloned() {
                self.send_command(EngineCommand::SelectModel(first));
            }
        }
        if !self.ui.voices.is_empty() && !self.ui.voices.contains(&self.ui.flags.voice) {
            let first = self.ui.voices[0].clone();
            self.send_command(EngineCommand::SelectVoice(first));
        }
    }

    pub fn draw_message(&self, ui: &mut egui::Ui, msg: &Message) {
        let settings = &self.ui.settings;

        ui.add_space(6.0);

        match msg {
            Message::User(t) => {
                ui.with_layout(Layout::right_to_left(egui::Align::TOP), |ui| {
                    bubble(ui, settings.color("User"), &format!("You: {t}"), None);
                });
            }
            Message::Roleplay {
                speaker,
                text,
                audio_url,
            } => {
                let key = match speaker {
                    RoleplaySpeaker::Narrator => "Narrator",
                    RoleplaySpeaker::Fallback => "Fallback",
                };
                bubble(ui, settings.color(key), text, audio_url.as_deref());
            }
            Message::System(t) => bubble(ui, settings.color("System"), t, None),
        }
    }
}

/* =========================
   egui App
   ========================= */

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        ctx.set_pixels_per_point(self.ui.settings.ui_scale);

        self.drain_responses();

        draw_left_panel(ctx, self);
        draw_right_panel(ctx, &mut self.ui);
        draw_center_panel(ctx, self);

        self.ui.should_auto_scroll = false;

        // Engine replies arrive off-thread; poll faster while a turn is in flight.
        let poll = if self.ui.is_busy() { 100 } else { 500 };
        ctx.request_repaint_after(Duration::from_millis(poll));
    }
}

/* =========================
   UI Helpers
   ========================= */

fn bubble(ui: &mut egui::Ui, color: egui::Color32, text: &str, audio_url: Option<&str>) {
    egui::Frame::new()
        .fill(color)
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(10, 6))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).color(egui::Color32::WHITE));
            if let Some(url) = audio_url {
                ui.hyperlink_to("▶ Listen", url);
            }
        });
}

pub fn status_color(status: TurnStatus) -> egui::Color32 {
    match status {
        TurnStatus::Success => egui::Color32::LIGHT_GREEN,
        TurnStatus::Error => egui::Color32::LIGHT_RED,
        TurnStatus::Info => egui::Color32::LIGHT_BLUE,
    }
}
