use eframe::egui;

use rpg_adventure::engine::protocol::EngineCommand;
use rpg_adventure::model::genre::{find_genre, roles_for, GENRES};

use super::app::{MyApp, UiState};
use super::settings_io::save_settings;

pub fn draw_left_panel(ctx: &egui::Context, app: &mut MyApp) {
    let mut commands: Vec<EngineCommand> = Vec::new();

    egui::SidePanel::left("left")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                draw_setup(ui, &mut app.ui, &mut commands);
                ui.separator();
                draw_backends(ui, &app.ui, &mut commands);
                ui.separator();
                draw_session(ui, &app.ui, &mut commands);
                ui.separator();
                draw_display(ui, &mut app.ui);
            });
        });

    for cmd in commands {
        app.send_command(cmd);
    }
}

/* =========================
   New adventure
   ========================= */

fn draw_setup(ui: &mut egui::Ui, state: &mut UiState, commands: &mut Vec<EngineCommand>) {
    ui.heading("Adventure");

    let before = state.setup_genre.clone();
    let genre_name = find_genre(&state.setup_genre)
        .map(|g| g.name)
        .unwrap_or("Choose…");

    ui.label("Genre");
    egui::ComboBox::from_id_salt("genre_select")
        .selected_text(genre_name)
        .show_ui(ui, |ui| {
            for g in GENRES {
                ui.selectable_value(&mut state.setup_genre, g.id.to_string(), g.name);
            }
        });

    if state.setup_genre != before {
        state.setup_role.clear();
    }

    let roles = roles_for(&state.setup_genre);
    if !roles.is_empty() {
        let shown = if state.setup_role.is_empty() {
            "Any"
        } else {
            state.setup_role.as_str()
        };

        ui.label("Role");
        egui::ComboBox::from_id_salt("role_select")
            .selected_text(shown.to_string())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut state.setup_role, String::new(), "Any");
                for role in roles {
                    ui.selectable_value(&mut state.setup_role, role.to_string(), *role);
                }
            });
    }

    ui.label("Name");
    ui.add(egui::TextEdit::singleline(&mut state.setup_name).hint_text("Alex"));

    let can_start = !state.is_busy() && !state.flags.model.is_empty();
    let label = if state.adventure_started {
        "Restart adventure"
    } else {
        "Start adventure"
    };

    if ui.add_enabled(can_start, egui::Button::new(label)).clicked() {
        commands.push(EngineCommand::StartAdventure {
            genre_id: state.setup_genre.clone(),
            role: Some(state.setup_role.clone()).filter(|r| !r.is_empty()),
            character_name: state.setup_name.trim().to_string(),
        });
    }

    if state.flags.model.is_empty() {
        ui.small("Select a model to begin.");
    }
}

/* =========================
   Model & voice
   ========================= */

fn draw_backends(ui: &mut egui::Ui, state: &UiState, commands: &mut Vec<EngineCommand>) {
    ui.heading("Narrator");

    ui.label("Model");
    let mut model = state.flags.model.clone();
    egui::ComboBox::from_id_salt("model_select")
        .selected_text(if model.is_empty() { "None" } else { model.as_str() }.to_string())
        .show_ui(ui, |ui| {
            for m in &state.models {
                ui.selectable_value(&mut model, m.clone(), m.as_str());
            }
        });
    if model != state.flags.model {
        commands.push(EngineCommand::SelectModel(model));
    }

    ui.label("Voice");
    if state.voices.is_empty() {
        ui.small("No voices available.");
    } else {
        let mut voice = state.flags.voice.clone();
        egui::ComboBox::from_id_salt("voice_select")
            .selected_text(voice.clone())
            .show_ui(ui, |ui| {
                for v in &state.voices {
                    ui.selectable_value(&mut voice, v.clone(), v.as_str());
                }
            });
        if voice != state.flags.voice {
            commands.push(EngineCommand::SelectVoice(voice));
        }
    }

    if ui.button("⟳ Refresh").clicked() {
        commands.push(EngineCommand::RefreshCatalog);
    }
}

/* =========================
   Session
   ========================= */

fn draw_session(ui: &mut egui::Ui, state: &UiState, commands: &mut Vec<EngineCommand>) {
    ui.heading("Session");

    let mut censored = state.flags.censored;
    if ui.checkbox(&mut censored, "Content filter (SFW)").changed() {
        commands.push(EngineCommand::SetCensored(censored));
    }

    let mut audio = state.flags.audio_enabled;
    if ui.checkbox(&mut audio, "Narration audio").changed() {
        commands.push(EngineCommand::SetAudioEnabled(audio));
    }

    ui.add_space(4.0);

    let export = ui.add_enabled(state.adventure_started, egui::Button::new("💾 Export…"));
    if export.clicked() {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("adventure.txt")
            .add_filter("Text", &["txt"])
            .save_file()
        {
            commands.push(EngineCommand::ExportAdventure(path));
        }
    }

    if ui.button("New session").clicked() {
        commands.push(EngineCommand::ResetSession);
    }
}

fn draw_display(ui: &mut egui::Ui, state: &mut UiState) {
    ui.label("UI Scale");
    let resp = ui.add(egui::Slider::new(&mut state.settings.ui_scale, 0.75..=2.0));
    if resp.drag_stopped() {
        save_settings(&state.settings);
    }
}
