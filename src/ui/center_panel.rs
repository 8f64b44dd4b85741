use eframe::egui;

use rpg_adventure::engine::protocol::EngineCommand;

use super::app::{status_color, MyApp};

pub fn draw_center_panel(ctx: &egui::Context, app: &mut MyApp) {
    let input_id = egui::Id::new("chat_input_box");

    // ---------- Input bar ----------
    egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
        if let Some(status) = &app.ui.status {
            ui.label(egui::RichText::new(&status.message).color(status_color(status.status)));
        }

        let mut send_now = false;
        let hint = if app.ui.adventure_started {
            "What do you do? (/help for commands)"
        } else {
            "Start an adventure from the left panel…"
        };

        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 60.0, 60.0],
                egui::TextEdit::multiline(&mut app.ui.input_text)
                    .id(input_id)
                    .hint_text(hint)
                    .lock_focus(true),
            );

            // Enter vs Shift+Enter
            if response.has_focus() {
                let (enter, shift) =
                    ui.input(|i| (i.key_pressed(egui::Key::Enter), i.modifiers.shift));
                if enter && !shift {
                    send_now = true;
                }
            }

            if ui.add_enabled(!app.ui.is_busy(), egui::Button::new("Send")).clicked() {
                send_now = true;
            }
        });

        if app.ui.is_busy() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.small("The narrator is thinking…");
            });
        }

        if send_now && !app.ui.is_busy() {
            let text = app.ui.input_text.trim().to_string();

            if !text.is_empty() {
                app.send_command(EngineCommand::SubmitPlayerInput(text));
                app.ui.input_text.clear();
            }

            // Keep cursor focused
            ui.memory_mut(|m| m.request_focus(input_id));
        }
    });

    // ---------- Chat history ----------
    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical()
            .stick_to_bottom(app.ui.should_auto_scroll)
            .show(ui, |ui| {
                for msg in &app.ui.rendered_messages {
                    app.draw_message(ui, msg);
                }
            });
    });
}
