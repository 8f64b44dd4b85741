use eframe::egui;

use rpg_adventure::model::world_state::WorldState;

use super::app::{RightTab, UiState};

pub fn draw_right_panel(ctx: &egui::Context, ui_state: &mut UiState) {
    egui::SidePanel::right("right")
        .resizable(true)
        .default_width(320.0)
        .min_width(240.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut ui_state.right_tab, RightTab::World, "World");
                ui.selectable_value(&mut ui_state.right_tab, RightTab::Prompt, "Narrator view");
            });

            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| match ui_state.right_tab {
                RightTab::World => draw_world(ui, ui_state),
                RightTab::Prompt => {
                    ui.label(egui::RichText::new(&ui_state.rendered_world).monospace());
                }
            });
        });
}

/* =========================
   World UI
   ========================= */

fn draw_world(ui: &mut egui::Ui, state: &UiState) {
    if !state.adventure_started {
        ui.label("No adventure in progress.");
        return;
    }

    let p = &state.profile;
    ui.heading(&p.name);
    ui.label(format!("{} · {}", p.role, p.genre));

    let w: &WorldState = &state.world;
    ui.label(format!("Reputation: {:+}", w.reputation));

    ui.separator();

    list(ui, "Allies", &w.allies);
    list(ui, "Enemies", &w.enemies);
    list(ui, "Discoveries", &w.discoveries);

    ui.collapsing("Resources", |ui| {
        if w.resources.is_empty() {
            ui.label("None");
        }
        for (name, qty) in &w.resources {
            ui.label(format!("• {name}: {qty}"));
        }
    });

    ui.collapsing("Factions", |ui| {
        if w.factions.is_empty() {
            ui.label("None");
        }
        for (name, standing) in &w.factions {
            let color = match standing.signum() {
                1 => egui::Color32::LIGHT_GREEN,
                -1 => egui::Color32::LIGHT_RED,
                _ => egui::Color32::GRAY,
            };
            ui.label(egui::RichText::new(format!("• {name}: {standing:+}")).color(color));
        }
    });

    list(ui, "Active quests", &w.active_quests);
    list(ui, "Completed quests", &w.completed_quests);
    list(ui, "World events", &w.world_events);
    list(ui, "Consequences", w.consequences());
    list(ui, "Player creations", w.player_creations());
}

fn list(ui: &mut egui::Ui, label: &str, items: &[String]) {
    ui.collapsing(label, |ui| {
        if items.is_empty() {
            ui.label("None");
        } else {
            for i in items {
                ui.label(format!("• {i}"));
            }
        }
    });
}
