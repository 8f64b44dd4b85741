mod ui;

use rpg_adventure::config::AppConfig;
use rpg_adventure::engine::turn::TurnProcessor;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rpg_adventure=info".into()),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();
    tracing::info!(backend = %config.ollama_url, speech = %config.alltalk_url, "starting rpg adventure");

    let processor = TurnProcessor::from_config(&config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1180.0, 760.0]),
        ..Default::default()
    };

    eframe::run_native(
        "RPG Adventure",
        options,
        Box::new(|_cc| Ok(Box::new(ui::app::MyApp::new(processor)))),
    )
    .map_err(|e| anyhow::anyhow!("frontend failed: {e}"))
}
