use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use crate::ui::settings::UiSettings;

fn settings_path() -> anyhow::Result<PathBuf> {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("rpg_adventure");
    fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
    path.push("ui_settings.json");
    Ok(path)
}

pub fn load_settings() -> UiSettings {
    let Ok(path) = settings_path() else {
        return UiSettings::default();
    };

    fs::read_to_string(&path)
        .ok()
        .and_then(|s| {
            serde_json::from_str::<UiSettings>(&s)
                .map_err(|e| tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable ui settings"))
                .ok()
        })
        .unwrap_or_default()
}

pub fn save_settings(settings: &UiSettings) {
    let result = settings_path().and_then(|path| {
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    });

    if let Err(e) = result {
        tracing::warn!(error = %format!("{e:#}"), "could not save ui settings");
    }
}
