//! Settings loaded from a `.env` file.

mod common;

use encounter_core::{CombatSettings, EnemyTargeting};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::tempdir;

fn load_env_file(contents: &str) -> HashMap<String, String> {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, contents).unwrap();
    dotenvy::from_path_iter(&path)
        .unwrap()
        .map(|pair| pair.unwrap())
        .collect()
}

#[test]
fn test_settings_from_env_file() {
    common::setup();
    let vars = load_env_file(
        "# local tuning\n\
         ENCOUNTER_COMPANION_AI=false\n\
         ENCOUNTER_DELAY_MS=250\n\
         ENCOUNTER_ENEMY_TARGETING=lowest_hp_ally\n",
    );
    let settings = CombatSettings::from_source(|key| vars.get(key).cloned());

    assert!(!settings.companion_ai);
    assert_eq!(settings.presentation_delay, Duration::from_millis(250));
    assert_eq!(settings.enemy_targeting, EnemyTargeting::LowestHpAlly);
    assert_eq!(settings.flee_dc, CombatSettings::default().flee_dc);
}

#[test]
fn test_quoted_values_are_unwrapped() {
    common::setup();
    let vars = load_env_file("ENCOUNTER_FLEE_DC=\"15\"\n");
    let settings = CombatSettings::from_source(|key| vars.get(key).cloned());
    assert_eq!(settings.flee_dc, 15);
}

#[test]
fn test_process_environment_is_read() {
    common::setup();
    // Unset keys keep their defaults.
    let settings = CombatSettings::from_env();
    if std::env::var("ENCOUNTER_FLEE_DC").is_err() {
        assert_eq!(settings.flee_dc, 12);
    }
}
