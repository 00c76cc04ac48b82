//! Combat settings and their environment loader.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Who enemies attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyTargeting {
    /// Always the player character.
    #[default]
    PlayerOnly,
    /// The living party member with the lowest HP, ties going to the player.
    LowestHpAlly,
}

impl FromStr for EnemyTargeting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "player" | "player_only" => Ok(EnemyTargeting::PlayerOnly),
            "lowest_hp" | "lowest_hp_ally" => Ok(EnemyTargeting::LowestHpAlly),
            other => Err(format!("unknown enemy targeting '{other}'")),
        }
    }
}

/// Tunables for a combat engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSettings {
    /// Companions act on their own; otherwise they wait for commands.
    pub companion_ai: bool,
    /// Pause before each AI or enemy step.
    pub presentation_delay: Duration,
    /// How long floating combat text stays up.
    pub transient_text_duration: Duration,
    pub flee_dc: i32,
    pub enemy_targeting: EnemyTargeting,
    /// Where a successful flee goes. `None` falls back to the lose scene.
    pub retreat_scene_id: Option<String>,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            companion_ai: true,
            presentation_delay: Duration::from_millis(1000),
            transient_text_duration: Duration::from_millis(1500),
            flee_dc: 12,
            enemy_targeting: EnemyTargeting::PlayerOnly,
            retreat_scene_id: None,
        }
    }
}

impl CombatSettings {
    pub fn with_companion_ai(mut self, enabled: bool) -> Self {
        self.companion_ai = enabled;
        self
    }

    pub fn with_presentation_delay(mut self, delay: Duration) -> Self {
        self.presentation_delay = delay;
        self
    }

    pub fn with_flee_dc(mut self, dc: i32) -> Self {
        self.flee_dc = dc;
        self
    }

    pub fn with_enemy_targeting(mut self, targeting: EnemyTargeting) -> Self {
        self.enemy_targeting = targeting;
        self
    }

    pub fn with_retreat_scene(mut self, scene_id: impl Into<String>) -> Self {
        self.retreat_scene_id = Some(scene_id.into());
        self
    }

    /// Construct settings from process environment variables.
    ///
    /// Environment variables:
    /// - `ENCOUNTER_COMPANION_AI` - Companions act on their own (default: true)
    /// - `ENCOUNTER_DELAY_MS` - Presentation delay in milliseconds (default: 1000)
    /// - `ENCOUNTER_FLEE_DC` - Flee check DC (default: 12)
    /// - `ENCOUNTER_ENEMY_TARGETING` - `player_only` or `lowest_hp_ally` (default: player_only)
    pub fn from_env() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(enabled) = read_bool(&lookup, "ENCOUNTER_COMPANION_AI") {
            settings.companion_ai = enabled;
        }
        if let Some(ms) = read_parsed::<u64>(&lookup, "ENCOUNTER_DELAY_MS") {
            settings.presentation_delay = Duration::from_millis(ms);
        }
        if let Some(dc) = read_parsed::<i32>(&lookup, "ENCOUNTER_FLEE_DC") {
            settings.flee_dc = dc;
        }
        if let Some(targeting) = read_parsed::<EnemyTargeting>(&lookup, "ENCOUNTER_ENEMY_TARGETING") {
            settings.enemy_targeting = targeting;
        }

        settings
    }
}

fn read_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
