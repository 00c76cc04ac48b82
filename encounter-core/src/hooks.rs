//! Outbound seam between the combat core and whatever hosts it.
//!
//! The engine never renders, stores or changes scenes itself. It calls a
//! [`CombatHooks`] implementation for each of those, in the order events
//! happen.

use crate::combatant::CombatantId;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category attached to every combat log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogCategory {
    System,
    Combat,
    Gain,
    CheckSuccess,
    CheckFail,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::System => "system",
            LogCategory::Combat => "combat",
            LogCategory::Gain => "gain",
            LogCategory::CheckSuccess => "check-success",
            LogCategory::CheckFail => "check-fail",
        }
    }
}

/// Callbacks into the presentation, narrative and persistence layers.
///
/// Every method has a no-op default, so a host implements only what it
/// renders.
pub trait CombatHooks {
    /// Something visible changed. `active` is whoever's turn it is, if a
    /// session is running.
    fn on_combat_ui_change(&mut self, _active: Option<&CombatantId>) {}

    fn on_log_event(&mut self, _message: &str, _category: LogCategory) {}

    /// Short-lived floating text such as damage numbers or "Miss!".
    fn on_transient_event_text(&mut self, _message: &str, _duration: Duration) {}

    /// Called exactly once when a session ends by victory, defeat, flight
    /// or abort.
    fn transition_to_scene(&mut self, _scene_id: &str) {}

    /// Called once on victory, before the scene transition.
    fn persist_snapshot(&mut self, _state: &GameState) {}
}

/// Hooks that drop everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl CombatHooks for NoopHooks {}

impl<H: CombatHooks + ?Sized> CombatHooks for &mut H {
    fn on_combat_ui_change(&mut self, active: Option<&CombatantId>) {
        (**self).on_combat_ui_change(active)
    }

    fn on_log_event(&mut self, message: &str, category: LogCategory) {
        (**self).on_log_event(message, category)
    }

    fn on_transient_event_text(&mut self, message: &str, duration: Duration) {
        (**self).on_transient_event_text(message, duration)
    }

    fn transition_to_scene(&mut self, scene_id: &str) {
        (**self).transition_to_scene(scene_id)
    }

    fn persist_snapshot(&mut self, state: &GameState) {
        (**self).persist_snapshot(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(LogCategory::CheckFail.as_str(), "check-fail");
        assert_eq!(
            serde_json::to_string(&LogCategory::CheckSuccess).unwrap(),
            "\"check-success\""
        );
    }
}
