//! Testing utilities for combat scenarios.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedRoller` for dice that land where a test needs them
//! - `RecordingHooks` for capturing everything the engine reports
//! - `EncounterHarness` for driving a whole encounter
//! - Assertion helpers for verifying outcomes

use crate::class_data::CharacterClass;
use crate::combatant::{CombatantId, Race};
use crate::config::CombatSettings;
use crate::dice::DieRoller;
use crate::engine::CombatEngine;
use crate::error::{ActionRejected, SessionFault};
use crate::hooks::{CombatHooks, LogCategory};
use crate::resolver::{ActionReport, ActionResolver};
use crate::rules::AbilityScores;
use crate::session::CombatPhase;
use crate::state::GameState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Scripted Dice
// ============================================================================

#[derive(Debug)]
struct Script {
    queue: VecDeque<u32>,
    fallback: StdRng,
}

/// Dice that return queued faces in order, clamped to the die size. Once
/// the queue runs dry, rolls come from a fixed-seed RNG.
///
/// Clones share one queue, so a test can keep a handle and push more faces
/// after handing the roller to an engine.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRoller {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                queue: faces.into_iter().collect(),
                fallback: StdRng::seed_from_u64(0x5eed),
            })),
        }
    }

    pub fn push(&self, faces: impl IntoIterator<Item = u32>) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.queue.extend(faces);
    }

    /// Faces not yet rolled.
    pub fn remaining(&self) -> usize {
        let script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.queue.len()
    }
}

impl DieRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match script.queue.pop_front() {
            Some(face) => face.clamp(1, sides),
            None => script.fallback.gen_range(1..=sides),
        }
    }
}

// ============================================================================
// Recording Hooks
// ============================================================================

/// Hooks that remember every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    pub logs: Vec<(String, LogCategory)>,
    pub floating: Vec<(String, Duration)>,
    pub scenes: Vec<String>,
    pub snapshots: Vec<GameState>,
    pub ui_changes: Vec<Option<CombatantId>>,
}

impl RecordingHooks {
    pub fn log_text(&self) -> Vec<String> {
        self.logs.iter().map(|(text, _)| text.clone()).collect()
    }

    pub fn has_log(&self, text: &str) -> bool {
        self.logs.iter().any(|(line, _)| line == text)
    }

    pub fn floating_text(&self) -> Vec<&str> {
        self.floating.iter().map(|(text, _)| text.as_str()).collect()
    }
}

impl CombatHooks for RecordingHooks {
    fn on_combat_ui_change(&mut self, active: Option<&CombatantId>) {
        self.ui_changes.push(active.cloned());
    }

    fn on_log_event(&mut self, message: &str, category: LogCategory) {
        self.logs.push((message.to_string(), category));
    }

    fn on_transient_event_text(&mut self, message: &str, duration: Duration) {
        self.floating.push((message.to_string(), duration));
    }

    fn transition_to_scene(&mut self, scene_id: &str) {
        self.scenes.push(scene_id.to_string());
    }

    fn persist_snapshot(&mut self, state: &GameState) {
        self.snapshots.push(state.clone());
    }
}

// ============================================================================
// Encounter Harness
// ============================================================================

pub const WIN_SCENE: &str = "SCENE_TEST_WIN";
pub const LOSE_SCENE: &str = "SCENE_TEST_LOSE";

/// Test harness for running encounters with scripted dice.
pub struct EncounterHarness {
    pub engine: CombatEngine<RecordingHooks>,
    pub dice: ScriptedRoller,
}

impl EncounterHarness {
    /// A level-1 human fighter with no companions and no presentation delay.
    pub fn new() -> Self {
        Self::with_player(
            Race::Human,
            CharacterClass::Fighter,
            AbilityScores::new(15, 13, 14, 10, 12, 8),
        )
    }

    pub fn with_player(race: Race, class: CharacterClass, scores: AbilityScores) -> Self {
        let game = GameState::new_game("Test Hero", race, class, scores)
            .with_settings(CombatSettings::default().with_presentation_delay(Duration::ZERO));
        Self::with_game(game)
    }

    pub fn with_game(game: GameState) -> Self {
        let dice = ScriptedRoller::new([]);
        let engine = CombatEngine::new(game, RecordingHooks::default()).with_roller(dice.clone());
        Self { engine, dice }
    }

    pub fn with_companion(mut self, companion_id: &str) -> Self {
        if let Err(err) = self.engine.game_mut().add_companion(companion_id) {
            panic!("cannot add companion '{companion_id}': {err}");
        }
        self
    }

    pub fn with_settings(mut self, settings: CombatSettings) -> Self {
        self.engine.game_mut().settings = settings;
        self
    }

    /// Queue die faces.
    pub fn rolls(&mut self, faces: impl IntoIterator<Item = u32>) -> &mut Self {
        self.dice.push(faces);
        self
    }

    pub fn start(&mut self, enemy_ids: &[&str]) -> Result<(), SessionFault> {
        self.engine.start_session(enemy_ids, WIN_SCENE, LOSE_SCENE)
    }

    /// Run parked continuations until the engine waits for a command or
    /// the session ends.
    pub fn settle(&mut self) -> usize {
        let mut steps = 0;
        while self.engine.advance() {
            steps += 1;
        }
        steps
    }

    pub fn player_attack(&mut self, target: &str) -> Result<ActionReport, ActionRejected> {
        self.engine
            .attack(&CombatantId::player(), &CombatantId::new(target))
    }

    pub fn player_end_turn(&mut self) -> Result<ActionReport, ActionRejected> {
        self.engine.end_turn(&CombatantId::player())
    }

    pub fn game(&self) -> &GameState {
        self.engine.game()
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        self.engine.game_mut()
    }

    pub fn hooks(&self) -> &RecordingHooks {
        self.engine.hooks()
    }

    pub fn player_hp(&self) -> (i32, i32) {
        let player = &self.game().player;
        (player.hp, player.max_hp)
    }

    pub fn enemy_hp(&self, id: &str) -> Option<i32> {
        self.game().enemy(&CombatantId::new(id)).map(|e| e.hp)
    }

    pub fn phase(&self) -> CombatPhase {
        self.engine.phase()
    }

    pub fn current_actor(&self) -> Option<&CombatantId> {
        self.engine.current_actor()
    }

    pub fn turn_order(&self) -> Vec<String> {
        self.game()
            .session()
            .map(|s| s.turn_order.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }
}

impl Default for EncounterHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert player HP is at expected values.
#[track_caller]
pub fn assert_hp(harness: &EncounterHarness, current: i32, max: i32) {
    let (actual_current, actual_max) = harness.player_hp();
    assert_eq!(
        (actual_current, actual_max),
        (current, max),
        "Expected HP {current}/{max}, got {actual_current}/{actual_max}"
    );
}

#[track_caller]
pub fn assert_phase(harness: &EncounterHarness, phase: CombatPhase) {
    assert_eq!(harness.phase(), phase, "Unexpected combat phase");
}

#[track_caller]
pub fn assert_turn(harness: &EncounterHarness, actor: &str) {
    let current = harness.current_actor().map(|id| id.to_string());
    assert_eq!(
        current.as_deref(),
        Some(actor),
        "Expected it to be {actor}'s turn"
    );
}

#[track_caller]
pub fn assert_logged(harness: &EncounterHarness, text: &str) {
    assert!(
        harness.hooks().has_log(text),
        "Expected log line '{text}', got {:#?}",
        harness.hooks().log_text()
    );
}

/// Assert the session ended in exactly one scene transition to `scene`.
#[track_caller]
pub fn assert_transitioned_once(harness: &EncounterHarness, scene: &str) {
    assert_eq!(
        harness.hooks().scenes,
        vec![scene.to_string()],
        "Expected exactly one transition to {scene}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_roller_clamps_and_falls_back() {
        let mut dice = ScriptedRoller::new([25, 0, 3]);
        assert_eq!(dice.roll_die(20), 20);
        assert_eq!(dice.roll_die(6), 1);
        assert_eq!(dice.roll_die(6), 3);
        let fallback = dice.roll_die(8);
        assert!((1..=8).contains(&fallback));
    }

    #[test]
    fn test_scripted_roller_clones_share_queue() {
        let dice = ScriptedRoller::new([]);
        let mut engine_copy = dice.clone();
        dice.push([7]);
        assert_eq!(engine_copy.roll_die(20), 7);
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn test_harness_starts_on_player_turn() {
        let mut harness = EncounterHarness::new();
        harness.rolls([20, 1]);
        harness.start(&["fungal_beast"]).unwrap();
        assert_turn(&harness, "player");
        assert_phase(&harness, CombatPhase::Active);
        assert_eq!(harness.turn_order(), vec!["player", "fungal_beast_0"]);
    }
}
