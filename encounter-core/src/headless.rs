//! Headless encounter runner for scripts and tests.
//!
//! [`HeadlessEncounter`] plays the player's turns with a fixed rule (attack
//! the first living enemy, else end the turn) and steps every parked
//! continuation until the session ends.
//!
//! # Example
//!
//! ```ignore
//! use encounter_core::headless::HeadlessEncounter;
//! use encounter_core::{CombatEngine, GameState};
//!
//! let engine = CombatEngine::headless(game);
//! let mut encounter = HeadlessEncounter::new(engine);
//! encounter.start(&["fungal_beast"], "SCENE_WIN", "SCENE_LOSE")?;
//! let phase = encounter.run();
//! println!("ended in {phase:?} after {} steps", encounter.steps());
//! ```

use crate::combatant::CombatantId;
use crate::engine::CombatEngine;
use crate::error::SessionFault;
use crate::hooks::{CombatHooks, NoopHooks};
use crate::resolver::ActionResolver;
use crate::session::CombatPhase;
use crate::state::GameState;

/// Default cap on steps before a run gives up.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Auto-plays one encounter on a [`CombatEngine`].
pub struct HeadlessEncounter<H: CombatHooks = NoopHooks> {
    engine: CombatEngine<H>,
    max_steps: usize,
    steps: usize,
}

impl HeadlessEncounter<NoopHooks> {
    pub fn from_game(game: GameState) -> Self {
        Self::new(CombatEngine::headless(game))
    }
}

impl<H: CombatHooks> HeadlessEncounter<H> {
    pub fn new(engine: CombatEngine<H>) -> Self {
        Self {
            engine,
            max_steps: DEFAULT_MAX_STEPS,
            steps: 0,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn start(
        &mut self,
        enemy_ids: &[&str],
        win_scene_id: &str,
        lose_scene_id: &str,
    ) -> Result<(), SessionFault> {
        self.engine.start_session(enemy_ids, win_scene_id, lose_scene_id)
    }

    pub fn engine(&self) -> &CombatEngine<H> {
        &self.engine
    }

    pub fn into_engine(self) -> CombatEngine<H> {
        self.engine
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Play until the session ends and return how it ended. A run that
    /// hits the step cap returns the phase it was stuck in.
    pub fn run(&mut self) -> CombatPhase {
        while self.engine.is_active() && self.steps < self.max_steps {
            self.step();
        }
        if self.engine.is_active() {
            tracing::warn!(steps = self.steps, "headless run hit its step limit");
        }
        self.engine.phase()
    }

    /// Like [`run`](Self::run) but waits out the presentation delay before
    /// each parked step.
    pub async fn run_with_delays(&mut self) -> CombatPhase {
        while self.engine.is_active() && self.steps < self.max_steps {
            if self.engine.has_pending() {
                self.engine.run_pending().await;
                self.steps += 1;
            } else {
                self.play_command_turn();
            }
        }
        self.engine.phase()
    }

    fn step(&mut self) {
        if !self.engine.advance() {
            self.play_command_turn();
            return;
        }
        self.steps += 1;
    }

    /// Take the turn of whoever is waiting for a command: attack once if
    /// possible, otherwise end the turn.
    fn play_command_turn(&mut self) {
        self.steps += 1;
        let Some(actor) = self.engine.current_actor().cloned() else {
            return;
        };

        let can_act = self
            .engine
            .session()
            .is_some_and(|s| s.actions_remaining > 0);
        if can_act {
            if let Some(target) = self.first_enemy() {
                match self.engine.attack(&actor, &target) {
                    Ok(_) => return,
                    Err(err) => tracing::debug!(%actor, error = %err, "headless attack refused"),
                }
            }
        }
        if let Err(err) = self.engine.end_turn(&actor) {
            tracing::warn!(%actor, error = %err, "headless end turn refused");
        }
    }

    fn first_enemy(&self) -> Option<CombatantId> {
        self.engine
            .game()
            .living_enemies()
            .next()
            .map(|e| e.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::CharacterClass;
    use crate::combatant::Race;
    use crate::config::CombatSettings;
    use crate::dice::RngRoller;
    use crate::rules::AbilityScores;
    use std::time::Duration;

    fn game() -> GameState {
        GameState::new_game(
            "Rowan",
            Race::Human,
            CharacterClass::Fighter,
            AbilityScores::new(16, 13, 14, 10, 12, 8),
        )
        .with_settings(CombatSettings::default().with_presentation_delay(Duration::ZERO))
    }

    #[test]
    fn test_run_reaches_terminal_phase() {
        for seed in 0..20 {
            let engine = CombatEngine::headless(game()).with_roller(RngRoller::seeded(seed));
            let mut encounter = HeadlessEncounter::new(engine);
            encounter.start(&["fungal_beast"], "WIN", "LOSE").unwrap();
            let phase = encounter.run();
            assert!(phase.is_terminal(), "seed {seed} ended in {phase:?}");
            assert!(!encounter.engine().has_pending());
        }
    }

    #[test]
    fn test_step_limit() {
        let engine = CombatEngine::headless(game()).with_roller(RngRoller::seeded(3));
        let mut encounter = HeadlessEncounter::new(engine).with_max_steps(1);
        encounter.start(&["spore_zombie", "spore_zombie"], "WIN", "LOSE").unwrap();
        assert_eq!(encounter.run(), CombatPhase::Active);
        assert_eq!(encounter.steps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_delays_party() {
        let mut state = game().with_settings(CombatSettings::default());
        state.add_companion("aodhan").unwrap();
        let engine = CombatEngine::headless(state).with_roller(RngRoller::seeded(11));
        let mut encounter = HeadlessEncounter::new(engine);
        encounter.start(&["fungal_beast"], "WIN", "LOSE").unwrap();
        assert!(encounter.run_with_delays().await.is_terminal());
    }
}
