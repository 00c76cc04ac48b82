//! Turn-based tabletop RPG combat engine.
//!
//! This crate provides:
//! - Initiative-ordered combat sessions with per-turn action budgets
//! - Weapon, spell and ability resolution with damage typing and criticals
//! - Companion and enemy AI driven through deferred continuations
//! - A whole-game state snapshot: party, progression, rests, inventory
//! - Versioned JSON persistence
//!
//! Rendering, narrative and storage live outside the crate and are reached
//! through [`CombatHooks`].
//!
//! # Quick Start
//!
//! ```ignore
//! use encounter_core::{
//!     AbilityScores, ActionResolver, CharacterClass, CombatEngine, CombatantId, GameState, Race,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = GameState::new_game(
//!         "Rowan",
//!         Race::Human,
//!         CharacterClass::Fighter,
//!         AbilityScores::new(15, 13, 14, 10, 12, 8),
//!     );
//!     game.add_companion("neala")?;
//!
//!     let mut engine = CombatEngine::headless(game);
//!     engine.start_session(&["fungal_beast"], "SCENE_CLEARING", "SCENE_CAMP")?;
//!     engine.run_pending().await;
//!
//!     let player = CombatantId::player();
//!     engine.attack(&player, &CombatantId::new("fungal_beast_0"))?;
//!     engine.end_turn(&player)?;
//!     engine.run_pending().await;
//!
//!     engine.game().save_to("quicksave.json").await?;
//!     Ok(())
//! }
//! ```

pub mod bestiary;
pub mod class_data;
pub mod combatant;
pub mod companions;
pub mod config;
pub mod dice;
pub mod engine;
pub mod error;
pub mod headless;
pub mod hooks;
pub mod items;
pub mod persist;
pub mod policy;
pub mod resolver;
pub mod rules;
pub mod session;
pub mod spells;
pub mod state;
pub mod testing;

// Primary public API
pub use class_data::{CharacterClass, Subclass};
pub use combatant::{Character, Combatant, CombatantId, CombatantKind, Enemy, Race, StatusEffectId};
pub use config::{CombatSettings, EnemyTargeting};
pub use dice::{DieRoller, RngRoller};
pub use engine::CombatEngine;
pub use error::{ActionRejected, SessionFault, StateError};
pub use headless::HeadlessEncounter;
pub use hooks::{CombatHooks, LogCategory, NoopHooks};
pub use persist::{PersistError, SavedGame};
pub use policy::{CompanionPolicy, EnemyPolicy};
pub use resolver::{ActionReport, ActionResolver, CunningAction, Effect};
pub use rules::{Ability, AbilityScores, DamageType};
pub use session::{CombatPhase, CombatSession};
pub use state::{GameState, LevelUpChoice};
pub use testing::{EncounterHarness, RecordingHooks, ScriptedRoller};
