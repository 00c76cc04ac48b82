//! Saving and restoring whole game snapshots.

mod common;

use encounter_core::persist::{list_saves, save_path, SavedGame, SAVE_VERSION};
use encounter_core::testing::*;
use encounter_core::{ActionResolver, CombatPhase, CombatantId, GameState};
use tempfile::tempdir;

#[tokio::test]
async fn test_mid_combat_snapshot_resumes() {
    common::setup();
    let dir = tempdir().unwrap();
    let path = save_path(dir.path(), "mid fight");

    let mut harness = EncounterHarness::new().with_companion("elara");
    // player 20, elara 2 + 2, beast 8
    harness.rolls([18, 2, 5]);
    harness.start(&["fungal_beast"]).unwrap();
    harness.rolls([15, 5]);
    harness.player_attack("fungal_beast_0").unwrap();
    assert_eq!(harness.enemy_hp("fungal_beast_0"), Some(7));

    let metadata = harness.game().save_to(&path).await.unwrap();
    assert!(metadata.in_combat);
    assert_eq!(metadata.party_size, 2);

    let mut fresh = EncounterHarness::new();
    assert!(fresh.game_mut().restore_from(&path).await);
    assert_eq!(fresh.game(), harness.game());
    assert_turn(&fresh, "player");
    assert_eq!(fresh.enemy_hp("fungal_beast_0"), Some(7));

    // The restored session keeps going: the action is already spent.
    assert_eq!(
        fresh.player_attack("fungal_beast_0"),
        Err(encounter_core::ActionRejected::NoActionRemaining)
    );
    fresh.player_end_turn().unwrap();
    assert_phase(&fresh, CombatPhase::Active);
}

#[tokio::test]
async fn test_corrupt_save_leaves_state_untouched() {
    common::setup();
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.json");
    tokio::fs::write(&path, "{\"version\": 1, \"state\": {\"player\": 12").await.unwrap();

    let mut state = EncounterHarness::new().game().clone();
    state.add_gold(10);
    let before = state.clone();

    assert!(!state.restore_from(&path).await);
    assert_eq!(state, before);
    assert!(!state.restore_from(dir.path().join("missing.json")).await);
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_future_version_is_refused() {
    common::setup();
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.json");
    let mut saved = SavedGame::new(EncounterHarness::new().game().clone());
    saved.version = SAVE_VERSION + 1;
    saved.save_json(&path).await.unwrap();

    let mut state = EncounterHarness::new().game().clone();
    let before = state.clone();
    assert!(!state.restore_from(&path).await);
    assert_eq!(state, before);
    assert!(SavedGame::peek_metadata(&path).await.is_err());
}

#[tokio::test]
async fn test_victory_snapshot_can_be_saved() {
    common::setup();
    let dir = tempdir().unwrap();
    let mut harness = EncounterHarness::new();
    harness.rolls([18, 5]);
    harness.start(&["fungal_beast"]).unwrap();
    harness.game_mut().enemy_mut(&CombatantId::new("fungal_beast_0")).unwrap().hp = 1;
    harness.rolls([15, 5]);
    harness.engine.attack(&CombatantId::player(), &CombatantId::new("fungal_beast_0")).unwrap();

    let snapshot: &GameState = &harness.hooks().snapshots[0];
    assert_eq!(snapshot.player.xp, 50);
    let path = save_path(dir.path(), "autosave");
    snapshot.save_to(&path).await.unwrap();

    let saves = list_saves(dir.path()).await.unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].metadata.player_name, "Test Hero");
    assert!(!saves[0].metadata.in_combat);
}
