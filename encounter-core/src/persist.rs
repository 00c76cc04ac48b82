//! Game snapshot persistence.
//!
//! The whole [`GameState`] is written as one versioned JSON document. There
//! is no incremental format: a save mid-fight simply carries the combat
//! session along with everything else.

use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Why a snapshot could not be written or read back.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("save file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("save file has an unexpected layout")]
    InvalidFormat,

    #[error("save version {found} is not supported (this build writes {expected})")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Format version written into every snapshot.
pub const SAVE_VERSION: u32 = 1;

/// A saved game with everything needed to resume play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    /// Snapshots from a newer build are refused.
    pub version: u32,

    /// Seconds since the Unix epoch.
    pub saved_at: String,

    pub state: GameState,

    pub metadata: SaveMetadata,
}

/// Summary of a save, readable without loading the full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub player_name: String,
    pub class: String,
    pub level: u32,
    pub scene_id: String,
    pub party_size: usize,
    pub in_combat: bool,
    #[serde(default)]
    pub saved_at: String,
}

impl SaveMetadata {
    fn describe(state: &GameState, saved_at: &str) -> Self {
        Self {
            player_name: state.player.name.clone(),
            class: state.player.class.name().to_string(),
            level: state.player.level,
            scene_id: state.current_scene_id.clone(),
            party_size: state.party.len(),
            in_combat: state.in_combat(),
            saved_at: saved_at.to_string(),
        }
    }
}

impl SavedGame {
    pub fn new(state: GameState) -> Self {
        let saved_at = chrono_now();
        let metadata = SaveMetadata::describe(&state, &saved_at);
        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
            metadata,
        }
    }

    pub fn to_json_string(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot, refusing other format versions.
    pub fn from_json_str(content: &str) -> Result<Self, PersistError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or(PersistError::InvalidFormat)?;
        check_version(version)?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = self.to_json_string()?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    /// Read only the metadata of a save file.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;
        check_version(u64::from(partial.version))?;
        Ok(partial.metadata)
    }
}

fn check_version(found: u64) -> Result<(), PersistError> {
    if found != u64::from(SAVE_VERSION) {
        return Err(PersistError::VersionMismatch {
            expected: SAVE_VERSION,
            found: u32::try_from(found).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

impl GameState {
    /// Write this state as a fresh snapshot.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let saved = SavedGame::new(self.clone());
        saved.save_json(path).await?;
        tracing::info!(scene = %saved.metadata.scene_id, "game saved");
        Ok(saved.metadata)
    }

    /// Replace this state with the snapshot at `path`.
    ///
    /// Returns `false` and leaves the state untouched if the file is
    /// missing, unparsable or from another format version.
    pub async fn restore_from(&mut self, path: impl AsRef<Path>) -> bool {
        match SavedGame::load_json(path.as_ref()).await {
            Ok(saved) => {
                *self = saved.state;
                true
            }
            Err(err) => {
                tracing::warn!(path = %path.as_ref().display(), error = %err, "could not restore save");
                false
            }
        }
    }
}

/// A save file and its metadata.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    pub path: PathBuf,
    pub metadata: SaveMetadata,
}

/// List readable save files in a directory, newest first. Unreadable files
/// are skipped.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let mut saves = Vec::new();
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(saves);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "json") {
            match SavedGame::peek_metadata(&path).await {
                Ok(metadata) => saves.push(SaveInfo { path, metadata }),
                Err(err) => tracing::debug!(path = %path.display(), error = %err, "skipping save"),
            }
        }
    }

    saves.sort_by(|a, b| b.metadata.saved_at.cmp(&a.metadata.saved_at));
    Ok(saves)
}

/// File name for a named save slot.
pub fn save_path(dir: impl AsRef<Path>, slot: &str) -> PathBuf {
    let sanitized = slot
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    dir.as_ref().join(format!("{sanitized}.json"))
}

fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:020}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::CharacterClass;
    use crate::combatant::Race;
    use crate::rules::AbilityScores;
    use tempfile::tempdir;

    fn game() -> GameState {
        GameState::new_game(
            "Rowan",
            Race::Human,
            CharacterClass::Cleric,
            AbilityScores::new(10, 12, 14, 10, 16, 8),
        )
    }

    #[test]
    fn test_metadata_describes_state() {
        let mut state = game();
        state.add_companion("aodhan").unwrap();
        let saved = SavedGame::new(state);
        assert_eq!(saved.version, SAVE_VERSION);
        assert_eq!(saved.metadata.player_name, "Rowan");
        assert_eq!(saved.metadata.class, "Cleric");
        assert_eq!(saved.metadata.party_size, 2);
        assert!(!saved.metadata.in_combat);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut saved = SavedGame::new(game());
        saved.version = 7;
        let json = serde_json::to_string(&saved).unwrap();
        match SavedGame::from_json_str(&json) {
            Err(PersistError::VersionMismatch { expected, found }) => {
                assert_eq!((expected, found), (SAVE_VERSION, 7));
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_version_is_invalid() {
        assert!(matches!(
            SavedGame::from_json_str("{\"state\": null}"),
            Err(PersistError::InvalidFormat)
        ));
    }

    #[test]
    fn test_save_path_sanitized() {
        let path = save_path("/saves", "Slot #1");
        assert!(path.to_string_lossy().ends_with("Slot__1.json"));
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path(), "quick");

        let mut state = game();
        state.add_gold(42);
        state.set_flag("met_elder", true);
        state.save_to(&path).await.unwrap();

        let mut restored = game();
        assert!(restored.restore_from(&path).await);
        assert_eq!(restored, state);
    }

    #[tokio::test]
    async fn test_list_saves_skips_garbage() {
        let dir = tempdir().unwrap();
        game().save_to(save_path(dir.path(), "one")).await.unwrap();
        tokio::fs::write(dir.path().join("broken.json"), "{").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "hello").await.unwrap();

        let saves = list_saves(dir.path()).await.unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].metadata.player_name, "Rowan");
    }
}
