//! Game settings
//!
//! Loaded from a JSON file; any missing field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::SpawnRules;

/// Errors loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed RNG seed (random per run when absent)
    pub seed: Option<u64>,

    // === Rules ===
    /// Chance a spawned tile is a 4
    pub four_probability: f64,
    /// Tiles seeded on a new game
    pub initial_tiles: usize,

    // === Input ===
    /// Move requests allowed to wait behind the one in flight; extra input is dropped
    pub max_pending_moves: usize,

    // === Driver pacing ===
    /// Simulated slide time per cell (ms)
    pub ms_per_cell: u64,
    /// Pause before the game over notice (ms)
    pub game_over_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,

            four_probability: FOUR_PROBABILITY,
            initial_tiles: INITIAL_TILES,

            max_pending_moves: MAX_PENDING_MOVES,

            ms_per_cell: MS_PER_CELL,
            game_over_delay_ms: GAME_OVER_DELAY_MS,
        }
    }
}

impl Settings {
    /// Load and validate settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` if given, falling back to defaults on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };

        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.four_probability) {
            return Err(SettingsError::Invalid(format!(
                "four_probability must be within 0..=1, got {}",
                self.four_probability
            )));
        }
        if self.initial_tiles > CELL_COUNT {
            return Err(SettingsError::Invalid(format!(
                "initial_tiles must be at most {CELL_COUNT}, got {}",
                self.initial_tiles
            )));
        }
        if self.max_pending_moves == 0 {
            return Err(SettingsError::Invalid(
                "max_pending_moves must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Spawn rules for new games
    pub fn rules(&self) -> SpawnRules {
        SpawnRules {
            four_probability: self.four_probability,
            initial_tiles: self.initial_tiles,
        }
    }

    /// Configured seed, or a fresh random one
    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_pending_moves, 2);
        assert_eq!(settings.rules(), SpawnRules::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "seed": 42, "initial_tiles": 2 }"#).unwrap();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.initial_tiles, 2);
        assert_eq!(settings.four_probability, FOUR_PROBABILITY);
        assert_eq!(settings.seed_or_random(), 42);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = Settings::from_json(r#"{ "four_probability": 1.5 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = Settings::from_json(r#"{ "max_pending_moves": 0 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = Settings::from_json(r#"{ "initial_tiles": 17 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Settings::from_json("{ seed: ").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = std::env::temp_dir().join("slide-2048-no-such-settings.json");
        assert!(matches!(Settings::load(&path), Err(SettingsError::Io(_))));
        assert_eq!(Settings::load_or_default(Some(&path)), Settings::default());
    }

    #[test]
    fn test_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!(
            "slide-2048-settings-{}.json",
            std::process::id()
        ));
        let settings = Settings {
            seed: Some(7),
            max_pending_moves: 3,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();
        let loaded = Settings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}
