//! Configuration loader - YAML settings + .env environment

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::blend::{GroupSettings, StarSettings};
use crate::camera::CameraSettings;
use crate::clock::RotationSettings;
use crate::gesture::GestureThresholds;
use crate::mode::DEFAULT_DEBOUNCE_MS;
use crate::photos::PhotoSettings;
use crate::text::MessageSettings;

/// Everything tunable about the tree, loaded from tree.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed RNG seed for reproducible formations and focus picks
    pub seed: Option<u64>,
    pub debounce_ms: u64,
    pub gesture: GestureThresholds,
    pub message: MessageSettings,
    pub groups: Vec<GroupSettings>,
    pub star: StarSettings,
    pub photo: PhotoSettings,
    pub camera: CameraSettings,
    pub rotation: RotationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            gesture: GestureThresholds::default(),
            message: MessageSettings::default(),
            groups: vec![
                GroupSettings::foliage(),
                GroupSettings::spiral(),
                GroupSettings::ornaments(),
            ],
            star: StarSettings::default(),
            photo: PhotoSettings::default(),
            camera: CameraSettings::default(),
            rotation: RotationSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading settings from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Settings file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.message.canvas == 0 {
            anyhow::bail!("message.canvas must be positive");
        }
        let c = &self.camera;
        if c.min_distance > c.max_distance {
            anyhow::bail!(
                "camera.min_distance ({}) exceeds camera.max_distance ({})",
                c.min_distance,
                c.max_distance
            );
        }
        if c.hand_min >= c.hand_max {
            anyhow::bail!("camera.hand_min must be below camera.hand_max");
        }
        Ok(())
    }
}

/// Process environment, read from .env
#[derive(Debug, Clone)]
pub struct Environment {
    pub log_dir: PathBuf,
    /// Overrides `Settings::seed` when set
    pub seed: Option<u64>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            seed: None,
        }
    }
}

impl Environment {
    /// Load environment from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Environment {
            log_dir: std::env::var("GESTURE_TREE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
            seed: std::env::var("GESTURE_TREE_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups() {
        let settings = Settings::default();
        let counts: Vec<usize> = settings.groups.iter().map(|g| g.count).collect();
        assert_eq!(counts, vec![4000, 600, 180]);
        assert_eq!(settings.debounce_ms, 1000);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_defaults() {
        let settings = Settings::default();
        let yaml = settings.to_yaml().unwrap();
        assert_eq!(Settings::from_yaml(&yaml).unwrap(), settings);
    }

    #[test]
    fn test_partial_yaml() {
        let settings = Settings::from_yaml(
            "seed: 42\ndebounce_ms: 500\ngesture:\n  pinch_max: 0.05\nmessage:\n  lines: [\"HELLO\"]\n",
        )
        .unwrap();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.debounce_ms, 500);
        assert_eq!(settings.gesture.pinch_max, 0.05);
        assert_eq!(settings.gesture.fist_max_avg, 0.23);
        assert_eq!(settings.message.lines, vec!["HELLO".to_string()]);
        assert_eq!(settings.message.canvas, 1024);
        assert_eq!(settings.groups.len(), 3);
    }

    #[test]
    fn test_rejects_inverted_camera_range() {
        let err = Settings::from_yaml("camera:\n  min_distance: 50\n  max_distance: 10\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_or_default("does/not/exist.yaml").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
