use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilecrop")
        .join("config.toml")
}

fn default_participants_file() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("performance_config.txt")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub layout: CropSettings,
    pub scenes: SceneSettings,
    pub transition: TransitionSettings,
    pub participants: ParticipantSettings,
    pub collaborator: CollaboratorSettings,
    pub dry_run: DryRunSettings,
}

/// Geometry used to carve the upstream gallery into per-tile crops.
///
/// The single-item margin, push-down rule and the 16/18 quantization were
/// tuned by eye against the upstream gallery renderer. Keep the values as they
/// are unless the renderer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropSettings {
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    /// Gap between neighbouring tiles, both axes.
    pub spacing: f64,
    /// Tile width divided by tile height.
    pub aspect_ratio: f64,
    /// Extra horizontal margin removed when only one tile is shown.
    pub single_item_extra_margin: f64,
    /// From this many tiles on, every tile sits `push_down_offset` lower.
    pub push_down_threshold: usize,
    pub push_down_offset: f64,
    /// Tile widths are rounded down to a multiple of this.
    pub width_quantum: u32,
    /// Tile heights are rounded down to a multiple of this.
    pub height_quantum: u32,
}

impl Default for CropSettings {
    fn default() -> Self {
        CropSettings {
            top_margin: 94.0,
            bottom_margin: 122.0,
            left_margin: 26.0,
            right_margin: 26.0,
            spacing: 12.0,
            aspect_ratio: 16.0 / 9.0,
            single_item_extra_margin: 140.0,
            push_down_threshold: 7,
            push_down_offset: 1.0,
            width_quantum: 16,
            height_quantum: 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSettings {
    /// Scene for `n` visible tiles is `<prefix><n>`.
    pub prefix: String,
    pub blank_scene: String,
    /// Source kinds that show the upstream gallery and therefore get cropped.
    pub capture_kinds: Vec<String>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        SceneSettings {
            prefix: "z".to_string(),
            blank_scene: "blank-black".to_string(),
            capture_kinds: vec!["display_capture".to_string(), "window_capture".to_string()],
        }
    }
}

impl SceneSettings {
    pub fn is_capture_kind(&self, kind: &str) -> bool {
        self.capture_kinds.iter().any(|k| k == kind)
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransitionSettings {
    pub name: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "fade_out_ms")]
    pub fade_out: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "settle_ms")]
    pub settle: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "fade_in_ms")]
    pub fade_in: Duration,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        TransitionSettings {
            name: "Fade".to_string(),
            fade_out: Duration::from_millis(500),
            settle: Duration::from_millis(50),
            fade_in: Duration::from_millis(1000),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticipantSettings {
    pub path: PathBuf,
    /// Pause after each upstream refresh request before the list is read.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "refresh_settle_ms")]
    pub refresh_settle: Duration,
}

impl Default for ParticipantSettings {
    fn default() -> Self {
        ParticipantSettings {
            path: default_participants_file(),
            refresh_settle: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollaboratorSettings {
    /// Extra attempts for idempotent compositor calls (crop, scene switch).
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DryRunSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    pub max_tiles: usize,
}

impl Default for DryRunSettings {
    fn default() -> Self {
        DryRunSettings {
            frame_width: 3840,
            frame_height: 2400,
            max_tiles: 25,
        }
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    pub fn to_toml(&self) -> anyhow::Result<String> { Ok(toml::to_string_pretty(self)?) }
}
