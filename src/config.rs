use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::Rgba;
use crate::controller::Style;
use crate::hit_test::DEFAULT_TOLERANCE;

/// Startup defaults. Read from `config.json` in the platform config
/// directory when present; never written back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub default_color: Rgba,
    pub default_line_width: f32,
    pub default_font_size: f32,
    pub hit_tolerance: f32,
    /// Pointer travel below which a press-release counts as a tap.
    pub tap_slop: f32,
    pub font_paths: Vec<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_color: [255, 59, 48, 255],
            default_line_width: 3.0,
            default_font_size: 20.0,
            hit_tolerance: DEFAULT_TOLERANCE,
            tap_slop: 5.0,
            font_paths: Vec::new(),
        }
    }
}

impl EditorConfig {
    pub fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "annoshot", "annoshot")?;
        Some(dirs.config_dir().join("config.json"))
    }

    /// Defaults overlaid with the config file, if there is one. A broken file
    /// is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::read_from(&path) {
            Ok(config) => {
                log::debug!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("ignoring config: {err:#}");
                Self::default()
            }
        }
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn style(&self) -> Style {
        Style::default()
            .with_color(self.default_color)
            .with_line_width(self.default_line_width)
            .with_font_size(self.default_font_size)
    }
}
