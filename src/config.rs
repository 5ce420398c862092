//! Configuration file handling.
//!
//! Loads `collimator.toml` from the working directory, or a custom path via
//! `--config`. Every field is optional; a missing file means all defaults.

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::camera::CaptureConfig;
use crate::error::{Error, Result};
use crate::focus::DEFAULT_FOCUS_FILE;
use crate::overlay::{CIRCLE_COUNT, CircleOverlay, CrossOverlay, OverlayState};
use crate::types::Rgb;

pub const DEFAULT_CONFIG_FILE: &str = "collimator.toml";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Substring of the device name to look for; platform default when unset
    pub device_name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Exposure forced right after open; Windows gets one by default
    pub manual_exposure: Option<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let capture = CaptureConfig::default();
        Self {
            device_name: None,
            width: capture.width,
            height: capture.height,
            fps: capture.fps,
            manual_exposure: capture.manual_exposure,
        }
    }
}

impl CameraConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            manual_exposure: self.manual_exposure,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CircleConfig {
    pub radius: f32,
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default)]
    pub visible: bool,
    pub color: Rgb,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CrossConfig {
    pub visible: bool,
    pub length: f32,
    pub thickness: f32,
    pub angle: f32,
    pub color: Rgb,
}

impl Default for CrossConfig {
    fn default() -> Self {
        let cross = CrossOverlay::default();
        Self {
            visible: cross.visible,
            length: cross.length,
            thickness: cross.thickness,
            angle: cross.angle,
            color: cross.color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Up to three circles; missing entries keep their defaults
    pub circles: Vec<CircleConfig>,
    pub cross: CrossConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let defaults = OverlayState::default();
        Self {
            circles: defaults
                .circles()
                .iter()
                .map(|c| CircleConfig {
                    radius: c.radius,
                    thickness: c.thickness,
                    visible: c.visible,
                    color: c.color,
                })
                .collect(),
            cross: CrossConfig::default(),
        }
    }
}

impl OverlayConfig {
    /// Initial overlay state. Extra circles past the third are ignored.
    pub fn to_state(&self) -> OverlayState {
        let mut circles = *OverlayState::default().circles();
        for (slot, c) in circles.iter_mut().zip(self.circles.iter().take(CIRCLE_COUNT)) {
            *slot = CircleOverlay {
                radius: c.radius,
                thickness: c.thickness,
                visible: c.visible,
                color: c.color,
            };
        }
        let c = self.cross;
        let cross = CrossOverlay {
            visible: c.visible,
            length: c.length,
            thickness: c.thickness,
            angle: c.angle,
            color: c.color,
        };
        OverlayState::new(circles, cross)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub focus_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            focus_file: PathBuf::from(DEFAULT_FOCUS_FILE),
        }
    }
}

fn default_thickness() -> f32 {
    2.0
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&content).map_err(|e| Error::Config {
            path: path.clone(),
            source: e,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
