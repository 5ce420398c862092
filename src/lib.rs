//! Telescope collimator: a live camera view with calibration circles and a
//! cross drawn over it.
//!
//! - Camera discovery and capture via [`locator`] and [`camera`]
//! - Overlay geometry via [`overlay`] and [`view`]
//! - Software rendering via [`render`] and [`draw`]
//! - Input handling via [`controls`] and [`shell`]

pub mod camera;
pub mod config;
pub mod controls;
pub mod draw;
pub mod error;
pub mod focus;
pub mod locator;
pub mod overlay;
pub mod render;
pub mod settings;
pub mod shell;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
