// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No video device name matched the configured substring.
    #[error("No camera matching '{0}' found")]
    DeviceNotFound(String),

    /// The backend refused to open or configure the device.
    #[error("Camera open error: {0}")]
    DeviceOpen(String),

    /// Enumerating devices through the OS backend failed.
    #[error("Camera query error: {0}")]
    Query(String),

    /// Grabbing or decoding a frame failed.
    #[error("Camera frame error: {0}")]
    CameraFrame(String),

    /// No capture backend exists for this OS.
    #[error("Unsupported platform: {0}. Supported platforms are Linux, Windows and macOS")]
    UnsupportedPlatform(String),

    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A capture session is already opening or streaming.
    #[error("Capture session is already running")]
    SessionBusy,

    /// The capture thread went away while we were talking to it.
    #[error("Capture thread terminated unexpectedly")]
    Disconnected,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
