//! Finding the collimation camera among the system's video devices.

use log::{debug, info};
use nokhwa::query;
use nokhwa::utils::ApiBackend;

use crate::camera::DeviceInfo;
use crate::error::{Error, Result};

/// Host platform, which decides the capture backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
}

impl Platform {
    /// Detect the running OS.
    ///
    /// # Errors
    /// * `Error::UnsupportedPlatform` - no capture backend exists for this OS
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn backend(self) -> ApiBackend {
        match self {
            Platform::Linux => ApiBackend::Video4Linux,
            Platform::Windows => ApiBackend::MediaFoundation,
            Platform::MacOs => ApiBackend::AVFoundation,
        }
    }

    /// Substring the OCAL camera reports in its device name on this platform.
    pub fn default_device_name(self) -> &'static str {
        match self {
            Platform::Linux => "ocal2: ocal2",
            Platform::Windows | Platform::MacOs => "ocal2",
        }
    }
}

/// List the video devices the platform backend can see.
pub fn list_devices(platform: Platform) -> Result<Vec<DeviceInfo>> {
    let devices = query(platform.backend()).map_err(|e| Error::Query(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| DeviceInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Index of the first device whose name contains `needle`.
///
/// V4L2 enumeration reports the camera one node above the index the capture
/// backend opens it by, so Linux matches are shifted down by one.
pub fn find_camera_index(devices: &[DeviceInfo], needle: &str, platform: Platform) -> Option<u32> {
    let found = devices.iter().find(|d| d.name.contains(needle))?;
    let index = match platform {
        Platform::Linux => found.index.saturating_sub(1),
        Platform::Windows | Platform::MacOs => found.index,
    };
    debug!("Matched '{needle}' at {found}, opening index {index}");
    Some(index)
}

/// Query the OS and locate the camera named `needle`.
///
/// # Errors
/// * `Error::DeviceNotFound` - nothing matched; the caller should warn and stay idle
/// * `Error::Query` - the backend could not enumerate devices
pub fn locate(platform: Platform, needle: &str) -> Result<u32> {
    let devices = list_devices(platform)?;
    for device in &devices {
        debug!("{device}");
    }
    let index = find_camera_index(&devices, needle, platform)
        .ok_or_else(|| Error::DeviceNotFound(needle.to_string()))?;
    info!("Found camera '{needle}' at index {index}");
    Ok(index)
}
