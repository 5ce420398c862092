// Collimator window: live camera, calibration circles and a cross.
// Keys:
// • O opens the camera, C closes it, S shows the camera settings.
// • Tab picks circle 1-3 / cross / offset; arrows, PageUp/PageDown and K adjust it.
// • 1-5 show or hide; mouse wheel zooms; Q or ESC quits.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use collimator::camera::{CaptureSession, NokhwaOpener};
use collimator::config::Config;
use collimator::draw::Drawer;
use collimator::error::Error;
use collimator::locator::{Platform, list_devices, locate};
use collimator::settings::SettingsPanel;
use collimator::shell::Shell;
use env_logger::Env;
use log::{info, warn};

/// Telescope collimation aid: camera feed with calibration overlays.
#[derive(Debug, Parser)]
#[command(name = "collimator", version, about)]
struct Args {
    /// TOML configuration file (defaults to ./collimator.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Focus center file, overrides [paths] focus_file
    #[arg(long)]
    focus_file: Option<PathBuf>,

    /// Substring of the camera name to look for
    #[arg(long)]
    device_name: Option<String>,

    /// Print the cameras the backend reports and exit
    #[arg(long)]
    list_devices: bool,

    /// Open the configured camera, print every adjustable property and exit
    #[arg(long)]
    list_properties: bool,

    /// Open the camera at startup
    #[arg(long)]
    open: bool,
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = args.focus_file {
        config.paths.focus_file = path;
    }
    if let Some(name) = args.device_name {
        config.camera.device_name = Some(name);
    }

    let platform = Platform::current()?;
    if args.list_devices {
        for device in list_devices(platform)? {
            println!("{device}");
        }
        return Ok(());
    }
    if args.list_properties {
        return list_properties(&config, platform);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            warn!("Cannot install Ctrl+C handler: {e}");
        }
    }

    let mut drawer = Drawer::new("Collimator", config.window.width, config.window.height)?;
    let mut shell = Shell::new(&config, platform, Arc::new(NokhwaOpener::new(platform)));
    if args.open {
        shell.open_camera();
    }

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !shell.should_quit() && !interrupted.load(Ordering::SeqCst) {
        let shift = drawer.shift_down();
        for key in drawer.keys_pressed() {
            shell.on_key(key, shift);
        }
        if let Some(notches) = drawer.scroll_notches() {
            shell.on_wheel(notches);
        }

        let (w, h) = drawer.size();
        shell.resize(w, h);
        shell.tick();

        // minifb only pumps events from update, so present every pass.
        drawer.present(shell.surface().screen())?;
    }

    shell.shutdown();
    info!("Bye");
    Ok(())
}

/// Open the camera once, read every property through the capture thread and print it.
fn list_properties(config: &Config, platform: Platform) -> Result<(), Error> {
    let needle = config
        .camera
        .device_name
        .clone()
        .unwrap_or_else(|| platform.default_device_name().to_string());
    let index = locate(platform, &needle)?;

    let mut session = CaptureSession::new(
        Arc::new(NokhwaOpener::new(platform)),
        config.camera.capture_config(),
    );
    let stream = session.open_blocking(index)?;
    println!(
        "Camera {index}: {}x{} @ {} fps",
        stream.width, stream.height, stream.fps
    );
    for line in SettingsPanel::open(&session).lines() {
        println!("{}", line.trim_start_matches(['>', ' ']));
    }
    session.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "collimator",
            "--config",
            "scope.toml",
            "--device-name",
            "ZWO",
            "--open",
        ])
        .expect("parse");
        assert_eq!(args.config, Some(PathBuf::from("scope.toml")));
        assert_eq!(args.device_name.as_deref(), Some("ZWO"));
        assert!(args.open);
        assert!(!args.list_devices);
        assert!(!args.list_properties);
    }

    #[test]
    fn list_properties_flag() {
        let args = Args::try_parse_from(["collimator", "--list-properties"]).expect("parse");
        assert!(args.list_properties);
    }
}
