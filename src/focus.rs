// Reads the calibrated focus center from the OCAL `focus.txt` file.
//
// The file is whitespace-separated; the 3rd and 4th tokens are the x/y center
// in frame pixels. Anything missing or unparsable falls back to (0, 0).

use std::path::Path;

use log::{info, warn};

pub const DEFAULT_FOCUS_FILE: &str = "focus.txt";

/// Parse the x/y tokens, `None` when there are fewer than four tokens or they are not numbers.
pub fn parse_focus(content: &str) -> Option<(f32, f32)> {
    let mut tokens = content.split_whitespace().skip(2);
    let x = tokens.next()?.parse::<f32>().ok()?;
    let y = tokens.next()?.parse::<f32>().ok()?;
    Some((x, y))
}

/// Read the focus center from `path`, or (0.0, 0.0) if the file is missing or malformed.
pub fn read_focus_center(path: &Path) -> (f32, f32) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read focus center from {}: {e}", path.display());
            return (0.0, 0.0);
        }
    };
    match parse_focus(&content) {
        Some(center) => {
            info!("Focus center from {}: {center:?}", path.display());
            center
        }
        None => {
            warn!("Malformed focus file {}, using (0, 0)", path.display());
            (0.0, 0.0)
        }
    }
}
