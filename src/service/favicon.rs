use std::path::Path;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use tracing::info;

use super::{AppResult, MotdConfig};

const FAVICON_URI_PREFIX: &str = "data:image/png;base64,";

/// Reads a PNG from disk and returns it as a data URI (unpadded base64).
pub fn load_favicon<P: AsRef<Path>>(path: P) -> AppResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!(
        "{}{}",
        FAVICON_URI_PREFIX,
        STANDARD_NO_PAD.encode(bytes)
    ))
}

/// Swaps `motd.favicon_path` for the encoded image. An empty path is left alone.
pub fn apply_favicon(motd: &mut MotdConfig) -> AppResult<()> {
    if motd.favicon_path.is_empty() {
        return Ok(());
    }
    let encoded = load_favicon(&motd.favicon_path)?;
    info!(
        "loaded favicon from {} ({} encoded bytes)",
        motd.favicon_path,
        encoded.len()
    );
    motd.favicon_path = encoded;
    Ok(())
}
