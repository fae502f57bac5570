pub mod auth;
pub mod create;
pub mod import;
pub mod inspect;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Read an .ics file, or stdin when `path` is "-".
pub fn read_ics(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Failed to read ICS from stdin")?;
        debug!(bytes = contents.len(), "Read ICS from stdin");
        return Ok(contents);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ICS from {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "Read ICS file");
    Ok(contents)
}
