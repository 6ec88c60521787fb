//! Destroy and repair commands.

use super::CliError;
use kvbridge_core::Database;
use std::path::Path;
use tracing::info;

/// Removes the database at `path`.
pub fn destroy(path: &Path, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::Refused(format!(
            "refusing to destroy {} without --yes",
            path.display()
        )));
    }
    Database::destroy(path)?;
    println!("Destroyed {}", path.display());
    Ok(())
}

/// Runs the engine's repair pass over the database at `path`.
pub fn repair(path: &Path) -> Result<(), CliError> {
    info!(path = %path.display(), "repairing");
    Database::repair(path)?;
    println!("Repaired {}", path.display());
    Ok(())
}
