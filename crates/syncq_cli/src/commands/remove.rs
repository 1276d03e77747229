//! Remove command implementation.

use super::{open_queue, CliError, CliResult};
use std::path::Path;

/// Runs the remove command.
pub fn run(path: &Path, key: &str, id: &str) -> CliResult<()> {
    let engine = open_queue(path, key, false)?;
    if !engine.remove_item(id) {
        return Err(CliError::NotFound(id.to_string()));
    }
    println!("Removed {}", id);
    Ok(())
}
