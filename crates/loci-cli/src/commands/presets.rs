//! Presets command

use super::load_library;
use anyhow::{Context, Result};

pub fn run(presets: Option<&str>) -> Result<()> {
    let library = load_library(presets)?;
    let text = library
        .to_toml_string()
        .context("Failed to serialise presets")?;
    print!("{text}");
    Ok(())
}
