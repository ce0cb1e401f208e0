//! CLI command implementations

pub mod palette;
pub mod presets;
pub mod simulate;

use anyhow::{Context, Result};
use loci_particles::{PaletteSeed, PresetLibrary};

/// Built-in presets, or the given file merged over them
pub fn load_library(path: Option<&str>) -> Result<PresetLibrary> {
    match path {
        Some(path) => PresetLibrary::load(path)
            .with_context(|| format!("Failed to load presets from {path}")),
        None => Ok(PresetLibrary::default()),
    }
}

/// Interpret a command-line seed: anything that parses as a JSON number is a
/// numeric seed, everything else hashes as text.
pub fn parse_seed(raw: &str) -> PaletteSeed {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if value.is_number() => PaletteSeed::from(&value),
        _ => PaletteSeed::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_text_seeds() {
        assert_eq!(parse_seed("42"), PaletteSeed::Number(42.0));
        assert_eq!(parse_seed("-3.5"), PaletteSeed::Number(-3.5));
        assert_eq!(parse_seed("door-42"), PaletteSeed::Text("door-42".into()));
        assert_eq!(parse_seed("\"quoted\""), PaletteSeed::Text("\"quoted\"".into()));
        assert_eq!(parse_seed("true"), PaletteSeed::Text("true".into()));
    }

    #[test]
    fn test_default_library_without_path() {
        assert_eq!(load_library(None).unwrap(), PresetLibrary::default());
        assert!(load_library(Some("/no/such/presets.toml")).is_err());
    }
}
