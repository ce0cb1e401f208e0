//! Preset library: one preset per kind plus the palette lists, loadable
//! from a TOML file

use crate::palette::{PalettePair, PaletteTable};
use crate::preset::{parse_toml_rgb, ParticleKind, ParticlePreset};
use loci_core::{LociError, Result};
use std::path::Path;

/// Effective configuration for every kind of system a manager can create
#[derive(Debug, Clone, PartialEq)]
pub struct PresetLibrary {
    pub door: ParticlePreset,
    pub object: ParticlePreset,
    pub mist: ParticlePreset,
    pub palettes: PaletteTable,
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self {
            door: ParticlePreset::door(),
            object: ParticlePreset::object(),
            mist: ParticlePreset::mist(),
            palettes: PaletteTable::builtin(),
        }
    }
}

impl PresetLibrary {
    pub fn preset(&self, kind: ParticleKind) -> &ParticlePreset {
        match kind {
            ParticleKind::Door => &self.door,
            ParticleKind::Object => &self.object,
            ParticleKind::Mist => &self.mist,
        }
    }

    pub fn preset_mut(&mut self, kind: ParticleKind) -> &mut ParticlePreset {
        match kind {
            ParticleKind::Door => &mut self.door,
            ParticleKind::Object => &mut self.object,
            ParticleKind::Mist => &mut self.mist,
        }
    }

    /// Parse a preset file. Missing tables keep the built-in defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let root: toml::value::Table = toml::from_str(toml_str)?;
        let mut library = Self::default();

        for (key, value) in &root {
            if key == "palettes" {
                let table = value.as_table().ok_or_else(|| {
                    LociError::ParseError("[palettes] must be a table".to_string())
                })?;
                library.palettes = parse_palettes(table)?;
                continue;
            }

            match key.parse::<ParticleKind>() {
                Ok(kind) => {
                    let table = value.as_table().ok_or_else(|| {
                        LociError::ParseError(format!("[{key}] must be a table"))
                    })?;
                    *library.preset_mut(kind) = ParticlePreset::from_toml(kind, table);
                }
                Err(_) => log::warn!("ignoring unknown preset section '{key}'"),
            }
        }

        Ok(library)
    }

    /// Read and parse a preset file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let library = Self::from_toml_str(&content)?;
        log::info!(
            "Loaded presets from {} ({} door / {} object palettes)",
            path.display(),
            library.palettes.door.len(),
            library.palettes.object.len()
        );
        Ok(library)
    }

    /// Serialise every preset and both palette lists
    pub fn to_toml_string(&self) -> Result<String> {
        let mut root = toml::value::Table::new();
        for kind in ParticleKind::ALL {
            root.insert(
                kind.as_str().to_string(),
                toml::Value::Table(self.preset(kind).to_toml()),
            );
        }

        let mut palettes = toml::value::Table::new();
        palettes.insert("door".to_string(), pairs_to_toml(&self.palettes.door));
        palettes.insert("object".to_string(), pairs_to_toml(&self.palettes.object));
        root.insert("palettes".to_string(), toml::Value::Table(palettes));

        Ok(toml::to_string_pretty(&root)?)
    }
}

fn parse_palettes(table: &toml::value::Table) -> Result<PaletteTable> {
    let mut palettes = PaletteTable::builtin();
    for (key, value) in table {
        let pairs = parse_pair_list(key, value)?;
        match key.as_str() {
            "door" => palettes.door = pairs,
            "object" => palettes.object = pairs,
            other => log::warn!("ignoring palette list '{other}'"),
        }
    }
    Ok(palettes)
}

fn parse_pair_list(key: &str, value: &toml::Value) -> Result<Vec<PalettePair>> {
    let entries = value
        .as_array()
        .ok_or_else(|| LociError::ParseError(format!("palettes.{key} must be an array")))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let bad = || LociError::ParseError(format!("palettes.{key}[{i}]: expected two colours"));
            match entry.as_array().map(Vec::as_slice) {
                Some([a, b]) => {
                    let a = parse_toml_rgb(a).ok_or_else(bad)?;
                    let b = parse_toml_rgb(b).ok_or_else(bad)?;
                    Ok(PalettePair::new(a, b))
                }
                _ => Err(bad()),
            }
        })
        .collect()
}

fn pairs_to_toml(pairs: &[PalettePair]) -> toml::Value {
    toml::Value::Array(
        pairs
            .iter()
            .map(|p| {
                toml::Value::Array(vec![
                    toml::Value::String(p.a.to_string()),
                    toml::Value::String(p.b.to_string()),
                ])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loci_core::Rgb;

    #[test]
    fn test_empty_file_gives_defaults() {
        let lib = PresetLibrary::from_toml_str("").unwrap();
        assert_eq!(lib, PresetLibrary::default());
    }

    #[test]
    fn test_sections_overlay_defaults() {
        let lib = PresetLibrary::from_toml_str(
            r##"
[door]
particle_count = 64
colour_a = "#ff0000"

[mist]
breath_hz = 0.0
"##,
        )
        .unwrap();
        assert_eq!(lib.door.particle_count, 64);
        assert_eq!(lib.door.colour_a, Rgb::from_hex(0xff0000));
        assert_eq!(lib.door.speed, ParticlePreset::door().speed);
        assert_eq!(lib.mist.mist.breath_hz, 0.0);
        assert_eq!(lib.object, ParticlePreset::object());
    }

    #[test]
    fn test_palettes_override_builtin_lists() {
        let lib = PresetLibrary::from_toml_str(
            r##"
[palettes]
door = [["#112233", "#445566"], [0xffffff, [0.0, 0.5, 1.0]]]
object = []
"##,
        )
        .unwrap();
        assert_eq!(lib.palettes.door.len(), 2);
        assert_eq!(
            lib.palettes.door[0],
            PalettePair::from_hex(0x112233, 0x445566)
        );
        assert_eq!(lib.palettes.door[1].b, Rgb::new(0.0, 0.5, 1.0));
        assert!(lib.palettes.object.is_empty());
    }

    #[test]
    fn test_bad_palette_entry_is_an_error() {
        let err = PresetLibrary::from_toml_str("[palettes]\ndoor = [[\"#112233\"]]").unwrap_err();
        assert!(matches!(err, LociError::ParseError(_)));

        let err = PresetLibrary::from_toml_str("[palettes]\ndoor = [[\"#112233\", \"nope\"]]")
            .unwrap_err();
        assert!(err.to_string().contains("palettes.door[0]"));
    }

    #[test]
    fn test_section_must_be_a_table() {
        let err = PresetLibrary::from_toml_str("door = 3").unwrap_err();
        assert!(matches!(err, LociError::ParseError(_)));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let err = PresetLibrary::from_toml_str("[door").unwrap_err();
        assert!(matches!(err, LociError::TomlParseError(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut lib = PresetLibrary::default();
        lib.door.particle_count = 33;
        lib.palettes.object.truncate(3);
        let text = lib.to_toml_string().unwrap();
        let back = PresetLibrary::from_toml_str(&text).unwrap();
        assert_eq!(back.door.particle_count, 33);
        assert_eq!(back.palettes.object.len(), 3);
        assert_eq!(back.palettes.door.len(), lib.palettes.door.len());
        for (a, b) in back.palettes.door.iter().zip(&lib.palettes.door) {
            assert_eq!(a.a.to_hex(), b.a.to_hex());
            assert_eq!(a.b.to_hex(), b.b.to_hex());
        }
        assert!((back.mist.mist.breath_hz - lib.mist.mist.breath_hz).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = PresetLibrary::load("/definitely/not/here/presets.toml").unwrap_err();
        assert!(matches!(err, LociError::IoError(_)));
    }
}
