//! Deterministic two-colour palette selection
//!
//! A seed picks one entry from a fixed ordered list of gradients:
//! - no seed: uniform random index from the injected generator
//! - numeric seed: 32-bit xorshift scramble, then modulo
//! - anything else: stringified, FNV-1a with a final avalanche, then modulo
//!
//! The hash path is pure `u32` arithmetic, so a seed maps to the same pair on
//! every run and platform.

use crate::preset::ParticleKind;
use crate::rand::RandomSource;
use loci_core::Rgb;
use std::fmt;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Built-in door gradients
pub const DOOR_PALETTE: [(u32, u32); 10] = [
    (0xffd27f, 0xff8a3d),
    (0xfff1a8, 0xffb347),
    (0xffb3c7, 0xff5e8a),
    (0xc6a0ff, 0x7a4dff),
    (0x9ef0ff, 0x3fb8ff),
    (0xa8ffcf, 0x2fd18f),
    (0xffe3b3, 0xe08e45),
    (0xff9e9e, 0xd93f3f),
    (0xf7f3c6, 0xc9b458),
    (0xb8c6ff, 0x5566dd),
];

/// Built-in object gradients
pub const OBJECT_PALETTE: [(u32, u32); 10] = [
    (0x9fd8ff, 0x5b7cff),
    (0xd7b8ff, 0x9b5cff),
    (0xbfffe9, 0x40d9b0),
    (0xffe0f0, 0xff7ac2),
    (0xfff6c2, 0xffc94d),
    (0xc2f0ff, 0x4fc3f7),
    (0xe6ffc2, 0x8bd94f),
    (0xffd6c2, 0xff8f5c),
    (0xdcdcff, 0x8080ff),
    (0xc2fff6, 0x33ccbb),
];

/// A two-colour gradient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalettePair {
    pub a: Rgb,
    pub b: Rgb,
}

impl PalettePair {
    pub const fn new(a: Rgb, b: Rgb) -> Self {
        Self { a, b }
    }

    pub fn from_hex(a: u32, b: u32) -> Self {
        Self {
            a: Rgb::from_hex(a),
            b: Rgb::from_hex(b),
        }
    }
}

impl fmt::Display for PalettePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.a, self.b)
    }
}

/// Seed for palette selection
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteSeed {
    Number(f64),
    Text(String),
}

impl PaletteSeed {
    /// Stringify any displayable value into a text seed
    pub fn text(value: impl fmt::Display) -> Self {
        PaletteSeed::Text(value.to_string())
    }

    /// The 32-bit hash whose residue selects the palette entry
    pub fn hash(&self) -> u32 {
        match self {
            PaletteSeed::Number(n) => xorshift_scramble(to_uint32(*n)),
            PaletteSeed::Text(s) => fnv1a_avalanche(s),
        }
    }
}

impl From<&str> for PaletteSeed {
    fn from(s: &str) -> Self {
        PaletteSeed::Text(s.to_string())
    }
}

impl From<String> for PaletteSeed {
    fn from(s: String) -> Self {
        PaletteSeed::Text(s)
    }
}

impl From<f64> for PaletteSeed {
    fn from(n: f64) -> Self {
        PaletteSeed::Number(n)
    }
}

impl From<i64> for PaletteSeed {
    fn from(n: i64) -> Self {
        PaletteSeed::Number(n as f64)
    }
}

impl From<u32> for PaletteSeed {
    fn from(n: u32) -> Self {
        PaletteSeed::Number(n as f64)
    }
}

impl From<&serde_json::Value> for PaletteSeed {
    /// JSON numbers are numeric seeds; every other value hashes its text form
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(PaletteSeed::Number)
                .unwrap_or_else(|| PaletteSeed::text(n)),
            serde_json::Value::String(s) => PaletteSeed::Text(s.clone()),
            other => PaletteSeed::text(other),
        }
    }
}

/// Modular conversion of a number to an unsigned 32-bit integer:
/// truncate toward zero, wrap modulo 2^32, non-finite → 0.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// Decorrelates small consecutive integer seeds
pub fn xorshift_scramble(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// 32-bit FNV-1a over the UTF-8 bytes, followed by an avalanche
pub fn fnv1a_avalanche(s: &str) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for byte in s.bytes() {
        h ^= byte as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h ^= h << 13;
    h ^= h >> 7;
    h ^= h << 17;
    h
}

/// Index into a list of `len` entries, or `None` when the list is empty
pub fn palette_index<R: RandomSource + ?Sized>(
    seed: Option<&PaletteSeed>,
    len: usize,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let idx = match seed {
        Some(seed) => seed.hash() as usize % len,
        None => ((rng.next_f32() * len as f32) as usize).min(len - 1),
    };
    Some(idx)
}

/// The ordered door and object palette lists
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteTable {
    pub door: Vec<PalettePair>,
    pub object: Vec<PalettePair>,
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PaletteTable {
    pub fn builtin() -> Self {
        let pairs = |list: &[(u32, u32)]| -> Vec<PalettePair> {
            list.iter()
                .map(|&(a, b)| PalettePair::from_hex(a, b))
                .collect()
        };
        Self {
            door: pairs(&DOOR_PALETTE),
            object: pairs(&OBJECT_PALETTE),
        }
    }

    /// Palette list for `kind`; mist has none
    pub fn pairs_for(&self, kind: ParticleKind) -> &[PalettePair] {
        match kind {
            ParticleKind::Door => &self.door,
            ParticleKind::Object => &self.object,
            ParticleKind::Mist => &[],
        }
    }

    /// Resolve the gradient for a new system, falling back to `fallback`
    /// (the preset's own colours) when the list for `kind` is empty.
    pub fn choose_pair<R: RandomSource + ?Sized>(
        &self,
        kind: ParticleKind,
        seed: Option<&PaletteSeed>,
        fallback: PalettePair,
        rng: &mut R,
    ) -> PalettePair {
        let pairs = self.pairs_for(kind);
        match palette_index(seed, pairs.len(), rng) {
            Some(idx) => pairs[idx],
            None => {
                if !kind.is_mist() {
                    log::warn!("{kind} palette list is empty; using preset colours");
                }
                fallback
            }
        }
    }
}
