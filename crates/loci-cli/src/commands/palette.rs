//! Palette command

use super::{load_library, parse_seed};
use anyhow::{bail, Result};
use loci_particles::palette::palette_index;
use loci_particles::{PalettePair, PaletteSeed, ParticleKind, ParticleRng};

pub fn run(
    kind: ParticleKind,
    seed: Option<&str>,
    histogram: Option<u32>,
    presets: Option<&str>,
) -> Result<()> {
    if kind.is_mist() {
        bail!("mist systems do not use a palette");
    }
    let library = load_library(presets)?;
    let pairs = library.palettes.pairs_for(kind);
    if pairs.is_empty() {
        let preset = library.preset(kind);
        println!(
            "{kind} palette list is empty; systems use preset colours {}",
            PalettePair::new(preset.colour_a, preset.colour_b)
        );
        return Ok(());
    }

    if let Some(n) = histogram {
        let counts = histogram_counts(n, pairs.len());
        println!("{n} seeds over {} {kind} palettes:", pairs.len());
        for (i, (pair, count)) in pairs.iter().zip(&counts).enumerate() {
            println!("  [{i:2}] {pair}  {count:>7}  {:5.2}%", share(*count, n));
        }
        return Ok(());
    }

    let Some(raw) = seed else {
        bail!("pass a seed or --histogram N");
    };
    let seed = parse_seed(raw);
    let mut rng = ParticleRng::default();
    if let Some(i) = palette_index(Some(&seed), pairs.len(), &mut rng) {
        println!("{} (hash {:#010x}) -> [{i}] {}", describe(&seed), seed.hash(), pairs[i]);
    }
    Ok(())
}

/// Selection counts per palette index for seeds `seed-0 .. seed-(n-1)`
fn histogram_counts(n: u32, len: usize) -> Vec<u32> {
    let mut counts = vec![0u32; len];
    let mut rng = ParticleRng::default();
    for i in 0..n {
        let seed = PaletteSeed::Text(format!("seed-{i}"));
        if let Some(idx) = palette_index(Some(&seed), len, &mut rng) {
            counts[idx] += 1;
        }
    }
    counts
}

fn share(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn describe(seed: &PaletteSeed) -> String {
    match seed {
        PaletteSeed::Number(n) => format!("number {n}"),
        PaletteSeed::Text(s) => format!("text {s:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_covers_every_index() {
        let counts = histogram_counts(2_000, 10);
        assert_eq!(counts.iter().sum::<u32>(), 2_000);
        assert!(counts.iter().all(|c| *c > 0));
    }

    #[test]
    fn test_share() {
        assert_eq!(share(0, 0), 0.0);
        assert!((share(25, 200) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_mist_has_no_palette() {
        assert!(run(ParticleKind::Mist, Some("x"), None, None).is_err());
    }
}
