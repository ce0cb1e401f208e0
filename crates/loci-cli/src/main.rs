//! Loci CLI - simulate and inspect particle aura and mist systems

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{palette, presets, simulate};
use loci_particles::ParticleKind;

#[derive(Parser)]
#[command(name = "loci")]
#[command(about = "Particle aura and mist engine for memory-palace rooms", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a particle system headlessly for a number of fixed steps
    Simulate {
        /// door, object or mist
        #[arg(long, default_value = "door", value_parser = parse_kind)]
        kind: ParticleKind,

        /// Palette seed; valid JSON numbers are numeric seeds, anything else is text
        #[arg(long)]
        seed: Option<String>,

        /// Number of 1/60 s steps to run
        #[arg(long, default_value = "360")]
        frames: u32,

        /// Start the fade-out after this many steps
        #[arg(long)]
        fade_after: Option<u32>,

        /// Seed for the particle random source
        #[arg(long, default_value = "3735928559")]
        rng_seed: u32,

        /// System origin (comma-separated x,y,z)
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,0")]
        position: [f32; 3],

        /// Preset TOML file overriding the built-in presets
        #[arg(long)]
        presets: Option<String>,

        /// Also upload and draw every step offscreen on a headless device
        #[arg(long)]
        gpu: bool,

        /// Edge length in pixels of the offscreen target used by --gpu
        #[arg(long, default_value = "256")]
        size: u32,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show which palette a seed selects
    Palette {
        /// door or object
        #[arg(long, default_value = "door", value_parser = parse_kind)]
        kind: ParticleKind,

        /// Seed to resolve
        seed: Option<String>,

        /// Instead of one seed, count selections over N generated string seeds
        #[arg(long)]
        histogram: Option<u32>,

        /// Preset TOML file with a [palettes] table
        #[arg(long)]
        presets: Option<String>,
    },

    /// Print the effective presets as TOML
    Presets {
        /// Preset TOML file to merge over the built-ins
        #[arg(long)]
        presets: Option<String>,
    },
}

fn parse_kind(s: &str) -> Result<ParticleKind, String> {
    s.parse().map_err(|e: loci_core::LociError| e.to_string())
}

fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma-separated values, got {}", parts.len()));
    }
    let x: f32 = parts[0].trim().parse().map_err(|e| format!("invalid x: {}", e))?;
    let y: f32 = parts[1].trim().parse().map_err(|e| format!("invalid y: {}", e))?;
    let z: f32 = parts[2].trim().parse().map_err(|e| format!("invalid z: {}", e))?;
    Ok([x, y, z])
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Simulate {
            kind,
            seed,
            frames,
            fade_after,
            rng_seed,
            position,
            presets,
            gpu,
            size,
            format,
        } => simulate::run(simulate::SimulateArgs {
            kind,
            seed,
            frames,
            fade_after,
            rng_seed,
            position,
            presets,
            gpu,
            size,
            format,
        }),
        Commands::Palette {
            kind,
            seed,
            histogram,
            presets,
        } => palette::run(kind, seed.as_deref(), histogram, presets.as_deref()),
        Commands::Presets { presets } => presets::run(presets.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1, 2.5,-3").unwrap(), [1.0, 2.5, -3.0]);
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("a,b,c").is_err());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("Mist").unwrap(), ParticleKind::Mist);
        assert!(parse_kind("portal").unwrap_err().contains("portal"));
    }

    #[test]
    fn test_cli_parses_simulate() {
        let cli = Cli::try_parse_from([
            "loci", "-vv", "simulate", "--kind", "object", "--seed", "42", "--fade-after", "10",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Simulate {
                kind,
                seed,
                frames,
                fade_after,
                ..
            } => {
                assert_eq!(kind, ParticleKind::Object);
                assert_eq!(seed.as_deref(), Some("42"));
                assert_eq!(frames, 360);
                assert_eq!(fade_after, Some(10));
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_cli_parses_gpu_target_size() {
        let cli = Cli::try_parse_from(["loci", "simulate", "--gpu", "--size", "128"]).unwrap();
        match cli.command {
            Commands::Simulate { gpu, size, .. } => {
                assert!(gpu);
                assert_eq!(size, 128);
            }
            _ => panic!("expected simulate"),
        }
        let cli = Cli::try_parse_from(["loci", "simulate"]).unwrap();
        assert!(matches!(cli.command, Commands::Simulate { gpu: false, size: 256, .. }));
    }
}
