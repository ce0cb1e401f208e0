//! Loci Particles - CPU simulation for door/object auras and volumetric mist
//!
//! Provides per-system particle simulation with:
//! - Deterministic seed-to-palette selection
//! - Struct-of-arrays attribute buffers filled from a spherical-shell spawn
//! - Fixed-step integration with respawn, gravity/drift and a global fade-out
//! - Dirty attribute masks so a renderer uploads only what changed

pub mod attributes;
pub mod buffers;
pub mod clock;
pub mod curves;
pub mod integrator;
pub mod library;
pub mod manager;
pub mod palette;
pub mod preset;
pub mod rand;
pub mod system;

pub use attributes::AttributeMask;
pub use buffers::ParticleBuffers;
pub use clock::FixedStepClock;
pub use integrator::{StepReport, FIXED_DT};
pub use library::PresetLibrary;
pub use manager::{ManagerStats, ParticleSystemManager};
pub use palette::{PalettePair, PaletteSeed, PaletteTable};
pub use preset::{MistParams, ParticleKind, ParticlePreset};
pub use rand::{ParticleRng, RandomSource};
pub use system::{FadeOut, FrameUniforms, ParticleSystemInstance};
