//! Struct-of-arrays particle storage and the spawn distribution
//!
//! Every attribute lives in its own flat `Vec<f32>` indexed by particle id,
//! which is also the layout the renderer uploads.

use crate::preset::{ParticleKind, ParticlePreset};
use crate::rand::{sample_shell, RandomSource};
use loci_core::Vec3;
use std::f32::consts::TAU;

/// Per-particle attribute arrays for one system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    /// xyz per particle
    pub position: Vec<f32>,
    /// xyz per particle
    pub velocity: Vec<f32>,
    /// Live render size
    pub size: Vec<f32>,
    /// Size reference the pulse is computed from
    pub base_size: Vec<f32>,
    /// rgb per particle (premultiplied for glow systems)
    pub color: Vec<f32>,
    /// (current, max) seconds per particle
    pub lifetime: Vec<f32>,
    /// (frequency Hz, phase) per particle
    pub flicker: Vec<f32>,
    /// Shader rotation/noise offset in [0, 1); 0 for door/object
    pub seed: Vec<f32>,
}

impl ParticleBuffers {
    /// Zero-filled buffers for `count` particles
    pub fn with_count(count: usize) -> Self {
        Self {
            position: vec![0.0; count * 3],
            velocity: vec![0.0; count * 3],
            size: vec![0.0; count],
            base_size: vec![0.0; count],
            color: vec![0.0; count * 3],
            lifetime: vec![0.0; count * 2],
            flicker: vec![0.0; count * 2],
            seed: vec![0.0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.size.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn position_of(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.position[i * 3],
            self.position[i * 3 + 1],
            self.position[i * 3 + 2],
        )
    }

    pub fn velocity_of(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.velocity[i * 3],
            self.velocity[i * 3 + 1],
            self.velocity[i * 3 + 2],
        )
    }

    /// (current, max) lifetime of particle `i`
    pub fn lifetime_of(&self, i: usize) -> (f32, f32) {
        (self.lifetime[i * 2], self.lifetime[i * 2 + 1])
    }

    pub fn color_of(&self, i: usize) -> [f32; 3] {
        [self.color[i * 3], self.color[i * 3 + 1], self.color[i * 3 + 2]]
    }
}

/// Allocate buffers for `preset.particle_count` particles around `origin`
/// and fill them with the initial spawn distribution.
pub fn allocate<R: RandomSource + ?Sized>(
    preset: &ParticlePreset,
    origin: Vec3,
    rng: &mut R,
) -> ParticleBuffers {
    let mut buffers = ParticleBuffers::with_count(preset.particle_count);
    for i in 0..preset.particle_count {
        spawn_particle(&mut buffers, i, preset, origin, rng);
        buffers.seed[i] = if preset.kind.is_mist() {
            rng.next_f32()
        } else {
            0.0
        };
    }
    buffers
}

/// (Re)initialise particle `i`: shell position, velocity, size, lifetime and
/// flicker. The shader seed is left untouched.
pub(crate) fn spawn_particle<R: RandomSource + ?Sized>(
    buffers: &mut ParticleBuffers,
    i: usize,
    preset: &ParticlePreset,
    origin: Vec3,
    rng: &mut R,
) {
    let [ox, oy, oz] = sample_shell(rng, preset.spawn_radius.inner, preset.spawn_radius.outer);
    buffers.position[i * 3] = origin.x + ox;
    buffers.position[i * 3 + 1] = origin.y + oy;
    buffers.position[i * 3 + 2] = origin.z + oz;

    let v = initial_velocity(preset, rng);
    buffers.velocity[i * 3..i * 3 + 3].copy_from_slice(&v);

    let size = preset.base_size + rng.next_f32() * preset.size_jitter;
    buffers.base_size[i] = size;
    buffers.size[i] = size;

    buffers.lifetime[i * 2] = 0.0;
    buffers.lifetime[i * 2 + 1] = preset.lifetime.lerp(rng.next_f32());

    let band = preset.kind.flicker_band();
    buffers.flicker[i * 2] = band.lerp(rng.next_f32());
    buffers.flicker[i * 2 + 1] = rng.next_f32() * TAU;
}

fn initial_velocity<R: RandomSource + ?Sized>(preset: &ParticlePreset, rng: &mut R) -> [f32; 3] {
    match preset.kind {
        ParticleKind::Mist => {
            let speed = preset.speed.lerp(rng.next_f32());
            [
                rng.centered(2.0) * speed,
                rng.centered(2.0) * speed,
                rng.centered(2.0) * speed,
            ]
        }
        ParticleKind::Door | ParticleKind::Object => {
            let angle = rng.next_f32() * TAU;
            let tangential = preset.spread * rng.next_f32();
            let speed = preset.speed.lerp(rng.next_f32());
            [
                angle.cos() * tangential,
                speed * preset.upward_bias,
                angle.sin() * tangential,
            ]
        }
    }
}
