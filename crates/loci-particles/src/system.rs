//! One running particle simulation

use crate::buffers::{allocate, ParticleBuffers};
use crate::integrator::{self, StepReport};
use crate::palette::{PalettePair, PaletteSeed, PaletteTable};
use crate::preset::{ParticleKind, ParticlePreset};
use crate::rand::RandomSource;
use loci_core::Vec3;

/// Length of the global fade-out ramp in simulated seconds
pub const FADE_OUT_SECONDS: f64 = 1.0;

/// Explicit fade-out request state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FadeOut {
    pub active: bool,
    /// Elapsed simulation time when the fade was requested
    pub start_time: f64,
}

impl FadeOut {
    /// Global alpha multiplier at simulation time `now`: 1 until a fade is
    /// requested, then a linear ramp to exactly 0 over `FADE_OUT_SECONDS`.
    pub fn multiplier(&self, now: f64) -> f32 {
        if !self.active {
            return 1.0;
        }
        let remaining = 1.0 - (now - self.start_time) / FADE_OUT_SECONDS;
        // summed fixed steps land within rounding of the end, not on it
        if remaining <= 1e-9 {
            0.0
        } else {
            remaining.min(1.0) as f32
        }
    }
}

/// Uniform values handed to the renderer after each step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Elapsed simulation time in seconds
    pub time: f32,
    pub point_scale: f32,
    /// base alpha × fade × breath
    pub global_alpha: f32,
}

/// Pure simulation state for one system. Holds no renderer handles.
#[derive(Debug, Clone)]
pub struct ParticleSystemInstance {
    pub(crate) preset: ParticlePreset,
    pub(crate) origin: Vec3,
    pub(crate) buffers: ParticleBuffers,
    pub(crate) elapsed_time: f64,
    pub(crate) fade_out: FadeOut,
    pub(crate) palette: Option<PalettePair>,
    pub(crate) point_scale: f32,
    pub(crate) uniforms: FrameUniforms,
}

impl ParticleSystemInstance {
    /// Resolve the palette (door/object only) and allocate the buffers
    pub fn new<R: RandomSource + ?Sized>(
        preset: ParticlePreset,
        origin: Vec3,
        seed: Option<&PaletteSeed>,
        palettes: &PaletteTable,
        rng: &mut R,
    ) -> Self {
        let preset = preset.sanitized();
        let palette = if preset.kind.is_mist() {
            None
        } else {
            let fallback = PalettePair::new(preset.colour_a, preset.colour_b);
            Some(palettes.choose_pair(preset.kind, seed, fallback, rng))
        };
        let buffers = allocate(&preset, origin, rng);

        let mut instance = Self {
            preset,
            origin,
            buffers,
            elapsed_time: 0.0,
            fade_out: FadeOut::default(),
            palette,
            point_scale: 1.0,
            uniforms: FrameUniforms {
                time: 0.0,
                point_scale: 1.0,
                global_alpha: 1.0,
            },
        };
        instance.uniforms = integrator::frame_uniforms(&instance);
        instance
    }

    /// Advance exactly one step of `dt` seconds
    pub fn step<R: RandomSource + ?Sized>(&mut self, dt: f32, rng: &mut R) -> StepReport {
        integrator::step(self, dt, rng)
    }

    /// Begin the global fade. Returns false if a fade was already running;
    /// the original start time is kept so the ramp stays monotonic.
    pub fn start_fade_out(&mut self) -> bool {
        if self.fade_out.active {
            return false;
        }
        self.fade_out = FadeOut {
            active: true,
            start_time: self.elapsed_time,
        };
        true
    }

    /// Current global fade multiplier
    pub fn fade_multiplier(&self) -> f32 {
        self.fade_out.multiplier(self.elapsed_time)
    }

    /// True once a requested fade has fully run out. The caller disposes.
    pub fn fade_complete(&self) -> bool {
        self.fade_out.active && (self.buffers.is_empty() || self.fade_multiplier() == 0.0)
    }

    pub fn kind(&self) -> ParticleKind {
        self.preset.kind
    }

    pub fn preset(&self) -> &ParticlePreset {
        &self.preset
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn buffers(&self) -> &ParticleBuffers {
        &self.buffers
    }

    pub fn particle_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn fade_out(&self) -> FadeOut {
        self.fade_out
    }

    /// Palette chosen at creation; `None` for mist
    pub fn palette(&self) -> Option<PalettePair> {
        self.palette
    }

    /// Gradient actually used for colouring: the chosen palette, or the
    /// preset colours for mist
    pub fn colours(&self) -> PalettePair {
        self.palette
            .unwrap_or_else(|| PalettePair::new(self.preset.colour_a, self.preset.colour_b))
    }

    pub fn uniforms(&self) -> FrameUniforms {
        self.uniforms
    }

    pub fn point_scale(&self) -> f32 {
        self.point_scale
    }

    /// Takes effect in the uniforms immediately
    pub fn set_point_scale(&mut self, scale: f32) {
        self.point_scale = scale;
        self.uniforms.point_scale = scale;
    }
}
