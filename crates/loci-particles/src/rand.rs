//! Injectable uniform random source plus the default xorshift32 PRNG

use std::f32::consts::TAU;

/// A uniform random generator. Simulation code only ever draws through this
/// trait so tests can substitute a seeded or scripted source.
pub trait RandomSource {
    /// Returns a float in [0, 1)
    fn next_f32(&mut self) -> f32;

    /// Returns a float in [min, max)
    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Returns a float in [-half_width, half_width)
    fn centered(&mut self, width: f32) -> f32 {
        (self.next_f32() - 0.5) * width
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f32(&mut self) -> f32 {
        (**self).next_f32()
    }
}

/// Lightweight xorshift32 PRNG
#[derive(Debug, Clone)]
pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl Default for ParticleRng {
    fn default() -> Self {
        Self::new(0xDEAD_BEEF)
    }
}

impl RandomSource for ParticleRng {
    fn next_f32(&mut self) -> f32 {
        // top 24 bits fit the f32 mantissa exactly, so 1.0 is unreachable
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}

/// Uniform point inside the spherical shell `[inner, outer]`, as an offset
/// from the centre.
///
/// Radius uses the inverse cube law so density is uniform per unit volume
/// rather than per unit radius.
pub fn sample_shell<R: RandomSource + ?Sized>(rng: &mut R, inner: f32, outer: f32) -> [f32; 3] {
    let theta = TAU * rng.next_f32();
    let phi = (2.0 * rng.next_f32() - 1.0).clamp(-1.0, 1.0).acos();
    let inner3 = inner * inner * inner;
    let outer3 = outer * outer * outer;
    let r = (rng.next_f32() * (outer3 - inner3) + inner3).cbrt();
    // cbrt rounding can land a hair outside the shell
    let r = r.clamp(inner, outer);

    let sin_phi = phi.sin();
    [
        r * sin_phi * theta.cos(),
        r * phi.cos(),
        r * sin_phi * theta.sin(),
    ]
}
