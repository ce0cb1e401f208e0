//! Fixed-step particle integrator
//!
//! One call to [`step`] ages every particle (respawning the expired ones),
//! integrates position, updates velocity and derives the visual attributes.
//! Everything is an in-place mutation of the instance's buffers.

use crate::buffers::spawn_particle;
use crate::curves::{ease_lookup, lerp_f32};
use crate::palette::PalettePair;
use crate::preset::{MistParams, ParticlePreset};
use crate::rand::RandomSource;
use crate::system::{FrameUniforms, ParticleSystemInstance};
use std::f32::consts::{PI, TAU};

/// Simulation timestep; steps are counted, not measured
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Fraction of life spent fading in (and out) for door/object particles
pub const ENVELOPE_EDGE: f32 = 0.1;

/// What happened during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles whose lifetime ran out and were re-spawned
    pub respawned: usize,
}

/// Mist opacity oscillation. Exactly 1.0 when `breath_hz` is 0.
pub fn breath_multiplier(mist: &MistParams, time: f64) -> f32 {
    if mist.breath_hz == 0.0 {
        return 1.0;
    }
    let wave = (std::f64::consts::TAU * mist.breath_hz as f64 * time).sin() as f32;
    lerp_f32(mist.breath_min, mist.breath_max, 0.5 + 0.5 * wave)
}

/// System-level alpha before fade and breath. Door/object opacity is applied
/// per particle instead, so it must not be folded in here as well.
pub fn base_alpha(preset: &ParticlePreset) -> f32 {
    if preset.kind.is_mist() {
        preset.base_opacity
    } else {
        1.0
    }
}

/// `current / max` clamped to [0, 1]; a zero or invalid max reads as expired
pub fn life_progress(current: f32, max: f32) -> f32 {
    if max > 0.0 && max.is_finite() && current.is_finite() {
        (current / max).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Symmetric fade-in/fade-out ramp over the first and last `ENVELOPE_EDGE`
/// of life, flat at 1 in between
pub fn alpha_envelope(prog: f32) -> f32 {
    (prog / ENVELOPE_EDGE)
        .min((1.0 - prog) / ENVELOPE_EDGE)
        .clamp(0.0, 1.0)
}

/// Strobe factor in `[1 - variation, 1]`
pub fn flicker_term(time: f32, frequency: f32, phase: f32, variation: f32) -> f32 {
    let wave = ((time + phase) * frequency * TAU).sin();
    (1.0 - variation * (0.5 - 0.5 * wave)).clamp(0.0, 1.0)
}

/// One swell up and back over a lifetime
pub fn pulse_size(base: f32, ease: f32) -> f32 {
    base * (0.9 + 0.2 * (ease * PI).sin())
}

/// Slow size breathing, phase-offset by particle index
pub fn mist_size(base: f32, time: f32, index: usize) -> f32 {
    base * (1.0 + 0.12 * (0.12 * time + index as f32 * 0.021).sin())
}

/// Uniform values for the instance's current time and fade state
pub fn frame_uniforms(instance: &ParticleSystemInstance) -> FrameUniforms {
    let preset = &instance.preset;
    let breath = if preset.kind.is_mist() {
        breath_multiplier(&preset.mist, instance.elapsed_time)
    } else {
        1.0
    };
    let fade = instance.fade_out.multiplier(instance.elapsed_time);
    FrameUniforms {
        time: instance.elapsed_time as f32,
        point_scale: instance.point_scale,
        global_alpha: (base_alpha(preset) * fade * breath).clamp(0.0, 1.0),
    }
}

/// Advance `instance` by one step of `dt` seconds. A system with no particles
/// is left untouched.
pub fn step<R: RandomSource + ?Sized>(
    instance: &mut ParticleSystemInstance,
    dt: f32,
    rng: &mut R,
) -> StepReport {
    let mut report = StepReport::default();
    if instance.buffers.is_empty() {
        return report;
    }

    instance.elapsed_time += dt as f64;
    let time = instance.elapsed_time as f32;
    let colours = instance.colours();

    let ParticleSystemInstance {
        preset,
        origin,
        buffers,
        ..
    } = &mut *instance;
    let is_mist = preset.kind.is_mist();

    for i in 0..buffers.len() {
        let (p, l) = (i * 3, i * 2);

        // Lifetime / respawn
        buffers.lifetime[l] += dt;
        if buffers.lifetime[l] >= buffers.lifetime[l + 1] {
            spawn_particle(buffers, i, preset, *origin, rng);
            report.respawned += 1;
        }

        // Position
        for axis in 0..3 {
            buffers.position[p + axis] += buffers.velocity[p + axis] * dt;
        }

        // Velocity
        if is_mist {
            // drift first, then damp: the steady state stays bounded
            for axis in 0..3 {
                let v = buffers.velocity[p + axis] + rng.centered(preset.drift);
                buffers.velocity[p + axis] = v * preset.damping;
            }
        } else {
            buffers.velocity[p + 1] -= preset.gravity * dt * preset.gravity_scale;
            for axis in 0..3 {
                buffers.velocity[p + axis] += rng.centered(preset.jitter);
            }
        }

        // Visuals
        let prog = life_progress(buffers.lifetime[l], buffers.lifetime[l + 1]);
        if is_mist {
            buffers.size[i] = mist_size(buffers.base_size[i], time, i);
        } else {
            let ease = ease_lookup(prog);
            let flicker = flicker_term(
                time,
                buffers.flicker[l],
                buffers.flicker[l + 1],
                preset.opacity_variation,
            );
            let alpha = alpha_envelope(prog) * flicker * preset.base_opacity;
            write_premultiplied(&mut buffers.color[p..p + 3], &colours, ease, alpha);
            buffers.size[i] = pulse_size(buffers.base_size[i], ease);
        }
    }

    instance.uniforms = frame_uniforms(instance);
    report
}

fn write_premultiplied(out: &mut [f32], colours: &PalettePair, ease: f32, alpha: f32) {
    let c = colours.a.lerp(&colours.b, ease).scaled(alpha);
    out.copy_from_slice(&c.to_array());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{PaletteSeed, PaletteTable};
    use crate::preset::{FloatRange, ParticlePreset};
    use crate::rand::ParticleRng;
    use loci_core::Vec3;

    fn make(preset: ParticlePreset, seed: u32) -> (ParticleSystemInstance, ParticleRng) {
        let mut rng = ParticleRng::new(seed);
        let sys = ParticleSystemInstance::new(
            preset,
            Vec3::new(0.0, 1.5, -4.0),
            Some(&PaletteSeed::from("test")),
            &PaletteTable::builtin(),
            &mut rng,
        );
        (sys, rng)
    }

    #[test]
    fn envelope_boundaries() {
        assert!(alpha_envelope(0.0).abs() < 1e-6);
        assert!(alpha_envelope(1.0).abs() < 1e-6);
        assert!((alpha_envelope(0.5) - 1.0).abs() < 1e-6);
        assert!((alpha_envelope(0.05) - 0.5).abs() < 1e-5);
        assert!((alpha_envelope(0.95) - 0.5).abs() < 1e-5);
        assert_eq!(alpha_envelope(-0.2), 0.0);
    }

    #[test]
    fn life_progress_guards() {
        assert_eq!(life_progress(0.5, 2.0), 0.25);
        assert_eq!(life_progress(3.0, 2.0), 1.0);
        assert_eq!(life_progress(0.0, 0.0), 1.0);
        assert_eq!(life_progress(f32::NAN, 2.0), 1.0);
    }

    #[test]
    fn breath_disabled_is_exactly_one() {
        let mist = MistParams {
            breath_hz: 0.0,
            breath_min: 0.2,
            breath_max: 0.9,
            ..MistParams::default()
        };
        for i in 0..500 {
            assert_eq!(breath_multiplier(&mist, i as f64 * 0.173), 1.0);
        }
    }

    #[test]
    fn breath_stays_between_min_and_max() {
        let mist = ParticlePreset::mist().mist;
        for i in 0..1000 {
            let m = breath_multiplier(&mist, i as f64 * 0.05);
            assert!(m >= mist.breath_min - 1e-6 && m <= mist.breath_max + 1e-6);
        }
    }

    #[test]
    fn flicker_term_bounds() {
        for i in 0..200 {
            let f = flicker_term(i as f32 * 0.01, 2.0, 0.3, 0.25);
            assert!((0.75 - 1e-6..=1.0).contains(&f));
        }
        assert_eq!(flicker_term(0.4, 2.0, 1.0, 0.0), 1.0);
    }

    #[test]
    fn pulse_size_single_bump() {
        assert!((pulse_size(1.0, 0.0) - 0.9).abs() < 1e-6);
        assert!((pulse_size(1.0, 0.5) - 1.1).abs() < 1e-6);
        assert!((pulse_size(1.0, 1.0) - 0.9).abs() < 1e-5);
    }

    #[test]
    fn door_base_alpha_is_one() {
        assert_eq!(base_alpha(&ParticlePreset::door()), 1.0);
        assert_eq!(base_alpha(&ParticlePreset::object()), 1.0);
        assert_eq!(base_alpha(&ParticlePreset::mist()), ParticlePreset::mist().base_opacity);
    }

    #[test]
    fn lifetime_invariant_holds_over_many_steps() {
        for preset in [ParticlePreset::door(), ParticlePreset::object(), ParticlePreset::mist()] {
            let (mut sys, mut rng) = make(preset, 11);
            for _ in 0..600 {
                step(&mut sys, FIXED_DT, &mut rng);
                for i in 0..sys.particle_count() {
                    let (cur, max) = sys.buffers().lifetime_of(i);
                    assert!(cur >= 0.0 && cur <= max, "particle {i}: {cur} > {max}");
                }
            }
        }
    }

    #[test]
    fn respawns_happen_and_land_in_shell() {
        let preset = ParticlePreset {
            lifetime: FloatRange::new(0.05, 0.1),
            ..ParticlePreset::door()
        };
        let (mut sys, mut rng) = make(preset.clone(), 2);
        let origin = sys.origin();
        // one step of motion after the respawn: |v| dt, with v bounded
        let slack = (preset.speed.max + preset.spread + 1.0) * FIXED_DT;
        let mut total = 0;
        for _ in 0..30 {
            let report = step(&mut sys, FIXED_DT, &mut rng);
            total += report.respawned;
            for i in 0..sys.particle_count() {
                let (cur, _) = sys.buffers().lifetime_of(i);
                if cur == 0.0 {
                    let d = sys.buffers().position_of(i).distance(&origin);
                    assert!(d >= preset.spawn_radius.inner - slack);
                    assert!(d <= preset.spawn_radius.outer + slack);
                }
            }
        }
        assert!(total > preset.particle_count);
    }

    #[test]
    fn door_colours_are_premultiplied() {
        let (mut sys, mut rng) = make(ParticlePreset::door(), 6);
        for _ in 0..90 {
            step(&mut sys, FIXED_DT, &mut rng);
        }
        let colours = sys.colours();
        let max_channel = colours.a.to_array().into_iter()
            .chain(colours.b.to_array())
            .fold(0.0f32, f32::max);
        for i in 0..sys.particle_count() {
            let (cur, max) = sys.buffers().lifetime_of(i);
            let c = sys.buffers().color_of(i);
            let ceiling = alpha_envelope(life_progress(cur, max)) * sys.preset().base_opacity;
            for ch in c {
                assert!(ch >= 0.0);
                assert!(ch <= max_channel * ceiling + 1e-5);
            }
        }
    }

    #[test]
    fn freshly_spawned_door_particles_are_invisible() {
        let (mut sys, mut rng) = make(ParticlePreset::door(), 13);
        // first step: every particle is at prog = dt / max, well inside the fade-in
        step(&mut sys, FIXED_DT, &mut rng);
        for i in 0..sys.particle_count() {
            let c = sys.buffers().color_of(i);
            let (cur, max) = sys.buffers().lifetime_of(i);
            let bound = alpha_envelope(life_progress(cur, max));
            assert!(c.iter().all(|ch| *ch <= bound + 1e-6));
        }
    }

    #[test]
    fn mist_leaves_colour_to_the_shader() {
        let (mut sys, mut rng) = make(ParticlePreset::mist(), 3);
        for _ in 0..30 {
            step(&mut sys, FIXED_DT, &mut rng);
        }
        assert!(sys.buffers().color.iter().all(|c| *c == 0.0));
        for i in 0..sys.particle_count() {
            let base = sys.buffers().base_size[i];
            let size = sys.buffers().size[i];
            assert!(size >= base * 0.88 - 1e-5 && size <= base * 1.12 + 1e-5);
        }
    }

    #[test]
    fn mist_velocity_stays_bounded() {
        let (mut sys, mut rng) = make(ParticlePreset::mist(), 19);
        for _ in 0..3000 {
            step(&mut sys, FIXED_DT, &mut rng);
        }
        for v in &sys.buffers().velocity {
            assert!(v.is_finite());
            assert!(v.abs() < 0.5, "runaway velocity {v}");
        }
    }

    #[test]
    fn door_gravity_pulls_down_without_jitter() {
        let preset = ParticlePreset {
            jitter: 0.0,
            lifetime: FloatRange::new(100.0, 100.0),
            ..ParticlePreset::door()
        };
        let (mut sys, mut rng) = make(preset.clone(), 23);
        let before = sys.buffers().velocity_of(0);
        step(&mut sys, FIXED_DT, &mut rng);
        let after = sys.buffers().velocity_of(0);
        let expected = before.y - preset.gravity * FIXED_DT * preset.gravity_scale;
        assert!((after.y - expected).abs() < 1e-7);
        assert_eq!(after.x, before.x);
        assert_eq!(after.z, before.z);
    }

    #[test]
    fn position_integrates_velocity() {
        let preset = ParticlePreset {
            jitter: 0.0,
            lifetime: FloatRange::new(100.0, 100.0),
            ..ParticlePreset::object()
        };
        let (mut sys, mut rng) = make(preset, 29);
        let p0 = sys.buffers().position_of(5);
        let v0 = sys.buffers().velocity_of(5);
        step(&mut sys, FIXED_DT, &mut rng);
        let p1 = sys.buffers().position_of(5);
        assert!((p1.x - (p0.x + v0.x * FIXED_DT)).abs() < 1e-6);
        assert!((p1.y - (p0.y + v0.y * FIXED_DT)).abs() < 1e-6);
        assert!((p1.z - (p0.z + v0.z * FIXED_DT)).abs() < 1e-6);
    }

    #[test]
    fn zero_particles_is_a_no_op() {
        let preset = ParticlePreset {
            particle_count: 0,
            ..ParticlePreset::mist()
        };
        let (mut sys, mut rng) = make(preset, 1);
        let report = step(&mut sys, FIXED_DT, &mut rng);
        assert_eq!(report, StepReport::default());
        assert_eq!(sys.elapsed_time(), 0.0);
    }

    #[test]
    fn fade_out_is_monotonic_and_reaches_zero() {
        let (mut sys, mut rng) = make(ParticlePreset::door(), 8);
        for _ in 0..37 {
            step(&mut sys, FIXED_DT, &mut rng);
        }
        sys.start_fade_out();
        let mut prev = sys.fade_multiplier();
        assert_eq!(prev, 1.0);
        for _ in 0..60 {
            step(&mut sys, FIXED_DT, &mut rng);
            let m = sys.fade_multiplier();
            assert!(m <= prev);
            prev = m;
        }
        assert_eq!(sys.fade_multiplier(), 0.0);
        assert_eq!(sys.uniforms().global_alpha, 0.0);
        for _ in 0..30 {
            step(&mut sys, FIXED_DT, &mut rng);
            assert_eq!(sys.fade_multiplier(), 0.0);
        }
    }

    #[test]
    fn mist_global_alpha_combines_opacity_and_breath() {
        let (mut sys, mut rng) = make(ParticlePreset::mist(), 4);
        step(&mut sys, FIXED_DT, &mut rng);
        let p = sys.preset().clone();
        let expected = p.base_opacity * breath_multiplier(&p.mist, sys.elapsed_time());
        assert!((sys.uniforms().global_alpha - expected).abs() < 1e-6);
        assert!((sys.uniforms().time - FIXED_DT).abs() < 1e-7);
    }
}
