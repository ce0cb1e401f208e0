//! Frame-time to fixed-step conversion

use crate::integrator::FIXED_DT;

/// Longest frame the clock will account for, in seconds
pub const MAX_FRAME_SECONDS: f64 = 0.25;

/// Accumulates wall-clock frame time and hands out whole simulation steps.
/// Simulation time only ever advances in `fixed_timestep` increments.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    /// Fixed timestep interval (default: 1/60 second)
    pub fixed_timestep: f64,
    /// Total frame time fed in, after clamping
    pub total_time: f64,
    accumulator: f64,
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self {
            fixed_timestep: FIXED_DT as f64,
            total_time: 0.0,
            accumulator: 0.0,
        }
    }
}

impl FixedStepClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock with a custom step rate
    pub fn with_rate(hz: f64) -> Self {
        Self {
            fixed_timestep: 1.0 / hz,
            ..Self::default()
        }
    }

    /// Feed one frame's duration and return how many fixed steps to run.
    /// Negative or non-finite durations count as zero.
    pub fn advance(&mut self, frame_secs: f64) -> u32 {
        let frame = if frame_secs.is_finite() {
            // clamp to avoid a spiral of death after a stall
            frame_secs.clamp(0.0, MAX_FRAME_SECONDS)
        } else {
            0.0
        };
        self.total_time += frame;
        self.accumulator += frame;

        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            steps += 1;
        }
        steps
    }

    /// Fraction of a step left in the accumulator
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.fixed_timestep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = FixedStepClock::new();
        assert!((clock.fixed_timestep - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.interpolation_alpha(), 0.0);
    }

    #[test]
    fn test_custom_rate() {
        let clock = FixedStepClock::with_rate(30.0);
        assert!((clock.fixed_timestep - 1.0 / 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_accumulates_partial_frames() {
        let mut clock = FixedStepClock::with_rate(60.0);
        assert_eq!(clock.advance(0.01), 0);
        assert_eq!(clock.advance(0.01), 1);
        let alpha = clock.interpolation_alpha();
        assert!(alpha > 0.1 && alpha < 0.3);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut clock = FixedStepClock::with_rate(8.0);
        assert_eq!(clock.advance(10.0), 2);
        assert!((clock.total_time - MAX_FRAME_SECONDS).abs() < 1e-12);
    }

    #[test]
    fn test_bad_durations_do_nothing() {
        let mut clock = FixedStepClock::new();
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.total_time, 0.0);
    }
}
