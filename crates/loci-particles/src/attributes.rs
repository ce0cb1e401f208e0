//! Which per-particle attribute arrays changed since the last upload

use crate::integrator::StepReport;
use crate::preset::ParticleKind;
use bitflags::bitflags;

bitflags! {
    /// Attribute arrays a renderer needs to re-upload
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributeMask: u8 {
        const POSITION = 0x01;
        const SIZE     = 0x02;
        /// Premultiplied colour; only the glow path writes it
        const COLOR    = 0x04;
        const LIFETIME = 0x08;
        /// Frequency and phase; only change on respawn
        const FLICKER  = 0x10;
        /// Shader seed; fixed after allocation
        const SEED     = 0x20;
    }
}

impl Default for AttributeMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl AttributeMask {
    /// Arrays touched by one integrator step for a system of `kind`
    pub fn after_step(kind: ParticleKind, report: &StepReport) -> Self {
        let mut mask = Self::POSITION | Self::SIZE | Self::LIFETIME;
        if !kind.is_mist() {
            mask |= Self::COLOR;
        }
        if report.respawned > 0 {
            mask |= Self::FLICKER;
        }
        mask
    }
}
