//! Handle-based ownership of every live particle system

use crate::attributes::AttributeMask;
use crate::clock::FixedStepClock;
use crate::integrator::{StepReport, FIXED_DT};
use crate::library::PresetLibrary;
use crate::palette::PaletteSeed;
use crate::preset::ParticleKind;
use crate::rand::{ParticleRng, RandomSource};
use crate::system::ParticleSystemInstance;
use loci_core::{LociError, Result, SystemId, Vec3};
use std::collections::BTreeMap;

struct ManagedSystem {
    instance: ParticleSystemInstance,
    /// Attributes changed since the renderer last took the mask
    dirty: AttributeMask,
}

/// Aggregate counts across all live systems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub systems: usize,
    pub particles: usize,
    pub fading: usize,
}

/// Owns the systems, the preset library and the shared random source.
/// Systems are addressed by [`SystemId`] handles and iterated in creation order.
pub struct ParticleSystemManager<R: RandomSource = ParticleRng> {
    systems: BTreeMap<SystemId, ManagedSystem>,
    library: PresetLibrary,
    rng: R,
    next_id: SystemId,
    point_scale: f32,
    clock: FixedStepClock,
}

impl ParticleSystemManager<ParticleRng> {
    pub fn new() -> Self {
        Self::with_rng(PresetLibrary::default(), ParticleRng::default())
    }
}

impl Default for ParticleSystemManager<ParticleRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RandomSource> ParticleSystemManager<R> {
    /// Manager drawing every random number from `rng`
    pub fn with_rng(library: PresetLibrary, rng: R) -> Self {
        Self {
            systems: BTreeMap::new(),
            library,
            rng,
            next_id: SystemId::from_raw(1),
            point_scale: 1.0,
            clock: FixedStepClock::new(),
        }
    }

    pub fn library(&self) -> &PresetLibrary {
        &self.library
    }

    /// Spawn a system of `kind` centred on `position`. The seed only matters
    /// for door/object palettes.
    pub fn create_particle_system(
        &mut self,
        position: Vec3,
        kind: ParticleKind,
        seed: Option<PaletteSeed>,
    ) -> SystemId {
        let preset = self.library.preset(kind).clone();
        let mut instance = ParticleSystemInstance::new(
            preset,
            position,
            seed.as_ref(),
            &self.library.palettes,
            &mut self.rng,
        );
        instance.set_point_scale(self.point_scale);

        let id = self.next_id;
        self.next_id = id.next();
        log::debug!(
            "Created {kind} system {id}: {} particles at ({}, {}, {})",
            instance.particle_count(),
            position.x,
            position.y,
            position.z
        );
        self.systems.insert(
            id,
            ManagedSystem {
                instance,
                dirty: AttributeMask::all(),
            },
        );
        id
    }

    /// Advance one system by exactly one fixed step
    pub fn update_particle_system(&mut self, id: SystemId) -> Result<StepReport> {
        let managed = self
            .systems
            .get_mut(&id)
            .ok_or(LociError::SystemNotFound(id))?;
        Ok(step_managed(managed, &mut self.rng))
    }

    /// Advance every system by one fixed step; returns how many were stepped
    pub fn update_all(&mut self) -> usize {
        for managed in self.systems.values_mut() {
            step_managed(managed, &mut self.rng);
        }
        self.systems.len()
    }

    /// Feed a real frame duration; runs as many whole fixed steps as have
    /// accumulated and returns that count.
    pub fn tick(&mut self, frame_secs: f64) -> u32 {
        let steps = self.clock.advance(frame_secs);
        for _ in 0..steps {
            self.update_all();
        }
        steps
    }

    /// Begin the one-second global fade. The system keeps simulating and is
    /// never removed automatically.
    pub fn start_fade_out(&mut self, id: SystemId) -> Result<()> {
        let managed = self
            .systems
            .get_mut(&id)
            .ok_or(LociError::SystemNotFound(id))?;
        if managed.instance.start_fade_out() {
            log::debug!("Fading out system {id}");
        }
        Ok(())
    }

    /// Remove a system, handing its final state back to the caller
    pub fn dispose(&mut self, id: SystemId) -> Result<ParticleSystemInstance> {
        let managed = self
            .systems
            .remove(&id)
            .ok_or(LociError::SystemNotFound(id))?;
        log::debug!("Disposed system {id}");
        Ok(managed.instance)
    }

    pub fn get(&self, id: SystemId) -> Option<&ParticleSystemInstance> {
        self.systems.get(&id).map(|m| &m.instance)
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.systems.contains_key(&id)
    }

    /// Attributes changed since the last call; clears the mask
    pub fn take_dirty(&mut self, id: SystemId) -> Option<AttributeMask> {
        self.systems
            .get_mut(&id)
            .map(|m| std::mem::take(&mut m.dirty))
    }

    pub fn fade_complete(&self, id: SystemId) -> Result<bool> {
        self.get(id)
            .map(ParticleSystemInstance::fade_complete)
            .ok_or(LociError::SystemNotFound(id))
    }

    /// Handles whose fade has run out, ready for the caller to dispose
    pub fn finished_systems(&self) -> Vec<SystemId> {
        self.systems
            .iter()
            .filter(|(_, m)| m.instance.fade_complete())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Screen-space size factor applied to every current and future system
    pub fn set_point_scale(&mut self, scale: f32) {
        self.point_scale = scale;
        for managed in self.systems.values_mut() {
            managed.instance.set_point_scale(scale);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = SystemId> + '_ {
        self.systems.keys().copied()
    }

    pub fn stats(&self) -> ManagerStats {
        self.systems.values().fold(ManagerStats::default(), |mut s, m| {
            s.systems += 1;
            s.particles += m.instance.particle_count();
            if m.instance.fade_out().active {
                s.fading += 1;
            }
            s
        })
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

fn step_managed<R: RandomSource>(managed: &mut ManagedSystem, rng: &mut R) -> StepReport {
    let report = managed.instance.step(FIXED_DT, rng);
    if managed.instance.particle_count() > 0 {
        managed.dirty |= AttributeMask::after_step(managed.instance.kind(), &report);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(seed: u32) -> ParticleSystemManager {
        ParticleSystemManager::with_rng(PresetLibrary::default(), ParticleRng::new(seed))
    }

    fn assert_lifetimes(sys: &ParticleSystemInstance) {
        for i in 0..sys.particle_count() {
            let (cur, max) = sys.buffers().lifetime_of(i);
            assert!(cur >= 0.0 && cur <= max);
        }
    }

    #[test]
    fn test_door_end_to_end() {
        let mut mgr = manager(42);
        let id = mgr.create_particle_system(
            Vec3::new(0.0, 1.0, -3.0),
            ParticleKind::Door,
            Some(PaletteSeed::from("door-42")),
        );
        for _ in 0..360 {
            mgr.update_particle_system(id).unwrap();
        }

        // independent manager, different rng: same seed, same palette
        let mut other = manager(7);
        let twin = other.create_particle_system(
            Vec3::ZERO,
            ParticleKind::Door,
            Some(PaletteSeed::from("door-42")),
        );
        assert_eq!(
            mgr.get(id).unwrap().palette(),
            other.get(twin).unwrap().palette()
        );

        assert_lifetimes(mgr.get(id).unwrap());

        mgr.start_fade_out(id).unwrap();
        for _ in 0..60 {
            mgr.update_particle_system(id).unwrap();
        }
        let sys = mgr.get(id).unwrap();
        assert_eq!(sys.uniforms().global_alpha, 0.0);
        assert!(mgr.fade_complete(id).unwrap());
        assert_eq!(mgr.finished_systems(), vec![id]);

        // no self-destruction
        assert!(mgr.contains(id));
        mgr.update_particle_system(id).unwrap();
        assert_eq!(mgr.get(id).unwrap().uniforms().global_alpha, 0.0);
    }

    #[test]
    fn test_unknown_handle_is_an_error() {
        let mut mgr = manager(1);
        let ghost = SystemId::from_raw(99);
        assert!(matches!(
            mgr.update_particle_system(ghost),
            Err(LociError::SystemNotFound(_))
        ));
        assert!(mgr.start_fade_out(ghost).is_err());
        assert!(mgr.dispose(ghost).is_err());
        assert!(mgr.fade_complete(ghost).is_err());
        assert!(mgr.take_dirty(ghost).is_none());
    }

    #[test]
    fn test_dispose_removes_system() {
        let mut mgr = manager(2);
        let a = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Object, None);
        let b = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Mist, None);
        assert_ne!(a, b);
        assert_eq!(mgr.len(), 2);

        let gone = mgr.dispose(a).unwrap();
        assert_eq!(gone.kind(), ParticleKind::Object);
        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(a).is_none());
        assert!(mgr.dispose(a).is_err());
        assert_eq!(mgr.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_dirty_mask_lifecycle() {
        let mut mgr = manager(3);
        let id = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Mist, None);
        assert_eq!(mgr.take_dirty(id), Some(AttributeMask::all()));
        assert_eq!(mgr.take_dirty(id), Some(AttributeMask::empty()));

        mgr.update_particle_system(id).unwrap();
        let mask = mgr.take_dirty(id).unwrap();
        assert!(mask.contains(AttributeMask::POSITION));
        assert!(!mask.contains(AttributeMask::COLOR));
        assert!(!mask.contains(AttributeMask::SEED));
    }

    #[test]
    fn test_update_all_and_tick() {
        let mut mgr = manager(4);
        let a = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Door, None);
        let b = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Mist, None);
        assert_eq!(mgr.update_all(), 2);

        let steps = mgr.tick(0.06);
        assert_eq!(steps, 3);
        let expected = 4.0 * FIXED_DT as f64;
        for id in [a, b] {
            assert!((mgr.get(id).unwrap().elapsed_time() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_point_scale_applies_to_new_and_existing() {
        let mut mgr = manager(5);
        let a = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Door, None);
        mgr.set_point_scale(300.0);
        let b = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Object, None);
        assert_eq!(mgr.get(a).unwrap().uniforms().point_scale, 300.0);
        assert_eq!(mgr.get(b).unwrap().point_scale(), 300.0);
    }

    #[test]
    fn test_stats() {
        let mut mgr = manager(6);
        assert!(mgr.is_empty());
        let a = mgr.create_particle_system(Vec3::ZERO, ParticleKind::Door, None);
        mgr.create_particle_system(Vec3::ZERO, ParticleKind::Mist, None);
        mgr.start_fade_out(a).unwrap();
        let stats = mgr.stats();
        assert_eq!(stats.systems, 2);
        assert_eq!(
            stats.particles,
            mgr.library().door.particle_count + mgr.library().mist.particle_count
        );
        assert_eq!(stats.fading, 1);
    }

    #[test]
    fn test_empty_palette_falls_back_to_preset_colours() {
        let mut library = PresetLibrary::default();
        library.palettes.object.clear();
        let mut mgr = ParticleSystemManager::with_rng(library, ParticleRng::new(8));
        let id = mgr.create_particle_system(
            Vec3::ZERO,
            ParticleKind::Object,
            Some(PaletteSeed::from(12.0)),
        );
        let sys = mgr.get(id).unwrap();
        let preset = &mgr.library().object;
        assert_eq!(sys.colours().a, preset.colour_a);
        assert_eq!(sys.colours().b, preset.colour_b);
    }
}
