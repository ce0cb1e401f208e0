//! Simulate command

use super::{load_library, parse_seed};
use anyhow::{bail, Context, Result};
use loci_core::{SystemId, Vec3};
use loci_particles::{ParticleKind, ParticleRng, ParticleSystemInstance, ParticleSystemManager};
use loci_render::{
    GpuContext, OffscreenTarget, ParticleCamera, ParticleRenderer, OFFSCREEN_COLOR_FORMAT,
    OFFSCREEN_DEPTH_FORMAT,
};
use serde::Serialize;

pub struct SimulateArgs {
    pub kind: ParticleKind,
    pub seed: Option<String>,
    pub frames: u32,
    pub fade_after: Option<u32>,
    pub rng_seed: u32,
    pub position: [f32; 3],
    pub presets: Option<String>,
    pub gpu: bool,
    pub size: u32,
    pub format: String,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    kind: String,
    seed: Option<String>,
    palette: Option<[String; 2]>,
    particles: usize,
    frames: u32,
    elapsed_seconds: f64,
    respawned: usize,
    fade_started_at: Option<u32>,
    fade_multiplier: f32,
    global_alpha: f32,
    fade_complete: bool,
    lifetime_violations: usize,
    gpu: Option<GpuReport>,
}

#[derive(Debug, Serialize)]
struct GpuReport {
    adapter: String,
    resolution: [u32; 2],
    frames_drawn: u32,
    uploaded_bytes: u64,
    bindings_released: usize,
}

/// Headless device, render target and renderer for `--gpu`
struct GpuMirror {
    context: GpuContext,
    target: OffscreenTarget,
    renderer: ParticleRenderer,
    frames_drawn: u32,
    uploaded_bytes: u64,
}

impl GpuMirror {
    fn new(size: u32, origin: Vec3) -> Result<Self> {
        let context = GpuContext::new_blocking().context("Failed to acquire a GPU device")?;
        let target = context.offscreen_target(size, size);
        let renderer = ParticleRenderer::new(
            &context.device,
            &context.queue,
            OFFSCREEN_COLOR_FORMAT,
            Some(OFFSCREEN_DEPTH_FORMAT),
        );
        let camera = ParticleCamera::looking_at(
            origin + Vec3::new(0.0, 1.5, 6.0),
            origin,
            target.aspect_ratio(),
        );
        renderer.update_camera(&context.queue, &camera.uniforms());
        Ok(Self {
            context,
            target,
            renderer,
            frames_drawn: 0,
            uploaded_bytes: 0,
        })
    }

    /// Upload what the last step changed and draw one frame
    fn frame(&mut self, manager: &mut ParticleSystemManager) {
        let stats = self
            .renderer
            .sync(&self.context.device, &self.context.queue, manager);
        self.uploaded_bytes += stats.uploaded_bytes;
        self.renderer
            .render_offscreen(&self.context.device, &self.context.queue, &self.target);
        self.frames_drawn += 1;
    }

    /// Release the bindings of disposed systems and wait for the device
    fn finish(mut self, manager: &mut ParticleSystemManager) -> GpuReport {
        let stats = self
            .renderer
            .sync(&self.context.device, &self.context.queue, manager);
        self.context.device.poll(wgpu::Maintain::Wait);
        GpuReport {
            adapter: self.context.adapter_name.clone(),
            resolution: [self.target.width, self.target.height],
            frames_drawn: self.frames_drawn,
            uploaded_bytes: self.uploaded_bytes,
            bindings_released: stats.disposed,
        }
    }
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        bail!("Unknown format: {}", args.format);
    }

    let library = load_library(args.presets.as_deref())?;
    let mut manager = ParticleSystemManager::with_rng(library, ParticleRng::new(args.rng_seed));
    let origin = Vec3::from_array(args.position);
    let id = manager.create_particle_system(origin, args.kind, args.seed.as_deref().map(parse_seed));

    let mut gpu = if args.gpu {
        Some(GpuMirror::new(args.size, origin)?)
    } else {
        None
    };

    let mut respawned = 0;
    let mut violations = 0;
    for frame in 0..args.frames {
        if args.fade_after == Some(frame) {
            manager.start_fade_out(id)?;
        }
        respawned += manager.update_particle_system(id)?.respawned;
        if let Some(sys) = manager.get(id) {
            violations += lifetime_violations(sys);
        }
        if let Some(mirror) = gpu.as_mut() {
            mirror.frame(&mut manager);
        }
    }

    let report = build_report(&args, &manager, id, respawned, violations)?;
    let gpu_report = match gpu {
        Some(mirror) => {
            manager.dispose(id)?;
            Some(mirror.finish(&mut manager))
        }
        None => None,
    };
    let report = SimulationReport {
        gpu: gpu_report,
        ..report
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }
    Ok(())
}

fn build_report(
    args: &SimulateArgs,
    manager: &ParticleSystemManager,
    id: SystemId,
    respawned: usize,
    lifetime_violations: usize,
) -> Result<SimulationReport> {
    let Some(sys) = manager.get(id) else {
        bail!("system {id} vanished during simulation");
    };
    let fade_started_at = args.fade_after.filter(|f| *f < args.frames);
    Ok(SimulationReport {
        kind: args.kind.to_string(),
        seed: args.seed.clone(),
        palette: sys.palette().map(|p| [p.a.to_string(), p.b.to_string()]),
        particles: sys.particle_count(),
        frames: args.frames,
        elapsed_seconds: sys.elapsed_time(),
        respawned,
        fade_started_at,
        fade_multiplier: sys.fade_multiplier(),
        global_alpha: sys.uniforms().global_alpha,
        fade_complete: sys.fade_complete(),
        lifetime_violations,
        gpu: None,
    })
}

/// Particles outside `0 <= current <= max`
fn lifetime_violations(sys: &ParticleSystemInstance) -> usize {
    (0..sys.particle_count())
        .filter(|&i| {
            let (cur, max) = sys.buffers().lifetime_of(i);
            !(cur >= 0.0 && cur <= max)
        })
        .count()
}

fn print_text(report: &SimulationReport) {
    println!("kind:            {}", report.kind);
    if let Some(seed) = &report.seed {
        println!("seed:            {seed}");
    }
    match &report.palette {
        Some([a, b]) => println!("palette:         {a} -> {b}"),
        None => println!("palette:         (preset colours)"),
    }
    println!("particles:       {}", report.particles);
    println!(
        "frames:          {} ({:.3} s simulated)",
        report.frames, report.elapsed_seconds
    );
    println!("respawned:       {}", report.respawned);
    if let Some(frame) = report.fade_started_at {
        println!(
            "fade:            started at frame {frame}, multiplier {:.3}{}",
            report.fade_multiplier,
            if report.fade_complete { " (complete)" } else { "" }
        );
    }
    println!("global alpha:    {:.4}", report.global_alpha);
    println!("lifetime check:  {} violation(s)", report.lifetime_violations);
    if let Some(gpu) = &report.gpu {
        println!(
            "gpu:             {} frame(s) drawn at {}x{} on '{}'",
            gpu.frames_drawn, gpu.resolution[0], gpu.resolution[1], gpu.adapter
        );
        println!(
            "                 {} bytes uploaded, {} binding(s) released",
            gpu.uploaded_bytes, gpu.bindings_released
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loci_particles::PresetLibrary;

    fn args(kind: ParticleKind, frames: u32, fade_after: Option<u32>) -> SimulateArgs {
        SimulateArgs {
            kind,
            seed: Some("door-42".to_string()),
            frames,
            fade_after,
            rng_seed: 9,
            position: [0.0, 1.0, 0.0],
            presets: None,
            gpu: false,
            size: 64,
            format: "json".to_string(),
        }
    }

    #[test]
    fn test_report_after_fade() {
        let a = args(ParticleKind::Door, 120, Some(30));
        let mut manager =
            ParticleSystemManager::with_rng(PresetLibrary::default(), ParticleRng::new(a.rng_seed));
        let id = manager.create_particle_system(Vec3::ZERO, a.kind, Some(parse_seed("door-42")));
        for frame in 0..a.frames {
            if a.fade_after == Some(frame) {
                manager.start_fade_out(id).unwrap();
            }
            manager.update_particle_system(id).unwrap();
        }
        let report = build_report(&a, &manager, id, 0, 0).unwrap();
        assert_eq!(report.fade_started_at, Some(30));
        assert!(report.fade_complete);
        assert_eq!(report.global_alpha, 0.0);
        assert!(report.palette.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "door");
        assert_eq!(json["frames"], 120);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let mut a = args(ParticleKind::Mist, 1, None);
        a.format = "yaml".to_string();
        assert!(run(a).is_err());
    }
}
