//! Loci Render - wgpu render state binder for particle systems
//!
//! Mirrors the simulation buffers owned by `loci-particles` into GPU vertex
//! and uniform buffers, uploading only the attributes each step changed, and
//! draws them with two shading models: additive glow sprites for door/object
//! auras and alpha-blended procedural noise for mist.

mod binding;
mod camera;
mod context;
mod glow_texture;
pub mod particle_pipeline;
mod renderer;

pub use binding::{upload_size, ParticleBinding};
pub use camera::ParticleCamera;
pub use context::{
    GpuContext, OffscreenTarget, RenderError, OFFSCREEN_COLOR_FORMAT, OFFSCREEN_DEPTH_FORMAT,
};
pub use glow_texture::{radial_gradient_pixels, GlowTexture, GLOW_TEXTURE_SIZE};
pub use particle_pipeline::{
    CameraUniforms, GpuAttribute, ParticlePipelines, ShadingModel, SystemUniforms, DRAW_ORDER,
};
pub use renderer::{draw_sequence, ParticleRenderer, SyncStats};
