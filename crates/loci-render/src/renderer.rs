//! Keeps one GPU binding per live particle system and draws them

use crate::binding::ParticleBinding;
use crate::context::OffscreenTarget;
use crate::glow_texture::{GlowTexture, GLOW_TEXTURE_SIZE};
use crate::particle_pipeline::{CameraUniforms, ParticlePipelines, ShadingModel, DRAW_ORDER};
use loci_core::SystemId;
use loci_particles::{AttributeMask, ParticleSystemManager, RandomSource};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

/// Shading models to draw this frame, in pass order, given the models of
/// every live binding
pub fn draw_sequence(bound: impl IntoIterator<Item = ShadingModel>) -> Vec<ShadingModel> {
    let bound: Vec<ShadingModel> = bound.into_iter().collect();
    DRAW_ORDER
        .into_iter()
        .filter(|model| bound.contains(model))
        .collect()
}

/// Attributes to upload for a system this sync. A binding created in the
/// same sync was filled from the instance already.
fn pending_upload(newly_bound: bool, dirty: AttributeMask) -> Option<AttributeMask> {
    (!newly_bound).then_some(dirty)
}

/// What one [`ParticleRenderer::sync`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub disposed: usize,
    pub uploaded_bytes: u64,
}

/// Render state binder for every system a manager owns
pub struct ParticleRenderer {
    pipelines: ParticlePipelines,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    glow_texture: GlowTexture,
    glow_bind_group: wgpu::BindGroup,
    bindings: BTreeMap<SystemId, ParticleBinding>,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let pipelines = ParticlePipelines::new(device, format, depth_format);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipelines.camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("Particle Camera Bind Group"),
        });

        let glow_texture = GlowTexture::new(device, queue, GLOW_TEXTURE_SIZE);
        let glow_bind_group = glow_texture.bind_group(device, &pipelines.texture_bind_group_layout);

        Self {
            pipelines,
            camera_buffer,
            camera_bind_group,
            glow_texture,
            glow_bind_group,
            bindings: BTreeMap::new(),
        }
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &CameraUniforms) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(std::slice::from_ref(camera)),
        );
    }

    /// Bring GPU state in line with the manager: bind new systems, drop
    /// bindings whose system was disposed, upload what each step changed.
    pub fn sync<R: RandomSource>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        manager: &mut ParticleSystemManager<R>,
    ) -> SyncStats {
        let mut stats = SyncStats::default();

        let stale: Vec<SystemId> = self
            .bindings
            .keys()
            .filter(|id| !manager.contains(**id))
            .copied()
            .collect();
        for id in stale {
            if self.dispose(id) {
                stats.disposed += 1;
            }
        }

        let ids: Vec<SystemId> = manager.ids().collect();
        for id in ids {
            let dirty = manager.take_dirty(id).unwrap_or_default();
            let Some(instance) = manager.get(id) else {
                continue;
            };
            let (binding, newly_bound) = match self.bindings.entry(id) {
                Entry::Occupied(entry) => (entry.into_mut(), false),
                Entry::Vacant(entry) => {
                    stats.created += 1;
                    log::debug!("Binding system {id} ({} particles)", instance.particle_count());
                    let binding = ParticleBinding::new(
                        device,
                        &self.pipelines.system_bind_group_layout,
                        instance,
                    );
                    (entry.insert(binding), true)
                }
            };
            if let Some(dirty) = pending_upload(newly_bound, dirty) {
                stats.uploaded_bytes += binding.sync(queue, instance, dirty);
            }
        }

        stats
    }

    /// Destroy the GPU resources for `id`. Returns false if it had none.
    pub fn dispose(&mut self, id: SystemId) -> bool {
        match self.bindings.remove(&id) {
            Some(binding) => {
                binding.dispose();
                log::debug!("Released GPU buffers for system {id}");
                true
            }
            None => false,
        }
    }

    pub fn binding(&self, id: SystemId) -> Option<&ParticleBinding> {
        self.bindings.get(&id)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn glow_texture(&self) -> &GlowTexture {
        &self.glow_texture
    }

    /// Record every system into `pass`: mist (alpha) first, glow (additive) after
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let sequence = draw_sequence(self.bindings.values().map(|b| b.model()));
        if sequence.is_empty() {
            return;
        }
        pass.set_index_buffer(
            self.pipelines.quad_index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        for model in sequence {
            pass.set_pipeline(self.pipelines.pipeline(model));
            if model.uses_glow_texture() {
                pass.set_bind_group(2, &self.glow_bind_group, &[]);
            }
            for binding in self.bindings.values().filter(|b| b.model() == model) {
                binding.draw(pass);
            }
        }
    }

    /// Clear `target`, draw every bound system into it and submit
    pub fn render_offscreen(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &OffscreenTarget,
    ) -> wgpu::SubmissionIndex {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Particle Offscreen Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Offscreen Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw(&mut pass);
        }
        queue.submit(std::iter::once(encoder.finish()))
    }
}
