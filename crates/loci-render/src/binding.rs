//! Per-system GPU state: one instance-rate vertex buffer per attribute the
//! system's shading model reads, plus a uniform buffer

use crate::particle_pipeline::{GpuAttribute, ShadingModel, SystemUniforms};
use loci_particles::{AttributeMask, ParticleSystemInstance};
use wgpu::util::DeviceExt;

/// Smallest buffer we allocate; wgpu rejects binding empty vertex buffers
const MIN_BUFFER_SIZE: u64 = 16;

/// Bytes pushed to the GPU by one [`ParticleBinding::sync`]
pub fn upload_size(model: ShadingModel, dirty: AttributeMask, particle_count: usize) -> u64 {
    let attributes: usize = model
        .dirty_attributes(dirty)
        .map(|attr| attr.components() * particle_count * std::mem::size_of::<f32>())
        .sum();
    (attributes + std::mem::size_of::<SystemUniforms>()) as u64
}

pub struct ParticleBinding {
    model: ShadingModel,
    instance_count: u32,
    attribute_buffers: Vec<(GpuAttribute, wgpu::Buffer)>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl ParticleBinding {
    /// Create buffers sized for `instance` and fill them with its current state
    pub fn new(
        device: &wgpu::Device,
        system_layout: &wgpu::BindGroupLayout,
        instance: &ParticleSystemInstance,
    ) -> Self {
        let model = ShadingModel::for_kind(instance.kind());
        let buffers = instance.buffers();

        let attribute_buffers = model
            .attributes()
            .iter()
            .map(|attr| {
                let data = attr.data(buffers);
                let buffer = if data.is_empty() {
                    device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(attr.label()),
                        size: MIN_BUFFER_SIZE,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    })
                } else {
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(attr.label()),
                        contents: bytemuck::cast_slice(data),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    })
                };
                (*attr, buffer)
            })
            .collect();

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle System Uniform Buffer"),
            contents: bytemuck::cast_slice(&[SystemUniforms::from_instance(instance)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: system_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("Particle System Bind Group"),
        });

        Self {
            model,
            instance_count: instance.particle_count() as u32,
            attribute_buffers,
            uniform_buffer,
            uniform_bind_group,
        }
    }

    pub fn model(&self) -> ShadingModel {
        self.model
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Upload the attributes flagged in `dirty` that this binding's model
    /// reads, then the uniforms. Returns the number of bytes written.
    pub fn sync(
        &self,
        queue: &wgpu::Queue,
        instance: &ParticleSystemInstance,
        dirty: AttributeMask,
    ) -> u64 {
        let mut written = 0u64;
        if self.instance_count > 0 {
            for (attr, buffer) in &self.attribute_buffers {
                if !dirty.contains(attr.mask()) {
                    continue;
                }
                let bytes: &[u8] = bytemuck::cast_slice(attr.data(instance.buffers()));
                queue.write_buffer(buffer, 0, bytes);
                written += bytes.len() as u64;
            }
        }

        let uniforms = SystemUniforms::from_instance(instance);
        let bytes: &[u8] = bytemuck::cast_slice(std::slice::from_ref(&uniforms));
        queue.write_buffer(&self.uniform_buffer, 0, bytes);
        written + bytes.len() as u64
    }

    /// Record the instanced draw. The caller has set the pipeline for
    /// `self.model()`, the camera group and the quad index buffer.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.uniform_bind_group, &[]);
        for (slot, (_, buffer)) in self.attribute_buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        pass.draw_indexed(0..6, 0, 0..self.instance_count);
    }

    /// Release the GPU buffers now rather than when the last handle drops
    pub fn dispose(self) {
        for (_, buffer) in &self.attribute_buffers {
            buffer.destroy();
        }
        self.uniform_buffer.destroy();
    }
}
