//! Particle render pipelines
//!
//! Camera-facing quads drawn with instanced calls, one instance per particle.
//! Each particle attribute array is its own instance-rate vertex buffer, so a
//! system uploads only the arrays that changed.
//! Two shading models: additive glow (door/object) and alpha-blended
//! volumetric noise (mist).

use bytemuck::{Pod, Zeroable};
use loci_particles::{AttributeMask, ParticleBuffers, ParticleKind, ParticleSystemInstance};
use wgpu::util::DeviceExt;

/// How a system is shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    /// Radial-gradient sprite, premultiplied colour, additive blend
    Glow,
    /// Procedural fbm noise, alpha blend
    MistNoise,
}

impl ShadingModel {
    pub fn for_kind(kind: ParticleKind) -> Self {
        match kind {
            ParticleKind::Door | ParticleKind::Object => ShadingModel::Glow,
            ParticleKind::Mist => ShadingModel::MistNoise,
        }
    }

    /// Vertex attributes in shader location order
    pub fn attributes(&self) -> &'static [GpuAttribute] {
        match self {
            ShadingModel::Glow => &[GpuAttribute::Position, GpuAttribute::Size, GpuAttribute::Color],
            ShadingModel::MistNoise => &[
                GpuAttribute::Position,
                GpuAttribute::Size,
                GpuAttribute::Lifetime,
                GpuAttribute::Flicker,
                GpuAttribute::Seed,
            ],
        }
    }

    /// Attributes the model reads that are flagged in `dirty`
    pub fn dirty_attributes(&self, dirty: AttributeMask) -> impl Iterator<Item = GpuAttribute> {
        self.attributes()
            .iter()
            .copied()
            .filter(move |attr| dirty.contains(attr.mask()))
    }

    pub fn blend(&self) -> wgpu::BlendState {
        match self {
            ShadingModel::Glow => GLOW_BLEND,
            ShadingModel::MistNoise => wgpu::BlendState::ALPHA_BLENDING,
        }
    }

    /// Whether draws bind the glow sprite texture at group 2
    pub fn uses_glow_texture(&self) -> bool {
        matches!(self, ShadingModel::Glow)
    }
}

/// Pass order within a frame: alpha-blended mist before additive glow
pub const DRAW_ORDER: [ShadingModel; 2] = [ShadingModel::MistNoise, ShadingModel::Glow];

/// One per-particle array as seen by the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuAttribute {
    Position,
    Size,
    Color,
    Lifetime,
    Flicker,
    Seed,
}

impl GpuAttribute {
    /// Floats per particle
    pub fn components(&self) -> usize {
        match self {
            GpuAttribute::Position | GpuAttribute::Color => 3,
            GpuAttribute::Lifetime | GpuAttribute::Flicker => 2,
            GpuAttribute::Size | GpuAttribute::Seed => 1,
        }
    }

    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components() {
            3 => wgpu::VertexFormat::Float32x3,
            2 => wgpu::VertexFormat::Float32x2,
            _ => wgpu::VertexFormat::Float32,
        }
    }

    pub fn mask(&self) -> AttributeMask {
        match self {
            GpuAttribute::Position => AttributeMask::POSITION,
            GpuAttribute::Size => AttributeMask::SIZE,
            GpuAttribute::Color => AttributeMask::COLOR,
            GpuAttribute::Lifetime => AttributeMask::LIFETIME,
            GpuAttribute::Flicker => AttributeMask::FLICKER,
            GpuAttribute::Seed => AttributeMask::SEED,
        }
    }

    /// The simulation array backing this attribute
    pub fn data<'a>(&self, buffers: &'a ParticleBuffers) -> &'a [f32] {
        match self {
            GpuAttribute::Position => &buffers.position,
            GpuAttribute::Size => &buffers.size,
            GpuAttribute::Color => &buffers.color,
            GpuAttribute::Lifetime => &buffers.lifetime,
            GpuAttribute::Flicker => &buffers.flicker,
            GpuAttribute::Seed => &buffers.seed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpuAttribute::Position => "Particle Position Buffer",
            GpuAttribute::Size => "Particle Size Buffer",
            GpuAttribute::Color => "Particle Color Buffer",
            GpuAttribute::Lifetime => "Particle Lifetime Buffer",
            GpuAttribute::Flicker => "Particle Flicker Buffer",
            GpuAttribute::Seed => "Particle Seed Buffer",
        }
    }
}

/// Camera uniforms shared across all particle draws in a frame
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_right: [f32; 3],
    pub _pad0: f32,
    pub camera_up: [f32; 3],
    pub _pad1: f32,
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self {
            view_proj: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            camera_right: [1.0, 0.0, 0.0],
            _pad0: 0.0,
            camera_up: [0.0, 1.0, 0.0],
            _pad1: 0.0,
        }
    }
}

/// Per-system uniforms, laid out like `SystemUniforms` in both shaders.
/// 80 bytes: two colour vec4s then twelve scalars.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SystemUniforms {
    pub colour_a: [f32; 4],
    pub colour_b: [f32; 4],
    pub time: f32,
    /// Quad edge in world units per unit of particle size
    pub point_scale: f32,
    pub global_alpha: f32,
    pub softness: f32,
    pub noise_scale: f32,
    pub noise_strength: f32,
    pub wisp_speed: f32,
    pub wisp_floor: f32,
    pub midlife_boost: f32,
    pub fade_in: f32,
    pub fade_out: f32,
    pub fade_jitter: f32,
}

impl SystemUniforms {
    /// Snapshot the instance's current frame uniforms. Mist parameters are
    /// only filled for mist systems.
    pub fn from_instance(instance: &ParticleSystemInstance) -> Self {
        let colours = instance.colours();
        let frame = instance.uniforms();
        let [ar, ag, ab] = colours.a.to_array();
        let [br, bg, bb] = colours.b.to_array();
        let mut uniforms = Self {
            colour_a: [ar, ag, ab, 1.0],
            colour_b: [br, bg, bb, 1.0],
            time: frame.time,
            point_scale: frame.point_scale,
            global_alpha: frame.global_alpha,
            ..Self::default()
        };

        if instance.kind().is_mist() {
            let m = &instance.preset().mist;
            uniforms.softness = m.softness;
            uniforms.noise_scale = m.noise_scale;
            uniforms.noise_strength = m.noise_strength;
            uniforms.wisp_speed = m.wisp_speed;
            uniforms.wisp_floor = m.wisp_floor;
            uniforms.midlife_boost = m.midlife_boost;
            uniforms.fade_in = m.fade_in_frac;
            uniforms.fade_out = m.fade_out_frac;
            uniforms.fade_jitter = m.fade_jitter;
        }
        uniforms
    }
}

/// One vertex attribute per [`GpuAttribute`] the model reads, at its shader
/// location
pub fn vertex_attributes(model: ShadingModel) -> Vec<wgpu::VertexAttribute> {
    model
        .attributes()
        .iter()
        .enumerate()
        .map(|(location, attr)| wgpu::VertexAttribute {
            format: attr.format(),
            offset: 0,
            shader_location: location as u32,
        })
        .collect()
}

/// Vertex buffer layouts for `model`, one instance-rate buffer per attribute.
/// `attributes` comes from [`vertex_attributes`] for the same model.
pub fn vertex_layouts(
    model: ShadingModel,
    attributes: &[wgpu::VertexAttribute],
) -> Vec<wgpu::VertexBufferLayout<'_>> {
    model
        .attributes()
        .iter()
        .zip(attributes)
        .map(|(attr, vertex)| wgpu::VertexBufferLayout {
            array_stride: (attr.components() * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: std::slice::from_ref(vertex),
        })
        .collect()
}

/// Premultiplied additive: colour was already scaled by alpha on the CPU
pub const GLOW_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Both particle pipelines plus the layouts bindings are created against
pub struct ParticlePipelines {
    pub glow_pipeline: wgpu::RenderPipeline,
    pub mist_pipeline: wgpu::RenderPipeline,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub system_bind_group_layout: wgpu::BindGroupLayout,
    pub texture_bind_group_layout: wgpu::BindGroupLayout,
    pub quad_index_buffer: wgpu::Buffer,
}

impl ParticlePipelines {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let glow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Glow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("glow_shader.wgsl").into()),
        });
        let mist_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Mist Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mist_shader.wgsl").into()),
        });

        // Group 0: camera
        let camera_bind_group_layout = uniform_layout(device, "Particle Camera Bind Group Layout");
        // Group 1: per-system uniforms
        let system_bind_group_layout = uniform_layout(device, "Particle System Bind Group Layout");

        // Group 2: glow texture + sampler
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("Particle Glow Texture Bind Group Layout"),
            });

        let glow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Glow Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &system_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });
        let mist_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Mist Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &system_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Depth test on, depth write off (translucent)
        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let glow_attributes = vertex_attributes(ShadingModel::Glow);
        let glow_pipeline = create_pipeline(
            device,
            "Particle Glow Pipeline",
            &glow_layout,
            &glow_shader,
            &vertex_layouts(ShadingModel::Glow, &glow_attributes),
            format,
            ShadingModel::Glow.blend(),
            depth_stencil.clone(),
        );

        let mist_attributes = vertex_attributes(ShadingModel::MistNoise);
        let mist_pipeline = create_pipeline(
            device,
            "Particle Mist Pipeline",
            &mist_layout,
            &mist_shader,
            &vertex_layouts(ShadingModel::MistNoise, &mist_attributes),
            format,
            ShadingModel::MistNoise.blend(),
            depth_stencil,
        );

        // Shared quad index buffer
        let quad_indices: [u32; 6] = [0, 1, 2, 2, 1, 3];
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Index Buffer"),
            contents: bytemuck::cast_slice(&quad_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            glow_pipeline,
            mist_pipeline,
            camera_bind_group_layout,
            system_bind_group_layout,
            texture_bind_group_layout,
            quad_index_buffer,
        }
    }

    pub fn pipeline(&self, model: ShadingModel) -> &wgpu::RenderPipeline {
        match model {
            ShadingModel::Glow => &self.glow_pipeline,
            ShadingModel::MistNoise => &self.mist_pipeline,
        }
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
