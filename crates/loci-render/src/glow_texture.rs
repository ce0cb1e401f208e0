//! Radial gradient sprite used to mask glow particles

/// Default edge length of the gradient texture in texels
pub const GLOW_TEXTURE_SIZE: u32 = 64;

/// RGBA8 pixels of a white radial gradient: bright centre, transparent at
/// and beyond the inscribed circle. Falloff is quadratic.
pub fn radial_gradient_pixels(size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    let centre = (size as f32 - 1.0) * 0.5;
    let radius = (size as f32 * 0.5).max(f32::EPSILON);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - centre;
            let dy = y as f32 - centre;
            let d = (dx * dx + dy * dy).sqrt() / radius;
            let v = (1.0 - d).clamp(0.0, 1.0);
            let byte = (v * v * 255.0).round() as u8;
            pixels.extend_from_slice(&[byte, byte, byte, byte]);
        }
    }
    pixels
}

/// GPU texture, view and sampler for the glow mask
pub struct GlowTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GlowTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, size: u32) -> Self {
        use wgpu::util::DeviceExt;

        let pixels = radial_gradient_pixels(size);
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Particle Glow Texture"),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                // linear: the mask is a coverage value, not a colour
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &pixels,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Particle Glow Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn bind_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("Particle Glow Texture Bind Group"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texel(pixels: &[u8], size: u32, x: u32, y: u32) -> u8 {
        pixels[((y * size + x) * 4) as usize]
    }

    #[test]
    fn gradient_dimensions() {
        assert_eq!(radial_gradient_pixels(8).len(), 8 * 8 * 4);
        assert!(radial_gradient_pixels(0).is_empty());
    }

    #[test]
    fn gradient_bright_centre_dark_corners() {
        let size = GLOW_TEXTURE_SIZE;
        let px = radial_gradient_pixels(size);
        assert!(texel(&px, size, size / 2, size / 2) > 240);
        assert_eq!(texel(&px, size, 0, 0), 0);
        assert_eq!(texel(&px, size, size - 1, size - 1), 0);
    }

    #[test]
    fn gradient_is_symmetric_and_monotonic() {
        let size = 32;
        let px = radial_gradient_pixels(size);
        for x in 0..size {
            assert_eq!(texel(&px, size, x, 7), texel(&px, size, size - 1 - x, 7));
        }
        let row = size / 2;
        for x in 1..size / 2 {
            assert!(texel(&px, size, x, row) >= texel(&px, size, x - 1, row));
        }
    }
}
