use glint_assets::{EnvLevel, PrefilteredEnvironment};
use half::f16;

/// Colour of the stand-in environment bound until the real one arrives.
pub const FALLBACK_RADIANCE: [f32; 3] = [0.05, 0.05, 0.05];

/// Pack one level as half-float RGBA.
pub fn level_bytes(level: &EnvLevel) -> Vec<u8> {
    let halves: Vec<f16> = level
        .texels
        .iter()
        .flat_map(|t| t.map(f16::from_f32))
        .collect();
    bytemuck::cast_slice(&halves).to_vec()
}

/// An environment mip chain resident on the GPU, bound at group 1 of the
/// scene pipelines.
pub struct GpuEnvironment {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    mip_count: u32,
}

impl GpuEnvironment {
    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("environment_bind_group_layout"),
            entries: &[crate::gpu::texture_entry(0), crate::gpu::sampler_entry(1)],
        })
    }

    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        env: &PrefilteredEnvironment,
    ) -> Self {
        let base = env.base();
        let mip_count = env.mip_count();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("environment_texture"),
            size: wgpu::Extent3d {
                width: base.width,
                height: base.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in env.levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level_bytes(level),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.width * 8),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("environment_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        tracing::debug!(
            "uploaded environment {}x{} with {} mips",
            base.width,
            base.height,
            mip_count
        );
        Self {
            texture,
            bind_group,
            mip_count,
        }
    }

    pub fn fallback(device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) -> Self {
        Self::upload(
            device,
            queue,
            layout,
            &PrefilteredEnvironment::uniform(FALLBACK_RADIANCE),
        )
    }

    /// Index of the blurriest level, used for diffuse lighting.
    pub fn max_level(&self) -> f32 {
        self.mip_count.saturating_sub(1) as f32
    }
}
