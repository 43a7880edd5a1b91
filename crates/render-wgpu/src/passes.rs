use crate::composer::PostPass;
use crate::gpu::{HDR_FORMAT, sampler_entry, texture_entry, uniform_entry};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glint_render::{RgbShiftParams, ToneMapping};
use std::marker::PhantomData;

/// A fullscreen pass: samples the previous target through one WGSL fragment
/// with a uniform block of type `U` bound after the input texture.
pub struct ShaderPass<U: Pod> {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    _uniforms: PhantomData<U>,
}

impl<U: Pod> ShaderPass<U> {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        fragment: &str,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shaders::fullscreen_shader(fragment).into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<U>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            label,
            pipeline,
            layout,
            sampler,
            uniform_buffer,
            _uniforms: PhantomData,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
        uniforms: &U,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RgbShiftUniforms {
    pub offset: [f32; 2],
    pub _pad: [f32; 2],
}

impl From<&RgbShiftParams> for RgbShiftUniforms {
    fn from(params: &RgbShiftParams) -> Self {
        Self {
            offset: params.offset().to_array(),
            _pad: [0.0; 2],
        }
    }
}

/// Chromatic split between the scene and the output pass.
pub struct RgbShiftPass {
    shader: ShaderPass<RgbShiftUniforms>,
    pub params: RgbShiftParams,
}

impl RgbShiftPass {
    pub fn new(device: &wgpu::Device, params: RgbShiftParams) -> Self {
        Self {
            shader: ShaderPass::new(device, "rgb_shift_pass", shaders::RGB_SHIFT_FRAGMENT, HDR_FORMAT),
            params,
        }
    }
}

impl PostPass for RgbShiftPass {
    fn label(&self) -> &str {
        self.shader.label()
    }

    fn enabled(&self) -> bool {
        !self.params.is_identity()
    }

    fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
    ) {
        let uniforms = RgbShiftUniforms::from(&self.params);
        self.shader.draw(device, queue, encoder, input, output, &uniforms);
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OutputUniforms {
    pub exposure: f32,
    pub _pad: [f32; 3],
}

/// Tone maps the HDR chain into the display surface.
pub struct OutputPass {
    shader: ShaderPass<OutputUniforms>,
    pub tone_mapping: ToneMapping,
}

impl OutputPass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, tone_mapping: ToneMapping) -> Self {
        if !surface_format.is_srgb() {
            tracing::warn!("surface format {surface_format:?} is not sRGB; output will look dark");
        }
        Self {
            shader: ShaderPass::new(device, "output_pass", shaders::OUTPUT_FRAGMENT, surface_format),
            tone_mapping,
        }
    }
}

impl PostPass for OutputPass {
    fn label(&self) -> &str {
        self.shader.label()
    }

    fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
    ) {
        let uniforms = OutputUniforms {
            exposure: self.tone_mapping.exposure,
            _pad: [0.0; 3],
        };
        self.shader.draw(device, queue, encoder, input, output, &uniforms);
    }
}
