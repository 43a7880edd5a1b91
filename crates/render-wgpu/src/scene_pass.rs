use crate::environment::GpuEnvironment;
use crate::gpu::{DEPTH_FORMAT, HDR_FORMAT, Vertex, create_depth_texture, uniform_entry};
use crate::model::GpuModel;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use glint_assets::PrefilteredEnvironment;
use glint_scene::{ModelId, PerspectiveCamera, Scene};
use std::sync::Arc;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub inv_view_rot_proj: [[f32; 4]; 4],
    /// xyz: camera position, w: last environment mip level
    pub camera: [f32; 4],
}

impl FrameUniforms {
    pub fn new(camera: &PerspectiveCamera, model: Mat4, max_env_level: f32) -> Self {
        let normal = Mat4::from_mat3(glam::Mat3::from_mat4(model).inverse().transpose());
        let p = camera.position;
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal_matrix: normal.to_cols_array_2d(),
            inv_view_rot_proj: camera.inverse_view_rotation_projection().to_cols_array_2d(),
            camera: [p.x, p.y, p.z, max_env_level],
        }
    }
}

/// Base render pass: draws the scene into an HDR target.
pub struct ScenePass {
    opaque_pipeline: wgpu::RenderPipeline,
    blend_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    env_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    environment: GpuEnvironment,
    env_source: Option<Arc<PrefilteredEnvironment>>,
    model: Option<(ModelId, GpuModel)>,
    depth: wgpu::TextureView,
    pub show_background: bool,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let env_layout = GpuEnvironment::bind_group_layout(device);
        let material_layout = GpuModel::material_layout(device);

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniforms"),
            contents: bytemuck::bytes_of(&FrameUniforms::new(
                &PerspectiveCamera::default(),
                Mat4::IDENTITY,
                0.0,
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let model_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("model_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &env_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &env_layout],
            push_constant_ranges: &[],
        });

        let pbr = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pbr_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::pbr_shader().into()),
        });
        let background = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::background_shader().into()),
        });

        let opaque_pipeline = model_pipeline(device, &model_layout, &pbr, false);
        let blend_pipeline = model_pipeline(device, &model_layout, &pbr, true);
        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("background_pipeline"),
            layout: Some(&background_layout),
            vertex: wgpu::VertexState {
                module: &background,
                entry_point: Some("vs_background"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &background,
                entry_point: Some("fs_background"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: Default::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let environment = GpuEnvironment::fallback(device, queue, &env_layout);

        Self {
            opaque_pipeline,
            blend_pipeline,
            background_pipeline,
            frame_buffer,
            frame_bind_group,
            env_layout,
            material_layout,
            environment,
            env_source: None,
            model: None,
            depth: create_depth_texture(device, width, height),
            show_background: false,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = create_depth_texture(device, width, height);
    }

    /// Upload whatever environment or model the scene gained since the last
    /// frame.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        if let Some(env) = scene.environment() {
            let uploaded = self
                .env_source
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, env));
            if !uploaded {
                self.environment = GpuEnvironment::upload(device, queue, &self.env_layout, env);
                self.env_source = Some(env.clone());
            }
        }

        match scene.model() {
            Some(model) if self.model.as_ref().map(|(id, _)| *id) != Some(model.id) => {
                let gpu = GpuModel::upload(device, queue, &self.material_layout, &model.data);
                self.model = Some((model.id, gpu));
            }
            None => self.model = None,
            _ => {}
        }
    }

    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        target: &wgpu::TextureView,
    ) {
        let model_matrix = scene
            .model()
            .map(|m| m.transform.matrix())
            .unwrap_or(Mat4::IDENTITY);
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(
                &scene.camera,
                model_matrix,
                self.environment.max_level(),
            )),
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.environment.bind_group, &[]);

        if self.show_background {
            pass.set_pipeline(&self.background_pipeline);
            pass.draw(0..3, 0..1);
        }

        if let Some((_, model)) = &self.model {
            pass.set_pipeline(&self.opaque_pipeline);
            model.draw(&mut pass, false);
            if model.has_blended() {
                pass.set_pipeline(&self.blend_pipeline);
                model.draw(&mut pass, true);
            }
        }
    }
}

fn model_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    blended: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if blended { "blend_pipeline" } else { "opaque_pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(if blended {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        // Back faces are shaded with a flipped normal instead of culled.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !blended,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}
