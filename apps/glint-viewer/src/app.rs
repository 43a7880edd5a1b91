use crate::hud;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use egui::Context as EguiContext;
use glint_common::{Viewport, ViewerConfig};
use glint_input::{Action, RotationDriver};
use glint_render::{RgbShiftParams, ToneMapping};
use glint_render_wgpu::Composer;
use glint_scene::{LoadEvent, Scene};
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Everything the viewer owns apart from the GPU.
pub struct AppState {
    pub scene: Scene,
    pub rotation: RotationDriver,
    pub viewport: Viewport,
    pub show_hud: bool,
    loader: Receiver<LoadEvent>,
    started: Instant,
}

impl AppState {
    pub fn new(config: &ViewerConfig, loader: Receiver<LoadEvent>) -> Self {
        let mut scene = Scene::new();
        scene.begin_loading();
        let viewport = Viewport::new(config.window_width, config.window_height, 1.0)
            .with_max_pixel_ratio(config.max_pixel_ratio);
        scene.camera.set_aspect(viewport.aspect());
        Self {
            scene,
            rotation: RotationDriver::new(config.rotation_range, config.tween_duration),
            viewport,
            show_hud: false,
            loader,
            started: Instant::now(),
        }
    }

    /// Seconds since start, the clock used by the rotation tween.
    pub fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Apply one action. Returns false when the viewer should exit.
    pub fn handle(&mut self, action: Action, now: f64) -> bool {
        match action {
            Action::PointerMoved { x, y } => {
                self.rotation
                    .pointer_moved(x, y, now, self.scene.has_model());
            }
            Action::Resized(viewport) => {
                self.viewport = viewport;
                self.scene.camera.set_aspect(viewport.aspect());
            }
            Action::ToggleHud => self.show_hud = !self.show_hud,
            Action::Quit => return false,
            Action::Noop => {}
        }
        true
    }

    /// Drain loader messages and advance the model rotation.
    pub fn update(&mut self, now: f64) {
        for event in self.loader.try_iter() {
            self.scene.apply(event);
        }
        for event in self.scene.drain_events() {
            tracing::debug!("scene event: {event:?}");
        }
        let rotation = self.rotation.rotation(now);
        if let Some(model) = self.scene.model_mut() {
            model.transform.rotation = rotation;
        }
    }
}

/// Translate a window event into a viewer action.
pub fn map_event(event: &WindowEvent, viewport: &Viewport) -> Action {
    match event {
        WindowEvent::CloseRequested => Action::Quit,
        WindowEvent::CursorMoved { position, .. } => Action::pointer(viewport, position.x, position.y),
        WindowEvent::Resized(size) => Action::Resized(
            Viewport::new(size.width, size.height, viewport.scale_factor)
                .with_max_pixel_ratio(viewport.max_pixel_ratio),
        ),
        WindowEvent::ScaleFactorChanged { scale_factor, .. } => Action::Resized(Viewport {
            scale_factor: *scale_factor,
            ..*viewport
        }),
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(key),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } => match key {
            KeyCode::F1 => Action::ToggleHud,
            KeyCode::Escape => Action::Quit,
            _ => Action::Noop,
        },
        _ => Action::Noop,
    }
}

/// Window, surface, device and the render stack built on them.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    composer: Composer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(
        event_loop: &ActiveEventLoop,
        settings: &ViewerConfig,
        egui_ctx: &EguiContext,
        viewport: &mut Viewport,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Glint")
            .with_inner_size(LogicalSize::new(settings.window_width, settings.window_height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glint_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        *viewport = Viewport::new(config.width, config.height, window.scale_factor())
            .with_max_pixel_ratio(settings.max_pixel_ratio);
        let mut composer = Composer::new(
            &device,
            &queue,
            surface_format,
            *viewport,
            RgbShiftParams::new(settings.rgb_shift_amount, settings.rgb_shift_angle),
            ToneMapping {
                exposure: settings.exposure,
            },
        );
        *composer.show_background_mut() = settings.show_background;

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend, surface {:?}",
            adapter.get_info().backend.to_str(),
            surface_format
        );
        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            composer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, viewport: Viewport) {
        self.config.width = viewport.width.max(1);
        self.config.height = viewport.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.composer.resize(&self.device, viewport);
    }

    fn frame(&mut self, state: &mut AppState, egui_ctx: &EguiContext) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        self.composer
            .render(&self.device, &self.queue, &mut encoder, &state.scene, &view);

        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let composer = &mut self.composer;
        let full_output = egui_ctx.run(raw_input, |ctx| {
            hud::draw(ctx, state, composer);
        });
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let egui_commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(
            egui_commands
                .into_iter()
                .chain(std::iter::once(encoder.finish())),
        );
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

pub struct GpuApp {
    state: AppState,
    settings: ViewerConfig,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    pub fn new(settings: ViewerConfig, loader: Receiver<LoadEvent>) -> Self {
        Self {
            state: AppState::new(&settings, loader),
            settings,
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.settings, &self.egui_ctx, &mut self.state.viewport) {
            Ok(gpu) => {
                self.state
                    .scene
                    .camera
                    .set_aspect(self.state.viewport.aspect());
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if gpu.egui_winit.on_window_event(&gpu.window, &event).consumed {
            return;
        }

        if let WindowEvent::RedrawRequested = event {
            let now = self.state.now();
            self.state.update(now);
            gpu.frame(&mut self.state, &self.egui_ctx);
            gpu.window.request_redraw();
            return;
        }

        let action = map_event(&event, &self.state.viewport);
        let resized = matches!(action, Action::Resized(_));
        let now = self.state.now();
        if !self.state.handle(action, now) {
            tracing::info!("exiting");
            event_loop.exit();
            return;
        }
        if resized {
            gpu.resize(self.state.viewport);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::{MeshPrimitive, ModelData};
    use glint_common::Euler;

    fn state() -> (AppState, crossbeam_channel::Sender<LoadEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (AppState::new(&ViewerConfig::default(), rx), tx)
    }

    fn model() -> Arc<ModelData> {
        Arc::new(ModelData {
            name: "tri".into(),
            primitives: vec![MeshPrimitive {
                positions: vec![[0.0; 3]; 3],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                uvs: vec![[0.0; 2]; 3],
                indices: vec![0, 1, 2],
                material: None,
            }],
            ..ModelData::default()
        })
    }

    #[test]
    fn pointer_before_model_is_ignored() {
        let (mut s, _tx) = state();
        assert!(s.handle(Action::PointerMoved { x: 1.0, y: 1.0 }, 0.0));
        assert_eq!(s.rotation.target(), Euler::ZERO);
    }

    #[test]
    fn model_follows_pointer_once_loaded() {
        let (mut s, tx) = state();
        tx.send(LoadEvent::ModelReady(model())).unwrap();
        s.update(0.0);
        assert!(s.scene.has_model());
        s.handle(Action::PointerMoved { x: 1.0, y: 0.5 }, 1.0);
        s.update(2.0);
        let rotation = s.scene.model().unwrap().transform.rotation;
        assert_eq!(rotation, s.rotation.target());
        assert!(rotation.y > 0.0);
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let (mut s, _tx) = state();
        s.handle(Action::Resized(Viewport::new(1000, 500, 1.0)), 0.0);
        assert_eq!(s.scene.camera.aspect, 2.0);
        assert_eq!(s.viewport.width, 1000);
    }

    #[test]
    fn hud_toggle_and_quit() {
        let (mut s, _tx) = state();
        assert!(!s.show_hud);
        s.handle(Action::ToggleHud, 0.0);
        assert!(s.show_hud);
        assert!(!s.handle(Action::Quit, 0.0));
    }

    #[test]
    fn close_request_maps_to_quit() {
        let vp = Viewport::default();
        assert_eq!(map_event(&WindowEvent::CloseRequested, &vp), Action::Quit);
        assert_eq!(map_event(&WindowEvent::Focused(true), &vp), Action::Noop);
    }
}
