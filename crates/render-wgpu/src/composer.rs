use crate::gpu::{HDR_FORMAT, RenderTarget};
use crate::passes::{OutputPass, RgbShiftPass};
use crate::scene_pass::ScenePass;
use glint_common::Viewport;
use glint_render::{RgbShiftParams, ToneMapping};
use glint_scene::Scene;

/// A fullscreen effect that reads one texture and writes another.
pub trait PostPass {
    fn label(&self) -> &str;

    /// Disabled passes are skipped and the chain reads through them.
    fn enabled(&self) -> bool {
        true
    }

    fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
    );
}

/// Where a pass reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Target(usize),
    Surface,
}

/// Input and output slots for `count` post passes that follow the scene
/// pass. The scene writes target 0, intermediate passes alternate between
/// the two targets and the last pass writes the surface.
pub fn pass_slots(count: usize) -> Vec<(Slot, Slot)> {
    let mut current = 0;
    (0..count)
        .map(|i| {
            let input = Slot::Target(current);
            let output = if i + 1 == count {
                Slot::Surface
            } else {
                current = 1 - current;
                Slot::Target(current)
            };
            (input, output)
        })
        .collect()
}

/// Scene pass followed by a chain of post passes, ending on the surface.
pub struct Composer {
    scene: ScenePass,
    rgb_shift: RgbShiftPass,
    output: OutputPass,
    targets: [RenderTarget; 2],
    viewport: Viewport,
}

impl Composer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
        rgb_shift: RgbShiftParams,
        tone_mapping: ToneMapping,
    ) -> Self {
        let (width, height) = viewport.render_size();
        tracing::info!(
            "composer targets {}x{} (pixel ratio {:.2})",
            width,
            height,
            viewport.pixel_ratio()
        );
        Self {
            scene: ScenePass::new(device, queue, width, height),
            rgb_shift: RgbShiftPass::new(device, rgb_shift),
            output: OutputPass::new(device, surface_format, tone_mapping),
            targets: create_targets(device, width, height),
            viewport,
        }
    }

    /// Resize the intermediate targets to the viewport's render size.
    pub fn resize(&mut self, device: &wgpu::Device, viewport: Viewport) {
        let size = viewport.render_size();
        self.viewport = viewport;
        if size == self.targets[0].size {
            return;
        }
        tracing::debug!("composer resize to {}x{}", size.0, size.1);
        self.targets = create_targets(device, size.0, size.1);
        self.scene.resize(device, size.0, size.1);
    }

    pub fn render_size(&self) -> (u32, u32) {
        self.targets[0].size
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn rgb_shift_mut(&mut self) -> &mut RgbShiftParams {
        &mut self.rgb_shift.params
    }

    pub fn tone_mapping_mut(&mut self) -> &mut ToneMapping {
        &mut self.output.tone_mapping
    }

    pub fn show_background_mut(&mut self) -> &mut bool {
        &mut self.scene.show_background
    }

    /// Record one frame into `encoder`, finishing on `surface`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        surface: &wgpu::TextureView,
    ) {
        self.scene.sync(device, queue, scene);
        self.scene.render(queue, encoder, scene, &self.targets[0].view);

        let chain: Vec<&dyn PostPass> = [&self.rgb_shift as &dyn PostPass, &self.output]
            .into_iter()
            .filter(|p| p.enabled())
            .collect();
        for (pass, (input, output)) in chain.iter().zip(pass_slots(chain.len())) {
            let view = |slot: Slot| match slot {
                Slot::Target(i) => &self.targets[i].view,
                Slot::Surface => surface,
            };
            tracing::trace!("post pass {} {:?} -> {:?}", pass.label(), input, output);
            pass.render(device, queue, encoder, view(input), view(output));
        }
    }
}

fn create_targets(device: &wgpu::Device, width: u32, height: u32) -> [RenderTarget; 2] {
    [
        RenderTarget::new(device, "composer_target_a", HDR_FORMAT, width, height),
        RenderTarget::new(device, "composer_target_b", HDR_FORMAT, width, height),
    ]
}
