use serde::{Deserialize, Serialize};

/// Window surface dimensions plus the device pixel ratio policy.
///
/// `width`/`height` are physical pixels as reported by the windowing system.
/// Offscreen targets are sized by [`Viewport::render_size`], which caps the
/// pixel ratio so high-DPI displays do not render at full density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
    pub max_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scale_factor: 1.0,
            max_pixel_ratio: 2.0,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
            ..Self::default()
        }
    }

    pub fn with_max_pixel_ratio(mut self, max: f64) -> Self {
        self.max_pixel_ratio = max;
        self
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn pixel_ratio(&self) -> f64 {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        scale.min(self.max_pixel_ratio)
    }

    /// Logical size in points.
    pub fn logical_size(&self) -> (f64, f64) {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        (self.width as f64 / scale, self.height as f64 / scale)
    }

    /// Size of the offscreen render targets: logical size times the capped pixel ratio.
    pub fn render_size(&self) -> (u32, u32) {
        let (lw, lh) = self.logical_size();
        let ratio = self.pixel_ratio();
        let w = (lw * ratio).round() as u32;
        let h = (lh * ratio).round() as u32;
        (w.clamp(1, self.width.max(1)), h.clamp(1, self.height.max(1)))
    }

    /// Cursor position (physical pixels) mapped to `[0, 1]` on both axes.
    pub fn normalized(&self, x: f64, y: f64) -> (f32, f32) {
        (
            (x / self.width.max(1) as f64) as f32,
            (y / self.height.max(1) as f64) as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_survives_zero_height() {
        let vp = Viewport::new(800, 0, 1.0);
        assert_eq!(vp.aspect(), 800.0);
    }

    #[test]
    fn pixel_ratio_is_capped() {
        assert_eq!(Viewport::new(100, 100, 3.0).pixel_ratio(), 2.0);
        assert_eq!(Viewport::new(100, 100, 1.5).pixel_ratio(), 1.5);
        assert_eq!(Viewport::new(100, 100, 0.0).pixel_ratio(), 1.0);
    }

    #[test]
    fn render_size_drops_density_above_cap() {
        // 3x display, 600x300 logical
        let vp = Viewport::new(1800, 900, 3.0);
        assert_eq!(vp.render_size(), (1200, 600));

        let vp = Viewport::new(1600, 900, 2.0);
        assert_eq!(vp.render_size(), (1600, 900));
    }

    #[test]
    fn render_size_never_zero() {
        let vp = Viewport::new(0, 0, 1.0);
        assert_eq!(vp.render_size(), (1, 1));
    }

    #[test]
    fn normalized_cursor() {
        let vp = Viewport::new(200, 100, 1.0);
        assert_eq!(vp.normalized(100.0, 50.0), (0.5, 0.5));
        assert_eq!(vp.normalized(0.0, 100.0), (0.0, 1.0));
    }
}
