//! Post-processing parameters and CPU reference filters.
//!
//! The GPU passes in the wgpu backend sample exactly the way these functions
//! do, which lets the filters be checked on plain images.

use glam::{Mat3, Vec2, Vec3};
use image::{Rgba, RgbaImage};

/// Chromatic split: red is sampled ahead of the pixel along `angle`, blue
/// behind it, green and alpha at the pixel itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbShiftParams {
    /// Offset length in texture coordinates (fraction of the image width).
    pub amount: f32,
    /// Direction of the offset in radians; 0 shifts along +x.
    pub angle: f32,
}

impl Default for RgbShiftParams {
    fn default() -> Self {
        Self {
            amount: 0.005,
            angle: 0.0,
        }
    }
}

impl RgbShiftParams {
    pub fn new(amount: f32, angle: f32) -> Self {
        Self { amount, angle }
    }

    /// Offset in texture space, +y pointing up.
    pub fn offset(&self) -> Vec2 {
        self.amount * Vec2::new(self.angle.cos(), self.angle.sin())
    }

    pub fn is_identity(&self) -> bool {
        self.amount == 0.0
    }
}

/// Bilinear sample of one channel with clamp-to-edge addressing.
/// `u`, `v` are texture coordinates with `v` growing downward (row order).
fn sample(img: &RgbaImage, u: f32, v: f32, channel: usize) -> f32 {
    let (w, h) = img.dimensions();
    let fx = u * w as f32 - 0.5;
    let fy = v * h as f32 - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let at = |x: f32, y: f32| {
        let x = (x as i64).clamp(0, w as i64 - 1) as u32;
        let y = (y as i64).clamp(0, h as i64 - 1) as u32;
        img.get_pixel(x, y)[channel] as f32
    };
    let top = at(x0, y0) * (1.0 - tx) + at(x0 + 1.0, y0) * tx;
    let bottom = at(x0, y0 + 1.0) * (1.0 - tx) + at(x0 + 1.0, y0 + 1.0) * tx;
    top * (1.0 - ty) + bottom * ty
}

/// Apply the RGB shift to an 8-bit image.
pub fn rgb_shift(src: &RgbaImage, params: &RgbShiftParams) -> RgbaImage {
    let (w, h) = src.dimensions();
    if params.is_identity() || w == 0 || h == 0 {
        return src.clone();
    }
    let offset = params.offset();
    // Rows run top to bottom, texture-space +y runs upward.
    let (du, dv) = (offset.x, -offset.y);
    let to_u8 = |c: f32| c.round().clamp(0.0, 255.0) as u8;

    RgbaImage::from_fn(w, h, |x, y| {
        let u = (x as f32 + 0.5) / w as f32;
        let v = (y as f32 + 0.5) / h as f32;
        let centre = src.get_pixel(x, y);
        Rgba([
            to_u8(sample(src, u + du, v + dv, 0)),
            centre[1],
            to_u8(sample(src, u - du, v - dv, 2)),
            centre[3],
        ])
    })
}

/// Exposure 0.6 leaves colours unscaled before the curve.
pub const NEUTRAL_EXPOSURE: f32 = 0.6;

/// Final HDR to display mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapping {
    pub exposure: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            exposure: NEUTRAL_EXPOSURE,
        }
    }
}

impl ToneMapping {
    pub fn apply(&self, color: Vec3) -> Vec3 {
        aces_filmic(color, self.exposure)
    }
}

fn rrt_and_odt_fit(v: Vec3) -> Vec3 {
    let a = v * (v + 0.024_578_6) - 0.000_090_537;
    let b = v * (0.983_729 * v + 0.432_951) + 0.238_081;
    a / b
}

/// ACES filmic curve (Hill fit) on linear RGB, output clamped to `[0, 1]`.
pub fn aces_filmic(color: Vec3, exposure: f32) -> Vec3 {
    let input = Mat3::from_cols(
        Vec3::new(0.597_19, 0.076_00, 0.028_40),
        Vec3::new(0.354_58, 0.908_34, 0.133_83),
        Vec3::new(0.048_23, 0.015_66, 0.837_77),
    );
    let output = Mat3::from_cols(
        Vec3::new(1.604_75, -0.102_08, -0.003_27),
        Vec3::new(-0.531_08, 1.108_13, -0.072_76),
        Vec3::new(-0.073_67, -0.006_05, 1.076_02),
    );
    let c = color * (exposure / NEUTRAL_EXPOSURE);
    (output * rrt_and_odt_fit(input * c)).clamp(Vec3::ZERO, Vec3::ONE)
}
