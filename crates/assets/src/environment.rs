//! Pre-filtered environment maps.
//!
//! An equirectangular HDR is turned into a mip chain where every level is
//! half the size of the previous one and blurred once more. Sampling a level
//! chosen by surface roughness approximates a pre-filtered radiance lookup:
//! level 0 gives mirror reflections, the last level a diffuse irradiance.
//!
//! Level sizes follow the GPU mip rule (`max(1, base >> i)`) so the chain can
//! be uploaded as one mipmapped texture.

use crate::HdrImage;

/// Widest level 0 kept; larger sources are box-downsampled first.
pub const MAX_BASE_WIDTH: u32 = 1024;
/// Smallest last-level width.
pub const MIN_LEVEL_WIDTH: u32 = 4;
pub const DEFAULT_LEVELS: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct EnvLevel {
    pub width: u32,
    pub height: u32,
    /// Linear RGBA, alpha always 1.
    pub texels: Vec<[f32; 4]>,
}

impl EnvLevel {
    fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[(y * self.width + x) as usize]
    }

    pub fn mean(&self) -> [f32; 3] {
        let mut sum = [0.0f64; 3];
        for t in &self.texels {
            for (s, v) in sum.iter_mut().zip(t) {
                *s += *v as f64;
            }
        }
        let n = self.texels.len().max(1) as f64;
        [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32]
    }

    /// 2x2 box filter to `max(1, w/2) x max(1, h/2)`.
    fn downsample(&self) -> Self {
        let width = (self.width >> 1).max(1);
        let height = (self.height >> 1).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let x0 = (2 * x).min(self.width - 1);
                let x1 = (2 * x + 1).min(self.width - 1);
                let y0 = (2 * y).min(self.height - 1);
                let y1 = (2 * y + 1).min(self.height - 1);
                let mut acc = [0.0f32; 4];
                for (sx, sy) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
                    let t = self.texel(sx, sy);
                    for (a, v) in acc.iter_mut().zip(t) {
                        *a += v * 0.25;
                    }
                }
                texels.push(acc);
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    /// Separable [1 2 1] / 4 blur: wraps around in longitude, clamps at the poles.
    fn blur(&mut self) {
        let (w, h) = (self.width, self.height);
        let mut tmp = vec![[0.0f32; 4]; self.texels.len()];
        for y in 0..h {
            for x in 0..w {
                let l = self.texel((x + w - 1) % w, y);
                let m = self.texel(x, y);
                let r = self.texel((x + 1) % w, y);
                tmp[(y * w + x) as usize] = weigh(l, m, r);
            }
        }
        for y in 0..h {
            for x in 0..w {
                let up = tmp[(y.saturating_sub(1) * w + x) as usize];
                let m = tmp[(y * w + x) as usize];
                let down = tmp[((y + 1).min(h - 1) * w + x) as usize];
                self.texels[(y * w + x) as usize] = weigh(up, m, down);
            }
        }
    }
}

fn weigh(a: [f32; 4], b: [f32; 4], c: [f32; 4]) -> [f32; 4] {
    [
        0.25 * a[0] + 0.5 * b[0] + 0.25 * c[0],
        0.25 * a[1] + 0.5 * b[1] + 0.25 * c[1],
        0.25 * a[2] + 0.5 * b[2] + 0.25 * c[2],
        1.0,
    ]
}

/// Equirectangular radiance mip chain ordered from sharp to blurry.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilteredEnvironment {
    pub levels: Vec<EnvLevel>,
}

impl PrefilteredEnvironment {
    /// Build at most `max_levels` levels from an equirectangular image.
    pub fn from_equirect(hdr: &HdrImage, max_levels: u32) -> Self {
        let _span = tracing::info_span!("prefilter_environment").entered();
        let texels = hdr
            .data
            .chunks_exact(3)
            .map(|p| [finite(p[0]), finite(p[1]), finite(p[2]), 1.0])
            .collect();
        let mut base = EnvLevel {
            width: hdr.width,
            height: hdr.height,
            texels,
        };
        while base.width > MAX_BASE_WIDTH {
            base = base.downsample();
        }

        let count = Self::level_count(base.width, max_levels);
        let mut levels = Vec::with_capacity(count as usize);
        levels.push(base);
        for _ in 1..count {
            let mut next = levels[levels.len() - 1].downsample();
            next.blur();
            levels.push(next);
        }

        tracing::info!(
            "prefiltered environment: {} levels, base {}x{}",
            levels.len(),
            levels[0].width,
            levels[0].height
        );
        Self { levels }
    }

    /// Levels such that the last one stays at least [`MIN_LEVEL_WIDTH`] wide.
    pub fn level_count(base_width: u32, max_levels: u32) -> u32 {
        let mut count = 1;
        let mut w = base_width;
        while count < max_levels && (w >> 1) >= MIN_LEVEL_WIDTH {
            w >>= 1;
            count += 1;
        }
        count
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn base(&self) -> &EnvLevel {
        &self.levels[0]
    }

    /// Fractional mip level for a given perceptual roughness.
    pub fn level_for_roughness(&self, roughness: f32) -> f32 {
        roughness.clamp(0.0, 1.0) * (self.levels.len().saturating_sub(1)) as f32
    }

    /// Uniform environment, used before a real one is loaded.
    pub fn uniform(color: [f32; 3]) -> Self {
        Self {
            levels: vec![EnvLevel {
                width: 1,
                height: 1,
                texels: vec![[color[0], color[1], color[2], 1.0]],
            }],
        }
    }
}

fn finite(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}
