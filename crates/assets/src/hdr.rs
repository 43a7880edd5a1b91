//! Radiance HDR (`.hdr`) decoding into linear RGB.

use crate::AssetError;

/// Decoded high dynamic range image.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    /// Linear RGB, 3 floats per pixel, row-major, top row first.
    pub data: Vec<f32>,
}

impl HdrImage {
    /// Decode Radiance RGBE bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)
            .map_err(|e| AssetError::Hdr(e.to_string()))?;
        let rgb = img.into_rgb32f();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(AssetError::Hdr("image dimensions cannot be zero".into()));
        }
        tracing::debug!("decoded HDR {width}x{height}");
        Ok(Self {
            width,
            height,
            data: rgb.into_raw(),
        })
    }

    pub fn from_rgb(width: u32, height: u32, data: Vec<f32>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(AssetError::Hdr(format!(
                "{width}x{height} image needs {expected} floats, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Average radiance per channel.
    pub fn mean(&self) -> [f32; 3] {
        let mut sum = [0.0f64; 3];
        for px in self.data.chunks_exact(3) {
            for (s, v) in sum.iter_mut().zip(px) {
                *s += *v as f64;
            }
        }
        let n = self.pixel_count().max(1) as f64;
        [
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ]
    }

    /// Brightest pixel by Rec. 709 luminance.
    pub fn peak_luminance(&self) -> f32 {
        self.data
            .chunks_exact(3)
            .map(|p| 0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2])
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x1 uncompressed RGBE file: white at 1.0, then pure red at 1.0.
    fn tiny_hdr() -> Vec<u8> {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 2\n".to_vec();
        bytes.extend_from_slice(&[128, 128, 128, 129]);
        bytes.extend_from_slice(&[128, 0, 0, 129]);
        bytes
    }

    #[test]
    fn decode_uncompressed_scanline() {
        let img = HdrImage::decode(&tiny_hdr()).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        let white = img.pixel(0, 0);
        let red = img.pixel(1, 0);
        for c in white {
            assert!((c - 1.0).abs() < 0.01, "white channel {c}");
        }
        assert!((red[0] - 1.0).abs() < 0.01);
        assert!(red[1].abs() < 0.01 && red[2].abs() < 0.01);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = HdrImage::decode(b"not an hdr").unwrap_err();
        assert!(matches!(err, AssetError::Hdr(_)));
    }

    #[test]
    fn from_rgb_checks_length() {
        assert!(HdrImage::from_rgb(2, 2, vec![0.0; 12]).is_ok());
        assert!(HdrImage::from_rgb(2, 2, vec![0.0; 11]).is_err());
        assert!(HdrImage::from_rgb(0, 2, vec![]).is_err());
    }

    #[test]
    fn mean_and_peak() {
        let img = HdrImage::from_rgb(2, 1, vec![2.0, 2.0, 2.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(img.mean(), [1.0, 1.0, 1.0]);
        assert!((img.peak_luminance() - 2.0).abs() < 1e-5);
    }
}
