use std::collections::BTreeSet;

use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{MatchError, Result};
use crate::segment::SegmentMap;

pub const DEFAULT_BLEND_FACTOR: f32 = 0.85;

const CLEAR: Rgba<u8> = Rgba([255, 255, 255, 0]);
const SHADE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// `true` wherever the pixel belongs to a matched segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl HighlightMask {
    pub fn build(segments: &SegmentMap, matched: &BTreeSet<u32>) -> Self {
        Self {
            width: segments.width(),
            height: segments.height(),
            bits: segments
                .as_slice()
                .iter()
                .map(|id| matched.contains(id))
                .collect(),
        }
    }

    /// Whether `(x, y)` is highlighted. Panics when out of bounds, like
    /// [`SegmentMap::get`].
    pub fn get(&self, x: u32, y: u32) -> bool {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn highlighted_pixels(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Opacity layer: clear over matches, opaque black everywhere else.
    fn shade_layer(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) {
                CLEAR
            } else {
                SHADE
            }
        })
    }
}

/// Shade the segments of `image` that are not in `matched`.
///
/// The shade layer is alpha-composited over the image, then the result is
/// mixed back with the original: `original * (1 - blend) + shaded * blend`.
/// Matched pixels come out unchanged; unmatched ones keep `1 - blend` of
/// their brightness.
pub fn composite(
    image: &RgbImage,
    segments: &SegmentMap,
    matched: &BTreeSet<u32>,
    blend_factor: f32,
) -> Result<RgbImage> {
    if !(0.0..=1.0).contains(&blend_factor) {
        return Err(MatchError::invalid("blend_factor", blend_factor));
    }
    segments.ensure_matches(image)?;

    let mask = HighlightMask::build(segments, matched);
    let mut layered = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
    imageops::overlay(&mut layered, &mask.shade_layer(), 0, 0);

    let (width, height) = image.dimensions();
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let original = image.get_pixel(x, y).0;
        let shaded = layered.get_pixel(x, y).0;
        Rgb(std::array::from_fn(|c| {
            lerp(original[c], shaded[c], blend_factor)
        }))
    }))
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    (from as f32 * (1.0 - t) + to as f32 * t)
        .round()
        .clamp(0.0, 255.0) as u8
}
