use image::RgbImage;
use log::{debug, warn};
use rand::seq::index;
use rand::Rng;

use crate::classify::PixelClassifier;
use crate::color::{Color, ColorLabel};
use crate::error::{MatchError, Result};
use crate::pipeline::vote;

/// Where and how densely pixels are sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    /// Pixels drawn from the central crop of the reference image.
    pub reference_samples: usize,
    /// Start of the central crop along each axis, in percent.
    pub crop_start_percent: u32,
    /// End of the central crop along each axis, in percent.
    pub crop_end_percent: u32,
    /// One in this many pixels of each closet segment is classified.
    pub segment_divisor: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            reference_samples: 400,
            crop_start_percent: 40,
            crop_end_percent: 60,
            segment_divisor: 5,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reference_samples == 0 {
            return Err(MatchError::invalid(
                "reference_samples",
                self.reference_samples,
            ));
        }
        if self.crop_start_percent >= self.crop_end_percent || self.crop_end_percent > 100 {
            return Err(MatchError::invalid(
                "central crop",
                format!("{}%..{}%", self.crop_start_percent, self.crop_end_percent),
            ));
        }
        if self.segment_divisor == 0 {
            return Err(MatchError::invalid("segment_divisor", self.segment_divisor));
        }
        Ok(())
    }
}

/// Classify the pixels at `coordinates` and return the majority label.
///
/// Coordinates are `(x, y)`. An empty list fails with `EmptyInput`.
pub fn estimate(
    image: &RgbImage,
    coordinates: &[(u32, u32)],
    classifier: &dyn PixelClassifier,
) -> Result<ColorLabel> {
    let (width, height) = image.dimensions();
    let mut pixels = Vec::with_capacity(coordinates.len());
    for &(x, y) in coordinates {
        if x >= width || y >= height {
            return Err(MatchError::invalid(
                "coordinate",
                format!("({x}, {y}) outside {width}x{height}"),
            ));
        }
        pixels.push(Color::from(*image.get_pixel(x, y)));
    }
    let labels = classifier.classify_batch(&pixels);
    vote::mode(&labels)
}

/// Uniformly draw `config.reference_samples` coordinates from the central
/// crop of a `width` x `height` image. Draws are independent per axis and
/// may repeat.
pub fn central_coordinates<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<Vec<(u32, u32)>> {
    if width == 0 || height == 0 {
        return Err(MatchError::EmptyImage);
    }
    let xs = crop_span(width, config.crop_start_percent, config.crop_end_percent);
    let ys = crop_span(height, config.crop_start_percent, config.crop_end_percent);
    debug!(
        "sampling {} pixels from x {:?}, y {:?}",
        config.reference_samples, xs, ys
    );
    Ok((0..config.reference_samples)
        .map(|_| (rng.random_range(xs.clone()), rng.random_range(ys.clone())))
        .collect())
}

/// Integer positions within `[len * start%, len * end%)`, never empty.
fn crop_span(len: u32, start_percent: u32, end_percent: u32) -> std::ops::Range<u32> {
    let len64 = len as u64;
    let lo = ((len64 * start_percent as u64 / 100) as u32).min(len - 1);
    let hi = ((len64 * end_percent as u64).div_ceil(100) as u32).clamp(lo + 1, len);
    lo..hi
}

/// Pick `len / divisor` of a segment's coordinates without replacement.
///
/// Segments too small to yield a single sample keep all their pixels, so the
/// result is only empty when `coordinates` is.
pub fn sample_segment<R: Rng + ?Sized>(
    coordinates: &[(u32, u32)],
    divisor: usize,
    rng: &mut R,
) -> Vec<(u32, u32)> {
    let amount = coordinates.len() / divisor.max(1);
    if amount == 0 {
        return coordinates.to_vec();
    }
    index::sample(rng, coordinates.len(), amount)
        .into_iter()
        .map(|i| coordinates[i])
        .collect()
}

/// Dominant label of the central region of the reference garment image.
pub fn estimate_reference<R: Rng + ?Sized>(
    image: &RgbImage,
    classifier: &dyn PixelClassifier,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<ColorLabel> {
    let (width, height) = image.dimensions();
    let coordinates = central_coordinates(width, height, config, rng)?;
    let label = estimate(image, &coordinates, classifier)?;
    if label.is_neutral() {
        warn!("reference garment reads as {label}; every chromatic color will match");
    }
    Ok(label)
}
