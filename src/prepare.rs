use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use imageproc::filter::bilateral::{bilateral_filter, GaussianEuclideanColorDistance};
use log::debug;

use crate::error::MatchError;

pub const DEFAULT_BASE_WIDTH: u32 = 600;

/// Simplest color balance followed by a gamma lift and an optional
/// edge-preserving denoise.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceConfig {
    /// Share of each channel, in percent, clipped before stretching. Half is
    /// taken from each end of the histogram.
    pub percentile: f32,
    pub gamma: f32,
    pub denoise: Option<BilateralConfig>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            percentile: 10.0,
            gamma: 0.75,
            denoise: Some(BilateralConfig::default()),
        }
    }
}

/// Bilateral filter settings. A radius of 2 is a 5x5 window.
#[derive(Debug, Clone, PartialEq)]
pub struct BilateralConfig {
    pub radius: u8,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralConfig {
    fn default() -> Self {
        Self {
            radius: 2,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

/// Load an image, resize it to `base_width` (preserving aspect ratio) and
/// optionally color-balance it.
pub fn load_and_prepare(
    path: &Path,
    base_width: u32,
    balance: Option<&BalanceConfig>,
) -> Result<RgbImage> {
    let img = image::open(path).with_context(|| {
        if !path.exists() {
            format!("file not found: {}", path.display())
        } else {
            format!(
                "unsupported or corrupt image: {}. Supported formats: PNG, JPEG, WebP, BMP, TIFF, GIF",
                path.display()
            )
        }
    })?;
    let rgb = resize_to_width(&img.to_rgb8(), base_width)?;
    debug!(
        "loaded {} as {}x{}",
        path.display(),
        rgb.width(),
        rgb.height()
    );

    match balance {
        Some(config) => Ok(correct_colors(&rgb, config)?),
        None => Ok(rgb),
    }
}

/// Balance, gamma, then denoise when `config.denoise` is set.
pub fn correct_colors(img: &RgbImage, config: &BalanceConfig) -> crate::error::Result<RgbImage> {
    let balanced = balance_colors(img, config)?;
    match &config.denoise {
        Some(bilateral) => denoise(&balanced, bilateral),
        None => Ok(balanced),
    }
}

/// Edge-preserving smoothing: neighbours within `radius` are averaged,
/// weighted by spatial distance and by color distance.
pub fn denoise(img: &RgbImage, config: &BilateralConfig) -> crate::error::Result<RgbImage> {
    if !(config.sigma_color > 0.0) {
        return Err(MatchError::invalid("sigma_color", config.sigma_color));
    }
    if !(config.sigma_space > 0.0) {
        return Err(MatchError::invalid("sigma_space", config.sigma_space));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(MatchError::EmptyImage);
    }
    if config.radius == 0 {
        return Ok(img.clone());
    }
    Ok(bilateral_filter(
        img,
        config.radius,
        config.sigma_space,
        GaussianEuclideanColorDistance::new(config.sigma_color),
    ))
}

/// Resize to `base_width` columns, scaling the height to match.
pub fn resize_to_width(img: &RgbImage, base_width: u32) -> crate::error::Result<RgbImage> {
    if base_width == 0 {
        return Err(MatchError::invalid("base_width", base_width));
    }
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(MatchError::EmptyImage);
    }
    if width == base_width {
        return Ok(img.clone());
    }
    let new_height = ((height as u64 * base_width as u64) as f64 / width as f64)
        .round()
        .max(1.0) as u32;
    Ok(image::imageops::resize(
        img,
        base_width,
        new_height,
        FilterType::Triangle,
    ))
}

/// Per-channel histogram stretch, then gamma.
///
/// Each channel is clipped at its `percentile / 2` lower and upper
/// percentiles and stretched to fill 0..=255. A channel whose clipped range
/// is a single value keeps that value instead of collapsing to 0. Gamma below
/// 1 brightens midtones.
pub fn balance_colors(img: &RgbImage, config: &BalanceConfig) -> crate::error::Result<RgbImage> {
    if !(config.percentile > 0.0 && config.percentile < 100.0) {
        return Err(MatchError::invalid("percentile", config.percentile));
    }
    if !(config.gamma > 0.0) {
        return Err(MatchError::invalid("gamma", config.gamma));
    }
    if img.width() == 0 || img.height() == 0 {
        return Err(MatchError::EmptyImage);
    }

    let half = config.percentile as f64 / 200.0;
    let tables: [[u8; 256]; 3] =
        std::array::from_fn(|c| channel_table(img, c, half, config.gamma));

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = pixel.0;
        *pixel = Rgb([
            tables[0][r as usize],
            tables[1][g as usize],
            tables[2][b as usize],
        ]);
    }
    Ok(out)
}

/// Lookup table for one channel: clip, stretch, gamma.
fn channel_table(img: &RgbImage, channel: usize, half: f64, gamma: f32) -> [u8; 256] {
    let mut histogram = [0usize; 256];
    for pixel in img.pixels() {
        histogram[pixel[channel] as usize] += 1;
    }
    let n = img.width() as usize * img.height() as usize;
    let low = nth_value(&histogram, (n as f64 * half).floor() as usize);
    let high = nth_value(&histogram, ((n as f64 * (1.0 - half)).ceil() as usize).min(n - 1));
    debug!("channel {channel}: clipping to {low}..={high}");

    std::array::from_fn(|v| {
        let clipped = (v as u8).clamp(low, high);
        let stretched = if high > low {
            (clipped - low) as f32 * 255.0 / (high - low) as f32
        } else {
            clipped as f32
        };
        (255.0 * (stretched / 255.0).powf(gamma)).round().clamp(0.0, 255.0) as u8
    })
}

/// The `rank`-th smallest value (0-based) described by a histogram.
fn nth_value(histogram: &[usize; 256], rank: usize) -> u8 {
    let mut seen = 0;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as u8;
        }
    }
    u8::MAX
}
