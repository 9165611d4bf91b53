//! Per-pixel color classification.
//!
//! The pipeline never owns a classifier. Callers build one and pass it in,
//! which keeps model state out of globals and lets tests substitute doubles.

use palette::Lab;

use crate::color::{Color, ColorLabel};
use crate::error::{MatchError, Result};
use crate::pipeline::vote;

/// Maps a single RGB pixel to one of the ten color labels.
pub trait PixelClassifier: Send + Sync {
    fn classify(&self, pixel: Color) -> ColorLabel;

    fn classify_batch(&self, pixels: &[Color]) -> Vec<ColorLabel> {
        pixels.iter().map(|&pixel| self.classify(pixel)).collect()
    }
}

impl<F> PixelClassifier for F
where
    F: Fn(Color) -> ColorLabel + Send + Sync,
{
    fn classify(&self, pixel: Color) -> ColorLabel {
        self(pixel)
    }
}

pub const DEFAULT_NEIGHBORS: usize = 1;

/// Hand-labelled reference shades used by [`KnnClassifier::default`].
const PROTOTYPES: &[(ColorLabel, [u8; 3])] = &[
    (ColorLabel::Red, [255, 0, 0]),
    (ColorLabel::Red, [200, 30, 30]),
    (ColorLabel::Red, [150, 20, 30]),
    (ColorLabel::Red, [230, 80, 80]),
    (ColorLabel::Yellow, [255, 255, 0]),
    (ColorLabel::Yellow, [230, 210, 60]),
    (ColorLabel::Yellow, [250, 240, 120]),
    (ColorLabel::Green, [0, 255, 0]),
    (ColorLabel::Green, [40, 160, 60]),
    (ColorLabel::Green, [20, 100, 40]),
    (ColorLabel::Green, [120, 200, 110]),
    (ColorLabel::Cyan, [0, 255, 255]),
    (ColorLabel::Cyan, [60, 190, 200]),
    (ColorLabel::Cyan, [20, 130, 140]),
    (ColorLabel::Blue, [0, 0, 255]),
    (ColorLabel::Blue, [40, 70, 180]),
    (ColorLabel::Blue, [20, 30, 110]),
    (ColorLabel::Blue, [100, 140, 230]),
    (ColorLabel::Magenta, [255, 0, 255]),
    (ColorLabel::Magenta, [190, 40, 170]),
    (ColorLabel::Magenta, [130, 30, 120]),
    (ColorLabel::Magenta, [230, 120, 220]),
    (ColorLabel::Black, [0, 0, 0]),
    (ColorLabel::Black, [25, 25, 30]),
    (ColorLabel::Black, [40, 35, 35]),
    (ColorLabel::Brown, [139, 69, 19]),
    (ColorLabel::Brown, [110, 75, 50]),
    (ColorLabel::Brown, [160, 110, 70]),
    (ColorLabel::Brown, [90, 55, 30]),
    (ColorLabel::Grey, [128, 128, 128]),
    (ColorLabel::Grey, [90, 90, 95]),
    (ColorLabel::Grey, [170, 170, 165]),
    (ColorLabel::White, [255, 255, 255]),
    (ColorLabel::White, [235, 235, 230]),
    (ColorLabel::White, [215, 220, 225]),
];

#[derive(Debug, Clone, Copy)]
struct Prototype {
    lab: Lab,
    label: ColorLabel,
}

/// k-nearest-neighbour classifier over labelled colors, measured in CIELAB.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    prototypes: Vec<Prototype>,
    k: usize,
}

impl KnnClassifier {
    /// Build a classifier from labelled samples.
    ///
    /// Fails when there are no samples or `k` is outside `1..=samples`.
    pub fn new(
        samples: impl IntoIterator<Item = (Color, ColorLabel)>,
        k: usize,
    ) -> Result<Self> {
        let prototypes = prototypes_from(samples);
        if prototypes.is_empty() {
            return Err(MatchError::invalid("classifier samples", 0));
        }
        if k == 0 || k > prototypes.len() {
            return Err(MatchError::invalid("neighbors", k));
        }
        Ok(Self { prototypes, k })
    }

    /// The built-in prototype table with `k` neighbours.
    pub fn with_neighbors(k: usize) -> Result<Self> {
        Self::new(builtin_samples(), k)
    }

    pub fn neighbors(&self) -> usize {
        self.k
    }
}

fn builtin_samples() -> impl Iterator<Item = (Color, ColorLabel)> {
    PROTOTYPES
        .iter()
        .map(|&(label, [r, g, b])| (Color::new(r, g, b), label))
}

fn prototypes_from(samples: impl IntoIterator<Item = (Color, ColorLabel)>) -> Vec<Prototype> {
    samples
        .into_iter()
        .map(|(color, label)| Prototype {
            lab: color.to_lab(),
            label,
        })
        .collect()
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self {
            prototypes: prototypes_from(builtin_samples()),
            k: DEFAULT_NEIGHBORS,
        }
    }
}

impl PixelClassifier for KnnClassifier {
    fn classify(&self, pixel: Color) -> ColorLabel {
        let lab = pixel.to_lab();
        let mut ranked: Vec<(f32, ColorLabel)> = self
            .prototypes
            .iter()
            .map(|p| {
                let d = (p.lab.l - lab.l).powi(2)
                    + (p.lab.a - lab.a).powi(2)
                    + (p.lab.b - lab.b).powi(2);
                (d, p.label)
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let neighbours: Vec<ColorLabel> =
            ranked.iter().take(self.k).map(|&(_, label)| label).collect();
        // k >= 1 and prototypes is non-empty, so the vote always has input.
        vote::mode(&neighbours).unwrap_or(ranked[0].1)
    }
}
