use image::{imageops, RgbImage};
use log::debug;
use palette::Lab;

use super::{SegmentMap, Segmenter};
use crate::color::Color;
use crate::error::{MatchError, Result};

pub const DEFAULT_SEGMENTS: usize = 350;
pub const DEFAULT_COMPACTNESS: f32 = 10.0;
pub const DEFAULT_SIGMA: f32 = 1.0;
const DEFAULT_ITERATIONS: usize = 10;
/// Fragments smaller than this share of the mean superpixel area get merged.
const MIN_SIZE_FACTOR: f32 = 0.5;
const UNASSIGNED: u32 = u32::MAX;

/// Simple Linear Iterative Clustering superpixels.
///
/// Clusters pixels in CIELAB plus image position. `compactness` trades color
/// similarity against spatial proximity; `sigma` is the Gaussian smoothing
/// applied beforehand (0 disables it).
#[derive(Debug, Clone, PartialEq)]
pub struct SlicSegmenter {
    pub n_segments: usize,
    pub compactness: f32,
    pub sigma: f32,
    pub iterations: usize,
}

impl Default for SlicSegmenter {
    fn default() -> Self {
        Self {
            n_segments: DEFAULT_SEGMENTS,
            compactness: DEFAULT_COMPACTNESS,
            sigma: DEFAULT_SIGMA,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Center {
    l: f32,
    a: f32,
    b: f32,
    x: f32,
    y: f32,
}

impl SlicSegmenter {
    fn validate(&self) -> Result<()> {
        if self.n_segments == 0 {
            return Err(MatchError::invalid("n_segments", self.n_segments));
        }
        if !(self.compactness > 0.0) {
            return Err(MatchError::invalid("compactness", self.compactness));
        }
        if !(self.sigma >= 0.0) {
            return Err(MatchError::invalid("sigma", self.sigma));
        }
        Ok(())
    }
}

impl Segmenter for SlicSegmenter {
    fn segment(&self, image: &RgbImage) -> Result<SegmentMap> {
        self.validate()?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(MatchError::EmptyImage);
        }

        let smoothed = if self.sigma > 0.0 {
            imageops::blur(image, self.sigma)
        } else {
            image.clone()
        };
        let lab: Vec<Lab> = smoothed
            .pixels()
            .map(|p| Color::from(*p).to_lab())
            .collect();

        let (w, h) = (width as usize, height as usize);
        let step = ((w * h) as f32 / self.n_segments as f32).sqrt().max(1.0);
        let spatial_weight = (self.compactness / step).powi(2);
        let mut centers = seed_centers(&lab, w, h, step);

        let mut labels = vec![UNASSIGNED; w * h];
        let mut distances = vec![f32::INFINITY; w * h];
        for _ in 0..self.iterations {
            distances.fill(f32::INFINITY);
            for (k, c) in centers.iter().enumerate() {
                let x0 = (c.x - step).floor().max(0.0) as usize;
                let x1 = ((c.x + step).ceil() as usize + 1).min(w);
                let y0 = (c.y - step).floor().max(0.0) as usize;
                let y1 = ((c.y + step).ceil() as usize + 1).min(h);
                for y in y0..y1 {
                    for x in x0..x1 {
                        let i = y * w + x;
                        let p = lab[i];
                        let dc = (p.l - c.l).powi(2) + (p.a - c.a).powi(2) + (p.b - c.b).powi(2);
                        let ds = (x as f32 - c.x).powi(2) + (y as f32 - c.y).powi(2);
                        let d = dc + ds * spatial_weight;
                        if d < distances[i] {
                            distances[i] = d;
                            labels[i] = k as u32;
                        }
                    }
                }
            }
            update_centers(&mut centers, &labels, &lab, w);
        }
        fill_unassigned(&mut labels, &centers, w);

        let min_size = ((w * h) as f32 / centers.len() as f32 * MIN_SIZE_FACTOR) as usize;
        let ids = enforce_connectivity(&labels, w, h, min_size.max(1));
        debug!(
            "slic: {} seeds on a {}x{} grid step {:.1}, {} segments after connectivity",
            centers.len(),
            width,
            height,
            step,
            ids.iter().max().map_or(0, |&m| m + 1)
        );
        SegmentMap::new(width, height, ids)
    }
}

/// One seed at the middle of each cell of a grid with spacing close to
/// `step`. Each axis gets at least one cell, so strips thinner than `step`
/// are still seeded along their length.
fn seed_centers(lab: &[Lab], w: usize, h: usize, step: f32) -> Vec<Center> {
    let cells = |len: usize| ((len as f32 / step).round() as usize).clamp(1, len);
    let (nx, ny) = (cells(w), cells(h));
    let (cell_w, cell_h) = (w as f32 / nx as f32, h as f32 / ny as f32);

    let mut centers = Vec::with_capacity(nx * ny);
    for iy in 0..ny {
        let y = (iy as f32 + 0.5) * cell_h;
        for ix in 0..nx {
            let x = (ix as f32 + 0.5) * cell_w;
            let p = lab[(y as usize).min(h - 1) * w + (x as usize).min(w - 1)];
            centers.push(Center {
                l: p.l,
                a: p.a,
                b: p.b,
                x,
                y,
            });
        }
    }
    centers
}

fn update_centers(centers: &mut [Center], labels: &[u32], lab: &[Lab], w: usize) {
    let mut sums = vec![[0f32; 5]; centers.len()];
    let mut counts = vec![0usize; centers.len()];
    for (i, &k) in labels.iter().enumerate() {
        if k == UNASSIGNED {
            continue;
        }
        let p = lab[i];
        let s = &mut sums[k as usize];
        s[0] += p.l;
        s[1] += p.a;
        s[2] += p.b;
        s[3] += (i % w) as f32;
        s[4] += (i / w) as f32;
        counts[k as usize] += 1;
    }
    for (c, (s, &n)) in centers.iter_mut().zip(sums.iter().zip(&counts)) {
        if n > 0 {
            let n = n as f32;
            *c = Center {
                l: s[0] / n,
                a: s[1] / n,
                b: s[2] / n,
                x: s[3] / n,
                y: s[4] / n,
            };
        }
    }
}

/// Give any pixel no search window reached the spatially nearest center.
fn fill_unassigned(labels: &mut [u32], centers: &[Center], w: usize) {
    for (i, label) in labels.iter_mut().enumerate() {
        if *label != UNASSIGNED {
            continue;
        }
        let (x, y) = ((i % w) as f32, (i / w) as f32);
        *label = centers
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (a.x - x).powi(2) + (a.y - y).powi(2);
                let db = (b.x - x).powi(2) + (b.y - y).powi(2);
                da.total_cmp(&db)
            })
            .map_or(0, |(k, _)| k as u32);
    }
}

fn neighbours(i: usize, w: usize, h: usize) -> impl Iterator<Item = usize> {
    let (x, y) = (i % w, i / w);
    [
        (x > 0).then(|| i - 1),
        (y > 0).then(|| i - w),
        (x + 1 < w).then(|| i + 1),
        (y + 1 < h).then(|| i + w),
    ]
    .into_iter()
    .flatten()
}

/// Relabel 4-connected components to `0..n`, folding components smaller
/// than `min_size` into an already-labelled neighbour.
fn enforce_connectivity(labels: &[u32], w: usize, h: usize, min_size: usize) -> Vec<u32> {
    let mut out = vec![UNASSIGNED; labels.len()];
    let mut next = 0u32;
    let mut stack = Vec::new();
    let mut component = Vec::new();

    for start in 0..labels.len() {
        if out[start] != UNASSIGNED {
            continue;
        }
        let original = labels[start];
        // raster order: the left/upper neighbours are already final
        let adjacent = neighbours(start, w, h)
            .find(|&j| out[j] != UNASSIGNED)
            .map(|j| out[j]);

        component.clear();
        out[start] = next;
        stack.push(start);
        while let Some(i) = stack.pop() {
            component.push(i);
            for j in neighbours(i, w, h) {
                if out[j] == UNASSIGNED && labels[j] == original {
                    out[j] = next;
                    stack.push(j);
                }
            }
        }

        match adjacent {
            Some(adj) if component.len() < min_size => {
                for &i in &component {
                    out[i] = adj;
                }
            }
            _ => next += 1,
        }
    }
    out
}
