//! Region segmentation of the closet image.

pub mod kmeans;
pub mod slic;

use std::collections::{BTreeMap, BTreeSet};

use image::RgbImage;

use crate::error::{MatchError, Result};

pub use kmeans::KmeansSegmenter;
pub use slic::SlicSegmenter;

/// Splits an image into regions, one id per pixel.
pub trait Segmenter {
    fn segment(&self, image: &RgbImage) -> Result<SegmentMap>;
}

/// A per-pixel segment id grid with the same extent as its source image.
///
/// Pixels sharing an id form one segment. Ids carry no ordering meaning and
/// need not be contiguous in value or in space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMap {
    width: u32,
    height: u32,
    ids: Vec<u32>,
}

impl SegmentMap {
    /// Wrap a row-major id buffer. Fails if its length is not `width * height`.
    pub fn new(width: u32, height: u32, ids: Vec<u32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if ids.len() != expected {
            return Err(MatchError::invalid(
                "segment ids",
                format!("{} ids for a {width}x{height} map", ids.len()),
            ));
        }
        Ok(Self { width, height, ids })
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u32) -> Self {
        let mut ids = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                ids.push(f(x, y));
            }
        }
        Self { width, height, ids }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Segment id at `(x, y)`. Panics when out of bounds, like `RgbImage::get_pixel`.
    pub fn get(&self, x: u32, y: u32) -> u32 {
        assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        self.ids[y as usize * self.width as usize + x as usize]
    }

    /// Row-major ids.
    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }

    /// The distinct segment ids present.
    pub fn segment_ids(&self) -> BTreeSet<u32> {
        self.ids.iter().copied().collect()
    }

    /// `(x, y)` coordinates of every pixel carrying `id`.
    pub fn coordinates_of(&self, id: u32) -> Vec<(u32, u32)> {
        self.ids
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value == id)
            .map(|(i, _)| self.position(i))
            .collect()
    }

    /// Coordinates of every segment, gathered in a single pass.
    pub fn coordinates_by_segment(&self) -> BTreeMap<u32, Vec<(u32, u32)>> {
        let mut groups: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        for (i, &id) in self.ids.iter().enumerate() {
            groups.entry(id).or_default().push(self.position(i));
        }
        groups
    }

    /// Fail unless this map covers exactly the pixels of `image`.
    pub fn ensure_matches(&self, image: &RgbImage) -> Result<()> {
        let (image_width, image_height) = image.dimensions();
        if (image_width, image_height) != self.dimensions() {
            return Err(MatchError::ShapeMismatch {
                image_width,
                image_height,
                map_width: self.width,
                map_height: self.height,
            });
        }
        Ok(())
    }

    fn position(&self, index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((index % w) as u32, (index / w) as u32)
    }
}
