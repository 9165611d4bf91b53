use image::RgbImage;
use kmeans_colors::get_kmeans_hamerly;
use log::debug;
use palette::Lab;

use super::{SegmentMap, Segmenter};
use crate::color::Color;
use crate::error::{MatchError, Result};

const MAX_ITER: usize = 20;
const CONVERGE: f32 = 5.0;
/// Cluster indices come back as `u8`.
const MAX_CLUSTERS: usize = u8::MAX as usize;

pub const DEFAULT_CLUSTERS: usize = 12;

/// Segments an image by clustering pixel colors in CIELAB.
///
/// Every pixel of one cluster shares an id, so segments follow color rather
/// than shape and may be scattered across the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmeansSegmenter {
    pub clusters: usize,
    pub seed: u64,
}

impl Default for KmeansSegmenter {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            seed: 42,
        }
    }
}

impl Segmenter for KmeansSegmenter {
    fn segment(&self, image: &RgbImage) -> Result<SegmentMap> {
        let (width, height) = image.dimensions();
        let pixel_count = width as usize * height as usize;
        if pixel_count == 0 {
            return Err(MatchError::EmptyImage);
        }
        if self.clusters == 0 || self.clusters > MAX_CLUSTERS.min(pixel_count) {
            return Err(MatchError::invalid("clusters", self.clusters));
        }

        let lab: Vec<Lab> = image.pixels().map(|p| Color::from(*p).to_lab()).collect();
        let result = get_kmeans_hamerly(self.clusters, MAX_ITER, CONVERGE, false, &lab, self.seed);
        debug!(
            "kmeans: {} clusters over {} pixels, score {:.2}",
            self.clusters, pixel_count, result.score
        );

        let ids = result.indices.iter().map(|&i| i as u32).collect();
        SegmentMap::new(width, height, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn two_colors_become_two_segments() {
        let image = RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Rgb([200, 30, 30])
            } else {
                Rgb([30, 30, 200])
            }
        });
        let segmenter = KmeansSegmenter {
            clusters: 2,
            seed: 7,
        };
        let map = segmenter.segment(&image).unwrap();
        assert_eq!(map.dimensions(), (20, 10));
        let left = map.get(0, 0);
        let right = map.get(19, 9);
        assert_ne!(left, right);
        for y in 0..10 {
            for x in 0..20 {
                let expected = if x < 10 { left } else { right };
                assert_eq!(map.get(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn rejects_impossible_cluster_counts() {
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        for clusters in [0, 17, 300] {
            let segmenter = KmeansSegmenter { clusters, seed: 0 };
            assert!(segmenter.segment(&image).is_err(), "clusters = {clusters}");
        }
        assert!(matches!(
            KmeansSegmenter::default().segment(&RgbImage::new(0, 3)),
            Err(MatchError::EmptyImage)
        ));
    }
}
