use std::collections::{BTreeMap, BTreeSet};

use image::RgbImage;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::classify::PixelClassifier;
use crate::color::ColorLabel;
use crate::error::{MatchError, Result};
use crate::pipeline::decide::MatchSet;
use crate::pipeline::dominant;
use crate::segment::SegmentMap;

/// The classified color of one segment and how many pixels decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentVerdict {
    pub label: ColorLabel,
    pub samples: usize,
}

/// Dominant label per segment id, built fresh for each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentClassification(BTreeMap<u32, SegmentVerdict>);

impl SegmentClassification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, verdict: SegmentVerdict) {
        self.0.insert(id, verdict);
    }

    pub fn label(&self, id: u32) -> Option<ColorLabel> {
        self.0.get(&id).map(|v| v.label)
    }

    pub fn verdict(&self, id: u32) -> Option<SegmentVerdict> {
        self.0.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, SegmentVerdict)> + '_ {
        self.0.iter().map(|(&id, &v)| (id, v))
    }
}

impl FromIterator<(u32, SegmentVerdict)> for SegmentClassification {
    fn from_iter<I: IntoIterator<Item = (u32, SegmentVerdict)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-segment generator seed. Each segment owns its generator, so results
/// do not depend on scheduling order.
fn segment_seed(seed: u64, id: u32) -> u64 {
    seed ^ (id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Classify every segment of `segments` by majority vote over a sample of
/// its pixels. Segments are processed in parallel.
pub fn classify_segments(
    image: &RgbImage,
    segments: &SegmentMap,
    classifier: &dyn PixelClassifier,
    divisor: usize,
    seed: u64,
) -> Result<SegmentClassification> {
    segments.ensure_matches(image)?;
    let groups: Vec<(u32, Vec<(u32, u32)>)> =
        segments.coordinates_by_segment().into_iter().collect();
    debug!("classifying {} segments", groups.len());

    let verdicts: BTreeMap<u32, SegmentVerdict> = groups
        .into_par_iter()
        .map(|(id, coordinates)| {
            let mut rng = StdRng::seed_from_u64(segment_seed(seed, id));
            let sample = dominant::sample_segment(&coordinates, divisor, &mut rng);
            if sample.is_empty() {
                return Err(MatchError::DegenerateSegment { id });
            }
            let label = dominant::estimate(image, &sample, classifier)?;
            Ok((
                id,
                SegmentVerdict {
                    label,
                    samples: sample.len(),
                },
            ))
        })
        .collect::<Result<_>>()?;

    Ok(SegmentClassification(verdicts))
}

/// Ids of the segments whose label is in `match_set`.
pub fn select_matches(
    classification: &SegmentClassification,
    match_set: &MatchSet,
) -> Result<BTreeSet<u32>> {
    let mut matched = BTreeSet::new();
    for (id, verdict) in classification.iter() {
        if verdict.samples == 0 {
            return Err(MatchError::DegenerateSegment { id });
        }
        if match_set.contains(verdict.label) {
            matched.insert(id);
        }
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KnnClassifier;
    use crate::color::MatchingRule;
    use crate::pipeline::decide::decide;
    use image::Rgb;

    /// Three vertical bands: green, blue, yellow with ids 10, 20, 30.
    fn banded() -> (RgbImage, SegmentMap) {
        let image = RgbImage::from_fn(30, 10, |x, _| match x / 10 {
            0 => Rgb([0, 255, 0]),
            1 => Rgb([0, 0, 255]),
            _ => Rgb([255, 255, 0]),
        });
        let segments = SegmentMap::from_fn(30, 10, |x, _| (x / 10 + 1) * 10);
        (image, segments)
    }

    #[test]
    fn every_segment_is_classified() {
        let (image, segments) = banded();
        let classification =
            classify_segments(&image, &segments, &KnnClassifier::default(), 5, 1).unwrap();
        assert_eq!(classification.len(), 3);
        assert_eq!(classification.label(10), Some(ColorLabel::Green));
        assert_eq!(classification.label(20), Some(ColorLabel::Blue));
        assert_eq!(classification.label(30), Some(ColorLabel::Yellow));
        assert_eq!(classification.verdict(10).unwrap().samples, 20);
    }

    #[test]
    fn red_triad_selects_green_and_blue() {
        let (image, segments) = banded();
        let classification =
            classify_segments(&image, &segments, &KnnClassifier::default(), 5, 1).unwrap();
        let matched =
            select_matches(&classification, &decide(ColorLabel::Red, MatchingRule::Triad))
                .unwrap();
        assert_eq!(matched, BTreeSet::from([10, 20]));
    }

    #[test]
    fn classification_is_reproducible() {
        let image = RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 12) as u8, (y * 12) as u8, 90]));
        let segments = SegmentMap::from_fn(20, 20, |x, y| (x / 5) + 4 * (y / 5));
        let knn = KnnClassifier::default();
        let a = classify_segments(&image, &segments, &knn, 5, 11).unwrap();
        let b = classify_segments(&image, &segments, &knn, 5, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shape_mismatch_fails_fast() {
        let (image, _) = banded();
        let segments = SegmentMap::from_fn(10, 10, |_, _| 0);
        assert!(matches!(
            classify_segments(&image, &segments, &KnnClassifier::default(), 5, 1),
            Err(MatchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn zero_sample_verdict_is_rejected() {
        let mut classification = SegmentClassification::new();
        classification.insert(
            4,
            SegmentVerdict {
                label: ColorLabel::Red,
                samples: 0,
            },
        );
        assert!(matches!(
            select_matches(&classification, &MatchSet::all_chromatic()),
            Err(MatchError::DegenerateSegment { id: 4 })
        ));
    }

    #[test]
    fn neutral_segments_never_match() {
        let classification: SegmentClassification = [
            (
                0,
                SegmentVerdict {
                    label: ColorLabel::Grey,
                    samples: 3,
                },
            ),
            (
                1,
                SegmentVerdict {
                    label: ColorLabel::Magenta,
                    samples: 3,
                },
            ),
        ]
        .into_iter()
        .collect();
        let matched = select_matches(&classification, &MatchSet::all_chromatic()).unwrap();
        assert_eq!(matched, BTreeSet::from([1]));
    }
}
