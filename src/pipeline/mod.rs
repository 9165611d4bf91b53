pub mod composite;
pub mod decide;
pub mod dominant;
pub mod matcher;
pub mod vote;
pub mod wheel;

use std::collections::BTreeSet;

use image::RgbImage;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::classify::PixelClassifier;
use crate::color::MatchingRule;
use crate::color::ColorLabel;
use crate::error::{MatchError, Result};
use crate::segment::Segmenter;

use composite::DEFAULT_BLEND_FACTOR;
use decide::MatchSet;
use dominant::SamplingConfig;

/// Tunables for a single [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sampling: SamplingConfig,
    pub blend_factor: f32,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            blend_factor: DEFAULT_BLEND_FACTOR,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        if !(0.0..=1.0).contains(&self.blend_factor) {
            return Err(MatchError::invalid("blend_factor", self.blend_factor));
        }
        Ok(())
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub reference_color: ColorLabel,
    pub matching_colors: MatchSet,
    pub segment_count: usize,
    pub matched_segments: BTreeSet<u32>,
    pub highlighted: RgbImage,
}

/// Find the reference garment's color, derive its matches under `rule`, and
/// shade every closet region that does not match.
///
/// Both images must already be decoded, balanced and resized. Fails without
/// partial output.
pub fn run(
    rule: MatchingRule,
    reference: &RgbImage,
    closet: &RgbImage,
    classifier: &dyn PixelClassifier,
    segmenter: &dyn Segmenter,
    config: &PipelineConfig,
) -> Result<MatchOutcome> {
    config.validate()?;
    if closet.width() == 0 || closet.height() == 0 {
        return Err(MatchError::EmptyImage);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let reference_color =
        dominant::estimate_reference(reference, classifier, &config.sampling, &mut rng)?;
    let matching_colors = decide::decide(reference_color, rule);
    info!("reference color {reference_color}, {rule} matches: {matching_colors}");

    let segments = segmenter.segment(closet)?;
    let classification = matcher::classify_segments(
        closet,
        &segments,
        classifier,
        config.sampling.segment_divisor,
        config.seed,
    )?;
    let matched_segments = matcher::select_matches(&classification, &matching_colors)?;
    info!(
        "{} of {} closet segments match",
        matched_segments.len(),
        classification.len()
    );

    let highlighted =
        composite::composite(closet, &segments, &matched_segments, config.blend_factor)?;

    Ok(MatchOutcome {
        reference_color,
        matching_colors,
        segment_count: classification.len(),
        matched_segments,
        highlighted,
    })
}
