//! Color-harmony matching for clothing photos.
//!
//! Reads the dominant color of a reference garment, derives the colors that
//! go with it (complement or triad on the hue wheel), segments a closet photo
//! and shades every region whose color does not match.

pub mod classify;
pub mod cli;
pub mod color;
pub mod error;
pub mod pipeline;
pub mod prepare;
pub mod preview;
pub mod segment;

pub use classify::{KnnClassifier, PixelClassifier};
pub use color::{Color, ColorLabel, MatchingRule};
pub use error::{MatchError, Result};
pub use pipeline::decide::MatchSet;
pub use pipeline::{run, MatchOutcome, PipelineConfig};
pub use segment::{KmeansSegmenter, SegmentMap, Segmenter, SlicSegmenter};
