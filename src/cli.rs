use std::path::PathBuf;

use clap::Parser;

use crate::color::MatchingRule;

/// Highlight the garments in a closet photo that match a reference garment's color.
#[derive(Parser, Debug)]
#[command(name = "charmony", version, about)]
pub struct Args {
    /// Image of the garment to match against
    pub reference: PathBuf,

    /// Image of the closet to search for matches
    pub closet: PathBuf,

    /// Color-theory rule used to pick matching colors
    #[arg(short, long, value_enum, default_value_t = MatchingRule::Complement)]
    pub rule: MatchingRule,

    /// Where to write the highlighted closet image
    #[arg(short, long, default_value = "highlighted.png")]
    pub output: PathBuf,

    /// Width both images are resized to before analysis
    #[arg(long, default_value_t = 600)]
    pub width: u32,

    /// Percentile clipped (split across both ends) by the color balance
    #[arg(long, default_value_t = 10.0)]
    pub percentile: f32,

    /// Skip color balancing and gamma correction
    #[arg(long)]
    pub no_balance: bool,

    /// Skip the bilateral noise filter that follows color balancing
    #[arg(long)]
    pub no_denoise: bool,

    /// Closet segmentation algorithm
    #[arg(long, value_enum, default_value_t = SegmenterKind::Slic)]
    pub segmenter: SegmenterKind,

    /// Target number of SLIC superpixels
    #[arg(long, default_value_t = 350)]
    pub segments: usize,

    /// SLIC compactness (higher = more square superpixels)
    #[arg(long, default_value_t = 10.0)]
    pub compactness: f32,

    /// Gaussian smoothing applied before SLIC
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f32,

    /// Number of color clusters for the k-means segmenter
    #[arg(long, default_value_t = 12)]
    pub clusters: usize,

    /// Pixels sampled from the center of the reference image
    #[arg(long, default_value_t = 400)]
    pub samples: usize,

    /// Neighbours consulted by the pixel classifier
    #[arg(short = 'k', long, default_value_t = 1)]
    pub neighbors: usize,

    /// How strongly non-matching regions are shaded (0 = not at all, 1 = black)
    #[arg(long, default_value_t = 0.85)]
    pub blend: f32,

    /// Seed for all pixel sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Print a colored terminal preview of the matched colors
    #[arg(long)]
    pub preview: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SegmenterKind {
    /// SLIC superpixels (contiguous regions)
    Slic,
    /// K-means color clusters (regions may be scattered)
    Kmeans,
}
