use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use charmony::cli::{Args, SegmenterKind};
use charmony::pipeline::dominant::SamplingConfig;
use charmony::prepare::{load_and_prepare, BalanceConfig};
use charmony::{preview, KmeansSegmenter, KnnClassifier, PipelineConfig, Segmenter, SlicSegmenter};

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{style}{}{style:#} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let defaults = BalanceConfig::default();
    let balance_config = BalanceConfig {
        percentile: args.percentile,
        denoise: defaults.denoise.filter(|_| !args.no_denoise),
        ..defaults
    };
    let balance = (!args.no_balance).then_some(&balance_config);

    let config = PipelineConfig {
        sampling: SamplingConfig {
            reference_samples: args.samples,
            ..SamplingConfig::default()
        },
        blend_factor: args.blend,
        seed: args.seed,
    };
    config.validate()?;

    let classifier = KnnClassifier::with_neighbors(args.neighbors)?;
    let segmenter: Box<dyn Segmenter> = match args.segmenter {
        SegmenterKind::Slic => Box::new(SlicSegmenter {
            n_segments: args.segments,
            compactness: args.compactness,
            sigma: args.sigma,
            ..SlicSegmenter::default()
        }),
        SegmenterKind::Kmeans => Box::new(KmeansSegmenter {
            clusters: args.clusters,
            seed: args.seed,
        }),
    };

    let reference = load_and_prepare(&args.reference, args.width, balance)?;
    let closet = load_and_prepare(&args.closet, args.width, balance)?;

    let outcome = charmony::run(
        args.rule,
        &reference,
        &closet,
        &classifier,
        segmenter.as_ref(),
        &config,
    )?;

    outcome
        .highlighted
        .save(&args.output)
        .with_context(|| format!("failed to write image to {}", args.output.display()))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "reference: {}", outcome.reference_color)?;
    writeln!(stdout, "matching: {}", outcome.matching_colors)?;
    writeln!(
        stdout,
        "highlighted {} of {} regions -> {}",
        outcome.matched_segments.len(),
        outcome.segment_count,
        args.output.display()
    )?;
    if args.preview {
        preview::print(&mut stdout, outcome.reference_color, &outcome.matching_colors)?;
    }
    Ok(())
}
