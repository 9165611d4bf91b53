use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{Rgb, RgbImage};

use charmony::classify::KnnClassifier;
use charmony::color::{ColorLabel, MatchingRule};
use charmony::error::{MatchError, Result};
use charmony::pipeline::composite::composite;
use charmony::pipeline::decide::{decide, MatchSet};
use charmony::pipeline::vote::mode;
use charmony::pipeline::{run, PipelineConfig};
use charmony::segment::{SegmentMap, Segmenter, SlicSegmenter};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREY: Rgb<u8> = Rgb([128, 128, 128]);

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn solid(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

/// Three equal vertical bands in the given colors.
fn banded(width: u32, height: u32, bands: [Rgb<u8>; 3]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| bands[(x * 3 / width) as usize])
}

/// Segments the image into its three vertical bands, ids 0, 1, 2.
struct BandSegmenter;

impl Segmenter for BandSegmenter {
    fn segment(&self, image: &RgbImage) -> Result<SegmentMap> {
        let (width, height) = image.dimensions();
        Ok(SegmentMap::from_fn(width, height, |x, _| x * 3 / width))
    }
}

fn save_fixture(name: &str, image: &RgbImage) -> PathBuf {
    let dir = fixture_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn assert_darkened(original: &Rgb<u8>, out: &Rgb<u8>, blend: f32) {
    for c in 0..3 {
        let expected = original[c] as f32 * (1.0 - blend);
        assert!(
            (out[c] as f32 - expected).abs() <= 1.0,
            "channel {c}: {} not darkened to ~{expected}",
            out[c]
        );
    }
}

// ---------------------------------------------------------------------------
// Pipeline scenarios
// ---------------------------------------------------------------------------

#[test]
fn red_triad_highlights_green_and_blue_bands() {
    let reference = solid(40, 40, RED);
    let closet = banded(60, 20, [GREEN, BLUE, YELLOW]);
    let config = PipelineConfig::default();

    let outcome = run(
        MatchingRule::Triad,
        &reference,
        &closet,
        &KnnClassifier::default(),
        &BandSegmenter,
        &config,
    )
    .unwrap();

    assert_eq!(outcome.reference_color, ColorLabel::Red);
    assert_eq!(
        outcome.matching_colors.to_vec(),
        vec![ColorLabel::Green, ColorLabel::Blue]
    );
    assert_eq!(outcome.segment_count, 3);
    assert_eq!(outcome.matched_segments, BTreeSet::from([0, 1]));

    for (x, y, pixel) in outcome.highlighted.enumerate_pixels() {
        let original = closet.get_pixel(x, y);
        if x < 40 {
            assert_eq!(pixel, original, "matched pixel ({x}, {y}) changed");
        } else {
            assert_darkened(original, pixel, config.blend_factor);
        }
    }
}

#[test]
fn grey_reference_highlights_every_chromatic_region() {
    let reference = solid(30, 30, GREY);
    let closet = banded(60, 20, [BLUE, Rgb([255, 255, 255]), Rgb([255, 0, 255])]);
    let config = PipelineConfig::default();

    let outcome = run(
        MatchingRule::Complement,
        &reference,
        &closet,
        &KnnClassifier::default(),
        &BandSegmenter,
        &config,
    )
    .unwrap();

    assert_eq!(outcome.reference_color, ColorLabel::Grey);
    assert_eq!(outcome.matching_colors, MatchSet::all_chromatic());
    assert_eq!(outcome.matched_segments, BTreeSet::from([0, 2]));

    let white_band = closet.get_pixel(30, 10);
    assert_darkened(white_band, outcome.highlighted.get_pixel(30, 10), 0.85);
    assert_eq!(outcome.highlighted.get_pixel(5, 5), closet.get_pixel(5, 5));
    assert_eq!(outcome.highlighted.get_pixel(55, 5), closet.get_pixel(55, 5));
}

#[test]
fn slic_pipeline_darkens_only_the_mismatched_band() {
    let reference = solid(40, 40, RED);
    let closet = banded(60, 30, [GREEN, BLUE, YELLOW]);
    let segmenter = SlicSegmenter {
        n_segments: 18,
        ..SlicSegmenter::default()
    };

    let outcome = run(
        MatchingRule::Triad,
        &reference,
        &closet,
        &KnnClassifier::default(),
        &segmenter,
        &PipelineConfig::default(),
    )
    .unwrap();

    // band centers, well away from the blurred edges
    assert_eq!(outcome.highlighted.get_pixel(10, 15), &GREEN);
    assert_eq!(outcome.highlighted.get_pixel(30, 15), &BLUE);
    assert_darkened(&YELLOW, outcome.highlighted.get_pixel(50, 15), 0.85);
}

#[test]
fn runs_are_reproducible() {
    let reference = RgbImage::from_fn(30, 30, |x, y| Rgb([200, (x * 8) as u8, (y * 8) as u8]));
    let closet = RgbImage::from_fn(40, 30, |x, y| {
        Rgb([(x * 6) as u8, (y * 8) as u8, ((x + y) * 3) as u8])
    });
    let segmenter = SlicSegmenter {
        n_segments: 24,
        ..SlicSegmenter::default()
    };
    let config = PipelineConfig {
        seed: 1234,
        ..PipelineConfig::default()
    };
    let knn = KnnClassifier::default();

    let a = run(MatchingRule::Complement, &reference, &closet, &knn, &segmenter, &config).unwrap();
    let b = run(MatchingRule::Complement, &reference, &closet, &knn, &segmenter, &config).unwrap();
    assert_eq!(a.reference_color, b.reference_color);
    assert_eq!(a.matched_segments, b.matched_segments);
    assert_eq!(a.highlighted, b.highlighted);
}

#[test]
fn classifier_double_is_injected() {
    // every pixel reads as cyan, whose complement is red
    let always_cyan = |_: charmony::Color| ColorLabel::Cyan;
    let closet = banded(30, 10, [RED, RED, RED]);
    let outcome = run(
        MatchingRule::Complement,
        &solid(10, 10, GREY),
        &closet,
        &always_cyan,
        &BandSegmenter,
        &PipelineConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.reference_color, ColorLabel::Cyan);
    assert_eq!(outcome.matching_colors.to_vec(), vec![ColorLabel::Red]);
    assert!(outcome.matched_segments.is_empty());
}

#[test]
fn invalid_config_is_rejected_before_processing() {
    let config = PipelineConfig {
        blend_factor: 2.0,
        ..PipelineConfig::default()
    };
    let err = run(
        MatchingRule::Triad,
        &solid(10, 10, RED),
        &solid(10, 10, RED),
        &KnnClassifier::default(),
        &BandSegmenter,
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, MatchError::InvalidParameter { .. }));
}

#[test]
fn segmenter_shape_mismatch_is_an_error() {
    struct Wrong;
    impl Segmenter for Wrong {
        fn segment(&self, _: &RgbImage) -> Result<SegmentMap> {
            Ok(SegmentMap::from_fn(3, 3, |_, _| 0))
        }
    }
    let err = run(
        MatchingRule::Triad,
        &solid(10, 10, RED),
        &solid(10, 10, RED),
        &KnnClassifier::default(),
        &Wrong,
        &PipelineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MatchError::ShapeMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_label() -> impl Strategy<Value = ColorLabel> {
        (0..ColorLabel::COUNT).prop_map(|i| ColorLabel::ALL[i])
    }

    /// A label list and a shuffled copy of it.
    fn arb_labels_and_permutation() -> impl Strategy<Value = (Vec<ColorLabel>, Vec<ColorLabel>)> {
        proptest::collection::vec(arb_label(), 1..40)
            .prop_flat_map(|labels| (Just(labels.clone()), Just(labels).prop_shuffle()))
    }

    /// A small image plus a segment map over it with ids 0..4.
    fn arb_image_and_segments() -> impl Strategy<Value = (RgbImage, SegmentMap)> {
        (1u32..=12, 1u32..=12).prop_flat_map(|(w, h)| {
            let n = (w * h) as usize;
            (
                proptest::collection::vec(proptest::array::uniform3(0u8..=255u8), n),
                proptest::collection::vec(0u32..4, n),
            )
                .prop_map(move |(pixels, ids)| {
                    let raw: Vec<u8> = pixels.into_iter().flatten().collect();
                    let image = RgbImage::from_raw(w, h, raw).unwrap();
                    (image, SegmentMap::new(w, h, ids).unwrap())
                })
        })
    }

    proptest! {
        #[test]
        fn mode_ignores_order((labels, shuffled) in arb_labels_and_permutation()) {
            prop_assert_eq!(mode(&labels).unwrap(), mode(&shuffled).unwrap());
        }

        #[test]
        fn mode_is_a_most_frequent_label(labels in proptest::collection::vec(arb_label(), 1..40)) {
            let winner = mode(&labels).unwrap();
            let count = |l: ColorLabel| labels.iter().filter(|&&x| x == l).count();
            for label in ColorLabel::ALL {
                prop_assert!(count(winner) >= count(label));
            }
        }

        #[test]
        fn matching_everything_leaves_image_unchanged(
            (image, segments) in arb_image_and_segments(),
            blend in 0.0f32..=1.0,
        ) {
            let all = segments.segment_ids();
            let out = composite(&image, &segments, &all, blend).unwrap();
            prop_assert_eq!(out, image);
        }

        #[test]
        fn matching_nothing_darkens_by_blend(
            (image, segments) in arb_image_and_segments(),
            blend in 0.0f32..=1.0,
        ) {
            let out = composite(&image, &segments, &BTreeSet::new(), blend).unwrap();
            for (o, p) in image.pixels().zip(out.pixels()) {
                for c in 0..3 {
                    let expected = o[c] as f32 * (1.0 - blend);
                    prop_assert!((p[c] as f32 - expected).abs() <= 1.0);
                }
            }
        }

        #[test]
        fn rule_cardinalities(index in 0usize..6) {
            let reference = ColorLabel::CHROMATIC[index];
            let complement = decide(reference, MatchingRule::Complement);
            prop_assert!((1..=2).contains(&complement.len()));
            let triad = decide(reference, MatchingRule::Triad);
            prop_assert_eq!(triad.len(), 2);
            prop_assert!(!triad.contains(reference));
            prop_assert!(triad.iter().all(ColorLabel::is_chromatic));
        }
    }
}

// ---------------------------------------------------------------------------
// CLI integration tests (run the actual binary)
// ---------------------------------------------------------------------------

fn cargo_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_charmony"))
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(cargo_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run binary")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn cli_triad_writes_highlighted_image() {
    let reference = save_fixture("cli-red-shirt.png", &solid(40, 40, RED));
    let closet = save_fixture("cli-closet.png", &banded(60, 30, [GREEN, BLUE, YELLOW]));
    let out_dir = std::env::temp_dir().join("charmony-test-cli-triad");
    std::fs::create_dir_all(&out_dir).unwrap();
    let out_path = out_dir.join("highlighted.png");

    let output = run_cli(&[
        path_str(&reference),
        path_str(&closet),
        "--rule",
        "triad",
        "--width",
        "60",
        "--segments",
        "18",
        "--no-balance",
        "--output",
        path_str(&out_path),
    ]);
    assert!(
        output.status.success(),
        "binary failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reference: red"), "{stdout}");
    assert!(stdout.contains("matching: green, blue"), "{stdout}");

    let written = image::open(&out_path).unwrap().to_rgb8();
    assert_eq!(written.dimensions(), (60, 30));
    assert_eq!(written.get_pixel(10, 15), &GREEN);
    assert!(written.get_pixel(50, 15)[0] < 60);

    std::fs::remove_dir_all(&out_dir).unwrap();
}

#[test]
fn cli_preview_prints_swatches() {
    let reference = save_fixture("cli-preview-shirt.png", &solid(20, 20, GREY));
    let closet = save_fixture("cli-preview-closet.png", &banded(30, 15, [RED, GREY, BLUE]));
    let out_dir = std::env::temp_dir().join("charmony-test-cli-preview");
    std::fs::create_dir_all(&out_dir).unwrap();
    let out_path = out_dir.join("out.png");

    let output = run_cli(&[
        path_str(&reference),
        path_str(&closet),
        "--width",
        "30",
        "--segmenter",
        "kmeans",
        "--clusters",
        "3",
        "--preview",
        "-o",
        path_str(&out_path),
    ]);
    assert!(
        output.status.success(),
        "binary failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reference: grey"), "{stdout}");
    assert!(stdout.contains("matches"), "{stdout}");

    std::fs::remove_dir_all(&out_dir).unwrap();
}

#[test]
fn cli_help_output() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("charmony"));
    assert!(stdout.contains("--rule"));
    assert!(stdout.contains("--blend"));
    assert!(stdout.contains("--segmenter"));
}

#[test]
fn cli_unknown_rule_is_rejected() {
    let output = run_cli(&["a.png", "b.png", "--rule", "analogous"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("analogous"), "{stderr}");
}

#[test]
fn cli_file_not_found_error() {
    let output = run_cli(&["/nonexistent/shirt.png", "/nonexistent/closet.png"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("file not found") || stderr.contains("No such file"),
        "expected file-not-found error, got: {stderr}"
    );
}

#[test]
fn cli_unsupported_format_error() {
    let dir = fixture_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let bogus = dir.join("cli_not_an_image.txt");
    std::fs::write(&bogus, "this is not an image").unwrap();

    let output = run_cli(&[path_str(&bogus), path_str(&bogus)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unsupported") || stderr.contains("Unsupported"),
        "expected unsupported format error, got: {stderr}"
    );
}
